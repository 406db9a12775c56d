//! Deterministic id namespacing
//!
//! A node cloned into universe `U2` gets the id `U2/<original>`; a scene cloned
//! under story clone `U2/ST1` gets `U2/ST1/<scene>`. Remapping is pure, so a
//! repeated clone into the same target lands on the same ids.

/// Separator between scope and original id
pub const SEPARATOR: char = '/';

/// Clone id of `id` inside `scope`
#[inline]
#[must_use]
pub fn remap(scope: &str, id: &str) -> String {
    let mut out = String::with_capacity(scope.len() + 1 + id.len());
    out.push_str(scope);
    out.push(SEPARATOR);
    out.push_str(id);
    out
}

/// Original id of a clone made inside `scope`, if it was made there
#[inline]
#[must_use]
pub fn unmap<'a>(clone_id: &'a str, scope: &str) -> Option<&'a str> {
    clone_id.strip_prefix(scope)?.strip_prefix(SEPARATOR)
}

/// Clone id of a scene reached through `story` in universe `target`
#[inline]
#[must_use]
pub fn remap_scene(target: &str, story: &str, scene: &str) -> String {
    remap(&remap(target, story), scene)
}
