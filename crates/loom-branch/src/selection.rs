//! What a clone copies
//!
//! A [`Selection`] is the closed set of source nodes one clone operation will
//! copy, computed by [`crate::Selector`] before any write. Dry runs report it;
//! real runs hand it to [`crate::GraphCloner`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// Kind of clone operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// Prefix of one story up to a divergence scene
    Branch,
    /// Whole universe
    Clone,
    /// Filtered universe
    Subset,
}

impl CloneMode {
    /// Mode name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Clone => "clone",
            Self::Subset => "subset",
        }
    }
}

impl Display for CloneMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for a subset clone
///
/// Empty allowlists mean "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetFilter {
    /// Story ids to keep
    pub stories: Vec<String>,
    /// Arc ids to keep
    pub arcs: Vec<String>,
    /// Keep only scenes with `sequence_index <= scene_max_index`
    pub scene_max_index: Option<i64>,
    /// Clone every entity of the universe, not only those in kept scenes
    pub include_all_entities: bool,
}

impl SubsetFilter {
    /// Create filter that keeps everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to these stories
    #[inline]
    #[must_use]
    pub fn stories<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stories = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to these arcs
    #[inline]
    #[must_use]
    pub fn arcs<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arcs = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Cap scene order
    #[inline]
    #[must_use]
    pub fn scene_max_index(mut self, max: i64) -> Self {
        self.scene_max_index = Some(max);
        self
    }

    /// Clone all entities of the universe
    #[inline]
    #[must_use]
    pub fn include_all_entities(mut self, all: bool) -> Self {
        self.include_all_entities = all;
        self
    }
}

/// What to select from the source universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionRequest {
    /// Branch at a divergence scene
    BranchAtScene {
        /// Divergence scene id
        scene_id: String,
    },
    /// Full clone
    Full,
    /// Subset clone
    Subset(SubsetFilter),
}

impl SelectionRequest {
    /// Mode this request runs in
    #[inline]
    #[must_use]
    pub fn mode(&self) -> CloneMode {
        match self {
            Self::BranchAtScene { .. } => CloneMode::Branch,
            Self::Full => CloneMode::Clone,
            Self::Subset(_) => CloneMode::Subset,
        }
    }
}

/// Resolved divergence point of a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    /// Divergence scene
    pub scene_id: String,
    /// Story that owns the divergence scene in the source universe
    pub story_id: String,
    /// Order of the divergence scene within that story
    pub sequence_index: i64,
}

/// One scene reached through one story
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SceneRef {
    /// Owning story
    pub story_id: String,
    /// Scene
    pub scene_id: String,
    /// Resolved order, if the scene has one
    pub sequence_index: Option<i64>,
}

/// Ownership of a sheet by an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SheetLink {
    /// Owning entity
    pub entity_id: String,
    /// Owned sheet
    pub sheet_id: String,
}

/// Number of nodes copied, per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneCounts {
    /// Stories
    pub stories: usize,
    /// Scenes, one per `(story, scene)` pair
    pub scenes: usize,
    /// Entities
    pub entities: usize,
    /// Facts
    pub facts: usize,
    /// Sheets
    pub sheets: usize,
    /// Relation states
    pub relation_states: usize,
    /// Arcs
    pub arcs: usize,
}

impl CloneCounts {
    /// Sum over all types
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.stories
            + self.scenes
            + self.entities
            + self.facts
            + self.sheets
            + self.relation_states
            + self.arcs
    }
}

/// Stable hash of a selection, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionFingerprint(pub String);

impl Display for SelectionFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of source nodes one clone copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Source universe
    pub source_id: String,
    /// Operation mode
    pub mode: CloneMode,
    /// Divergence point, for branches
    pub divergence: Option<Divergence>,
    /// Story ids
    pub stories: BTreeSet<String>,
    /// Scenes, keyed by owning story
    pub scenes: BTreeSet<SceneRef>,
    /// Entity ids
    pub entities: BTreeSet<String>,
    /// Fact ids
    pub facts: BTreeSet<String>,
    /// Sheet ids
    pub sheets: BTreeSet<String>,
    /// Entity-to-sheet ownership to recreate
    pub sheet_links: BTreeSet<SheetLink>,
    /// Relation state ids
    pub relation_states: BTreeSet<String>,
    /// Arc ids
    pub arcs: BTreeSet<String>,
}

impl Selection {
    /// Create empty selection
    #[must_use]
    pub fn empty(source_id: impl Into<String>, mode: CloneMode) -> Self {
        Self {
            source_id: source_id.into(),
            mode,
            divergence: None,
            stories: BTreeSet::new(),
            scenes: BTreeSet::new(),
            entities: BTreeSet::new(),
            facts: BTreeSet::new(),
            sheets: BTreeSet::new(),
            sheet_links: BTreeSet::new(),
            relation_states: BTreeSet::new(),
            arcs: BTreeSet::new(),
        }
    }

    /// Nodes a clone of this selection creates, per type
    #[must_use]
    pub fn counts(&self) -> CloneCounts {
        CloneCounts {
            stories: self.stories.len(),
            scenes: self.scenes.len(),
            entities: self.entities.len(),
            facts: self.facts.len(),
            sheets: self.sheets.len(),
            relation_states: self.relation_states.len(),
            arcs: self.arcs.len(),
        }
    }

    /// Distinct selected scene ids
    #[must_use]
    pub fn scene_ids(&self) -> BTreeSet<&str> {
        self.scenes.iter().map(|s| s.scene_id.as_str()).collect()
    }

    /// Owning stories of each selected scene id
    #[must_use]
    pub fn scene_owners(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for scene in &self.scenes {
            owners
                .entry(scene.scene_id.as_str())
                .or_default()
                .push(scene.story_id.as_str());
        }
        owners
    }

    /// Hash of every selected id, stable across runs
    #[must_use]
    pub fn fingerprint(&self) -> SelectionFingerprint {
        let mut hasher = blake3::Hasher::new();
        feed(&mut hasher, "source", &[self.source_id.as_str(), self.mode.as_str()]);
        if let Some(d) = &self.divergence {
            let index = d.sequence_index.to_string();
            feed(
                &mut hasher,
                "divergence",
                &[d.story_id.as_str(), d.scene_id.as_str(), index.as_str()],
            );
        }
        for (tag, ids) in [
            ("story", &self.stories),
            ("entity", &self.entities),
            ("fact", &self.facts),
            ("sheet", &self.sheets),
            ("relation_state", &self.relation_states),
            ("arc", &self.arcs),
        ] {
            for id in ids {
                feed(&mut hasher, tag, &[id.as_str()]);
            }
        }
        for scene in &self.scenes {
            let index = scene
                .sequence_index
                .map_or_else(String::new, |i| i.to_string());
            feed(
                &mut hasher,
                "scene",
                &[scene.story_id.as_str(), scene.scene_id.as_str(), index.as_str()],
            );
        }
        for link in &self.sheet_links {
            feed(
                &mut hasher,
                "sheet_link",
                &[link.entity_id.as_str(), link.sheet_id.as_str()],
            );
        }

        SelectionFingerprint(hex::encode(hasher.finalize().as_bytes()))
    }
}

/// Unit and record separators keep adjacent fields from running together
fn feed(hasher: &mut blake3::Hasher, tag: &str, parts: &[&str]) {
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update(&[0x1f]);
        hasher.update(part.as_bytes());
    }
    hasher.update(&[0x1e]);
}
