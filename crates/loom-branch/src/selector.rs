//! Selection of the nodes a clone will copy
//!
//! The selector only reads. It runs inside the clone transaction on the
//! mutating path and directly against the store for dry runs, so both paths
//! see exactly the same selection.

use crate::error::BranchError;
use crate::selection::{
    CloneMode, Divergence, SceneRef, Selection, SelectionRequest, SheetLink, SubsetFilter,
};
use crate::walk;
use loom_graph::{EdgeKind, GraphRead, NodeKey, NodeLabel};
use std::collections::BTreeSet;

/// Read-only planner for clone operations
pub struct Selector<'r> {
    reader: &'r dyn GraphRead,
}

impl<'r> Selector<'r> {
    /// Create selector over a reader
    #[inline]
    #[must_use]
    pub fn new(reader: &'r dyn GraphRead) -> Self {
        Self { reader }
    }

    /// Check that the source exists and the target is free
    ///
    /// # Errors
    /// - [`BranchError::SourceNotFound`] if the source universe is absent
    /// - [`BranchError::TargetAlreadyExists`] if the target exists and `force` is
    ///   unset, or the target already branched from a different universe
    pub fn check_source_and_target(
        &self,
        source_id: &str,
        target_id: &str,
        force: bool,
    ) -> Result<(), BranchError> {
        if !self.reader.exists(NodeLabel::Universe, source_id)? {
            return Err(BranchError::SourceNotFound(source_id.to_string()));
        }
        if !self.reader.exists(NodeLabel::Universe, target_id)? {
            return Ok(());
        }
        if !force {
            return Err(BranchError::TargetAlreadyExists(target_id.to_string()));
        }
        let target = NodeKey::new(NodeLabel::Universe, target_id);
        let foreign = walk::outgoing(self.reader, &target, EdgeKind::BranchedFrom)?
            .iter()
            .any(|e| e.to.label == NodeLabel::Universe && e.to.id != source_id);
        if foreign {
            return Err(BranchError::TargetAlreadyExists(target_id.to_string()));
        }
        Ok(())
    }

    /// Select for any request
    ///
    /// # Errors
    /// See [`Self::branch_at_scene`]; store failures otherwise
    pub fn select(
        &self,
        source_id: &str,
        request: &SelectionRequest,
    ) -> Result<Selection, BranchError> {
        match request {
            SelectionRequest::BranchAtScene { scene_id } => self.branch_at_scene(source_id, scene_id),
            SelectionRequest::Full => self.clone_full(source_id),
            SelectionRequest::Subset(filter) => self.clone_subset(source_id, filter),
        }
    }

    /// Find the story owning a scene in the source universe, and the scene's order
    ///
    /// When several of the universe's stories contain the scene, the one with
    /// the lowest id wins.
    ///
    /// # Errors
    /// [`BranchError::DivergencePointNotFound`] if no owning story belongs to
    /// the universe or the scene has no `sequence_index`
    pub fn resolve_divergence(
        &self,
        source_id: &str,
        scene_id: &str,
    ) -> Result<Divergence, BranchError> {
        let not_found = || BranchError::DivergencePointNotFound {
            universe_id: source_id.to_string(),
            scene_id: scene_id.to_string(),
        };

        let stories = walk::universe_stories(self.reader, source_id)?;
        let scene = NodeKey::new(NodeLabel::Scene, scene_id);
        let owner = walk::incoming(self.reader, &scene, EdgeKind::HasScene, NodeLabel::Story)?
            .into_iter()
            .filter(|e| stories.contains(&e.from.id))
            .min_by(|a, b| a.from.id.cmp(&b.from.id))
            .ok_or_else(not_found)?;

        let sequence_index = walk::sequence_index(self.reader, &owner)?.ok_or_else(not_found)?;
        Ok(Divergence {
            scene_id: scene_id.to_string(),
            story_id: owner.from.id,
            sequence_index,
        })
    }

    /// Prefix of the divergence story up to and including the divergence scene
    ///
    /// # Errors
    /// [`BranchError::DivergencePointNotFound`] as in [`Self::resolve_divergence`]
    pub fn branch_at_scene(
        &self,
        source_id: &str,
        scene_id: &str,
    ) -> Result<Selection, BranchError> {
        let divergence = self.resolve_divergence(source_id, scene_id)?;
        let mut selection = Selection::empty(source_id, CloneMode::Branch);

        selection.stories.insert(divergence.story_id.clone());
        selection.scenes = walk::story_scenes(self.reader, &divergence.story_id)?
            .into_iter()
            .filter(|s| within(s, Some(divergence.sequence_index)))
            .collect();

        self.fill_scene_contents(&mut selection, false, &BTreeSet::new())?;
        self.fill_sheets(&mut selection, Some(&divergence.story_id))?;
        let scene_ids: BTreeSet<String> =
            selection.scene_ids().into_iter().map(str::to_string).collect();
        selection.relation_states = self.closed_relation_states(&selection.entities, Some(&scene_ids))?;

        selection.divergence = Some(divergence);
        Ok(selection)
    }

    /// Everything the source universe owns
    ///
    /// # Errors
    /// Store failures only
    pub fn clone_full(&self, source_id: &str) -> Result<Selection, BranchError> {
        let mut selection = Selection::empty(source_id, CloneMode::Clone);
        selection.stories = walk::universe_stories(self.reader, source_id)?;
        selection.scenes = walk::universe_scenes(self.reader, source_id)?;

        let members = walk::universe_entities(self.reader, source_id)?;
        self.fill_scene_contents(&mut selection, true, &members)?;
        self.fill_sheets(&mut selection, None)?;
        selection.relation_states = self.closed_relation_states(&selection.entities, None)?;
        selection.arcs = walk::universe_arcs(self.reader, source_id)?;
        Ok(selection)
    }

    /// Source universe narrowed by a filter
    ///
    /// # Errors
    /// Store failures only
    pub fn clone_subset(
        &self,
        source_id: &str,
        filter: &SubsetFilter,
    ) -> Result<Selection, BranchError> {
        let mut selection = Selection::empty(source_id, CloneMode::Subset);
        selection.stories = walk::universe_stories(self.reader, source_id)?
            .into_iter()
            .filter(|id| allowed(&filter.stories, id))
            .collect();
        for story in &selection.stories {
            selection.scenes.extend(
                walk::story_scenes(self.reader, story)?
                    .into_iter()
                    .filter(|s| within(s, filter.scene_max_index)),
            );
        }

        let members = if filter.include_all_entities {
            walk::universe_entities(self.reader, source_id)?
        } else {
            BTreeSet::new()
        };
        self.fill_scene_contents(&mut selection, filter.include_all_entities, &members)?;
        self.fill_sheets(&mut selection, None)?;
        selection.relation_states = self.closed_relation_states(&selection.entities, None)?;
        selection.arcs = walk::universe_arcs(self.reader, source_id)?
            .into_iter()
            .filter(|id| allowed(&filter.arcs, id))
            .collect();
        Ok(selection)
    }

    /// Facts of the selected scenes, and entities: either `members` or those
    /// appearing in the selected scenes
    fn fill_scene_contents(
        &self,
        selection: &mut Selection,
        use_members: bool,
        members: &BTreeSet<String>,
    ) -> Result<(), BranchError> {
        let scene_ids: Vec<String> = selection
            .scene_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        for scene in &scene_ids {
            selection.facts.extend(walk::scene_facts(self.reader, scene)?);
            if !use_members {
                selection
                    .entities
                    .extend(walk::scene_entities(self.reader, scene)?);
            }
        }
        if use_members {
            selection.entities.clone_from(members);
        }
        Ok(())
    }

    /// Sheets owned by selected entities, optionally scoped to one story
    fn fill_sheets(
        &self,
        selection: &mut Selection,
        story_id: Option<&str>,
    ) -> Result<(), BranchError> {
        for entity in &selection.entities {
            let key = NodeKey::new(NodeLabel::Entity, entity.clone());
            for edge in walk::outgoing(self.reader, &key, EdgeKind::HasSheet)? {
                if story_id.is_some_and(|story| edge.prop_str("story_id") != Some(story)) {
                    continue;
                }
                selection.sheet_links.insert(SheetLink {
                    entity_id: entity.clone(),
                    sheet_id: edge.to.id,
                });
            }
        }
        selection.sheets = selection
            .sheet_links
            .iter()
            .map(|link| link.sheet_id.clone())
            .collect();
        Ok(())
    }

    /// Relation states whose A and B endpoints are both selected, and, when
    /// `scenes` is given, that were set, changed or ended in one of them
    fn closed_relation_states(
        &self,
        entities: &BTreeSet<String>,
        scenes: Option<&BTreeSet<String>>,
    ) -> Result<BTreeSet<String>, BranchError> {
        let mut candidates = BTreeSet::new();
        for entity in entities {
            let key = NodeKey::new(NodeLabel::Entity, entity.clone());
            candidates.extend(
                walk::incoming(self.reader, &key, EdgeKind::RelStateFor, NodeLabel::RelationState)?
                    .into_iter()
                    .map(|e| e.from.id),
            );
        }

        let mut closed = BTreeSet::new();
        for rs in candidates {
            let key = NodeKey::new(NodeLabel::RelationState, rs.clone());
            let endpoints = walk::outgoing(self.reader, &key, EdgeKind::RelStateFor)?;
            let endpoint = |name: &str| {
                endpoints
                    .iter()
                    .find(|e| e.prop_str("endpoint") == Some(name))
                    .map(|e| e.to.id.as_str())
            };
            let both = matches!(
                (endpoint("A"), endpoint("B")),
                (Some(a), Some(b)) if entities.contains(a) && entities.contains(b)
            );
            if !both {
                continue;
            }
            if let Some(scenes) = scenes {
                let anchored = walk::provenance(self.reader, &rs)?
                    .iter()
                    .any(|e| scenes.contains(&e.to.id));
                if !anchored {
                    continue;
                }
            }
            closed.insert(rs);
        }
        Ok(closed)
    }
}

/// Empty allowlist admits everything
fn allowed(allowlist: &[String], id: &str) -> bool {
    allowlist.is_empty() || allowlist.iter().any(|a| a == id)
}

/// Scenes without an order are excluded whenever a cap applies
fn within(scene: &SceneRef, max: Option<i64>) -> bool {
    max.map_or(true, |max| scene.sequence_index.is_some_and(|i| i <= max))
}
