use loom_branch::{Brancher, BranchError, CloneOptions, SubsetFilter};
use loom_graph::{EdgeKind, EdgePattern, GraphRead, NodeKey, NodeLabel};
use loom_test_utils::{ids, rich_universe, scenario_a, targets};
use pretty_assertions::assert_eq;

fn scene(id: &str) -> NodeKey {
    NodeKey::new(NodeLabel::Scene, id)
}

#[test]
fn test_branch_copies_prefix_up_to_divergence() {
    let graph = scenario_a().build();
    let brancher = Brancher::new(&graph);

    let report = brancher
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2"))
        .unwrap();

    assert!(!report.dry_run);
    assert_eq!(report.counts.stories, 1);
    assert_eq!(report.counts.scenes, 2);
    assert_eq!(report.counts.entities, 1);
    assert_eq!(report.counts.facts, 1);

    let divergence = report.divergence.unwrap();
    assert_eq!(divergence.story_id, "ST1");
    assert_eq!(divergence.sequence_index, 2);

    let cloned: Vec<_> = targets(&graph, &NodeKey::new(NodeLabel::Story, "U2/ST1"), EdgeKind::HasScene)
        .into_iter()
        .map(|k| k.id)
        .collect();
    assert_eq!(cloned, vec!["U2/ST1/SC1", "U2/ST1/SC2"]);
    assert!(!graph.exists(NodeLabel::Scene, "U2/ST1/SC3").unwrap());
    assert!(graph.exists(NodeLabel::Fact, "U2/F1").unwrap());
}

#[test]
fn test_branch_records_divergence_on_universe() {
    let graph = scenario_a().build();
    Brancher::new(&graph)
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2"))
        .unwrap();

    let universe = graph.node(&NodeKey::new(NodeLabel::Universe, "U2")).unwrap().unwrap();
    assert_eq!(universe.prop_str("name"), Some("Prime [branch]"));
    assert_eq!(universe.prop_str("description"), Some("Prime timeline (branched at SC2)"));

    let edges = graph
        .query(
            &EdgePattern::new(EdgeKind::BranchedFrom)
                .from_node(NodeLabel::Universe, "U2"),
        )
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].to, NodeKey::new(NodeLabel::Universe, "U1"));
    assert_eq!(edges[0].prop_str("at_scene"), Some("SC2"));
    assert_eq!(edges[0].prop_str("story_id"), Some("ST1"));
    assert_eq!(edges[0].prop_i64("sequence_index"), Some(2));
}

#[test]
fn test_branch_keeps_only_anchored_relation_states() {
    let graph = rich_universe().build();
    let report = Brancher::new(&graph)
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2"))
        .unwrap();

    assert_eq!(report.counts.entities, 2);
    assert_eq!(report.counts.sheets, 1);
    assert_eq!(report.counts.relation_states, 1);
    assert_eq!(report.counts.arcs, 0);

    assert!(graph.exists(NodeLabel::Sheet, "U2/SH1").unwrap());
    assert!(!graph.exists(NodeLabel::Sheet, "U2/SH2").unwrap());
    assert!(graph.exists(NodeLabel::RelationState, "U2/RS1").unwrap());
    assert!(!graph.exists(NodeLabel::RelationState, "U2/RS2").unwrap());
    assert!(!graph.exists(NodeLabel::RelationState, "U2/RS3").unwrap());

    let rs = NodeKey::new(NodeLabel::RelationState, "U2/RS1");
    assert_eq!(targets(&graph, &rs, EdgeKind::SetInScene), vec![scene("U2/ST1/SC1")]);
    assert!(targets(&graph, &rs, EdgeKind::ChangedInScene).is_empty());
}

#[test]
fn test_branch_carries_surroundings() {
    let graph = rich_universe().build();
    Brancher::new(&graph)
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2").with_name("Mirror"))
        .unwrap();

    let u2 = NodeKey::new(NodeLabel::Universe, "U2");
    assert_eq!(
        graph.node(&u2).unwrap().unwrap().prop_str("name"),
        Some("Mirror")
    );
    assert_eq!(
        targets(&graph, &u2, EdgeKind::UsesSystem),
        vec![NodeKey::new(NodeLabel::System, "SYS1")]
    );
    assert_eq!(
        targets(&graph, &NodeKey::new(NodeLabel::Multiverse, "MV1"), EdgeKind::HasUniverse).len(),
        2
    );
    assert_eq!(
        targets(&graph, &NodeKey::new(NodeLabel::Axiom, "AX1"), EdgeKind::AppliesTo).len(),
        2
    );

    let sheet_owner = graph
        .query(
            &EdgePattern::new(EdgeKind::HasSheet)
                .from_node(NodeLabel::Entity, "U2/E1"),
        )
        .unwrap();
    assert_eq!(sheet_owner.len(), 1);
    assert_eq!(sheet_owner[0].prop_str("story_id"), Some("ST1"));
    assert_eq!(sheet_owner[0].prop_str("system_id"), Some("SYS1"));

    let roles: Vec<_> = graph
        .query(
            &EdgePattern::new(EdgeKind::ParticipatesAs)
                .to_node(NodeLabel::Fact, "U2/F1"),
        )
        .unwrap()
        .into_iter()
        .map(|e| {
            let role = e.prop_str("role").map(str::to_string);
            (e.from.id, role)
        })
        .collect();
    assert_eq!(
        roles,
        vec![
            ("U2/E1".to_string(), Some("witness".to_string())),
            ("U2/E3".to_string(), Some("culprit".to_string())),
        ]
    );
}

#[test]
fn test_subset_caps_scenes_and_entities() {
    let graph = scenario_a().build();
    let filter = SubsetFilter::new().stories(["ST1"]).scene_max_index(1);
    let report = Brancher::new(&graph)
        .clone_subset("U1", &filter, &CloneOptions::new("U3"))
        .unwrap();

    assert_eq!(report.counts.scenes, 1);
    assert!(graph.exists(NodeLabel::Scene, "U3/ST1/SC1").unwrap());
    assert!(!graph.exists(NodeLabel::Scene, "U3/ST1/SC2").unwrap());
    assert_eq!(report.counts.entities, 1);
    assert_eq!(report.counts.facts, 0);
}

#[test]
fn test_subset_entity_scope_follows_flag() {
    let graph = rich_universe().build();
    let brancher = Brancher::new(&graph);
    let filter = SubsetFilter::new().stories(["ST1"]).scene_max_index(1);

    let scene_only = brancher
        .clone_subset("U1", &filter, &CloneOptions::new("U3").dry_run(true))
        .unwrap();
    assert_eq!(scene_only.counts.entities, 2);
    assert_eq!(scene_only.counts.relation_states, 2);

    let everyone = brancher
        .clone_subset(
            "U1",
            &filter.clone().include_all_entities(true),
            &CloneOptions::new("U3"),
        )
        .unwrap();
    assert_eq!(everyone.counts.entities, 4);
    assert_eq!(everyone.counts.relation_states, 3);
    let entities: Vec<_> = ids(&graph, NodeLabel::Entity)
        .into_iter()
        .filter(|id| id.starts_with("U3/"))
        .collect();
    assert_eq!(entities, vec!["U3/E1", "U3/E2", "U3/E3", "U3/E4"]);
}

#[test]
fn test_subset_arcs_keep_only_selected_story_order() {
    let graph = rich_universe().build();
    let filter = SubsetFilter::new().stories(["ST1"]).arcs(["A1"]);
    let report = Brancher::new(&graph)
        .clone_subset("U1", &filter, &CloneOptions::new("U3"))
        .unwrap();

    assert_eq!(report.counts.arcs, 1);
    assert_eq!(
        targets(&graph, &NodeKey::new(NodeLabel::Arc, "U3/A1"), EdgeKind::HasStory),
        vec![NodeKey::new(NodeLabel::Story, "U3/ST1")]
    );
    assert!(!graph.exists(NodeLabel::Arc, "U3/A2").unwrap());
}

#[test]
fn test_subset_with_unknown_story_is_empty() {
    let graph = scenario_a().build();
    let filter = SubsetFilter::new().stories(["ST404"]);
    let report = Brancher::new(&graph)
        .clone_subset("U1", &filter, &CloneOptions::new("U3"))
        .unwrap();
    assert_eq!(report.counts.total(), 0);
    assert!(graph.exists(NodeLabel::Universe, "U3").unwrap());
}

#[test]
fn test_full_clone_copies_everything() {
    let graph = rich_universe().build();
    let report = Brancher::new(&graph)
        .clone_full("U1", &CloneOptions::new("U3"))
        .unwrap();

    let counts = report.counts;
    assert_eq!(
        (counts.stories, counts.scenes, counts.entities, counts.facts),
        (2, 4, 4, 3)
    );
    assert_eq!((counts.sheets, counts.relation_states, counts.arcs), (2, 3, 2));

    let universe = graph.node(&NodeKey::new(NodeLabel::Universe, "U3")).unwrap().unwrap();
    assert_eq!(universe.prop_str("name"), Some("Prime [clone]"));
    assert_eq!(universe.prop_str("description"), Some("Prime timeline (cloned)"));
    assert!(Brancher::new(&graph).diff_typed("U1", "U3").unwrap().is_empty());
}

#[test]
fn test_diff_after_branch_reports_missing_tail() {
    let graph = scenario_a().build();
    let brancher = Brancher::new(&graph);
    brancher
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2"))
        .unwrap();

    let diff = brancher.diff_typed("U1", "U2").unwrap();
    assert_eq!(diff.scenes.only_in_source, vec!["SC3"]);
    assert!(diff.scenes.only_in_target.is_empty());
    assert!(diff.stories.is_empty());
    assert!(diff.entities.is_empty());
    assert!(diff.facts.is_empty());
    assert_eq!(diff.provenance_counts.scenes, 2);
}

#[test]
fn test_promote_append_missing_joins_ownership() {
    let graph = scenario_a().build();
    let brancher = Brancher::new(&graph);
    brancher
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2"))
        .unwrap();
    let nodes_before = graph.stats().unwrap().nodes;

    let report = brancher
        .promote_named("U2", "U1", "append_missing", false)
        .unwrap();

    assert!(report.ok);
    assert_eq!(report.metric_name, "ops");
    assert_eq!(report.metric, 7);
    assert_eq!(report.edges_created, 2);
    assert_eq!(graph.stats().unwrap().nodes, nodes_before);

    let stories = targets(&graph, &NodeKey::new(NodeLabel::Universe, "U1"), EdgeKind::HasStory);
    assert!(stories.contains(&NodeKey::new(NodeLabel::Story, "U2/ST1")));
}

#[test]
fn test_dry_run_writes_nothing() {
    let graph = rich_universe().build();
    let brancher = Brancher::new(&graph);
    let before = graph.stats().unwrap();

    brancher
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2").dry_run(true))
        .unwrap();
    brancher
        .clone_full("U1", &CloneOptions::new("U3").dry_run(true))
        .unwrap();
    brancher
        .clone_subset("U1", &SubsetFilter::new(), &CloneOptions::new("U4").dry_run(true))
        .unwrap();
    for strategy in ["append_facts", "append_missing", "overwrite"] {
        let report = brancher.promote_named("U1", "U1", strategy, true).unwrap();
        assert!(report.dry_run);
        assert!(report.metric > 0, "{strategy} planned nothing");
    }

    assert_eq!(graph.stats().unwrap(), before);
    assert!(!graph.exists(NodeLabel::Universe, "U2").unwrap());
}

#[test]
fn test_guardrails_reject_before_writing() {
    let graph = scenario_a().build();
    let brancher = Brancher::new(&graph);
    let before = graph.stats().unwrap();

    let missing = brancher.clone_full("U404", &CloneOptions::new("U2")).unwrap_err();
    assert!(matches!(missing, BranchError::SourceNotFound(ref id) if id == "U404"));

    let taken = brancher.clone_full("U1", &CloneOptions::new("U1")).unwrap_err();
    assert!(matches!(taken, BranchError::TargetAlreadyExists(_)));

    let nowhere = brancher
        .branch_at_scene("U1", "SC404", &CloneOptions::new("U2"))
        .unwrap_err();
    assert!(matches!(nowhere, BranchError::DivergencePointNotFound { .. }));
    assert!(nowhere.is_guardrail());

    let dry = brancher
        .clone_full("U404", &CloneOptions::new("U2").dry_run(true))
        .unwrap_err();
    assert!(matches!(dry, BranchError::SourceNotFound(_)));

    assert_eq!(graph.stats().unwrap(), before);
}

#[test]
fn test_existing_target_needs_force() {
    let graph = scenario_a().build();
    let brancher = Brancher::new(&graph);
    brancher.clone_full("U1", &CloneOptions::new("U2")).unwrap();

    let again = brancher.clone_full("U1", &CloneOptions::new("U2"));
    assert!(matches!(again, Err(BranchError::TargetAlreadyExists(_))));

    let forced = brancher
        .clone_full("U1", &CloneOptions::new("U2").force(true))
        .unwrap();
    assert_eq!(forced.counts.scenes, 3);
}

#[test]
fn test_forced_clone_keeps_single_origin() {
    let graph = scenario_a().universe("U5", "Other").story("U5", "ST5").build();
    let brancher = Brancher::new(&graph);
    brancher.clone_full("U1", &CloneOptions::new("U9")).unwrap();
    let before = graph.stats().unwrap();

    let err = brancher
        .clone_full("U5", &CloneOptions::new("U9").force(true))
        .unwrap_err();
    assert!(matches!(err, BranchError::TargetAlreadyExists(ref id) if id == "U9"));
    assert_eq!(graph.stats().unwrap(), before);

    let dry = brancher.clone_full("U5", &CloneOptions::new("U9").force(true).dry_run(true));
    assert!(matches!(dry, Err(BranchError::TargetAlreadyExists(_))));

    brancher
        .clone_full("U1", &CloneOptions::new("U9").force(true))
        .unwrap();
    let origins = targets(&graph, &NodeKey::new(NodeLabel::Universe, "U9"), EdgeKind::BranchedFrom);
    assert_eq!(origins, vec![NodeKey::new(NodeLabel::Universe, "U1")]);
}

#[test]
fn test_unordered_divergence_scene_is_not_found() {
    let graph = scenario_a().unordered_scene("ST1", "SC9").build();
    let err = Brancher::new(&graph)
        .branch_at_scene("U1", "SC9", &CloneOptions::new("U2"))
        .unwrap_err();
    assert!(matches!(err, BranchError::DivergencePointNotFound { .. }));
}

#[test]
fn test_divergence_prefers_lowest_story_id() {
    let graph = scenario_a()
        .story("U1", "ST0")
        .scene("ST0", "SC2", 5)
        .build();
    let report = Brancher::new(&graph)
        .branch_at_scene("U1", "SC2", &CloneOptions::new("U2").dry_run(true))
        .unwrap();
    let divergence = report.divergence.unwrap();
    assert_eq!(divergence.story_id, "ST0");
    assert_eq!(divergence.sequence_index, 5);
}
