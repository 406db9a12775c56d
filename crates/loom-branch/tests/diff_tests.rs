use loom_branch::{Brancher, CloneOptions, SubsetFilter};
use loom_graph::{Edge, EdgeKind, NodeKey, NodeLabel};
use loom_test_utils::{rich_universe, scenario_a};
use pretty_assertions::assert_eq;

#[test]
fn test_missing_universes_diff_to_one_side() {
    let graph = scenario_a().build();
    let brancher = Brancher::new(&graph);

    let diff = brancher.diff_typed("U1", "U404").unwrap();
    assert_eq!(diff.scenes.only_in_source, vec!["SC1", "SC2", "SC3"]);
    assert_eq!(diff.stories.only_in_source, vec!["ST1"]);
    assert!(diff.scenes.only_in_target.is_empty());
    assert_eq!(diff.provenance_counts.scenes, 0);

    assert!(brancher.diff_typed("U404", "U405").unwrap().is_empty());
}

#[test]
fn test_subset_diff_lists_what_was_left_out() {
    let graph = rich_universe().build();
    let brancher = Brancher::new(&graph);
    let filter = SubsetFilter::new().stories(["ST1"]).scene_max_index(1);
    brancher
        .clone_subset("U1", &filter, &CloneOptions::new("U3"))
        .unwrap();

    let diff = brancher.diff_typed("U1", "U3").unwrap();
    assert_eq!(diff.stories.only_in_source, vec!["ST2"]);
    assert_eq!(diff.scenes.only_in_source, vec!["SC2", "SC3", "SC4"]);
    assert_eq!(diff.entities.only_in_source, vec!["E2", "E4"]);
    assert_eq!(diff.facts.only_in_source, vec!["F1", "F2", "F3"]);
    assert_eq!(diff.provenance_counts.entities, 2);

    let summary = brancher.diff("U1", "U3").unwrap();
    assert_eq!(summary.counts["scenes_only_in_source"], 3);
    assert_eq!(summary.counts["facts_only_in_target"], 0);
    assert_eq!(summary.provenance_counts, diff.provenance_counts);
}

#[test]
fn test_naming_and_lineage_can_disagree() {
    let graph = scenario_a()
        .universe("U2", "Hand made")
        .story("U2", "U2/ST7")
        .story("U2", "Loose")
        .build();

    let diff = Brancher::new(&graph).diff_typed("U1", "U2").unwrap();
    assert_eq!(diff.stories.only_in_source, vec!["ST1"]);
    assert_eq!(diff.stories.only_in_target, vec!["ST7"]);
    assert_eq!(diff.provenance_counts.stories, 0);
}

#[test]
fn test_lineage_counts_renamed_clone() {
    let graph = scenario_a()
        .universe("U2", "Hand made")
        .story("U2", "Renamed")
        .edge(Edge::new(
            NodeKey::new(NodeLabel::Story, "Renamed"),
            EdgeKind::BranchedFrom,
            NodeKey::new(NodeLabel::Story, "ST1"),
        ))
        .build();

    let diff = Brancher::new(&graph).diff_typed("U1", "U2").unwrap();
    assert_eq!(diff.stories.only_in_source, vec!["ST1"]);
    assert_eq!(diff.provenance_counts.stories, 1);
}

#[test]
fn test_shared_scene_left_out_of_one_story_is_only_in_source() {
    let graph = scenario_a()
        .story("U1", "ST2")
        .scene("ST2", "SC1", 1)
        .build();
    let brancher = Brancher::new(&graph);
    brancher
        .clone_subset("U1", &SubsetFilter::new().stories(["ST1"]), &CloneOptions::new("U3"))
        .unwrap();

    let diff = brancher.diff_typed("U1", "U3").unwrap();
    assert_eq!(diff.stories.only_in_source, vec!["ST2"]);
    assert_eq!(diff.scenes.only_in_source, vec!["SC1"]);
    assert!(diff.scenes.only_in_target.is_empty());
}
