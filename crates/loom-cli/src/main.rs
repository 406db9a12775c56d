//! `loom`: branch, clone, diff and promote universes in a JSON graph snapshot

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use loom_branch::{BranchConfig, Brancher, CloneOptions, SubsetFilter};
use loom_graph::{GraphRead, GraphSnapshot, MemoryGraph};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let target = Arg::new("target")
        .long("target")
        .required(true)
        .help("Id of the universe to create");
    let name = Arg::new("name").long("name").help("Name of the new universe");
    let force = Arg::new("force")
        .long("force")
        .action(ArgAction::SetTrue)
        .help("Write into an existing target universe");
    let dry_run = Arg::new("dry-run")
        .long("dry-run")
        .action(ArgAction::SetTrue)
        .help("Report what would change without writing");

    Command::new("loom")
        .version(loom_branch::VERSION)
        .about("Graph version control for a narrative multiverse")
        .subcommand_required(true)
        .arg(
            Arg::new("graph")
                .long("graph")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Graph snapshot (JSON); rewritten after mutating commands"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Brancher configuration (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("branch")
                .about("Branch a universe at a divergence scene")
                .arg(Arg::new("source").required(true).help("Source universe id"))
                .arg(Arg::new("scene").required(true).help("Divergence scene id"))
                .arg(target.clone())
                .arg(name.clone())
                .arg(force.clone())
                .arg(dry_run.clone()),
        )
        .subcommand(
            Command::new("clone")
                .about("Clone a universe, fully or by subset")
                .arg(Arg::new("source").required(true).help("Source universe id"))
                .arg(target)
                .arg(name)
                .arg(force)
                .arg(dry_run.clone())
                .arg(
                    Arg::new("subset")
                        .long("subset")
                        .action(ArgAction::SetTrue)
                        .help("Apply the subset filters below"),
                )
                .arg(
                    Arg::new("stories")
                        .long("stories")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .requires("subset")
                        .help("Story ids to keep"),
                )
                .arg(
                    Arg::new("arcs")
                        .long("arcs")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .requires("subset")
                        .help("Arc ids to keep"),
                )
                .arg(
                    Arg::new("scene-max")
                        .long("scene-max")
                        .value_parser(value_parser!(i64))
                        .requires("subset")
                        .help("Keep scenes with sequence_index up to this value"),
                )
                .arg(
                    Arg::new("all-entities")
                        .long("all-entities")
                        .action(ArgAction::SetTrue)
                        .requires("subset")
                        .help("Clone every entity of the universe"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Compare a universe with a clone of it")
                .arg(Arg::new("source").required(true))
                .arg(Arg::new("target").required(true))
                .arg(
                    Arg::new("typed")
                        .long("typed")
                        .action(ArgAction::SetTrue)
                        .help("List ids instead of counts"),
                ),
        )
        .subcommand(
            Command::new("promote")
                .about("Merge one universe's state into another")
                .arg(Arg::new("source").required(true))
                .arg(Arg::new("target").required(true))
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .default_value("append_facts")
                        .help("append_facts, append_missing or overwrite"),
                )
                .arg(dry_run),
        )
        .subcommand(Command::new("stats").about("Print node and edge totals"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn arg<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing argument: {id}"))
}

fn load_graph(path: &Path) -> Result<MemoryGraph> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading graph {}", path.display()))?;
    let snapshot: GraphSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("parsing graph {}", path.display()))?;
    MemoryGraph::from_snapshot(snapshot).with_context(|| format!("loading graph {}", path.display()))
}

fn save_graph(graph: &MemoryGraph, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut file, &graph.snapshot())?;
    file.write_all(b"\n")?;
    file.persist(path)
        .with_context(|| format!("writing graph {}", path.display()))?;
    tracing::debug!(path = %path.display(), "graph saved");
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn clone_options(args: &ArgMatches) -> Result<CloneOptions> {
    let mut options = CloneOptions::new(arg(args, "target")?)
        .force(args.get_flag("force"))
        .dry_run(args.get_flag("dry-run"));
    if let Some(name) = args.get_one::<String>("name") {
        options = options.with_name(name.clone());
    }
    Ok(options)
}

fn subset_filter(args: &ArgMatches) -> SubsetFilter {
    let list = |id: &str| -> Vec<String> {
        args.get_many::<String>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };
    let mut filter = SubsetFilter::new()
        .stories(list("stories"))
        .arcs(list("arcs"))
        .include_all_entities(args.get_flag("all-entities"));
    if let Some(max) = args.get_one::<i64>("scene-max") {
        filter = filter.scene_max_index(*max);
    }
    filter
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let graph_path = matches
        .get_one::<PathBuf>("graph")
        .context("--graph <file.json> is required")?;
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => BranchConfig::from_path(path)?,
        None => BranchConfig::default(),
    };
    let graph = load_graph(graph_path)?;
    let brancher = Brancher::with_config(&graph, config);

    let wrote = match matches.subcommand() {
        Some(("branch", args)) => {
            let options = clone_options(args)?;
            let report = brancher
                .branch_at_scene(arg(args, "source")?, arg(args, "scene")?, &options)
                .context("branch failed")?;
            print_json(&report)?;
            !options.dry_run
        }
        Some(("clone", args)) => {
            let options = clone_options(args)?;
            let source = arg(args, "source")?;
            let report = if args.get_flag("subset") {
                brancher.clone_subset(source, &subset_filter(args), &options)
            } else {
                brancher.clone_full(source, &options)
            }
            .context("clone failed")?;
            print_json(&report)?;
            !options.dry_run
        }
        Some(("diff", args)) => {
            let (source, target) = (arg(args, "source")?, arg(args, "target")?);
            if args.get_flag("typed") {
                print_json(&brancher.diff_typed(source, target)?)?;
            } else {
                print_json(&brancher.diff(source, target)?)?;
            }
            false
        }
        Some(("promote", args)) => {
            let dry_run = args.get_flag("dry-run");
            let report = brancher
                .promote_named(
                    arg(args, "source")?,
                    arg(args, "target")?,
                    arg(args, "strategy")?,
                    dry_run,
                )
                .context("promotion failed")?;
            print_json(&report)?;
            !dry_run
        }
        Some(("stats", _)) => {
            print_json(&graph.stats()?)?;
            false
        }
        _ => false,
    };

    if wrote {
        save_graph(&graph, graph_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn subset_flags_parse_into_filter() {
        let matches = cli()
            .try_get_matches_from([
                "loom", "--graph", "g.json", "clone", "U1", "--target", "U3", "--subset",
                "--stories", "ST1,ST2", "--scene-max", "4", "--all-entities",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let filter = subset_filter(args);
        assert_eq!(filter.stories, vec!["ST1", "ST2"]);
        assert_eq!(filter.scene_max_index, Some(4));
        assert!(filter.include_all_entities);
        assert!(clone_options(args).unwrap().target_id == "U3");
    }

    #[test]
    fn graph_file_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, r#"{"nodes":[{"label":"Universe","id":"U1","props":{"name":"Prime"}}]}"#)
            .unwrap();

        let graph = load_graph(&path).unwrap();
        save_graph(&graph, &path).unwrap();
        let again = load_graph(&path).unwrap();
        assert_eq!(again.stats().unwrap().nodes, 1);
    }
}
