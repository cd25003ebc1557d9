use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gws_artifact::{ArtifactId, ArtifactKind, RelationshipKind};
use gws_core::{ArtifactSystem, MessageOutcome, SystemConfig, TEMPLATE_NAMES};
use gws_store::{FileStorage, HydrationOutcome, StorageBackend};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("gws")
        .version(gws_core::VERSION)
        .about("Generative workspace: artifacts, natural-language edits, grounding context")
        .subcommand_required(true)
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .default_value(".gws")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the persisted workspace"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("create")
                .about("Create an artifact")
                .arg(Arg::new("kind").required(true).help("ExecutionPlan, plan, board, matrix, ..."))
                .arg(Arg::new("state").long("state").default_value("{}").help("Initial state as JSON"))
                .arg(Arg::new("title").long("title").help("Display title")),
        )
        .subcommand(
            Command::new("run")
                .about("Handle a chat message: apply it locally or print the model context")
                .arg(Arg::new("text").required(true).num_args(1..)),
        )
        .subcommand(Command::new("list").about("List artifacts"))
        .subcommand(
            Command::new("show")
                .about("Print an artifact with its history and edges")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("undo")
                .about("Revert the newest mutation of an artifact")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete an artifact")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("link")
                .about("Relate two artifacts")
                .arg(Arg::new("source").required(true))
                .arg(Arg::new("target").required(true))
                .arg(
                    Arg::new("type")
                        .required(true)
                        .value_parser(value_parser!(RelationshipKind))
                        .help("references, depends_on, conflicts_with, derived_from, similar_to"),
                ),
        )
        .subcommand(
            Command::new("context")
                .about("Print the grounding context, optionally for a message")
                .arg(Arg::new("text").num_args(0..)),
        )
        .subcommand(
            Command::new("template")
                .about("Load a built-in template")
                .arg(Arg::new("name").required(true).help(TEMPLATE_NAMES.join(", "))),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open(matches: &ArgMatches) -> Result<ArtifactSystem> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SystemConfig::load(path)?,
        None => SystemConfig::new(),
    };
    let dir = matches
        .get_one::<PathBuf>("data-dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(".gws"));
    let storage: Arc<dyn StorageBackend> =
        Arc::new(FileStorage::open(&dir).with_context(|| format!("opening {}", dir.display()))?);

    let mut system = ArtifactSystem::with_backend(config, storage);
    match system.hydrate().await {
        HydrationOutcome::Failed(reason) => {
            tracing::warn!(%reason, "stored workspace unreadable, changes in this run are not saved");
        }
        HydrationOutcome::TimedOut => {
            tracing::warn!("storage too slow, changes in this run are not saved");
        }
        _ => {}
    }
    Ok(system)
}

fn parse_kind(raw: &str) -> ArtifactKind {
    gws_relate::kind_for_keyword(raw).unwrap_or_else(|| ArtifactKind::from(raw))
}

fn parse_id(matches: &ArgMatches, name: &str) -> ArtifactId {
    let raw = matches.get_one::<String>(name).map_or("", String::as_str);
    ArtifactId::new(raw.trim_start_matches('#').to_lowercase())
}

fn joined(matches: &ArgMatches, name: &str) -> String {
    matches
        .get_many::<String>(name)
        .map(|words| words.map(String::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn print_state(system: &ArtifactSystem, id: &ArtifactId) -> Result<()> {
    let Some(artifact) = system.get_artifact(id).flatten() else {
        bail!("artifact {id} not found");
    };
    println!(
        "{} {} \"{}\" v{}",
        artifact.id.tag(),
        artifact.kind,
        artifact.display_title(),
        artifact.version
    );
    println!("{}", serde_json::to_string_pretty(&artifact.state)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));
    let mut system = open(&matches).await?;

    match matches.subcommand() {
        Some(("create", args)) => {
            let kind = parse_kind(args.get_one::<String>("kind").map_or("", String::as_str));
            let raw = args.get_one::<String>("state").map_or("{}", String::as_str);
            let state: Value = serde_json::from_str(raw).context("--state is not valid JSON")?;
            let title = args.get_one::<String>("title").map(String::as_str);
            let id = system.create_artifact(kind, state, title);
            print_state(&system, &id)?;
        }
        Some(("run", args)) => {
            let text = joined(args, "text");
            match system.process_message(&text) {
                MessageOutcome::Mutation { artifact_id, intent } => {
                    let done = system.execute_mutation(&artifact_id, &intent, &text)?;
                    println!("applied {} to {} (v{})", intent.summary(), artifact_id.tag(), done.version);
                    print_state(&system, &artifact_id)?;
                }
                MessageOutcome::Conversation { relationships, .. } => {
                    for edge in &relationships {
                        println!("linked {} -> {} ({})", edge.source_id.tag(), edge.target_id.tag(), edge.kind);
                    }
                    if let Some(context) = system.referenced_context(&text).ready() {
                        println!("{context}");
                    }
                }
                MessageOutcome::Loading => bail!("workspace is still loading"),
            }
        }
        Some(("list", _)) => {
            for artifact in system.artifacts().ready().unwrap_or_default() {
                println!(
                    "{}  {:<20} v{:<3} {}",
                    artifact.id.tag(),
                    artifact.kind,
                    artifact.version,
                    artifact.display_title()
                );
            }
        }
        Some(("show", args)) => {
            let id = parse_id(args, "id");
            print_state(&system, &id)?;
            for mutation in system.store().get_mutations(&id) {
                println!(
                    "  {} {} {} at {}",
                    mutation.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    mutation.source,
                    mutation.operation,
                    mutation.path
                );
            }
            for edge in system.store().relationships_of(&id) {
                println!("  {} -> {} ({})", edge.source_id.tag(), edge.target_id.tag(), edge.kind);
            }
        }
        Some(("undo", args)) => {
            let id = parse_id(args, "id");
            let version = system.undo(&id)?;
            println!("undone {} (v{version})", id.tag());
        }
        Some(("delete", args)) => {
            let id = parse_id(args, "id");
            if !system.delete_artifact(&id) {
                bail!("artifact {id} not found");
            }
            println!("deleted {}", id.tag());
        }
        Some(("link", args)) => {
            let source = parse_id(args, "source");
            let target = parse_id(args, "target");
            let kind = args
                .get_one::<RelationshipKind>("type")
                .copied()
                .unwrap_or(RelationshipKind::References);
            let edge = system.create_relationship(&source, &target, kind)?;
            println!("linked {} -> {} ({})", edge.source_id.tag(), edge.target_id.tag(), edge.kind);
        }
        Some(("context", args)) => {
            let text = joined(args, "text");
            let context = if text.is_empty() {
                system.context_string()
            } else {
                system.referenced_context(&text)
            };
            match context.ready() {
                Some(context) => println!("{context}"),
                None => bail!("workspace is still loading"),
            }
        }
        Some(("template", args)) => {
            let name = args.get_one::<String>("name").map_or("", String::as_str);
            for id in system.load_template(name)? {
                print_state(&system, &id)?;
            }
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}
