//! SpriteFlow command-line host
//!
//! Loads a graph document, runs one node's generation task or exports a
//! Cut node's frames, and writes the result back to disk.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use generation::{GenerationConfig, GenerationError, GenerationGateway, RemoveBgClient};
use sprite_engine::{
    load_graph, save_graph, EngineError, EventError, EventSink, ExportAssembler, GraphStore,
    Orchestrator, PipelineEvent,
};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "spriteflow", version, about = "Run SpriteFlow sprite graphs")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute one node and save the updated graph.
    Run(RunArgs),
    /// Zip the frames of a Cut or Frames Preview node.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Graph document (JSON).
    #[arg(long)]
    graph: PathBuf,

    /// Id of the node to execute.
    #[arg(long)]
    node: String,

    /// Where to write the updated graph (defaults to overwriting --graph).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Provider configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Graph document (JSON).
    #[arg(long)]
    graph: PathBuf,

    /// Id of the Cut or Frames Preview node.
    #[arg(long)]
    node: String,

    /// Output zip path.
    #[arg(long)]
    out: PathBuf,

    /// Remove each frame's background before bundling.
    #[arg(long, default_value_t = false)]
    remove_background: bool,

    /// Provider configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Forwards pipeline events to the log
struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        match event {
            PipelineEvent::TaskStarted {
                node_id,
                task_kind,
                seed,
            } => log::info!("{} started ({} task, seed {})", node_id, task_kind.as_str(), seed),
            PipelineEvent::NodeStatusChanged {
                node_id, status, ..
            } => log::debug!("{} is now {:?}", node_id, status),
            PipelineEvent::TaskCompleted { node_id, mirrored } if mirrored.is_empty() => {
                log::info!("{} finished", node_id)
            }
            PipelineEvent::TaskCompleted { node_id, mirrored } => {
                log::info!("{} finished, mirrored to {}", node_id, mirrored.join(", "))
            }
            PipelineEvent::TaskFailed { node_id, error } => {
                log::warn!("{} failed: {}", node_id, error)
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Run(args) => cmd_run(args).await,
        Command::Export(args) => cmd_export(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GenerationConfig, CliError> {
    let config = match path {
        Some(path) => {
            log::info!("Loading configuration from {:?}", path);
            GenerationConfig::load(path)?
        }
        None => GenerationConfig::default(),
    };
    Ok(config.apply_env())
}

async fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let gateway = Arc::new(GenerationGateway::from_config(&config)?);
    log::info!("Video fallback chain: {}", gateway.video_variants().join(" -> "));

    let store = GraphStore::new(load_graph(&args.graph)?);
    let orchestrator = Orchestrator::new(store.clone(), gateway).with_events(Arc::new(LogEventSink));

    let outcome = orchestrator.run(&args.node).await;

    // The node's Error status is part of the document, so save either way
    let out = args.out.as_deref().unwrap_or(&args.graph);
    save_graph(&store.snapshot().await, out)?;
    log::info!("Wrote graph to {:?}", out);

    outcome?;
    Ok(())
}

async fn cmd_export(args: ExportArgs) -> Result<(), CliError> {
    let graph = load_graph(&args.graph)?;

    let mut assembler = ExportAssembler::new();
    if args.remove_background {
        let config = load_config(args.config.as_deref())?;
        assembler = assembler.with_background_removal(Arc::new(RemoveBgClient::from_config(&config)?));
    }

    let archive = assembler.export_frames(&graph, &args.node).await?;
    std::fs::write(&args.out, &archive).map_err(|source| CliError::Write {
        path: args.out.clone(),
        source,
    })?;
    log::info!("Wrote {} bytes to {:?}", archive.len(), args.out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "spriteflow", "run", "--graph", "knight.json", "--node", "walk",
        ])
        .unwrap();
        match cli.cmd {
            Command::Run(args) => {
                assert_eq!(args.graph, PathBuf::from("knight.json"));
                assert_eq!(args.node, "walk");
                assert!(args.out.is_none());
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_requires_out() {
        assert!(Cli::try_parse_from([
            "spriteflow", "export", "--graph", "g.json", "--node", "cut",
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "spriteflow",
            "export",
            "--graph",
            "g.json",
            "--node",
            "cut",
            "--out",
            "frames.zip",
            "--remove-background",
        ])
        .unwrap();
        match cli.cmd {
            Command::Export(args) => assert!(args.remove_background),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_sink_accepts_events() {
        let sink = LogEventSink;
        assert!(sink
            .send(PipelineEvent::TaskFailed {
                node_id: "walk".to_string(),
                error: "Timed out".to_string(),
            })
            .is_ok());
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/spriteflow.json"))).unwrap_err();
        assert!(matches!(err, CliError::Generation(GenerationError::Config(_))));
    }
}
