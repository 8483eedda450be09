use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use orchestra::{
    CommandStrategy, Config, OrchestrationRequest, Orchestrator, Result, SourceFlags, TaskCatalog,
};

/// Orchestra - parallel section generation with progress tracking
#[derive(Parser, Debug)]
#[command(name = "orchestra")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    ORCHESTRA_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.orchestra/orchestra.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the available tasks
    List,

    /// Generate the selected tasks and print the report as JSON
    Run {
        /// Local corpus file (company information)
        #[arg(long, required_unless_present = "no_local")]
        local: Option<PathBuf>,

        /// Reference corpus file
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Task to generate; repeat for several (default: all)
        #[arg(long = "task", short = 't')]
        tasks: Vec<String>,

        /// Do not draw on the local corpus
        #[arg(long)]
        no_local: bool,

        /// Draw on the generator's world knowledge
        #[arg(long)]
        world: bool,

        /// Draw on online research
        #[arg(long)]
        online: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    orchestra::log::init_with_debug(cli.debug);
    if orchestra::log::is_debug() {
        tracing::info!("orchestra starting (debug mode enabled)");
    }

    match cli.command {
        Command::List => {
            run_list();
            Ok(())
        }
        Command::Run {
            local,
            reference,
            tasks,
            no_local,
            world,
            online,
        } => {
            let flags = SourceFlags::new(!no_local, world, online);
            run_generate(local.as_deref(), reference.as_deref(), tasks, flags)
        }
    }
}

fn run_list() {
    let catalog = TaskCatalog::standard();
    for task in catalog.iter() {
        println!("{:<22} {}", task.name, task.description);
    }
}

fn run_generate(
    local: Option<&Path>,
    reference: Option<&Path>,
    tasks: Vec<String>,
    flags: SourceFlags,
) -> Result<()> {
    let config = Config::load()?;
    let catalog = Arc::new(TaskCatalog::standard());

    let local_corpus = match local {
        Some(path) if flags.use_local => std::fs::read_to_string(path)?,
        _ => String::new(),
    };
    let reference_corpus = match reference {
        Some(path) => std::fs::read_to_string(path)?,
        None => String::new(),
    };

    let request = if tasks.is_empty() {
        OrchestrationRequest::all(&catalog, flags)
    } else {
        OrchestrationRequest::new(tasks, flags)
    }
    .with_local_corpus(local_corpus)
    .with_reference_corpus(reference_corpus);

    let strategy = CommandStrategy::from_config(&config.generator)?;
    let orchestrator = Orchestrator::from_config(Arc::clone(&catalog), Arc::new(strategy), &config);

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                eprintln!("{}", snapshot);
            }
        });

        let report = orchestrator
            .dispatch_with_progress(request, tx, CancellationToken::new())
            .await;
        let _ = printer.await;
        report
    })?;

    let summary = report.summary();
    eprintln!(
        "{} succeeded, {} failed in {:.1}s",
        summary.succeeded,
        summary.failed,
        summary.total_duration.as_secs_f64()
    );

    let json_output = serde_json::json!({
        "sections": report.ordered(&catalog),
        "summary": summary,
    });
    println!("{}", serde_json::to_string_pretty(&json_output)?);

    Ok(())
}
