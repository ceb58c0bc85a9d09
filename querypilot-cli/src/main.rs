mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "querypilot")]
#[command(about = "Inspect schemas, join paths and SQL errors the way the workflow sees them")]
struct Cli {
    /// Schema metadata JSON file
    #[arg(short, long, env = "QUERYPILOT_SCHEMA", global = true)]
    schema: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, e.g. `info` or `querypilot_join=debug`
    #[arg(long, env = "QUERYPILOT_LOG", default_value = "warn", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the schema summary given to the language model
    Schema,
    /// Resolve join paths connecting the given tables
    Paths {
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// Classify a database error message
    ClassifyError { message: String },
    /// Decide whether a question needs join path finding
    Assess {
        question: String,
        /// Distinct tables among the matched columns
        #[arg(long, default_value_t = 1)]
        tables: usize,
        /// The planner explicitly asked for path finding
        #[arg(long)]
        planner_requested: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let output = match cli.command {
        Command::Schema => {
            let graph = commands::load_graph(cli.schema.as_deref())?;
            commands::schema(&graph, cli.json)?
        }
        Command::Paths { tables } => {
            let graph = commands::load_graph(cli.schema.as_deref())?;
            commands::paths(graph, &tables, cli.json)?
        }
        Command::ClassifyError { message } => {
            let graph = match cli.schema.as_deref() {
                Some(path) => Some(commands::load_graph(Some(path))?),
                None => None,
            };
            commands::classify_error(graph, &message, cli.json)?
        }
        Command::Assess {
            question,
            tables,
            planner_requested,
        } => commands::assess(&question, tables, planner_requested, cli.json)?,
    };
    println!("{output}");
    Ok(())
}
