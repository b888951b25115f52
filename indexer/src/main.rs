use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use wikidex::collection::prepare_collection;
use wikidex::job::build_index;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a partitioned inverted index over an article collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a raw `wikipedia-<id>,"<text>"` dump into a collection file
    Prepare {
        /// Raw dump path
        #[arg(long)]
        input: PathBuf,
        /// Collection file to write (`<id>\t<text>` per line)
        #[arg(long)]
        output: PathBuf,
    },
    /// Build the index from a collection file
    Build {
        /// Collection file path
        #[arg(long)]
        input: PathBuf,
        /// Output index directory (replaced if it exists)
        #[arg(long)]
        output: PathBuf,
        /// Number of partitions to split the index into
        #[arg(long, default_value_t = 1)]
        partitions: u32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare { input, output } => {
            let written = prepare_collection(&input, &output)
                .with_context(|| format!("preparing {}", input.display()))?;
            println!("wrote {written} articles to {}", output.display());
        }
        Commands::Build { input, output, partitions } => {
            tracing::info!(input = %input.display(), output = %output.display(), partitions, "building index");
            let start = Instant::now();
            let summary = build_index(&input, &output, partitions)
                .with_context(|| format!("building index from {}", input.display()))?;
            println!(
                "indexed {} articles into {} partitions ({} terms) in {:.3}s",
                summary.articles,
                summary.num_partitions,
                summary.num_terms,
                start.elapsed().as_secs_f64()
            );
        }
    }
    Ok(())
}
