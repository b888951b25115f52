use anyhow::Result;
use clap::{Parser, Subcommand};
use server::{build_app, open_engine};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve boolean AND/OR queries over a partitioned index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve queries over HTTP
    Serve {
        /// Index directory path
        #[arg(long, default_value = "./index")]
        index: String,
        /// Collection file the index was built from
        #[arg(long)]
        collection: String,
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a single query and print the matching excerpts
    Query {
        /// Index directory path
        #[arg(long, default_value = "./index")]
        index: String,
        /// Collection file the index was built from
        #[arg(long)]
        collection: String,
        /// Query, e.g. "cat AND dog". Operators apply left to right with no
        /// precedence: "a OR b AND c" means "(a OR b) AND c"
        #[arg(long)]
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { index, collection, host, port } => {
            let app = build_app(index, collection)?;
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(%addr, "server listening");
            axum::serve(listener, app).await?;
        }
        Commands::Query { index, collection, query, limit } => {
            let engine = open_engine(&index, &collection)?;
            println!("Query: {query}");
            let start = Instant::now();
            let results = engine.query(&query, limit)?;
            for hit in &results.hits {
                match &hit.excerpt {
                    Ok(text) => println!("{text}"),
                    Err(e) => println!("[article {}: {e}]", hit.article_id),
                }
            }
            println!(
                "\n{} of {} matches, query completed in {}ms",
                results.hits.len(),
                results.total_hits,
                start.elapsed().as_millis()
            );
        }
    }
    Ok(())
}
