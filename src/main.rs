use clap::Parser;
use oxydis::database::{Database, DEFAULT_DATABASES};
use oxydis::server;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "oxydis", about = "A minimal RESP2 in-memory key-value server")]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 6379)]
    port: u16,

    /// Number of logical databases
    #[arg(long, default_value_t = DEFAULT_DATABASES)]
    databases: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("oxydis starting with {} logical databases", args.databases);

    let database = Arc::new(Database::new(args.databases));
    let addr = format!("{}:{}", args.host, args.port);

    server::run(&addr, database).await
}
