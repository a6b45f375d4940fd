//! Server module
//!
//! Accepts TCP connections and hands each one to the connection handler.
//! A ctrl-c stops the accept loop, closes the engine and lets in-flight
//! connection tasks drain as their clients disconnect.

mod connection;

pub use connection::Connection;

use crate::database::Database;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Bind `addr` and serve until a shutdown signal arrives.
pub async fn run(addr: &str, database: Arc<Database>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("oxydis listening on {}", addr);
    serve(listener, database).await
}

/// Serve an already-bound listener until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, database: Arc<Database>) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, addr) = accepted?;
                info!("accepted connection from {}", addr);

                let database = database.clone();
                tokio::spawn(async move {
                    connection::handle(socket, addr, database).await;
                    info!("connection closed: {}", addr);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    database.close();
    Ok(())
}
