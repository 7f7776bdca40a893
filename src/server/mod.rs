// Server module entry point
// Listener setup, connection serving and the accept loop

pub mod connection;
pub mod listener;

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use listener::create_reusable_listener;

use crate::config::Config;
use crate::logger;
use crate::pipeline::Pipeline;

/// State shared by every connection
pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
}

impl AppState {
    pub const fn new(config: Config, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }
}

/// Accept connections until `shutdown` resolves.
///
/// Connections are served with `spawn_local`, so this must run inside a
/// `tokio::task::LocalSet`. In-flight connections are not awaited.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                        );
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = &mut shutdown => {
                logger::log_server_stop();
                return Ok(());
            }
        }
    }
}
