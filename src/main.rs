use std::sync::Arc;

use rest_reply::config::Config;
use rest_reply::logger;
use rest_reply::pipeline::{demo_registry, Pipeline};
use rest_reply::server::{self, AppState};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Size the runtime from the workers setting (defaults to CPU cores)
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let pipeline = Pipeline::from_config(&cfg, demo_registry()?)?;
    logger::log_server_start(&addr, &cfg, pipeline.registry().len());
    let state = Arc::new(AppState::new(cfg, pipeline));

    // spawn_local needs a LocalSet
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::run(listener, state, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                logger::log_error(&format!("Failed to listen for ctrl-c: {e}"));
                std::future::pending::<()>().await;
            }
        }))
        .await?;
    Ok(())
}
