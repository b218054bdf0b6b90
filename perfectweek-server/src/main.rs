use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use perfectweek_server::{init_logger, router, Config, State};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger()?;

    let mut config = Config::from_env()?;
    if let Some(port) = env::args().nth(1) {
        config.port = port.parse().context("port argument must be a number")?;
    }

    let state = State::open(&config)?;
    let app = router(state.clone());

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("Unexpected error happened in server")?;

    state.flush().await?;
    tracing::info!("shut down");
    Ok(())
}
