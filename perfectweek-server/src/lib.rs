pub mod access;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod membership;
pub mod query;
pub mod relationship;
pub mod routes;
pub mod scopes;
pub mod search;
pub mod state;
pub mod users;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use config::Config;
pub use error::{AppError, Result};
pub use routes::router;
pub use state::State;

pub fn init_logger() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "perfectweek_server=debug,tower_http=info".into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}
