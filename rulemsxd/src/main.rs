//! RuleMSX Daemon
//!
//! Evaluates routing rules over working orders and re-evaluates them as
//! order and market data notifications arrive.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p rulemsxd
//!
//! # Start with custom environment
//! RULEMSX_ENV=test RULEMSX_DEFAULT_MARGIN=1.5 cargo run -p rulemsxd
//! ```
//!
//! # Environment Variables
//!
//! - `RULEMSX_ENV`: Environment (test, development, production)
//! - `RULEMSX_EVENT_BUS_CAPACITY`: Event bus buffer (default: 1000)
//! - `RULEMSX_DEFAULT_MARGIN`: Margin added to the last price (default: 2.0)
//! - `RULEMSX_SUPPRESS_DUPLICATE_ROUTES`: Skip repeated routes (default: true)
//! - `RULEMSX_LARGE_ORDER_AMOUNT`: Amount that raises a large-order signal (default: 10000)

use rulemsxd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("rulemsxd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        margin = %config.routing.default_margin,
        suppress_duplicate_routes = config.routing.suppress_duplicate_routes,
        "RuleMSX Daemon"
    );

    // Create and run daemon
    let daemon = Daemon::new_stub(config);
    daemon.run().await?;

    Ok(())
}
