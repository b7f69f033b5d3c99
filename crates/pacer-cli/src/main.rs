#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use pacer_server::handler::routes;
use pacer_server::middleware::{RouterRecoveryExt, RouterRequestLoggingExt};

use crate::config::{Cli, MiddlewareConfig};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "pacer_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "pacer_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "pacer_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.init_tracing();
    cli.log();

    cli.validate().context("invalid configuration")?;

    let router = create_router(&cli.middleware);
    server::serve(router, cli.server).await?;

    Ok(())
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Request logging - records requests, responses and failures
/// 3. Routes (innermost) - actual request handlers
fn create_router(middleware: &MiddlewareConfig) -> Router {
    routes()
        .with_request_logging(middleware.request_logging.clone())
        .with_recovery(&middleware.recovery)
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use pacer_server::middleware::{RecoveryConfig, RequestLoggingOptions};

    use super::*;

    #[tokio::test]
    async fn router_serves_routes_through_middleware() -> anyhow::Result<()> {
        let middleware = MiddlewareConfig {
            request_logging: RequestLoggingOptions::verbose(),
            recovery: RecoveryConfig::default(),
        };
        let server = TestServer::new(create_router(&middleware))?;

        server.get("/health").await.assert_status_ok();
        server.post("/echo").text("10k run").await.assert_text("10k run");
        Ok(())
    }

    #[test]
    fn tracing_targets_are_scoped_to_the_crate() {
        let targets = [
            TRACING_TARGET_SERVER_STARTUP,
            TRACING_TARGET_SERVER_SHUTDOWN,
            TRACING_TARGET_CONFIG,
        ];

        for target in targets {
            assert!(target.starts_with(env!("CARGO_CRATE_NAME")), "{target}");
        }
        assert!(TRACING_TARGET_SERVER_STARTUP.starts_with("pacer_cli::server::"));
        assert!(TRACING_TARGET_SERVER_SHUTDOWN.starts_with("pacer_cli::server::"));
        assert_ne!(TRACING_TARGET_SERVER_STARTUP, TRACING_TARGET_SERVER_SHUTDOWN);
    }
}
