//! Check a Mautic integration's configuration and print the report as JSON.
//!
//! ```sh
//! export MAUTIC_URL='https://mautic.example.com'
//! export MAUTIC_CLIENT_ID='...' MAUTIC_CLIENT_SECRET='...'
//! RUST_LOG=mtcbridge=debug cargo run --bin mtc-diagnose
//! ```
//!
//! Exits with status 1 when any check fails.

use std::process::ExitCode;
use std::sync::Arc;

use mtcbridge::auth::{FileTokenStore, TokenStore};
use mtcbridge::{MauticIntegration, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("  Set MAUTIC_URL and the credentials for MAUTIC_AUTH_METHOD (oauth2 or basic).");
            return ExitCode::FAILURE;
        }
    };

    let mut builder = MauticIntegration::builder(settings);
    match FileTokenStore::new() {
        Ok(store) => {
            let store: Arc<dyn TokenStore> = Arc::new(store);
            builder = builder.with_token_store(store);
        }
        Err(e) => eprintln!("Warning: tokens will not persist between runs: {e}"),
    }

    let integration = match builder.build() {
        Ok(integration) => integration,
        Err(e) => {
            eprintln!("Error: Failed to configure integration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = integration.validate_configuration().await;
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: Failed to render report: {e}");
            return ExitCode::FAILURE;
        }
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
