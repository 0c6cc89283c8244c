#![warn(clippy::all, rust_2018_idioms)]

mod args;

use std::{io, process::ExitCode};

use log::info;
use pubsubverify_backend::{error::BackendError, runner::Verifier, Backend};

pub use args::Args;

/// Connects, runs one verification pass and maps its outcome to an exit code.
pub async fn run(args: Args) -> Result<ExitCode, BackendError> {
    let config = args.backend_config();
    let settings = args.verify_settings();

    match &config.emulator_host {
        Some(host) => info!("connecting to Pub/Sub emulator at {host}"),
        None => info!("connecting to Google Cloud Pub/Sub"),
    }

    let backend = Backend::new(&config).await?;
    let outcome = Verifier::new(&backend, settings, io::stdout()).run().await?;

    info!(
        "received {} message(s), acknowledged {}, {} undecodable",
        outcome.received, outcome.acknowledged, outcome.decode_failures
    );

    Ok(if outcome.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
