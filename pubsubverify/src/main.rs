#![warn(clippy::all, rust_2018_idioms)]

use std::process::ExitCode;

use clap::Parser;
use pubsubverify::Args;
use pubsubverify_backend::error::BackendError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, BackendError> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let args = Args::parse();

    pubsubverify::run(args).await
}
