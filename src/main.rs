//! Runs the `upload_rotate` probe once and prints the verdict. Exits 0 in
//! every path; the printed text is the diagnostic output.

use rorschach_probe::{Client, ProbeConfig, ProbeOutcome, run_upload_rotate};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("rorschach upload_rotate probe");

    let config = match ProbeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("configuration error: {err}");
            return;
        }
    };

    println!("target: {}", config.upload_rotate_url());
    println!("user:   {}", config.user_id);

    let client = Client::new();
    match run_upload_rotate(&client, &config).await {
        ProbeOutcome::Accepted => println!("result: upload accepted"),
        ProbeOutcome::Rejected { reason } => println!("result: upload rejected: {reason}"),
    }
}
