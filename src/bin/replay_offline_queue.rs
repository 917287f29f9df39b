use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use finance_manager::offline::{HttpTransport, OfflineStore, replay};

/// Send the requests queued while the finance manager API was unreachable.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database with the offline queue.
    #[arg(long)]
    queue_path: String,

    /// The address of the API, e.g. `https://localhost:3000`.
    #[arg(long)]
    base_url: String,

    /// The auth token to send the requests with.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    api_token: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let store = match OfflineStore::open(&args.queue_path) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!("Could not open the queue at {}: {error}", args.queue_path);
            return ExitCode::FAILURE;
        }
    };

    let transport = HttpTransport::new(&args.base_url).with_token(args.api_token);

    match replay(&store, &transport).await {
        Ok(report) => {
            println!(
                "Replayed {}, failed {}, {} still queued.",
                report.replayed, report.failed, report.remaining
            );

            if report.remaining == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            tracing::error!("Could not replay the queue: {error}");
            ExitCode::FAILURE
        }
    }
}
