//! churn-client - command-line client for the churn-prediction service
//!
//! Subcommands:
//! - `upload <FILE>`: validate and submit a CSV, then show the results
//! - `results`: show the latest results (summary, pie, preview, bands)
//! - `download`: save the latest results CSV
//! - `login`: establish a session with configured credentials

use anyhow::{bail, Result};
use churn_client::aggregator::INCOME_BAND_ORDER;
use churn_client::services::ResultView;
use churn_client::{
    AuthContext, ChurnClient, EnrichedResult, ObserverHandle, ResultState, UploadCandidate,
    UploadObserver,
};
use churn_common::config::{ConfigOverrides, ConfigResolver};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for churn-client
#[derive(Parser, Debug)]
#[command(name = "churn-client", version, about = "Churn-prediction service client")]
struct Args {
    /// Config file (default: <config dir>/churn-client/config.toml)
    #[arg(long, env = "CHURN_CONFIG")]
    config: Option<PathBuf>,

    /// Prediction service base URL
    #[arg(long)]
    ml_api_url: Option<String>,

    /// Account backend base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Identity sent with requests
    #[arg(long)]
    user_id: Option<String>,

    /// Bearer token
    #[arg(long)]
    token: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a CSV of customer records for prediction
    Upload {
        file: PathBuf,
    },
    /// Show the latest prediction results
    Results {
        /// Print the enriched result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the latest results as CSV
    Download {
        /// Destination directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Log in with CHURN_EMAIL / CHURN_PASSWORD and print the session
    Login,
}

/// Console progress bar for uploads
struct ConsoleProgress {
    accepted: AtomicBool,
}

impl UploadObserver for ConsoleProgress {
    fn on_progress(&self, percent: u8) {
        if percent > 0 {
            eprint!("\rUploading... {:>3}%", percent);
            let _ = std::io::stderr().flush();
        }
    }

    fn on_accepted(&self, _result_location: &str) {
        eprintln!();
        self.accepted.store(true, Ordering::SeqCst);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = match &args.config {
        Some(path) => ConfigResolver::with_config_file(path),
        None => ConfigResolver::new(),
    };
    let overrides = ConfigOverrides {
        ml_api_url: args.ml_api_url.clone(),
        backend_url: args.backend_url.clone(),
        identity: args.user_id.clone(),
        bearer_token: args.token.clone(),
        log_level: args.verbose.then(|| "debug".to_string()),
        download_dir: None,
    };
    let config = resolver.resolve(&overrides)?;

    // Initialize tracing: RUST_LOG wins, then the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting churn-client v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(ml_api_url = %config.ml_api_url, "Prediction service");

    let client = ChurnClient::from_config(&config)?;
    let mut auth = ChurnClient::auth_context(&config);

    match args.command {
        Command::Upload { file } => {
            let candidate = UploadCandidate::from_path(&file).await?;
            let observer = Arc::new(ConsoleProgress {
                accepted: AtomicBool::new(false),
            });
            let outcome = client
                .upload
                .submit(
                    candidate,
                    &mut auth,
                    ObserverHandle::detached(observer.clone()),
                )
                .await;

            if !outcome.is_accepted() {
                eprintln!();
                bail!("{}", outcome.user_message());
            }
            println!("{}", outcome.user_message());

            if observer.accepted.load(Ordering::SeqCst) {
                show_results(&client, &auth, false).await?;
            }
        }
        Command::Results { json } => show_results(&client, &auth, json).await?,
        Command::Download { out } => {
            let dest = out.unwrap_or_else(|| config.download_dir.clone());
            let hint = match client.results.fetch_latest(&auth).await {
                ResultState::Ready(result) => result.csv_url,
                _ => None,
            };
            let path = client
                .downloads
                .download(&auth, &dest, hint.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!("Download failed: {}", e))?;
            println!("CSV downloaded to {}", path.display());
        }
        Command::Login => {
            if auth.credentials().is_none() {
                bail!("Set CHURN_EMAIL and CHURN_PASSWORD to log in");
            }
            client.authenticator.acquire(&mut auth).await?;
            println!("{}", session_summary(&auth));
        }
    }

    Ok(())
}

/// One-line session description; the bearer token itself is never shown
fn session_summary(auth: &AuthContext) -> String {
    match auth.bearer_token() {
        Some(_) => format!("Logged in as {} (session token held)", auth.identity()),
        None => format!("Logged in as {} (no session token)", auth.identity()),
    }
}

async fn show_results(client: &ChurnClient, auth: &AuthContext, json: bool) -> Result<()> {
    let view = ResultView::new();
    view.load(&client.results, auth).await;

    match view.state().await {
        ResultState::Ready(result) if json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        ResultState::Ready(result) => print_result(&result),
        ResultState::Empty => println!("No results yet."),
        ResultState::Failed(message) => bail!("{}", message),
        ResultState::Loading => bail!("Results did not load"),
    }
    Ok(())
}

fn print_result(result: &EnrichedResult) {
    let summary = &result.summary;
    println!("ML Prediction Results");
    println!(
        "  Total: {}  Churned: {}  Retained: {}  Churn rate: {:.1}%",
        summary.total, summary.churned, summary.retained, summary.churn_rate_percent
    );

    println!("\nChurn vs Retain");
    for slice in &result.pie_data {
        println!("  {:<10} {}", slice.name, slice.value);
    }

    if !result.preview.is_empty() {
        println!("\n  {:>6}  {:>10}  {:>11}", "ID", "Prediction", "Probability");
        for row in &result.preview {
            let prediction = row
                .prediction
                .map(|p| format!("{}", p))
                .unwrap_or_else(|| "-".to_string());
            let probability = row
                .probability
                .map(|p| format!("{:.3}", p))
                .unwrap_or_else(|| "-".to_string());
            println!("  {:>6}  {:>10}  {:>11}", row.id, prediction, probability);
        }
    }

    if let Some(bands) = result.income_bands_ordered() {
        println!("\nIncome Band vs Churn ({})", INCOME_BAND_ORDER.join(" < "));
        for point in bands {
            println!(
                "  {:<10} churned={} retained={}",
                point.get("band").and_then(|b| b.as_str()).unwrap_or("?"),
                point.get("churned").cloned().unwrap_or_default(),
                point.get("retained").cloned().unwrap_or_default(),
            );
        }
    }

    let series = [
        ("Customer Tenure vs Churn", &result.tenure_chart),
        ("Complaints vs Churn", &result.complaints_line_chart),
        ("Balance vs Churn/Retain", &result.balance_area_chart),
        ("Credit Score Trends", &result.credit_score_chart),
        ("Average Credit Score by Churn", &result.avg_credit_score_by_churn),
    ];
    for (title, points) in series {
        if let Some(points) = points {
            println!("\n{} ({} points)", title, points.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_summary_hides_token() {
        let auth = AuthContext::anonymous()
            .with_identity("user-17")
            .with_bearer_token("tok-secret-123");

        let summary = session_summary(&auth);

        assert!(summary.contains("user-17"));
        assert!(!summary.contains("tok-secret-123"));
    }

    #[test]
    fn test_session_summary_without_token() {
        assert_eq!(
            session_summary(&AuthContext::anonymous()),
            "Logged in as anonymous (no session token)"
        );
    }
}
