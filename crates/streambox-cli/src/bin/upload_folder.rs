use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use streambox_api_client::{ApiClient, BatchItem, SubmissionLoop, SubmissionPolicy};
use streambox_cli::{discover_uploads, format_summary, init_tracing, ConsoleObserver};

#[derive(Parser, Debug)]
#[command(name = "upload_folder")]
#[command(about = "Upload every video in a folder to Streambox")]
struct Args {
    /// Directory containing video files
    #[arg(long, short = 'd')]
    dir: PathBuf,

    /// API base URL (example: http://localhost:4000/api/v0)
    #[arg(long)]
    api: String,

    /// Admin email
    #[arg(long)]
    email: String,

    /// Admin password
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if !args.dir.is_dir() {
        bail!("Directory not found: {}", args.dir.display());
    }

    println!("Authenticating...");
    let client = ApiClient::login(args.api.clone(), &args.email, &args.password).await?;

    let uploads = discover_uploads(&args.dir)?;
    println!("Found {} video files to upload.", uploads.len());
    if uploads.is_empty() {
        return Ok(());
    }

    let mut items: Vec<BatchItem> = uploads.into_iter().map(BatchItem::new).collect();
    let runner = SubmissionLoop::new(client, SubmissionPolicy::default())
        .with_observer(Arc::new(ConsoleObserver::default()));

    let summary = runner
        .run(&mut items)
        .await
        .context("Submission loop failed")?;

    println!("\n{}", format_summary(&summary));
    Ok(())
}
