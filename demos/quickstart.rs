//! Quick-start walkthrough for the Nira Rust client.
//!
//! Run with:
//!   NIRA_URL=https://example.nira.app NIRA_API_KEY=... NIRA_USER_EMAIL=you@example.com \
//!     cargo run --example quickstart -- robot.obj robot.mtl

use niraclient::{ClientBuilder, JobStatus, MetadataLevel, WaitOptions};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> niraclient::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Create a client (reads NIRA_URL / NIRA_API_KEY / NIRA_USER_EMAIL)
    // -----------------------------------------------------------------------
    let mut client = ClientBuilder::new().build()?;

    if let Some(email) = client.user_email().map(str::to_string) {
        let user = client.use_user_email(&email).await?;
        println!("Acting as {} (id {})", user.name, user.id);
    }

    // -----------------------------------------------------------------------
    // 2. Upload the files given on the command line, primary file first
    // -----------------------------------------------------------------------
    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        eprintln!("usage: quickstart <asset file> [texture/material files...]");
        return Ok(());
    }

    let upload = client.upload_asset(&files).await?;
    println!("Uploaded {} file(s), job {}", upload.assets.len(), upload.asset_job_id);

    // -----------------------------------------------------------------------
    // 3. Wait for processing with a progress callback
    // -----------------------------------------------------------------------
    let opts = WaitOptions {
        poll_interval: Duration::from_secs(3),
        timeout: Duration::from_secs(300),
        on_progress: Some(Box::new(|job: &niraclient::AssetJob| {
            println!("  Status: {}", job.status);
        })),
    };
    let status = client
        .wait_for_asset_processing(upload.asset_job_id, &opts)
        .await?;
    if status != JobStatus::Processed {
        println!("Processing ended with: {status}");
        return Ok(());
    }
    println!("Ready: {}", upload.asset_url);

    // -----------------------------------------------------------------------
    // 4. Attach and read back metadata
    // -----------------------------------------------------------------------
    if let Some(url_uuid) = upload.url_uuid() {
        client
            .set_metadata(url_uuid, MetadataLevel::Asset, &json!({ "source": "quickstart" }))
            .await?;
        let meta = client.get_metadata(url_uuid, MetadataLevel::Asset).await?;
        println!("Metadata: {meta}");
    }

    // -----------------------------------------------------------------------
    // 5. List everything touched in the last hour
    // -----------------------------------------------------------------------
    let assets = client
        .get_assets_updated_within(Duration::from_secs(60 * 60))
        .await?;
    for asset in &assets {
        println!("  {} | {}", asset.url_uuid, asset.file_name);
    }

    Ok(())
}
