//! # Nira client for Rust
//!
//! A small async client for the [Nira](https://nira.app) asset review API.
//! Upload asset files and image sequences, wait for server-side processing,
//! list recently updated assets, read and write asset metadata, and download
//! assets.
//!
//! ## Quick start
//!
//! ```no_run
//! use niraclient::{Client, JobStatus, WaitOptions};
//!
//! #[tokio::main]
//! async fn main() -> niraclient::Result<()> {
//!     let mut client = Client::new("https://example.nira.app", "your_api_key")?;
//!     client.use_user_email("artist@example.com").await?;
//!
//!     // Primary file first, then its textures and materials.
//!     let upload = client
//!         .upload_asset(&["robot.obj", "robot.mtl", "robot_diffuse.png"])
//!         .await?;
//!
//!     match client
//!         .wait_for_asset_processing(upload.asset_job_id, &WaitOptions::default())
//!         .await?
//!     {
//!         JobStatus::Processed => println!("{}", upload.asset_url),
//!         other => eprintln!("{other}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Builder pattern
//!
//! ```no_run
//! use niraclient::ClientBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> niraclient::Result<()> {
//! let client = ClientBuilder::new()
//!     .base_url("https://example.nira.app")
//!     .api_key("your_api_key")
//!     .user_email("artist@example.com")
//!     .max_retries(5)
//!     .timeout(Duration::from_secs(300))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod errors;
mod models;
pub mod sequence;

pub use client::{Client, ClientBuilder};
pub use errors::{NiraError, Result};
pub use models::{
    Asset, AssetJob, JobStatus, MetadataLevel, UploadInfo, UploadOptions, User, WaitOptions,
};
pub use sequence::{SequenceFrames, SequencePattern};
