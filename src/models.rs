use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::errors::NiraError;

/// A Nira user account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    /// Full API record.
    pub raw: serde_json::Value,
}

/// One asset file record. An uploaded asset made of several files has one
/// record per file; the first is the primary file.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: u64,
    /// Short identifier used in asset URLs (`<base>/a/<urlUuid>`).
    pub url_uuid: String,
    pub file_name: String,
    /// Full API record.
    pub raw: serde_json::Value,
}

/// The server-side job tracking an upload batch through processing.
#[derive(Debug, Clone)]
pub struct AssetJob {
    pub id: u64,
    /// e.g. "validating", "uploaded", "processing", "processed".
    pub status: String,
    pub batch_id: String,
    /// Full API record.
    pub raw: serde_json::Value,
}

impl AssetJob {
    pub fn is_processed(&self) -> bool {
        self.status == "processed"
    }

    pub fn is_processed_with_errors(&self) -> bool {
        self.status == "processed_with_errors"
    }

    /// Terminal = processing won't progress any further.
    pub fn is_terminal(&self) -> bool {
        self.is_processed() || self.is_processed_with_errors()
    }
}

/// Final outcome of [`Client::wait_for_asset_processing`](crate::Client::wait_for_asset_processing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Processed,
    ProcessingError,
    TimedOut,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Processed => "Processed",
            JobStatus::ProcessingError => "Processing Error",
            JobStatus::TimedOut => "Timed Out",
        };
        f.write_str(s)
    }
}

/// Where a metadata document is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataLevel {
    /// The asset as a whole, across versions.
    Asset,
    /// The asset's current version.
    #[serde(rename = "assetversion")]
    AssetVersion,
}

impl MetadataLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataLevel::Asset => "asset",
            MetadataLevel::AssetVersion => "assetversion",
        }
    }
}

impl fmt::Display for MetadataLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataLevel {
    type Err = NiraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asset" => Ok(MetadataLevel::Asset),
            "assetversion" | "asset_version" | "version" => Ok(MetadataLevel::AssetVersion),
            other => Err(NiraError::InvalidInput(format!(
                "unknown metadata level {other:?} (expected \"asset\" or \"assetversion\")"
            ))),
        }
    }
}

/// Returned by the upload methods once every file has been sent.
#[derive(Debug, Clone)]
pub struct UploadInfo {
    /// Browser URL of the new asset.
    pub asset_url: String,
    /// Pass to `wait_for_asset_processing` to follow server-side processing.
    pub asset_job_id: u64,
    /// One record per uploaded file, in upload order.
    pub assets: Vec<Asset>,
}

impl UploadInfo {
    /// The `urlUuid` of the primary file, used by the metadata and download calls.
    pub fn url_uuid(&self) -> Option<&str> {
        self.assets.first().map(|a| a.url_uuid.as_str())
    }
}

/// Extra job settings for an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Display name for the asset. The server uses the primary file name if unset.
    pub asset_name: Option<String>,
    /// Mark the files as frames of one image sequence.
    pub is_sequence: bool,
}

/// Polling config for `wait_for_asset_processing`.
pub struct WaitOptions {
    /// Default: 2s.
    pub poll_interval: Duration,
    /// Default: 600s.
    pub timeout: Duration,
    /// Called on each poll iteration with the current job.
    #[allow(clippy::type_complexity)]
    pub on_progress: Option<Box<dyn Fn(&AssetJob) + Send + Sync>>,
}

impl WaitOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(600),
            on_progress: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal deserialization helpers
// ---------------------------------------------------------------------------

/// Pull a string out of a JSON value, or `""` if missing.
pub(crate) fn json_str(val: &serde_json::Value, key: &str) -> String {
    val.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Pull an id out of a JSON value. Accepts numbers and numeric strings.
pub(crate) fn json_u64(val: &serde_json::Value, key: &str) -> Option<u64> {
    match val.get(key)? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Like [`json_u64`], but a missing id is an error.
pub(crate) fn require_id(val: &serde_json::Value, what: &str) -> crate::Result<u64> {
    json_u64(val, "id").ok_or_else(|| NiraError::Api {
        status_code: 200,
        message: format!("{what} record has no numeric id"),
        body: Some(val.clone()),
    })
}

pub(crate) fn user_from_value(val: serde_json::Value) -> User {
    User {
        id: json_u64(&val, "id").unwrap_or_default(),
        email: json_str(&val, "email"),
        name: json_str(&val, "name"),
        raw: val,
    }
}

pub(crate) fn asset_from_value(val: serde_json::Value) -> Asset {
    Asset {
        id: json_u64(&val, "id").unwrap_or_default(),
        url_uuid: json_str(&val, "urlUuid"),
        file_name: json_str(&val, "fileName"),
        raw: val,
    }
}

pub(crate) fn job_from_value(val: serde_json::Value) -> AssetJob {
    AssetJob {
        id: json_u64(&val, "id").unwrap_or_default(),
        status: json_str(&val, "status"),
        batch_id: json_str(&val, "batchId"),
        raw: val,
    }
}
