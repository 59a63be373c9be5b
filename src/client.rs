use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{NiraError, Result};
use crate::models::{
    asset_from_value, job_from_value, json_u64, require_id, user_from_value, Asset, AssetJob,
    JobStatus, MetadataLevel, UploadInfo, UploadOptions, User, WaitOptions,
};
use crate::sequence::SequencePattern;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

const API_KEY_HEADER: &str = "x-api-key";
const USER_EMAIL_HEADER: &str = "x-user-api-email";

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use niraclient::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> niraclient::Result<()> {
/// let client = ClientBuilder::new()
///     .base_url("https://example.nira.app")
///     .api_key("a1b2c3")
///     .user_email("artist@example.com")
///     .max_retries(5)
///     .timeout(Duration::from_secs(300))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    user_email: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
    timeout: Duration,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            user_email: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Base URL of the Nira server, such as `https://example.nira.app`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API key for authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Email of the Nira account the API key acts for.
    pub fn user_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Set the maximum number of retries for transient errors (defaults to 3).
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Delay before the first retry; doubled on each further attempt (defaults to 1s).
    pub fn retry_backoff(mut self, d: Duration) -> Self {
        self.retry_backoff = d;
        self
    }

    /// Set the HTTP request timeout (defaults to 60 seconds).
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Build the [`Client`].
    ///
    /// Unset values fall back to the `NIRA_URL`, `NIRA_API_KEY` and
    /// `NIRA_USER_EMAIL` environment variables.
    ///
    /// Returns [`NiraError::Authentication`] if no API key is available and
    /// [`NiraError::InvalidInput`] if no base URL is available.
    pub fn build(self) -> Result<Client> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("NIRA_API_KEY").ok())
            .ok_or_else(|| NiraError::Authentication {
                message: "API key is required. Pass it to ClientBuilder::api_key() \
                          or set the NIRA_API_KEY environment variable."
                    .into(),
            })?;

        let base_url = self
            .base_url
            .or_else(|| std::env::var("NIRA_URL").ok())
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                NiraError::InvalidInput(
                    "base URL is required. Pass it to ClientBuilder::base_url() \
                     or set the NIRA_URL environment variable."
                        .into(),
                )
            })?;

        let user_email = self
            .user_email
            .or_else(|| std::env::var("NIRA_USER_EMAIL").ok())
            .filter(|e| !e.is_empty());

        let mut headers = HeaderMap::new();
        let mut key_value = header_value(&api_key, "API key")?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);
        if let Some(ref email) = user_email {
            headers.insert(USER_EMAIL_HEADER, header_value(email, "user email")?);
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(NiraError::Http)?;

        Ok(Client {
            base_url,
            http,
            user_email,
            user_id: None,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| NiraError::InvalidInput(format!("{what} contains invalid characters")))
}

/// Request body variants understood by [`Client::request_json`].
enum Payload {
    Empty,
    Form(Vec<(&'static str, String)>),
    Json(serde_json::Value),
}

/// A file validated for upload.
struct UploadFile<'a> {
    path: &'a Path,
    name: String,
    size: u64,
}

/// The Nira API client.
///
/// # Example
///
/// ```no_run
/// use niraclient::{Client, JobStatus, WaitOptions};
///
/// # async fn example() -> niraclient::Result<()> {
/// let mut client = Client::new("https://example.nira.app", "a1b2c3")?;
/// client.use_user_email("artist@example.com").await?;
///
/// let upload = client.upload_asset(&["/work/robot.obj", "/work/robot.mtl"]).await?;
/// let status = client
///     .wait_for_asset_processing(upload.asset_job_id, &WaitOptions::default())
///     .await?;
/// if status == JobStatus::Processed {
///     println!("{}", upload.asset_url);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    user_email: Option<String>,
    user_id: Option<u64>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Client {
    /// Create a client for `base_url` with default settings.
    ///
    /// For customization, use [`ClientBuilder`] instead.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new()
            .base_url(base_url)
            .api_key(api_key)
            .build()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    /// Sets the user account that later API operations are recorded under.
    /// For example, uploads made afterwards show this user as the uploader.
    pub fn set_user_id(&mut self, user_id: u64) {
        self.user_id = Some(user_id);
    }

    /// Browser URL of the asset with the given `urlUuid`.
    pub fn asset_url(&self, url_uuid: &str) -> String {
        format!("{}/a/{}", self.base_url, url_uuid)
    }

    /// Retrieve a user account record by email address.
    ///
    /// Returns `None` when no account matches.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = [("email", email.to_string()), ("$paginate", "false".into())];
        let resp: serde_json::Value = self
            .request_json(Method::GET, "/users", &query, Payload::Empty)
            .await?;

        Ok(into_records(resp).into_iter().next().map(user_from_value))
    }

    /// Resolve `email` to an account and act as that user from now on.
    pub async fn use_user_email(&mut self, email: &str) -> Result<User> {
        let user = self
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| NiraError::UserNotFound(email.to_string()))?;
        debug!(user_id = user.id, email, "acting as user");
        self.set_user_id(user.id);
        Ok(user)
    }

    /// All assets updated after `since` (seconds since epoch, UTC).
    ///
    /// Assets are updated on upload and whenever a markup is created for them.
    pub async fn get_assets_updated_since(&self, since: i64) -> Result<Vec<Asset>> {
        let query = [
            ("$groupByFile", "true".to_string()),
            ("$paginate", "false".into()),
            ("$updatedSince", since.to_string()),
        ];
        let resp: serde_json::Value = self
            .request_json(Method::GET, "/assets", &query, Payload::Empty)
            .await?;

        Ok(into_records(resp)
            .into_iter()
            .map(asset_from_value)
            .collect())
    }

    /// All assets updated within the last `window`.
    pub async fn get_assets_updated_within(&self, window: Duration) -> Result<Vec<Asset>> {
        let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        let since = chrono::Utc::now().timestamp().saturating_sub(window);
        self.get_assets_updated_since(since).await
    }

    /// Fetch the current state of an upload job.
    pub async fn get_asset_job(&self, job_id: u64) -> Result<AssetJob> {
        let resp: serde_json::Value = self
            .request_json(Method::GET, &format!("/jobs/{job_id}"), &[], Payload::Empty)
            .await?;
        Ok(job_from_value(resp))
    }

    /// Poll the server until the job's asset is processed, fails processing,
    /// or `opts.timeout` has been spent waiting.
    ///
    /// Small assets usually finish within seconds; multi-GB scene files can
    /// take a few minutes.
    pub async fn wait_for_asset_processing(
        &self,
        job_id: u64,
        opts: &WaitOptions,
    ) -> Result<JobStatus> {
        let step = opts.poll_interval.max(Duration::from_millis(1));
        let mut waited = Duration::ZERO;

        loop {
            let job = self.get_asset_job(job_id).await?;

            if let Some(ref cb) = opts.on_progress {
                cb(&job);
            }

            if job.is_processed() {
                info!(job_id, "asset processed");
                return Ok(JobStatus::Processed);
            }

            if job.is_processed_with_errors() {
                warn!(job_id, "asset processed with errors");
                return Ok(JobStatus::ProcessingError);
            }

            waited += step;
            if waited > opts.timeout {
                warn!(job_id, timeout = ?opts.timeout, "gave up waiting for asset processing");
                return Ok(JobStatus::TimedOut);
            }

            debug!(job_id, status = %job.status, "asset not processed yet");
            tokio::time::sleep(step).await;
        }
    }

    /// Upload an asset file and its accompanying files.
    ///
    /// The primary asset file (`.ma`, `.mb`, `.zpr`, `.obj`, ...) must come
    /// first; texture and material files follow. See
    /// [`upload_asset_with`](Self::upload_asset_with).
    pub async fn upload_asset<P: AsRef<Path>>(&self, paths: &[P]) -> Result<UploadInfo> {
        self.upload_asset_with(paths, &UploadOptions::default())
            .await
    }

    /// Upload files as one asset.
    ///
    /// This performs, in order:
    /// 1. `POST /jobs` to open an upload batch.
    /// 2. Per file, `POST /assets` to create the file record, then a
    ///    multipart `POST /asset-uploads` with the file contents.
    /// 3. `PATCH /jobs/{id}` to mark the batch uploaded, which starts
    ///    server-side processing.
    ///
    /// Every path is checked before anything is sent.
    pub async fn upload_asset_with<P: AsRef<Path>>(
        &self,
        paths: &[P],
        opts: &UploadOptions,
    ) -> Result<UploadInfo> {
        if paths.is_empty() {
            return Err(NiraError::InvalidInput(
                "at least one file is required for an upload".into(),
            ));
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let meta = tokio::fs::metadata(path).await.map_err(NiraError::Io)?;
            if !meta.is_file() {
                return Err(NiraError::InvalidInput(format!(
                    "{} is not a regular file",
                    path.display()
                )));
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    NiraError::InvalidInput(format!("{} has no file name", path.display()))
                })?;
            files.push(UploadFile {
                path,
                name,
                size: meta.len(),
            });
        }

        let batch_id = Uuid::new_v4().to_string();

        // Step 1: open the job.
        let mut job_form = vec![
            ("status", "validating".to_string()),
            ("batchId", batch_id.clone()),
        ];
        self.push_created_by(&mut job_form);
        if opts.is_sequence {
            job_form.push(("isSequence", "true".into()));
        }
        if let Some(ref name) = opts.asset_name {
            job_form.push(("assetName", name.clone()));
        }
        let job: serde_json::Value = self
            .request_json(Method::POST, "/jobs", &[], Payload::Form(job_form))
            .await?;
        let job_id = require_id(&job, "job")?;
        info!(job_id, batch_id = %batch_id, files = files.len(), "created upload job");

        // Step 2: one record and one upload per file.
        let mut parent_id = 0;
        let mut assets = Vec::with_capacity(files.len());
        for file in &files {
            let asset_uuid = Uuid::new_v4().to_string();

            let mut form = vec![
                ("fileName", file.name.clone()),
                ("uuid", asset_uuid.clone()),
                ("parentAssetpathId", parent_id.to_string()),
                ("jobId", job_id.to_string()),
            ];
            self.push_created_by(&mut form);
            let record: serde_json::Value = self
                .request_json(Method::POST, "/assets", &[], Payload::Form(form))
                .await?;
            let asset_id = require_id(&record, "asset")?;
            if parent_id == 0 {
                parent_id = asset_id;
            }

            self.upload_file(file, &asset_uuid).await?;
            assets.push(asset_from_value(record));
        }

        // Step 3: close the job.
        let patch = vec![("status", "uploaded".to_string()), ("batchId", batch_id)];
        let patched: serde_json::Value = self
            .request_json(
                Method::PATCH,
                &format!("/jobs/{job_id}"),
                &[],
                Payload::Form(patch),
            )
            .await?;

        let asset_url = assets
            .first()
            .map(|a| self.asset_url(&a.url_uuid))
            .unwrap_or_default();
        info!(job_id, url = %asset_url, "upload complete");

        Ok(UploadInfo {
            asset_url,
            asset_job_id: json_u64(&patched, "id").unwrap_or(job_id),
            assets,
        })
    }

    /// Upload every frame of an image sequence as one asset.
    ///
    /// `frame_or_pattern` is any frame of the sequence (`shot.0001.png`) or a
    /// placeholder pattern (`shot.####.png`, `shot.%04d.png`). Gaps in the
    /// numbering are logged but do not stop the upload.
    pub async fn upload_sequence(
        &self,
        frame_or_pattern: impl AsRef<Path>,
        opts: &UploadOptions,
    ) -> Result<UploadInfo> {
        let frames = SequencePattern::parse(frame_or_pattern)?.collect()?;
        let pattern = frames.pattern.display_pattern();

        let gaps = frames.gaps();
        if let Some(first_gap) = gaps.first() {
            warn!(
                pattern = %pattern,
                gaps = gaps.len(),
                missing = frames.missing_count(),
                first_gap = ?first_gap,
                "image sequence has gaps"
            );
        }
        info!(
            pattern = %pattern,
            frames = frames.len(),
            first = ?frames.first_frame(),
            last = ?frames.last_frame(),
            "uploading image sequence"
        );

        let opts = UploadOptions {
            is_sequence: true,
            ..opts.clone()
        };
        self.upload_asset_with(&frames.paths(), &opts).await
    }

    /// Replace the metadata stored on an asset at `level`.
    ///
    /// `metadata` must be a JSON object. Returns the server's response.
    pub async fn set_metadata(
        &self,
        asset_url_uuid: &str,
        level: MetadataLevel,
        metadata: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        check_url_uuid(asset_url_uuid)?;
        if !metadata.is_object() {
            return Err(NiraError::InvalidInput(
                "metadata must be a JSON object".into(),
            ));
        }

        let body = json!({
            "assetUrlUuid": asset_url_uuid,
            "level": level,
            "metadata": metadata,
        });
        self.request_json(Method::POST, "/asset-metadata", &[], Payload::Json(body))
            .await
    }

    /// Read the metadata stored on an asset at `level`.
    pub async fn get_metadata(
        &self,
        asset_url_uuid: &str,
        level: MetadataLevel,
    ) -> Result<serde_json::Value> {
        check_url_uuid(asset_url_uuid)?;
        let query = [
            ("assetUrlUuid", asset_url_uuid.to_string()),
            ("level", level.as_str().to_string()),
        ];
        self.request_json(Method::GET, "/asset-metadata", &query, Payload::Empty)
            .await
    }

    /// Download an asset's files into `dest_dir` and return the written path.
    ///
    /// The file name comes from the response's `Content-Disposition` header,
    /// falling back to `<urlUuid>.zip`.
    pub async fn download_asset(
        &self,
        asset_url_uuid: &str,
        dest_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        check_url_uuid(asset_url_uuid)?;
        let dest_dir = dest_dir.as_ref();
        let url = self.url(&format!("/assets/{asset_url_uuid}/download"));

        let mut response = self.execute(|| Ok(self.http.get(&url))).await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("{asset_url_uuid}.zip"));

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(file_name);
        let mut file = tokio::fs::File::create(&path).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(path = %path.display(), bytes = written, "asset downloaded");
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn push_created_by(&self, form: &mut Vec<(&'static str, String)>) {
        if let Some(id) = self.user_id {
            form.push(("createdBy", id.to_string()));
        }
    }

    /// Send one file to the upload endpoint as multipart/form-data.
    ///
    /// The file is streamed from disk rather than buffered, and reopened on
    /// every attempt since a sent stream cannot be replayed.
    async fn upload_file(&self, file: &UploadFile<'_>, asset_uuid: &str) -> Result<()> {
        let mime = mime_guess::from_path(file.path)
            .first_or_octet_stream()
            .to_string();
        let url = self.url("/asset-uploads");

        debug!(file = %file.name, size = file.size, mime = %mime, "uploading file");

        let response = self
            .execute(|| {
                let handle = tokio::fs::File::from_std(std::fs::File::open(file.path)?);
                let part = Part::stream_with_length(handle, file.size)
                    .file_name(file.name.clone())
                    .mime_str(&mime)?;
                let form = Form::new()
                    .text("qquuid", asset_uuid.to_string())
                    .text("qqfilename", file.name.clone())
                    .text("qqtotalfilesize", file.size.to_string())
                    .part("qqfile", part);
                Ok(self.http.post(&url).multipart(form))
            })
            .await?;

        debug!(file = %file.name, status = %response.status(), "file uploaded");
        Ok(())
    }

    /// Execute a request and decode its JSON response.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload,
    ) -> Result<T> {
        let url = self.url(path);

        let response = self
            .execute(|| {
                let mut req = self.http.request(method.clone(), &url);
                if !query.is_empty() {
                    req = req.query(query);
                }
                req = match &payload {
                    Payload::Empty => req,
                    Payload::Form(fields) => req.form(fields),
                    Payload::Json(body) => req.json(body),
                };
                Ok(req)
            })
            .await?;

        let text = response.text().await.map_err(NiraError::Http)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Execute an HTTP request with automatic retry for transient failures.
    ///
    /// `build` is called once per attempt, so bodies that cannot be cloned
    /// (multipart forms) are rebuilt each time.
    ///
    /// Retries are performed for:
    /// - HTTP 5xx server errors
    /// - HTTP 429 rate-limit responses
    /// - Network-level errors (connection refused, timeout, etc.)
    ///
    /// Exponential backoff is applied starting from `retry_backoff`.
    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut last_err: Option<NiraError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(backoff).await;
            }

            let request = build()?.build()?;
            debug!(method = %request.method(), url = %request.url(), attempt, "sending request");

            let response = match self.http.execute(request).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, error = %e, "request failed");
                    last_err = Some(NiraError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let err = error_from_response(response).await;

            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                warn!(attempt, status = status.as_u16(), error = %err, "transient server error");
                last_err = Some(err);
                continue;
            }

            return Err(err);
        }

        // All retries exhausted.
        Err(last_err.unwrap_or_else(|| NiraError::Api {
            status_code: 0,
            message: "request failed after all retries".into(),
            body: None,
        }))
    }
}

/// Map a non-success response to a typed error.
async fn error_from_response(response: Response) -> NiraError {
    let status = response.status();
    let status_code = status.as_u16();
    let response_text = response.text().await.unwrap_or_default();

    let parsed_body: Option<serde_json::Value> = serde_json::from_str(&response_text).ok();

    let message = parsed_body
        .as_ref()
        .and_then(|b| b.get("message").or_else(|| b.get("error")))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if response_text.is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                response_text.clone()
            }
        });

    match status_code {
        401 => NiraError::Authentication { message },
        403 => NiraError::PermissionDenied { message },
        404 => NiraError::NotFound { message },
        429 => {
            let retry_after = parsed_body
                .as_ref()
                .and_then(|b| b.get("retryAfter"))
                .and_then(|v| v.as_f64());

            NiraError::RateLimit {
                message,
                retry_after,
            }
        }
        _ => NiraError::Api {
            status_code,
            message,
            body: parsed_body,
        },
    }
}

/// List endpoints answer with a bare array when `$paginate=false` is honored
/// and with `{ "data": [...] }` otherwise.
fn into_records(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("data") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn check_url_uuid(url_uuid: &str) -> Result<()> {
    if url_uuid.is_empty()
        || url_uuid == "."
        || url_uuid == ".."
        || url_uuid.contains(['/', '?', '#'])
    {
        return Err(NiraError::InvalidInput(format!(
            "{url_uuid:?} is not an asset urlUuid"
        )));
    }
    Ok(())
}

/// Extract a safe file name from a `Content-Disposition` header value.
///
/// The RFC 6266 extended form `filename*=UTF-8''...` wins over `filename=`.
fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };
        let val = val.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'language'percent-encoded-value
                extended = val
                    .splitn(3, '\'')
                    .nth(2)
                    .and_then(|encoded| urlencoding::decode(encoded).ok())
                    .map(|decoded| decoded.into_owned());
            }
            "filename" => plain = Some(val.trim_matches('"').to_string()),
            _ => {}
        }
    }

    let raw = extended.or(plain)?;
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_filename_is_extracted_and_sanitized() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="robot.zip""#).as_deref(),
            Some("robot.zip")
        );
        assert_eq!(
            filename_from_disposition("attachment; FILENAME=scene.ma").as_deref(),
            Some("scene.ma")
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(filename_from_disposition(r#"attachment; filename="..""#), None);
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn extended_disposition_filename_is_decoded_and_preferred() {
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''robot%20v2%E2%9C%93.zip")
                .as_deref(),
            Some("robot v2\u{2713}.zip")
        );
        assert_eq!(
            filename_from_disposition(
                r#"attachment; filename="fallback.zip"; filename*=utf-8'en'scene%2Ema"#
            )
            .as_deref(),
            Some("scene.ma")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''..%2F..%2Fetc%2Fpasswd")
                .as_deref(),
            Some("passwd")
        );
    }

    #[test]
    fn records_accept_bare_and_paginated_lists() {
        assert_eq!(into_records(json!([{ "id": 1 }])).len(), 1);
        assert_eq!(into_records(json!({ "total": 2, "data": [{}, {}] })).len(), 2);
        assert!(into_records(json!({ "total": 0 })).is_empty());
        assert!(into_records(json!(null)).is_empty());
    }

    #[test]
    fn url_uuid_must_be_a_single_segment() {
        assert!(check_url_uuid("Xy7_3kQ").is_ok());
        assert!(check_url_uuid("").is_err());
        assert!(check_url_uuid("a/b").is_err());
        assert!(check_url_uuid(".").is_err());
        assert!(check_url_uuid("..").is_err());
        assert!(check_url_uuid("..x").is_ok());
    }

    #[test]
    fn builder_normalizes_base_url() {
        let client = ClientBuilder::new()
            .base_url("https://example.nira.app/")
            .api_key("k")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://example.nira.app");
        assert_eq!(client.asset_url("abc"), "https://example.nira.app/a/abc");
        assert_eq!(client.user_id(), None);
    }

    #[test]
    fn builder_rejects_credentials_that_cannot_be_headers() {
        let err = ClientBuilder::new()
            .base_url("https://example.nira.app")
            .api_key("bad\nkey")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, NiraError::InvalidInput(_)));
    }
}
