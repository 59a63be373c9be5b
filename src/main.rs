//! niracmd - command line client for the Nira asset review API

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, ValueEnum};
use niraclient::{
    AssetJob, Client, ClientBuilder, JobStatus, MetadataLevel, UploadInfo, UploadOptions,
    WaitOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "niracmd")]
#[command(about = "Nira Client CLI")]
#[command(version)]
#[command(group(
    ArgGroup::new("uploads").args(["upload", "upload_sequence"])
))]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args([
            "upload",
            "upload_sequence",
            "list_assets_updated_within",
            "get_job",
            "set_metadata",
            "get_metadata",
            "download_asset",
        ])
))]
struct Args {
    /// API key for the Nira server
    #[arg(long, env = "NIRA_API_KEY", hide_env_values = true)]
    apikey: String,

    /// Base URL of the Nira server, e.g. https://example.nira.app
    #[arg(long, env = "NIRA_URL")]
    niraurl: String,

    /// User email of Nira account to create records with [env: NIRA_USER_EMAIL]
    #[arg(long, conflicts_with = "userid")]
    useremail: Option<String>,

    /// User ID of Nira account to create records with
    #[arg(long)]
    userid: Option<u64>,

    /// Upload asset files (primary file first) and print the asset URL
    #[arg(long, value_name = "PATH", num_args = 1..)]
    upload: Vec<PathBuf>,

    /// Upload an image sequence given one frame or a pattern like shot.####.png
    #[arg(long, value_name = "FRAME_OR_PATTERN")]
    upload_sequence: Option<PathBuf>,

    /// With an upload, wait up to SECONDS for server-side processing before returning
    #[arg(long, value_name = "SECONDS", requires = "uploads")]
    wait_for_asset_processing: Option<u64>,

    /// Display name for an uploaded asset
    #[arg(long, value_name = "NAME", requires = "uploads")]
    asset_name: Option<String>,

    /// Print asset records (JSON) updated within the last SECONDS
    #[arg(long, value_name = "SECONDS")]
    list_assets_updated_within: Option<u64>,

    /// Print the upload job record (JSON) with this id
    #[arg(long, value_name = "JOB_ID")]
    get_job: Option<u64>,

    /// Store a JSON object as metadata on --asset
    #[arg(long, value_name = "JSON", value_parser = parse_json_object, requires = "asset")]
    set_metadata: Option<serde_json::Value>,

    /// Print the metadata stored on --asset
    #[arg(long, requires = "asset")]
    get_metadata: bool,

    /// Asset urlUuid, or a full asset URL ending in /a/<urlUuid>
    #[arg(long, value_name = "ASSET")]
    asset: Option<String>,

    /// Level the metadata is attached at
    #[arg(long, value_enum, default_value_t = LevelArg::Asset)]
    metadata_level: LevelArg,

    /// Download the asset with this urlUuid (or asset URL)
    #[arg(long, value_name = "ASSET")]
    download_asset: Option<String>,

    /// Directory downloads are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Retries for transient server errors
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Per-request HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 60)]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long, env = "NIRA_DEBUG")]
    debug: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LevelArg {
    Asset,
    Assetversion,
}

impl From<LevelArg> for MetadataLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Asset => MetadataLevel::Asset,
            LevelArg::Assetversion => MetadataLevel::AssetVersion,
        }
    }
}

/// The one thing a single invocation does.
#[derive(Debug, PartialEq)]
enum Action {
    Upload(Vec<PathBuf>),
    UploadSequence(PathBuf),
    ListUpdatedWithin(u64),
    GetJob(u64),
    SetMetadata(String, serde_json::Value),
    GetMetadata(String),
    Download(String),
}

/// Who records are created as.
#[derive(Debug, PartialEq)]
enum ActingUser {
    Id(u64),
    Email(String),
}

impl Args {
    /// `--userid` wins over `--useremail`, which wins over the environment.
    ///
    /// The environment email is only a fallback so that it never clashes
    /// with an explicit `--userid`.
    fn acting_user(&self, env_email: Option<String>) -> anyhow::Result<ActingUser> {
        if let Some(id) = self.userid {
            return Ok(ActingUser::Id(id));
        }
        match self.useremail.clone().or(env_email) {
            Some(email) if !email.trim().is_empty() => Ok(ActingUser::Email(email)),
            _ => bail!("either --useremail (or NIRA_USER_EMAIL) or --userid is required"),
        }
    }

    fn action(&self) -> anyhow::Result<Action> {
        if !self.upload.is_empty() {
            return Ok(Action::Upload(self.upload.clone()));
        }
        if let Some(ref frame) = self.upload_sequence {
            return Ok(Action::UploadSequence(frame.clone()));
        }
        if let Some(secs) = self.list_assets_updated_within {
            return Ok(Action::ListUpdatedWithin(secs));
        }
        if let Some(id) = self.get_job {
            return Ok(Action::GetJob(id));
        }
        if let Some(ref metadata) = self.set_metadata {
            return Ok(Action::SetMetadata(self.asset_ref()?, metadata.clone()));
        }
        if self.get_metadata {
            return Ok(Action::GetMetadata(self.asset_ref()?));
        }
        if let Some(ref asset) = self.download_asset {
            return Ok(Action::Download(url_uuid_from(asset)));
        }
        bail!("no action given")
    }

    fn asset_ref(&self) -> anyhow::Result<String> {
        match self.asset {
            Some(ref asset) => Ok(url_uuid_from(asset)),
            None => bail!("--asset is required for metadata operations"),
        }
    }
}

/// Accept either a bare urlUuid or an asset URL and return the urlUuid.
fn url_uuid_from(asset: &str) -> String {
    let asset = asset.trim();
    let path = asset.split(['?', '#']).next().unwrap_or(asset);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

fn parse_json_object(s: &str) -> Result<serde_json::Value, String> {
    let value: serde_json::Value =
        serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))?;
    if !value.is_object() {
        return Err("metadata must be a JSON object".into());
    }
    Ok(value)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr; stdout carries URLs and JSON for scripts.
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("niraclient={log_level},niracmd={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(args).await
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let action = args.action()?;
    let acting = args.acting_user(std::env::var("NIRA_USER_EMAIL").ok())?;

    let mut builder = ClientBuilder::new()
        .base_url(&args.niraurl)
        .api_key(&args.apikey)
        .max_retries(args.max_retries)
        .timeout(Duration::from_secs(args.timeout));
    if let ActingUser::Email(ref email) = acting {
        builder = builder.user_email(email);
    }
    let mut client = builder.build().context("failed to configure Nira client")?;

    match acting {
        ActingUser::Id(id) => client.set_user_id(id),
        ActingUser::Email(email) => {
            client
                .use_user_email(&email)
                .await
                .with_context(|| format!("failed to look up user {email}"))?;
        }
    }
    tracing::debug!(user_id = ?client.user_id(), action = ?action, "running");

    let upload_opts = UploadOptions {
        asset_name: args.asset_name.clone(),
        ..UploadOptions::default()
    };

    match action {
        Action::Upload(paths) => {
            let info = client
                .upload_asset_with(&paths, &upload_opts)
                .await
                .context("upload failed")?;
            finish_upload(&client, info, args.wait_for_asset_processing)
                .await?
                .print()
        }
        Action::UploadSequence(frame) => {
            let info = client
                .upload_sequence(&frame, &upload_opts)
                .await
                .context("sequence upload failed")?;
            finish_upload(&client, info, args.wait_for_asset_processing)
                .await?
                .print()
        }
        Action::ListUpdatedWithin(secs) => {
            let assets = client
                .get_assets_updated_within(Duration::from_secs(secs))
                .await
                .context("failed to list assets")?;
            let records: Vec<&serde_json::Value> = assets.iter().map(|a| &a.raw).collect();
            print_json(&records)?;
            Ok(ExitCode::SUCCESS)
        }
        Action::GetJob(id) => {
            let job = client
                .get_asset_job(id)
                .await
                .with_context(|| format!("failed to fetch job {id}"))?;
            print_json(&job.raw)?;
            Ok(ExitCode::SUCCESS)
        }
        Action::SetMetadata(asset, metadata) => {
            let resp = client
                .set_metadata(&asset, args.metadata_level.into(), &metadata)
                .await
                .with_context(|| format!("failed to set metadata on {asset}"))?;
            print_json(&resp)?;
            Ok(ExitCode::SUCCESS)
        }
        Action::GetMetadata(asset) => {
            let resp = client
                .get_metadata(&asset, args.metadata_level.into())
                .await
                .with_context(|| format!("failed to get metadata of {asset}"))?;
            print_json(&resp)?;
            Ok(ExitCode::SUCCESS)
        }
        Action::Download(asset) => {
            let path = client
                .download_asset(&asset, &args.output)
                .await
                .with_context(|| format!("failed to download {asset}"))?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// What an upload run prints, and whether it succeeded.
#[derive(Debug, PartialEq)]
struct UploadReport {
    line: String,
    ok: bool,
}

impl UploadReport {
    fn print(self) -> anyhow::Result<ExitCode> {
        println!("{}", self.line);
        Ok(if self.ok {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// The asset URL, optionally after waiting for processing.
///
/// When processing does not succeed the report carries the job status
/// instead and is not ok.
async fn finish_upload(
    client: &Client,
    info: UploadInfo,
    wait_secs: Option<u64>,
) -> anyhow::Result<UploadReport> {
    let Some(secs) = wait_secs.filter(|s| *s > 0) else {
        return Ok(UploadReport {
            line: info.asset_url,
            ok: true,
        });
    };

    let opts = WaitOptions {
        on_progress: Some(Box::new(|job: &AssetJob| {
            tracing::debug!(job_id = job.id, status = %job.status, "waiting for processing");
        })),
        ..WaitOptions::with_timeout(Duration::from_secs(secs))
    };
    let status = client
        .wait_for_asset_processing(info.asset_job_id, &opts)
        .await
        .context("failed while waiting for asset processing")?;

    Ok(if status == JobStatus::Processed {
        UploadReport {
            line: info.asset_url,
            ok: true,
        }
    } else {
        UploadReport {
            line: status.to_string(),
            ok: false,
        }
    })
}
