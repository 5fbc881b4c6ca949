//! icmirror CLI - mirror a local directory into iCloud Drive
//!
//! Signs in (prompting for a two-factor code when the account requires
//! one), resolves the destination folder, and runs the sync engine
//! over the source tree.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use icmirror_core::{RemoteError, RemoteNodeRef, SyncOptions};
use icmirror_drive::Session;
use icmirror_sync::{FsTreeWalker, Mirror, RunSummary};

/// Service name for keyring lookups
const KEYRING_SERVICE: &str = "icmirror";

/// Wrong two-factor codes tolerated before giving up
const MAX_2FA_ATTEMPTS: u32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "icmirror",
    version,
    about = "Mirror a local directory into iCloud Drive"
)]
struct Cli {
    /// Local directory to mirror
    source: PathBuf,

    /// Destination folder in the drive, e.g. "Backups/laptop"
    dest: String,

    /// Apple ID to sign in with
    #[arg(long, env = "ICMIRROR_APPLE_ID")]
    apple_id: String,

    /// Account password; prefer the environment or the keyring over
    /// the flag
    #[arg(long, env = "ICMIRROR_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Keyring entry holding the password (service "icmirror")
    #[arg(long)]
    keyring_item: Option<String>,

    /// Log level
    #[arg(
        long,
        env = "ICMIRROR_LOG_LEVEL",
        default_value = "info",
        value_parser = ["debug", "info", "warning", "error"]
    )]
    log_level: String,

    /// How many sync tasks run per batch
    #[arg(long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // "warning" is accepted for familiarity; the filter calls it warn.
    let level = match cli.log_level.as_str() {
        "warning" => "warn",
        other => other,
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if !cli.source.is_dir() {
        bail!("source {} is not a directory", cli.source.display());
    }

    let password = resolve_password(&cli)?;
    let root = sign_in(&cli.apple_id, &password).await?;

    let mut options = SyncOptions::default();
    if let Some(jobs) = cli.jobs {
        options = options.with_jobs_batch(jobs);
    }

    let mirror = Mirror::new(root, Arc::new(FsTreeWalker::new()), options);
    let summary = mirror.run(&cli.source, &cli.dest).await?;
    finish(summary)
}

/// Reports the run outcome
///
/// Per-entry failures are already logged by the scheduler and only
/// re-surfaced here as a count; they never affect the exit code. The
/// process fails only when it cannot run at all (bad source,
/// authentication, enumeration).
fn finish(summary: RunSummary) -> Result<()> {
    if summary.failed > 0 {
        error!("{} entries failed to sync, see the log above", summary.failed);
    }
    Ok(())
}

/// Resolves the password from the flag/environment, then the keyring
///
/// Without `--keyring-item` the Apple ID doubles as the entry name, so
/// `keyring set icmirror <apple-id>` works out of the box.
fn resolve_password(cli: &Cli) -> Result<String> {
    if let Some(password) = &cli.password {
        return Ok(password.clone());
    }

    let item = cli.keyring_item.as_deref().unwrap_or(&cli.apple_id);
    let entry = keyring::Entry::new(KEYRING_SERVICE, item)
        .with_context(|| format!("cannot open keyring entry {KEYRING_SERVICE}/{item}"))?;
    match entry.get_password() {
        Ok(password) => Ok(password),
        Err(keyring::Error::NoEntry) => bail!(
            "no password given: use --password, ICMIRROR_PASSWORD, \
             or store one with `keyring set {KEYRING_SERVICE} {item}`"
        ),
        Err(err) => Err(err).context("keyring lookup failed"),
    }
}

/// Signs in, walking the two-factor flow when needed, and returns the
/// drive root
async fn sign_in(apple_id: &str, password: &str) -> Result<RemoteNodeRef> {
    let mut session = Session::builder()
        .build()
        .context("cannot build iCloud session")?;

    session
        .login(apple_id, password)
        .await
        .map_err(auth_failure)?;

    if session.requires_2fa() {
        verify_second_factor(&mut session).await?;

        if !session.is_trusted() {
            // Trust is best-effort: a decline just means the next run
            // prompts for a code again.
            if let Err(err) = session.trust().await {
                warn!("session will not be remembered: {err}");
            }
        }
    }

    session.drive_root().await.map_err(auth_failure)
}

/// Prompts for two-factor codes on stdin until one verifies
async fn verify_second_factor(session: &mut Session) -> Result<()> {
    let mut attempts = 0;
    loop {
        let code = prompt("Two-factor code: ")?;
        if session
            .validate_2fa_code(code.trim())
            .await
            .map_err(auth_failure)?
        {
            info!("two-factor code verified");
            return Ok(());
        }
        attempts += 1;
        if attempts >= MAX_2FA_ATTEMPTS {
            bail!("authentication failed: too many wrong two-factor codes");
        }
        eprintln!("Wrong code, try again.");
    }
}

fn prompt(message: &str) -> Result<String> {
    eprint!("{message}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("cannot read from stdin")?;
    if line.is_empty() {
        bail!("stdin closed while waiting for a two-factor code");
    }
    Ok(line)
}

fn auth_failure(err: RemoteError) -> anyhow::Error {
    match err {
        RemoteError::Auth(message) => anyhow::anyhow!("authentication failed: {message}"),
        other => other.into(),
    }
}
