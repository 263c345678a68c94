//! epiphyte: read and append to a covert message thread
//!
//! Usage:
//!   epiphyte THREAD              - print every message in the thread
//!   epiphyte THREAD MESSAGE...   - append MESSAGE, then print the thread
//!
//! stdout carries only replayed messages; logs go to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use epiphyte_core::config::{EpiphyteConfig, StorageBackend};
use epiphyte_core::{EpiphyteError, Salt, ThreadId};
use epiphyte_storage::Store;
use epiphyte_sync::{Session, SessionOptions};
use tracing::{debug, info};

const LICENSE: &str = "\
MIT License

Copyright (c) 2026 Epiphyte Contributors

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "epiphyte",
    version,
    disable_version_flag = true,
    about = "Covert messaging over public link shorteners",
    long_about = "epiphyte: read and append to an encrypted message thread hidden in key-value records"
)]
struct Cli {
    /// Thread name (shared secret)
    thread: Option<String>,

    /// Message to append; words are joined with single spaces
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    message: Vec<String>,

    /// Path to epiphyte.toml configuration file
    #[arg(long, short = 'c', env = "EPIPHYTE_CONFIG")]
    config: Option<PathBuf>,

    /// Genesis salt (overrides config)
    #[arg(long, short = 's')]
    salt: Option<String>,

    /// Storage backend (overrides config)
    #[arg(long)]
    backend: Option<Backend>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "EPIPHYTE_LOG", default_value = "warn")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "EPIPHYTE_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Shows the license
    #[arg(long, short = 'l')]
    license: bool,

    /// Shows the version
    #[arg(long, short = 'v')]
    version: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum Backend {
    Shortener,
    Fs,
    S3,
}

impl From<Backend> for StorageBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Shortener => StorageBackend::Shortener,
            Backend::Fs => StorageBackend::Fs,
            Backend::S3 => StorageBackend::S3,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.license {
        println!("{LICENSE}");
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("Epiphyte {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    let Some(thread) = cli.thread.as_deref() else {
        // no thread: same as --help
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    };

    init_logging(&cli.log, &cli.log_format);

    let mut stdout = std::io::stdout().lock();
    let result = tokio::select! {
        result = run(&cli, thread, &mut stdout) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Abort");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "command failed");
            eprintln!("{}", describe_failure(&e));
            ExitCode::FAILURE
        }
    }
}

/// Open the thread, append the message if one was given, then print every
/// message. Messages decrypted before a failure are still printed.
async fn run(cli: &Cli, thread: &str, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(cli).await?;
    let store = Store::from_config(&config.storage)?;

    let mut session = Session::new(
        ThreadId::from(thread),
        &Salt::from(config.thread.salt.as_str()),
        store,
        SessionOptions::from_config(&config),
    )?;

    let synced = if cli.message.is_empty() {
        session.pull().await.map(drop)
    } else {
        let message = cli.message.join(" ");
        session.push(message.as_bytes()).await.map(|receipt| {
            info!(
                pulled = receipt.pulled,
                fragments = receipt.fragments,
                "message appended"
            );
        })
    };

    for message in session.messages() {
        writeln!(out, "{}", String::from_utf8_lossy(message))?;
    }
    out.flush()?;

    synced?;
    Ok(())
}

/// Config file plus command-line overrides.
async fn resolve_config(cli: &Cli) -> Result<EpiphyteConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path).await?,
        None => EpiphyteConfig::default(),
    };
    if let Some(salt) = &cli.salt {
        config.thread.salt = salt.clone();
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }
    config.validate()?;
    Ok(config)
}

async fn load_config(path: &Path) -> Result<EpiphyteConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        EpiphyteConfig::from_toml(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    } else {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            path.display()
        );
        Ok(EpiphyteConfig::default())
    }
}

/// The single line printed for a failed run.
fn describe_failure(err: &anyhow::Error) -> String {
    match err.downcast_ref::<EpiphyteError>() {
        Some(EpiphyteError::Connection(_)) => "Error: Connection failed".into(),
        Some(EpiphyteError::Timeout(_)) => "Error: Connection timeout".into(),
        _ => format!("Error: {err}"),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
