use crate::archives::Archives;
use crate::error::{ErrorKind, Result};
use crate::http;
use airlog_config::Config;
use airlog_library::{Library, Resolution};
use airlog_timekey::HourBucket;
use clap::{ArgAction, Parser, Subcommand};
use exn::ResultExt;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Browse and stream an archive of station recordings.
#[derive(Debug, Parser)]
#[command(name = "airlog", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "PATH", env = "AIRLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Archive to query instead of the configured default
    #[arg(short, long, global = true, value_name = "NAME")]
    pub archive: Option<String>,

    /// Log more (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Log less (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}
impl Cli {
    /// Verbosity relative to the default `info` level.
    pub fn verbosity(&self) -> i8 {
        let verbose = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let quiet = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        verbose.saturating_sub(quiet)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List archives whose root directory exists
    Archives,
    /// List stations
    Stations,
    /// List the hours that have recordings, newest first
    Hours { station: String },
    /// List recordings, newest first, or the recordings of one hour
    Files {
        station: String,
        /// Hour bucket, `YYYY-MM-DDTHH`
        #[arg(long, value_parser = parse_hour)]
        hour: Option<HourBucket>,
    },
    /// Find the recording for an exact minute (`YYYY-MM-DDTHH-MM` or ISO 8601)
    Resolve { station: String, timestamp: String },
    /// Write a recording to standard output
    Cat { station: String, filename: String },
    /// Serve the HTTP API
    Serve {
        /// Address to listen on, overriding the configuration
        #[arg(short, long, value_name = "ADDR")]
        listen: Option<SocketAddr>,
    },
}

fn parse_hour(s: &str) -> std::result::Result<HourBucket, String> {
    HourBucket::parse(s).map_err(|err| (*err).to_string())
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let archives = Arc::new(Archives::from_config(&config)?);
    let context = Context {
        archives,
        archive: cli.archive,
        listen: config.listen,
    };
    let mut stdout = tokio::io::stdout();
    let success = execute(&cli.command, &context, &mut stdout).await?;
    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

struct Context {
    archives: Arc<Archives>,
    /// Archive named on the command line, if any.
    archive: Option<String>,
    /// Configured listen address.
    listen: SocketAddr,
}
impl Context {
    fn library(&self) -> Result<&Library> {
        self.archives.get(self.archive.as_deref())
    }
}

/// Run a command, writing its output to `out`. Returns `false` when the
/// command ran but found nothing.
async fn execute(command: &Command, context: &Context, out: &mut (impl AsyncWrite + Unpin)) -> Result<bool> {
    let library = || context.library();
    let archives = &context.archives;
    match command {
        Command::Archives => write_json(out, &archives.available().await).await?,
        Command::Stations => {
            let stations = library()?.stations().await.or_raise(|| ErrorKind::Query)?;
            write_json(out, &stations).await?;
        },
        Command::Hours { station } => {
            let hours = library()?.available_hours(station).await.or_raise(|| ErrorKind::Query)?;
            write_json(out, &hours).await?;
        },
        Command::Files { station, hour } => {
            let library = library()?;
            let files = match hour {
                Some(hour) => library.files_for_hour(station, hour.as_str()).await,
                None => library.all_files(station).await,
            }
            .or_raise(|| ErrorKind::Query)?;
            write_json(out, &files).await?;
        },
        Command::Resolve { station, timestamp } => {
            let resolution = library()?.search(station, timestamp).await.or_raise(|| ErrorKind::Query)?;
            return match resolution {
                Resolution::Found(recording) => {
                    let url = match context.archive {
                        Some(_) => recording.archive_url(),
                        None => recording.url(),
                    };
                    write_json(out, &json!({ "success": true, "url": url })).await?;
                    Ok(true)
                },
                Resolution::NotFound { .. } => {
                    write_json(out, &json!({ "success": false, "error": "File not found." })).await?;
                    Ok(false)
                },
            };
        },
        Command::Cat { station, filename } => {
            let recording = library()?.open(station, filename).await.or_raise(|| ErrorKind::Query)?;
            let mut reader = recording.into_reader();
            tokio::io::copy(&mut reader, out).await.or_raise(|| ErrorKind::Output)?;
            out.flush().await.or_raise(|| ErrorKind::Output)?;
        },
        Command::Serve { listen } => {
            http::serve(archives.clone(), listen.unwrap_or(context.listen)).await?;
        },
    }
    Ok(true)
}

async fn write_json(out: &mut (impl AsyncWrite + Unpin), value: &impl Serialize) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).or_raise(|| ErrorKind::Output)?;
    bytes.push(b'\n');
    out.write_all(&bytes).await.or_raise(|| ErrorKind::Output)?;
    out.flush().await.or_raise(|| ErrorKind::Output)
}
