//! clipboard-bridge - HTTP access to the VM clipboard
//!
//! Runs the bridge service, and also ships the operational tooling around it:
//! a backend probe, a supervisor for a bridge child process, and a small
//! client for the REST API.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipboard_bridge::client::BridgeClient;
use clipboard_bridge::config::ServiceConfig;
use clipboard_bridge::probe::{self, SystemEnvironment};
use clipboard_bridge::protocol::{ClipboardContent, DEFAULT_CONTENT_TYPE};
use clipboard_bridge::supervisor::{Supervisor, SupervisorConfig, DEFAULT_PROGRAM};
use clipboard_bridge::{backend, BridgeServer, ClipboardExecutor};

const LOG_FILE: &str = "clipboard-bridge.log";

/// HTTP bridge to the VM clipboard.
#[derive(Parser, Debug)]
#[command(name = "clipboard-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Directory for the log file (default: ~/.local/share/overlay-companion).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Do not write a log file.
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,

    /// Print the clipboard backend this host would use.
    Probe,

    /// Start/stop a bridge child process with commands read from stdin.
    Supervise {
        /// Bridge executable.
        #[arg(long, default_value = DEFAULT_PROGRAM)]
        program: PathBuf,

        /// Base URL; its port is handed to the child and probed by `test`.
        #[arg(long)]
        url: Option<String>,

        /// API key handed to the child.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Call a running bridge.
    Client {
        /// Bridge base URL.
        #[arg(long)]
        url: Option<String>,

        /// API key.
        #[arg(long)]
        api_key: Option<String>,

        #[command(subcommand)]
        action: ClientAction,
    },
}

#[derive(Subcommand, Debug)]
enum ClientAction {
    /// Print the clipboard content.
    Get,
    /// Replace the clipboard content.
    Set {
        /// New content.
        text: String,
        /// MIME type passed through to the bridge.
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,
    },
    /// Empty the clipboard.
    Clear,
    /// Print the health report.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve);

    let wants_file =
        !args.no_log_file && matches!(command, Command::Serve | Command::Supervise { .. });
    let _guard = init_logging(args.verbose, args.log_json, args.log_dir, wants_file);

    let result = match command {
        Command::Serve => serve().await,
        Command::Probe => {
            println!("{}", probe::detect(&SystemEnvironment));
            Ok(())
        }
        Command::Supervise {
            program,
            url,
            api_key,
        } => supervise(program, url, api_key).await,
        Command::Client {
            url,
            api_key,
            action,
        } => client(url, api_key, action).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Stderr logging, plus a file under the data directory when requested.
fn init_logging(
    verbose: bool,
    json: bool,
    log_dir: Option<PathBuf>,
    file: bool,
) -> Option<WorkerGuard> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let dir = file
        .then(|| log_dir.or_else(|| dirs::data_local_dir().map(|d| d.join("overlay-companion"))))
        .flatten()
        .filter(|dir| match std::fs::create_dir_all(dir) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("log directory {} unusable: {}", dir.display(), e);
                false
            }
        });

    let (file_layer, guard) = match dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    guard
}

async fn serve() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    let kind = probe::detect(&SystemEnvironment);
    tracing::info!(backend = %kind, "Clipboard backend selected");

    let backend = backend::build(kind, config.helper_timeout)
        .context("failed to initialize clipboard backend")?;
    BridgeServer::new(config, ClipboardExecutor::new(backend))
        .run()
        .await?;
    Ok(())
}

fn default_api_key(api_key: Option<String>) -> anyhow::Result<String> {
    Ok(match api_key {
        Some(key) => key,
        None => ServiceConfig::from_env()?.api_key,
    })
}

fn default_url(url: Option<String>) -> anyhow::Result<String> {
    Ok(match url {
        Some(url) => url,
        None => format!("http://127.0.0.1:{}", ServiceConfig::from_env()?.port),
    })
}

async fn supervise(
    program: PathBuf,
    url: Option<String>,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let config = SupervisorConfig {
        program,
        api_key: default_api_key(api_key)?,
        ..SupervisorConfig::default()
    }
    .with_base_url(&default_url(url)?);

    let mut supervisor = Supervisor::new(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Status: {}", supervisor.state());
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "start" => match supervisor.start() {
                Ok(state) => println!("Status: {state}"),
                Err(e) => println!("Status: failed to start: {e}"),
            },
            "stop" => println!("Status: {}", supervisor.stop().await),
            "test" => {
                let probe = supervisor.test();
                tokio::spawn(async move {
                    match probe.await {
                        Ok(report) => println!("Status: {report}"),
                        Err(e) => println!("Status: error: {e}"),
                    }
                });
            }
            "status" => println!("Status: {}", supervisor.state()),
            "quit" | "exit" => break,
            other => println!("unknown command {other:?} (start, stop, test, status, quit)"),
        }
    }

    supervisor.shutdown().await;
    Ok(())
}

async fn client(
    url: Option<String>,
    api_key: Option<String>,
    action: ClientAction,
) -> anyhow::Result<()> {
    let client = BridgeClient::new(default_url(url)?, default_api_key(api_key)?)?;

    match action {
        ClientAction::Get => {
            let content = client.get().await?;
            print!("{}", content.content);
        }
        ClientAction::Set { text, content_type } => {
            let response = client
                .set(&ClipboardContent::with_type(text, content_type))
                .await?;
            println!("{}", response.message.unwrap_or_default());
        }
        ClientAction::Clear => {
            let response = client.clear().await?;
            println!("{}", response.message.unwrap_or_default());
        }
        ClientAction::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }
    Ok(())
}
