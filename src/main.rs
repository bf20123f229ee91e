//! filecast binary
//!
//! # Usage
//!
//! ```bash
//! filecast serve --bind 0.0.0.0:8021 --api-bind 0.0.0.0:8081
//! filecast subscribe -c docs --files-dir ./files
//! filecast send -c docs -f ./report.pdf
//! ```

use std::io::{BufRead, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use filecast::client::{send_file, ClientConfig, FileReceiver};
use filecast::{FileServer, OverwritePolicy, RegistryConfig, ServerConfig};

/// Channel-based file relay
#[derive(Parser, Debug)]
#[command(name = "filecast")]
#[command(about = "Relay files to every subscriber of a channel", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay server and its admin API
    Serve {
        /// Address for the line protocol listener
        #[arg(long, env = "FILECAST_BIND", default_value = "0.0.0.0:8021")]
        bind: SocketAddr,

        /// Address for the HTTP admin API
        #[arg(long, env = "FILECAST_API_BIND", default_value = "0.0.0.0:8081")]
        api_bind: SocketAddr,

        /// Do not start the admin API
        #[arg(long)]
        no_api: bool,

        /// Maximum concurrent connections (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        max_connections: usize,

        /// Seconds a client may stay silent while sending its request line
        #[arg(long, default_value_t = 30)]
        read_timeout_secs: u64,

        /// Seconds a single subscriber write may take before eviction
        #[arg(long, default_value_t = 10)]
        write_timeout_secs: u64,

        /// Remove channels left without subscribers for this many seconds
        #[arg(long)]
        empty_channel_ttl_secs: Option<u64>,
    },

    /// Subscribe to a channel and save every received file
    Subscribe {
        /// Channel to subscribe to
        #[arg(short, long)]
        channel: String,

        /// Relay server address
        #[arg(long, env = "FILECAST_SERVER", default_value = "127.0.0.1:8021")]
        server: SocketAddr,

        /// Directory received files are saved under
        #[arg(long, default_value = "./files")]
        files_dir: PathBuf,

        /// Replace existing files without asking
        #[arg(long)]
        overwrite: bool,
    },

    /// Send a file to a channel
    Send {
        /// Target channel
        #[arg(short, long)]
        channel: String,

        /// File to send
        #[arg(short, long)]
        file: PathBuf,

        /// Relay server address
        #[arg(long, env = "FILECAST_SERVER", default_value = "127.0.0.1:8021")]
        server: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("filecast=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            api_bind,
            no_api,
            max_connections,
            read_timeout_secs,
            write_timeout_secs,
            empty_channel_ttl_secs,
        } => {
            let mut config = ServerConfig::with_addr(bind)
                .api_addr(api_bind)
                .max_connections(max_connections)
                .read_timeout(Duration::from_secs(read_timeout_secs));
            if no_api {
                config = config.disable_api();
            }

            let mut registry_config =
                RegistryConfig::default().write_timeout(Duration::from_secs(write_timeout_secs));
            if let Some(ttl) = empty_channel_ttl_secs {
                registry_config = registry_config.empty_channel_ttl(Duration::from_secs(ttl));
            }

            let server = FileServer::with_registry_config(config, registry_config);
            server
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }

        Command::Subscribe {
            channel,
            server,
            files_dir,
            overwrite,
        } => {
            let policy = if overwrite {
                OverwritePolicy::Allow
            } else {
                ask_overwrite()?
            };

            let config = ClientConfig::new(server).files_dir(files_dir).overwrite(policy);
            let summary = FileReceiver::new(config, channel).run().await?;
            println!("{} file(s) saved, {} skipped", summary.saved, summary.skipped);
        }

        Command::Send {
            channel,
            file,
            server,
        } => {
            let envelope = send_file(&ClientConfig::new(server), &channel, &file).await?;
            println!("Sent {} to {}", envelope.file_name(), channel);
        }
    }

    Ok(())
}

/// Ask once whether received files may replace existing ones
///
/// Non-interactive sessions never overwrite.
fn ask_overwrite() -> anyhow::Result<OverwritePolicy> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Ok(OverwritePolicy::Reject);
    }

    print!("Overwrite existing files? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;

    let allow = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    Ok(OverwritePolicy::from_allow(allow))
}
