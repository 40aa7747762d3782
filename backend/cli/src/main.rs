mod call_cmd;
mod config;
mod keygen_cmd;
mod output;
mod serve_cmd;
mod status_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keygate_core::Method;

use config::Config;

#[derive(Parser)]
#[command(name = "keygate")]
#[command(about = "keygate: signed-call RPC node and client")]
#[command(version)]
struct Cli {
    /// Node config file (default: $KEYGATE_CONFIG or ~/.keygate/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a node with the built-in /status and /echo routes
    Serve {
        /// Port to bind, overriding the config file
        #[arg(short, long)]
        port: Option<u16>,
        /// Let loopback callers skip authentication
        #[arg(long)]
        debug: bool,
    },
    /// Generate a key pair
    Keygen,
    /// Sign and send one call
    Call {
        /// Route to call, e.g. /echo
        function: String,
        /// Call parameters
        params: Vec<String>,
        /// HTTP method: GET, POST, PULL or DELETE
        #[arg(short = 'X', long, default_value = "POST")]
        method: Method,
        /// Node base URL (default: $KEYGATE_URL)
        #[arg(long)]
        url: Option<String>,
        /// Hex private key (default: $KEYGATE_SIGNING_KEY)
        #[arg(long)]
        key: Option<String>,
    },
    /// Query a running node
    Status {
        /// Node base URL (default: $KEYGATE_URL)
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, debug } => {
            let path = cli.config.unwrap_or(env.config_path);
            serve_cmd::run(&path, serve_cmd::ServeOverrides { port, debug }).await?;
            output::note_success("node stopped");
        }
        Commands::Keygen => keygen_cmd::run()?,
        Commands::Call { function, params, method, url, key } => {
            keygate_logging::init_logger(None, "warn", false);
            call_cmd::run(call_cmd::CallArgs {
                url: url.unwrap_or(env.node_url),
                function,
                method,
                params,
                signing_key: key.or(env.signing_key),
            })
            .await?;
        }
        Commands::Status { url } => {
            keygate_logging::init_logger(None, "warn", false);
            status_cmd::run(&url.unwrap_or(env.node_url)).await?;
        }
    }

    Ok(())
}
