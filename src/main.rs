use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use spanbridge::{CallOptions, Session, SessionConfig, StorageClient};

#[derive(Parser)]
#[command(
    name = "spanbridge",
    about = "Inspect and query gRPC span storage plugins",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Endpoint address of the plugin process
    #[arg(
        short,
        long,
        global = true,
        env = "SPANBRIDGE_ENDPOINT",
        default_value = "http://127.0.0.1:4317"
    )]
    endpoint: String,

    /// Enable verbose output (use -vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which optional contracts the plugin implements
    Capabilities {
        /// Emit the capability set as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the service names known to the plugin's reader
    Services,

    /// Fetch one trace by id and print its spans
    GetTrace {
        trace_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let client = connect(&cli.endpoint).await?;

    match cli.command {
        Commands::Capabilities { json } => {
            let caps = client.capabilities();
            if json {
                println!("{}", serde_json::to_string_pretty(&caps)?);
            } else {
                for contract in caps.contracts() {
                    println!("{contract}");
                }
            }
        }
        Commands::Services => {
            let services = client
                .get_services(CallOptions::default())
                .await
                .context("failed to list services")?;
            for service in services {
                println!("{service}");
            }
        }
        Commands::GetTrace { trace_id } => {
            let spans = client
                .get_trace(&trace_id, CallOptions::default())
                .await
                .with_context(|| format!("failed to fetch trace {trace_id}"))?;
            if spans.is_empty() {
                anyhow::bail!("trace not found: {trace_id}");
            }
            for span in spans {
                println!(
                    "{}/{} {} {} ({}ns)",
                    span.trace_id,
                    span.span_id,
                    span.service_name,
                    span.operation_name,
                    span.duration_nanos
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("spanbridge=warn"), // Default: warnings and errors only
        1 => EnvFilter::new("spanbridge=info"), // -v: info messages
        _ => EnvFilter::new("spanbridge=debug"), // -vv or more: full debug
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

async fn connect(endpoint: &str) -> Result<StorageClient> {
    let session = Session::connect(endpoint, SessionConfig::default())
        .await
        .with_context(|| format!("failed to reach plugin at {endpoint}"))?;
    StorageClient::connect(session)
        .await
        .context("capability negotiation failed")
}
