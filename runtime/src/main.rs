use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use rentsched::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rentsched",
    about = "Rental schedule acquisition from the branch ERP",
    version,
    after_help = "Configuration is read from RENTSCHED_* environment variables\nor a .env file in the working directory.\nRun 'rentsched doctor' to check it."
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire rental records for the given dates and print them as JSON
    Fetch {
        /// Dates as YYYY-MM-DD, comma-separated or repeated
        #[arg(long, required = true, num_args = 1..)]
        dates: Vec<String>,
        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },
    /// Parse a saved export file offline
    Parse {
        /// Export file (.xls)
        file: PathBuf,
        /// Rental date stamped on every record
        #[arg(long)]
        date: String,
        /// Pretty-print the records
        #[arg(long)]
        pretty: bool,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_logging(json: bool, verbose: bool) -> Result<()> {
    let level = if verbose { "rentsched=debug" } else { "rentsched=info" };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs, cli.verbose)?;

    let result = match cli.command {
        Commands::Fetch { dates, pretty } => cli::fetch_cmd::run(&dates, pretty).await,
        Commands::Parse { file, date, pretty } => cli::parse_cmd::run(&file, &date, pretty),
        Commands::Serve { host, port } => cli::serve_cmd::run(&host, port).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rentsched", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
