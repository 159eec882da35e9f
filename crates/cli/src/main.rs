//! oget - download objects from S3-compatible storage
//!
//! ```text
//! oget get s3/bucket/report.csv ./
//! oget get s3/bucket/photos... ./backup/
//! oget get s3/bucket/logs/*.gz ./logs/
//! ```

mod commands;
mod exit_code;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use crate::commands::alias::AliasCommands;
use crate::commands::get::GetArgs;
use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

#[derive(Parser, Debug)]
#[command(name = "oget", version, about, propagate_version = true)]
struct Cli {
    /// Output strict JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress progress and informational output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug details to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download objects to the local filesystem
    Get(GetArgs),

    /// Manage storage aliases
    #[command(subcommand)]
    Alias(AliasCommands),

    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

impl Cli {
    fn output_config(&self) -> OutputConfig {
        OutputConfig {
            json: self.json,
            no_color: self.no_color || std::env::var_os("NO_COLOR").is_some(),
            quiet: self.quiet,
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins
/// over `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let output_config = cli.output_config();
    if output_config.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let code = match cli.command {
        Commands::Get(args) => commands::get::execute(args, output_config).await,
        Commands::Alias(cmd) => commands::alias::execute(cmd, output_config).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "oget", &mut std::io::stdout());
            ExitCode::Success
        }
    };
    code.into()
}
