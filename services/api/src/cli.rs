use crate::commands::{
    run_classifications, run_fields, run_normalize, ClassificationsArgs, FieldsArgs,
    NormalizeArgs,
};
use crate::server;
use bid_intake::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bid-intake-api",
    about = "Resolve takeoff spreadsheets onto the bid form and serve the QA review API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Resolve a key/value field export and print the import report
    Fields(FieldsArgs),
    /// Map a classification export with explicit units and print the import report
    Classifications(ClassificationsArgs),
    /// Show how a single raw key normalizes and resolves
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Fields(args) => run_fields(args),
        Command::Classifications(args) => run_classifications(args),
        Command::Normalize(args) => run_normalize(args),
    }
}
