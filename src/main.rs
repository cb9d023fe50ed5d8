use clap::Parser;
use minisql::repl;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "minisql",
    version = VERSION,
    about = "Tiny persistent single-table SQL database."
)]
struct Cli {
    /// Path to the database file.
    filename: Option<PathBuf>,
    /// File receiving diagnostic logs.
    #[arg(long, env = "MINISQL_LOG_FILE", default_value = "minisql.log")]
    log_file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&cli.log_file)
        .expect("Failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(filename) = cli.filename else {
        println!("Must supply a database filename.");
        std::process::exit(1);
    };

    if let Err(e) = repl::start(&filename) {
        println!("{}", e);
        std::process::exit(1);
    }
}
