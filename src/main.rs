//! gitagent-harness - end-to-end exerciser for the gitagent tool server
//!
//! Spawns the server, runs the fixed workflow against every tool, cleans
//! up whatever the run created, and exits 0 only when every check passed.

use std::path::PathBuf;

use clap::Parser;

use harness::common::{logging, Config};
use harness::scenario;

#[derive(Parser)]
#[command(name = "gitagent-harness", about = "End-to-end test harness for the gitagent tool server")]
#[command(version, long_about = None)]
struct Cli {
    /// Path to the server binary (falls back to $GITAGENT_MCP_BIN)
    server: Option<PathBuf>,

    /// Path to the target repository (falls back to $REPO_PATH)
    repo: Option<PathBuf>,

    /// Log every wire message
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match Config::resolve(cli.server, cli.repo) {
        Ok(config) => scenario::run_harness(&config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
