mod cli;
mod engine;
mod input;
mod model;
mod orchestrator;
mod preview;
mod summary;
#[cfg(feature = "tui")]
mod tui;
mod validate;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = !args.is_interactive();
    cli::init_logging(&args)?;

    match cli::run(args).await {
        Ok(()) => {
            // Exit explicitly so lingering blocking tasks cannot hold the process open.
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_non_tui {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
