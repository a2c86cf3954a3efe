// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::Cli;

mod cli;
mod commands;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::execute(&args))
}
