// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::io::Write;

use clap::Parser;
use cli::{Cli, Commands};
use gatehouse_core::TokenGenerator;
use gatehouse_core::auth::StaticUserProvider;
use gatehouse_core::auth::password::hash_password;
use gatehouse_core::auth::static_users::STATIC_PROVIDER_ID;

mod cli;
mod logging;

fn main() -> Result<()> {
    let _logger = logging::init()?;

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    let args = Cli::parse();
    let mut out = std::io::stdout().lock();

    match &args.command {
        Commands::HashPassword { password } => {
            writeln!(out, "{}", hash_password(password)?)?;
        }
        Commands::CheckUsers { file } => {
            let users = StaticUserProvider::from_file(STATIC_PROVIDER_ID, file)?;
            if users.is_empty() {
                log::warn!("{} defines no users", file.display());
            }
            writeln!(out, "{} users in {}", users.len(), file.display())?;
        }
        Commands::GenerateToken => {
            writeln!(out, "{}", TokenGenerator::new()?.generate())?;
        }
        Commands::Version => {
            writeln!(out, "{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
        }
    }

    Ok(())
}
