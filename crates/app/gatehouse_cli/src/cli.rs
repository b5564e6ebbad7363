use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gatehouse", version, about = "Gatehouse operator tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a bcrypt hash for the `password` field of a user file.
    HashPassword {
        password: String,
    },
    /// Parse a user file and report how many users it defines.
    CheckUsers {
        file: PathBuf,
    },
    /// Print a freshly generated session token.
    GenerateToken,
    /// Print the version.
    Version,
}
