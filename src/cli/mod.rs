//! CLI command definitions for todo-board
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::types::{ItemId, Priority, Status};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Todo board client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Base URL of the todo API (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format: markdown or json
    #[arg(short, long, default_value = "markdown", global = true)]
    pub format: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every column of the board (default if no subcommand given)
    Board,

    /// Create a todo
    Add(AddArgs),

    /// Move a todo to a column and position
    Move(MoveArgs),

    /// Delete a todo
    Delete {
        /// Todo id
        id: ItemId,
    },

    /// Sign in and store the session for later commands
    Login(LoginArgs),

    /// Create an account on the server
    Register(RegisterArgs),

    /// Forget stored credentials
    Logout,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Title of the todo
    #[arg(short, long)]
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Column to create the todo in
    #[arg(short, long, default_value = "pending", value_parser = parse_status)]
    pub status: Status,

    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Due date, passed through to the server as-is
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Todo id
    pub id: ItemId,

    /// Destination column
    #[arg(value_parser = parse_status)]
    pub status: Status,

    /// Destination index within the column (0 = top)
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub username: String,

    /// Password, exchanged with the server for a token
    #[arg(short, long, required_unless_present = "token", conflicts_with = "token")]
    pub password: Option<String>,

    /// Store an already issued bearer token instead of signing in
    #[arg(short, long)]
    pub token: Option<String>,

    /// Name to greet with when the server does not supply one
    #[arg(long)]
    pub first_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub username: String,

    #[arg(short, long)]
    pub email: String,

    #[arg(short, long)]
    pub password: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,
}

/// Priority as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

fn parse_status(s: &str) -> Result<Status, String> {
    s.parse()
}
