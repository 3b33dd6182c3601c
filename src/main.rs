//! todo-board CLI
//!
//! Loads the board from the todo API, prints it, and performs single
//! operations (add, move, delete) through the same engine a UI would use.

use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use todo_board::board::{Board, BoardOptions};
use todo_board::cli::{AddArgs, Cli, Command, LoginArgs, MoveArgs, RegisterArgs};
use todo_board::config::Config;
use todo_board::format::{OutputFormat, format_board_json, format_board_markdown};
use todo_board::logging::{self, LogTarget};
use todo_board::remote::{AuthClient, HttpCollection, Registration};
use todo_board::reorder::{MoveDescriptor, Slot};
use todo_board::session::{Session, UserProfile};
use todo_board::types::{NewTodo, Todo};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::load_or_default(cli.config.as_deref().map(Path::new))?;
    if let Some(api_url) = &cli.api_url {
        config.remote.api_url = api_url.clone();
    }
    debug!(api_url = %config.remote.api_url, "Configuration loaded");

    let format = OutputFormat::from_str(&cli.format)
        .ok_or_else(|| anyhow!("Unknown format '{}', expected markdown or json", cli.format))?;

    let mut session = Session::load(&config.session.path)?;

    match cli.command.unwrap_or(Command::Board) {
        Command::Login(args) => login(&config, &mut session, args).await,
        Command::Register(args) => register(&config, args).await,
        Command::Logout => {
            session.sign_out();
            session.save(&config.session.path)?;
            println!("Signed out");
            Ok(())
        }
        command => {
            if !session.is_authenticated() {
                info!("No valid session, requests are sent without credentials");
            }
            let remote = HttpCollection::<Todo>::new(
                &config.remote.api_url,
                &session,
                config.remote.timeout(),
            )?;
            let mut board = Board::new(Arc::new(remote), BoardOptions::from(&config.sync));
            board.load().await?;

            match command {
                Command::Add(args) => add(&mut board, args).await?,
                Command::Move(args) => move_todo(&mut board, args).await?,
                Command::Delete { id } => {
                    board.delete(id).await?;
                    println!("Deleted todo {}", id);
                }
                _ => {}
            }

            print_board(&board, &session, format)
        }
    }
}

async fn login(config: &Config, session: &mut Session, args: LoginArgs) -> Result<()> {
    let mut user = match (args.password, args.token) {
        (_, Some(token)) => UserProfile::new(args.username, token),
        (Some(password), None) => {
            let auth = AuthClient::new(&config.remote.api_url, config.remote.timeout())?;
            auth.login(&args.username, &password).await?
        }
        (None, None) => return Err(anyhow!("Either --password or --token is required")),
    };
    if user.first_name.is_none() {
        user.first_name = args.first_name;
    }
    session.sign_in(user);
    session.save(&config.session.path)?;
    println!("Signed in as {}", session.display_name());
    Ok(())
}

async fn register(config: &Config, args: RegisterArgs) -> Result<()> {
    let auth = AuthClient::new(&config.remote.api_url, config.remote.timeout())?;
    let user = auth
        .register(&Registration {
            username: args.username,
            email: args.email,
            password: args.password,
            first_name: args.first_name,
            last_name: args.last_name,
        })
        .await?;
    println!("Registered {}; sign in with `todo-board login`", user.username);
    Ok(())
}

async fn add(board: &mut Board, args: AddArgs) -> Result<()> {
    let mut draft = NewTodo::new(args.title)
        .with_status(args.status)
        .with_description(args.description);
    if let Some(priority) = args.priority {
        draft = draft.with_priority(priority.into());
    }
    if let Some(due) = args.due {
        draft = draft.with_field("dueDate", serde_json::Value::String(due));
    }

    let todo = board.create(draft).await?;
    println!("Added todo {} to {}", todo.id, todo.status);
    Ok(())
}

async fn move_todo(board: &mut Board, args: MoveArgs) -> Result<()> {
    let (status, index) = board
        .partition()
        .position_of(args.id)
        .ok_or_else(|| anyhow!("Todo {} is not on the board", args.id))?;

    let mv = MoveDescriptor::new(Slot::new(status, index), Slot::new(args.status, args.index))
        .with_item(args.id);
    let report = board.handle_move(mv).await?;
    println!(
        "Moved todo {} to {} ({} updates saved)",
        args.id,
        args.status,
        report.succeeded()
    );
    Ok(())
}

fn print_board(board: &Board, session: &Session, format: OutputFormat) -> Result<()> {
    let columns = board.columns();
    match format {
        OutputFormat::Markdown => {
            print!("{}", format_board_markdown(&columns, session.display_name()))
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&format_board_json(&columns))?)
        }
    }
    Ok(())
}
