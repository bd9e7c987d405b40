//! Terminal client for the boards service.
//!
//! ```bash
//! boards-cli tree
//! boards-cli create "Q4 planning" --parent 3
//! boards-cli move 7 --parent 2
//! boards-cli move 7            # back to the root level
//! boards-cli targets 7
//! boards-cli delete 3
//! boards-cli watch
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};

use boards::client::{move_targets, render_forest, BoardsClient, SseDecoder, DEFAULT_API_URL};

#[derive(Parser)]
#[command(name = "boards-cli", version, about = "Browse and edit the board hierarchy")]
struct Cli {
    /// Base URL of the boards API.
    #[arg(long, env = "BOARDS_API_URL", default_value = DEFAULT_API_URL)]
    api: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the whole board tree.
    Tree,
    /// Create a board, optionally under a parent.
    Create {
        name: String,
        #[arg(long)]
        parent: Option<i32>,
    },
    /// Delete a board and everything under it.
    Delete { id: i32 },
    /// Move a board under a new parent, or to the root level without one.
    Move {
        id: i32,
        #[arg(long)]
        parent: Option<i32>,
    },
    /// List the boards a board can be moved under.
    Targets { id: i32 },
    /// Print server notifications as they arrive.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = BoardsClient::new(&cli.api);

    match cli.command {
        Command::Tree => {
            let forest = client.list().await?;
            print!("{}", render_forest(&forest));
        }
        Command::Create { name, parent } => {
            let board = client.create(&name, parent).await?;
            println!("Created {} [{}]", board.name, board.id);
        }
        Command::Delete { id } => {
            client.delete(id).await?;
            println!("Deleted board {}", id);
        }
        Command::Move { id, parent } => {
            let board = client.move_board(id, parent).await?;
            match board.parent {
                Some(parent) => println!("Moved {} under {} [{}]", board.name, parent.name, parent.id),
                None => println!("Moved {} to the root level", board.name),
            }
        }
        Command::Targets { id } => {
            let forest = client.list().await?;
            let targets = move_targets(&forest, id);
            if targets.is_empty() {
                println!("No valid targets for board {}", id);
            }
            for target in targets {
                println!("{} [{}]", target.name, target.id);
            }
        }
        Command::Watch => {
            let mut response = client.notifications().await?;
            let mut decoder = SseDecoder::default();
            while let Some(chunk) = response
                .chunk()
                .await
                .context("notification stream interrupted")?
            {
                for notification in decoder.push(&chunk) {
                    println!("{}", notification.message);
                }
            }
        }
    }

    Ok(())
}
