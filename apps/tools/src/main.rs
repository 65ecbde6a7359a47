use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{Todo, TodoId},
    error::ApiException,
    protocol::validate_title,
};
use storage::{SetCompletedOutcome, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/todos.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Add {
        title: String,
    },
    List,
    Complete {
        id: String,
        #[arg(long)]
        undo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open '{}'", cli.database_url))?;

    match cli.command {
        Command::Add { title } => {
            let title = validate_title(&title).map_err(ApiException::from)?;
            let todo = storage.create_todo(&title).await?;
            println!("{}", describe(&todo.into()));
        }
        Command::List => {
            for todo in storage.list_todos().await? {
                println!("{}", describe(&todo.into()));
            }
        }
        Command::Complete { id, undo } => {
            let id: TodoId = id.parse().with_context(|| format!("invalid todo id '{id}'"))?;
            match storage.set_completed(id, !undo, None).await? {
                SetCompletedOutcome::Applied(todo) => println!("{}", describe(&todo.into())),
                SetCompletedOutcome::NotFound => bail!("todo {id} not found"),
                SetCompletedOutcome::Stale { .. } => bail!("todo {id} changed concurrently"),
            }
        }
    }

    Ok(())
}

fn describe(todo: &Todo) -> String {
    format!(
        "{} [{}] {} (updated {})",
        todo.id,
        if todo.is_completed { "x" } else { " " },
        todo.title,
        todo.updated_at_label()
    )
}
