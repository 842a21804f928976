// Tai Chat command line: send one prompt and print the streamed answer

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use tai_chat::chat::{self, ChatEvent, SendOutcome, UiSender};
use tai_chat::database::{ChatMessageStatus, DatabaseManager};
use tai_chat::{AppState, ChatOptions};

#[derive(Parser)]
#[command(name = "tai-chat")]
#[command(about = "Send a prompt to OpenRouter and print the answer as it streams", long_about = None)]
struct Cli {
    /// Continue an existing conversation instead of starting a new one
    #[arg(short, long)]
    conversation: Option<String>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Database file (defaults to the platform data directory)
    #[arg(long)]
    database: Option<PathBuf>,

    /// The message to send
    #[arg(required = true)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tai_chat::init_logging();
    let cli = Cli::parse();

    let (events, mut rx) = UiSender::channel();
    let state = match cli.database {
        Some(path) => AppState::open(DatabaseManager::new(path)?, events)?,
        None => AppState::open_default(events)?,
    }
    .with_options(ChatOptions {
        streaming: !cli.no_stream,
        env_overrides: true,
    });

    let response = chat::send_message(&state, cli.conversation, cli.prompt.join(" "))
        .await
        .context("Failed to send message")?;
    log::info!("Conversation {}", response.conversation_id);

    let mut stdout = std::io::stdout();
    let mut printed = 0;

    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::MessageReplaced { message_id, content, status, .. }
                if message_id == response.assistant_message_id =>
            {
                if status == ChatMessageStatus::Error {
                    continue;
                }
                if let Some(new_text) = content.get(printed..) {
                    write!(stdout, "{}", new_text)?;
                    stdout.flush()?;
                    printed = content.len();
                }
            }
            ChatEvent::SendFinished { message_id, outcome, .. }
                if message_id == response.assistant_message_id =>
            {
                writeln!(stdout)?;
                match outcome {
                    SendOutcome::Complete => return Ok(()),
                    SendOutcome::Cancelled => bail!("Cancelled"),
                    SendOutcome::Failed { error } => bail!(error),
                }
            }
            _ => {}
        }
    }

    bail!("Event channel closed before the answer finished")
}
