//! Multi-turn chat command.
//!
//! Every message goes through `ChatService`, so the store replays the
//! recent window of the current conversation into each prompt.

use std::io::Write;
use std::path::PathBuf;

use aurora_conversation::{ChatRequest, ChatService, ConversationContextStore};
use aurora_core::util::truncate_with_ellipsis;
use aurora_core::{LLMProvider, Role};
use tracing::{debug, info};
use uuid::Uuid;

use super::init_common_components;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Conversation to continue (a new one is started if not provided)
    pub conversation_id: Option<String>,
    /// Send every message without history
    pub no_memory: bool,
    /// Optional model override
    pub model: Option<String>,
    /// Number of turns to keep per conversation
    pub max_turns: Option<usize>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components(input.model, input.max_turns)?;
        info!(
            "Chat ready (max_turns={})",
            common.config.conversation.max_turns
        );

        let conversation_id = if input.no_memory {
            None
        } else {
            Some(input.conversation_id.unwrap_or_else(new_conversation_id))
        };

        if let Some(message) = input.message {
            let request = ChatRequest {
                conversation_id,
                message,
            };
            let reply = common.service.send(request).await?;
            println!("{}", reply.reply);
            return Ok(());
        }

        run_interactive(&common.service, conversation_id).await
    }
}

fn new_conversation_id() -> String {
    format!("chat_{}", Uuid::now_v7())
}

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    Help,
    New,
    List,
    History,
    Forget,
    Search(String),
    Export(Option<PathBuf>),
    Unknown(String),
    Message(String),
    Empty,
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if matches!(line, "exit" | "quit" | "q") {
            return Self::Exit;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));

        match name {
            "help" => Self::Help,
            "new" => Self::New,
            "list" => Self::List,
            "history" => Self::History,
            "forget" => Self::Forget,
            "search" => Self::Search(arg.to_string()),
            "export" => Self::Export((!arg.is_empty()).then(|| PathBuf::from(arg))),
            "exit" | "quit" => Self::Exit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

const HELP_TEXT: &str = "\
Commands:
  /new             start a new conversation
  /list            list conversations in this session
  /history         show the remembered turns
  /search <text>   search the current conversation
  /forget          drop the current conversation's history
  /export [path]   write all conversations to a JSON file
  exit | quit | q  leave";

/// Read from stdin and write to stdout until the user exits.
async fn run_interactive<P>(
    service: &ChatService<P>,
    mut conversation_id: Option<String>,
) -> anyhow::Result<()>
where
    P: LLMProvider + Send + Sync,
{
    match &conversation_id {
        Some(id) => println!("=== Conversation: {id} ==="),
        None => println!("=== Chat without memory ==="),
    }
    println!("Type '/help' for commands, 'exit' to end the session.\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        match ReplCommand::parse(&input) {
            ReplCommand::Empty => {}
            ReplCommand::Exit => break,
            ReplCommand::Help => println!("{HELP_TEXT}\n"),
            ReplCommand::New => {
                if conversation_id.is_some() {
                    let id = new_conversation_id();
                    println!("Started conversation {id}\n");
                    conversation_id = Some(id);
                } else {
                    println!("Memory is disabled for this session.\n");
                }
            }
            ReplCommand::List => print_conversations(service.store(), conversation_id.as_deref()),
            ReplCommand::History => match &conversation_id {
                Some(id) => print_history(service.store(), id),
                None => println!("Memory is disabled for this session.\n"),
            },
            ReplCommand::Search(query) => match &conversation_id {
                Some(id) => print_search(service.store(), id, &query),
                None => println!("Memory is disabled for this session.\n"),
            },
            ReplCommand::Forget => {
                if let Some(id) = &conversation_id {
                    service.store().remove(id);
                    println!("Forgot conversation {id}\n");
                }
            }
            ReplCommand::Export(path) => match export(service.store(), path) {
                Ok(path) => println!("Exported conversations to {}\n", path.display()),
                Err(e) => eprintln!("Export failed: {e}\n"),
            },
            ReplCommand::Unknown(name) => println!("Unknown command '/{name}'. Try /help.\n"),
            ReplCommand::Message(message) => {
                let request = ChatRequest {
                    conversation_id: conversation_id.clone(),
                    message,
                };
                match service.send(request).await {
                    Ok(reply) => {
                        println!("\n{}\n", reply.reply);
                        if let Some(usage) = reply.usage {
                            debug!(
                                "Tokens: {} prompt + {} completion = {} total",
                                usage.prompt, usage.completion, usage.total
                            );
                        }
                    }
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
    }

    println!(
        "\nSession ended. {} conversation(s) in memory.",
        service.store().conversation_count()
    );
    Ok(())
}

fn print_conversations(store: &ConversationContextStore, current: Option<&str>) {
    let summaries = store.list_summaries();
    if summaries.is_empty() {
        println!("No conversations yet.\n");
        return;
    }
    for summary in summaries {
        let marker = if current == Some(summary.id.as_str()) { "*" } else { " " };
        println!(
            "{marker} {}  {} ({} messages)\n    {}",
            summary.id, summary.title, summary.message_count, summary.last_message
        );
    }
    println!();
}

fn role_label(store: &ConversationContextStore, role: Role) -> &str {
    store.config().template.label(role)
}

fn print_history(store: &ConversationContextStore, conversation_id: &str) {
    let turns = store.turns(conversation_id);
    if turns.is_empty() {
        println!("No history yet.\n");
        return;
    }
    for turn in turns {
        println!("{}: {}", role_label(store, turn.role), turn.text);
    }
    println!();
}

fn print_search(store: &ConversationContextStore, conversation_id: &str, query: &str) {
    let hits = store.search(conversation_id, query);
    if hits.is_empty() {
        println!("No messages found\n");
        return;
    }
    for hit in hits {
        println!(
            "[{}] {}: {}",
            hit.index,
            role_label(store, hit.turn.role),
            truncate_with_ellipsis(&hit.turn.text, 100)
        );
    }
    println!();
}

fn export(store: &ConversationContextStore, path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let snapshot = store.export();
    let path = path.unwrap_or_else(|| PathBuf::from(snapshot.file_name()));
    std::fs::write(&path, snapshot.to_json_pretty()?)?;
    Ok(path)
}
