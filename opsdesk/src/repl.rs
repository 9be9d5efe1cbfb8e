//! Line protocol for the console.
//!
//! - Plain lines are sent to the assistant
//! - Lines starting with `#` are commands (new, list, history, open, delete,
//!   help, quit)
//! - Every reply is followed by a one-line audit trail in brackets

use opsdesk_core::id::ConversationId;
use opsdesk_core::{Message, SessionError, SessionManager};
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    New(&'a str),
    List,
    History,
    Open(&'a str),
    Delete(&'a str),
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse(line: &str) -> Command<'_> {
    let Some(rest) = line.strip_prefix('#') else {
        return Command::Say(line);
    };
    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };
    match name {
        "new" => Command::New(argument),
        "list" => Command::List,
        "history" => Command::History,
        "open" => Command::Open(argument),
        "delete" => Command::Delete(argument),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other),
    }
}

fn print_commands() {
    println!("  #new [title]   - Start a new conversation");
    println!("  #list          - List conversations, most recent first");
    println!("  #history       - Show the current conversation");
    println!("  #open <id>     - Switch to a conversation");
    println!("  #delete <id>   - Delete a conversation");
    println!("  #help          - Show this help");
    println!("  #quit          - Exit");
    println!("  (anything else is sent to the assistant)");
}

fn print_message(message: &Message) {
    println!("[{}] {}", message.role, message.content);
}

fn print_reply(message: &Message) {
    println!("{}", message.content);
    if let Some(metadata) = &message.metadata {
        println!("[{}]", metadata.audit_line());
    }
    println!();
}

/// Run the console until `#quit` or end of input.
pub async fn run(session: SessionManager) -> Result<(), SessionError> {
    let mut current = session.create_conversation("Console").await?.id;

    println!("=== OpsDesk ===");
    println!("Conversation: {current}");
    println!();
    println!("Commands:");
    print_commands();
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse(line) {
            Command::Say(text) => match session.send_message(current, text).await {
                Ok(reply) => print_reply(&reply),
                Err(e) => println!("[ERROR] {e}"),
            },
            Command::New(title) => {
                let conversation = session.create_conversation(title).await?;
                current = conversation.id;
                println!("[NEW] {} ({})", conversation.title, conversation.id);
            }
            Command::List => {
                for conversation in session.list_conversations().await? {
                    let marker = if conversation.id == current { "*" } else { " " };
                    println!(
                        "{marker} {}  {}  {}",
                        conversation.id,
                        conversation.updated_at.format("%d/%m/%Y %H:%M"),
                        conversation.title
                    );
                }
            }
            Command::History => match session.list_messages(current).await {
                Ok(messages) => messages.iter().for_each(print_message),
                Err(e) => println!("[ERROR] {e}"),
            },
            Command::Open(raw) => match raw.parse::<ConversationId>() {
                Ok(id) => match session.list_messages(id).await {
                    Ok(messages) => {
                        current = id;
                        println!("[OPENED] {id} ({} messages)", messages.len());
                    }
                    Err(e) => println!("[ERROR] {e}"),
                },
                Err(_) => println!("[ERROR] Usage: #open <conversation id>"),
            },
            Command::Delete(raw) => match raw.parse::<ConversationId>() {
                Ok(id) => {
                    if session.delete_conversation(id).await? {
                        println!("[DELETED] {id}");
                        if id == current {
                            current = session.create_conversation("Console").await?.id;
                            println!("[NEW] Console ({current})");
                        }
                    } else {
                        println!("[ERROR] No conversation {id}");
                    }
                }
                Err(_) => println!("[ERROR] Usage: #delete <conversation id>"),
            },
            Command::Help => {
                println!("[HELP]");
                print_commands();
            }
            Command::Quit => {
                println!("Até logo!");
                break;
            }
            Command::Unknown(name) => {
                println!("[ERROR] Unknown command #{name}. Type #help for help.");
            }
        }
        stdout.flush().ok();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("estoque baixo"), Command::Say("estoque baixo"));
        assert_eq!(parse("#new"), Command::New(""));
        assert_eq!(parse("#new  Plantão de sábado "), Command::New("Plantão de sábado"));
        assert_eq!(parse("#list"), Command::List);
        assert_eq!(parse("#open abc"), Command::Open("abc"));
        assert_eq!(parse("#exit"), Command::Quit);
        assert_eq!(parse("#salvar"), Command::Unknown("salvar"));
    }
}
