//! Special commands for the interactive chat client
//!
//! Lines starting with `/` are commands; anything else is a text prompt.
//! Command names are case-insensitive, their arguments are kept verbatim.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Commands understood by the chat client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Generate an image from the prompt
    Image {
        /// Prompt text
        prompt: String,
        /// Publish the result to the gallery
        publish: bool,
    },
    /// Create a chat and switch to it
    NewChat,
    /// List chats
    ListChats,
    /// Switch to a chat by id (a unique prefix is enough)
    OpenChat(String),
    /// Delete a chat, the active one by default
    DeleteChat(Option<String>),
    /// Refresh and show the credit balance
    Balance,
    /// Show the public gallery
    Gallery,
    /// Show help
    Help,
    /// Leave the session
    Exit,
    /// Not a command; send the line as a text prompt
    None,
}

/// Parse a line of input
///
/// # Examples
///
/// ```
/// use creditchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert_eq!(parse_special_command("/NEW").unwrap(), SpecialCommand::NewChat);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/image" | "/img" | "/publish" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: name.clone(),
                    usage: format!("{} <prompt>", name),
                });
            }
            Ok(SpecialCommand::Image {
                prompt: arg.to_string(),
                publish: name == "/publish",
            })
        }
        "/new" => Ok(SpecialCommand::NewChat),
        "/chats" | "/list" => Ok(SpecialCommand::ListChats),
        "/open" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/open".to_string(),
                    usage: "/open <chat-id>".to_string(),
                });
            }
            Ok(SpecialCommand::OpenChat(arg.to_string()))
        }
        "/delete" => Ok(SpecialCommand::DeleteChat(
            (!arg.is_empty()).then(|| arg.to_string()),
        )),
        "/balance" | "/credits" => Ok(SpecialCommand::Balance),
        "/gallery" => Ok(SpecialCommand::Gallery),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the chat client
pub fn print_help() {
    use colored::Colorize;

    println!("\n{}", "Commands".bold());
    println!("  {}             Generate an image (2 credits)", "/image <prompt>".cyan());
    println!("  {}           Generate and publish to the gallery", "/publish <prompt>".cyan());
    println!("  {}                        Start a new chat", "/new".cyan());
    println!("  {}                      List your chats", "/chats".cyan());
    println!("  {}                  Switch to another chat", "/open <id>".cyan());
    println!("  {}              Delete a chat (default: current)", "/delete [id]".cyan());
    println!("  {}                    Show your credit balance", "/balance".cyan());
    println!("  {}                    Show published images", "/gallery".cyan());
    println!("  {}                         Leave", "exit".cyan());
    println!("\nAnything else is sent as a text prompt (1 credit).\n");
}
