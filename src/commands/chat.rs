//! Interactive chat client
//!
//! Connects to a running server with the token saved by `creditchat login`,
//! opens the last used chat (creating one on first use) and runs a
//! readline loop. A failed prompt is rolled back and offered again as the
//! initial text of the next line.

use super::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::client::{ApiClient, ClientSyncState, SavedSession};
use crate::config::Config;
use crate::error::{CreditChatError, Result};
use crate::providers::GenerationMode;
use crate::storage::{Message, Role};

use colored::Colorize;
use prettytable::{format, Table};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::time::Duration;

/// Extra client-side patience on top of the server's generation timeout
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

/// Start the interactive chat client
pub async fn run_chat(config: Config) -> Result<()> {
    let mut session = SavedSession::load()?.ok_or_else(|| {
        CreditChatError::Authentication(
            "Not logged in. Run `creditchat login --token <TOKEN>` first".to_string(),
        )
    })?;

    let api = ApiClient::new(
        &config.client.server_url,
        &session.token,
        config.generation.timeout() + CLIENT_TIMEOUT_MARGIN,
    )?;
    let mut state = api.bootstrap(session.last_chat_id.as_deref()).await?;
    remember_chat(&mut session, &state);

    print_welcome(&config, &state);
    print_messages(state.messages());

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("[{} credits] > ", state.balance());
        let line = match rl.readline_with_initial(&prompt, (state.input(), "")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(e) => {
                eprintln!("Error: {:?}", e);
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            state.set_input("");
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        let command = match parse_special_command(trimmed) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                continue;
            }
        };

        let outcome = match command {
            SpecialCommand::Exit => break,
            SpecialCommand::Help => {
                print_help();
                Ok(())
            }
            SpecialCommand::None => {
                send(&api, &mut state, trimmed, GenerationMode::Text, false).await;
                Ok(())
            }
            SpecialCommand::Image { prompt, publish } => {
                send(&api, &mut state, &prompt, GenerationMode::Image, publish).await;
                Ok(())
            }
            SpecialCommand::NewChat => new_chat(&api, &mut state).await,
            SpecialCommand::ListChats => list_chats(&api, &mut state).await,
            SpecialCommand::OpenChat(id) => open_chat(&api, &mut state, &id).await,
            SpecialCommand::DeleteChat(id) => delete_chat(&api, &mut state, id).await,
            SpecialCommand::Balance => match api.user().await {
                Ok(user) => {
                    state.set_balance(user.credits);
                    println!("Balance: {} credits\n", user.credits.to_string().green());
                    Ok(())
                }
                Err(e) => Err(e),
            },
            SpecialCommand::Gallery => show_gallery(&api).await,
        };

        if let Err(e) = outcome {
            eprintln!("{}", format!("Error: {:#}", e).red());
        }
        remember_chat(&mut session, &state);
    }

    println!("Goodbye!");
    Ok(())
}

async fn send(
    api: &ApiClient,
    state: &mut ClientSyncState,
    prompt: &str,
    mode: GenerationMode,
    publish: bool,
) {
    let Some(submission) = state.submit(prompt, mode, publish) else {
        return;
    };

    let before = state.messages().len().saturating_sub(1);
    let failures = api.drive(state, submission).await;

    for failure in &failures {
        eprintln!("{}\n", failure.red());
    }
    let held = state.take_held_prompts();
    if !held.is_empty() {
        println!("{}", "Not sent (queued behind the failed prompt):".yellow());
        for prompt in held {
            println!("  {}", prompt);
        }
        println!();
    }
    if failures.is_empty() {
        print_messages(state.messages().get(before + 1..).unwrap_or_default());
    }
}

async fn new_chat(api: &ApiClient, state: &mut ClientSyncState) -> Result<()> {
    let chat = api.create_chat().await?;
    state.set_chats(api.list_chats().await?);
    println!("{}\n", format!("Started chat {}", short_id(&chat.id)).green());
    state.open_chat(chat.id, chat.messages);
    Ok(())
}

async fn list_chats(api: &ApiClient, state: &mut ClientSyncState) -> Result<()> {
    state.set_chats(api.list_chats().await?);

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for chat in state.chats() {
        let marker = if state.active_chat() == Some(chat.id.as_str()) {
            "*"
        } else {
            ""
        };
        table.add_row(prettytable::row![
            marker,
            short_id(&chat.id).cyan(),
            chat.title,
            chat.message_count,
            chat.updated_at.format("%Y-%m-%d %H:%M").to_string()
        ]);
    }

    table.printstd();
    println!();
    Ok(())
}

async fn open_chat(api: &ApiClient, state: &mut ClientSyncState, id: &str) -> Result<()> {
    let full_id = resolve_chat_id(state, id)?;
    let chat = api.open_chat(&full_id).await?;
    state.open_chat(chat.id, chat.messages);
    print_messages(state.messages());
    Ok(())
}

async fn delete_chat(api: &ApiClient, state: &mut ClientSyncState, id: Option<String>) -> Result<()> {
    let target = match id {
        Some(id) => resolve_chat_id(state, &id)?,
        None => state
            .active_chat()
            .map(str::to_string)
            .ok_or_else(|| CreditChatError::InvalidOperation("No chat is open".to_string()))?,
    };

    api.delete_chat(&target).await?;
    println!("{}\n", format!("Deleted chat {}", short_id(&target)).green());

    match state.remove_chat(&target) {
        Some(next) => {
            let chat = api.open_chat(&next).await?;
            state.open_chat(chat.id, chat.messages);
            print_messages(state.messages());
        }
        None if state.active_chat().is_none() => new_chat(api, state).await?,
        None => {}
    }
    Ok(())
}

async fn show_gallery(api: &ApiClient) -> Result<()> {
    let gallery = api.published_images().await?;
    if gallery.images.is_empty() {
        println!("{}\n", "No published images yet.".yellow());
        return Ok(());
    }
    for image in gallery.images {
        println!("{}  {}", image.owner_name.bold(), image.image_url.cyan());
    }
    println!();
    Ok(())
}

/// Expand a unique id prefix against the known chats
fn resolve_chat_id(state: &ClientSyncState, id: &str) -> Result<String> {
    let matches: Vec<&str> = state
        .chats()
        .iter()
        .map(|c| c.id.as_str())
        .filter(|c| c.starts_with(id))
        .collect();

    match matches.as_slice() {
        [one] => Ok(one.to_string()),
        [] => Ok(id.to_string()),
        _ => Err(CreditChatError::InvalidOperation(format!("Chat id `{}` is ambiguous", id)).into()),
    }
}

fn remember_chat(session: &mut SavedSession, state: &ClientSyncState) {
    let active = state.active_chat().map(str::to_string);
    if session.last_chat_id == active {
        return;
    }
    session.last_chat_id = active;
    if let Err(e) = session.save() {
        tracing::warn!("Failed to remember last chat: {}", e);
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        match message.role {
            Role::User => println!("{} {}", "you:".bold(), message.content),
            Role::Assistant if message.is_image => {
                let tag = if message.is_published { " (published)" } else { "" };
                println!("{} {}{}", "image:".magenta().bold(), message.content.cyan(), tag);
            }
            Role::Assistant => println!("{}\n", message.content),
            Role::System => println!("{}", message.content.dimmed()),
        }
    }
}

fn print_welcome(config: &Config, state: &ClientSyncState) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                CreditChat - Interactive Session              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Server:  {}", config.client.server_url.cyan());
    println!("Balance: {} credits", state.balance().to_string().green());
    if let Some(chat) = state.active_chat() {
        println!("Chat:    {}", short_id(chat).cyan());
    }
    println!("Type '/help' for available commands, 'exit' to quit\n");
}
