//! Chat management CLI commands: list, history, delete, system prompt.
//!
//! These operate directly on the database, so they work while `serve` is
//! running in another process.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use chatlayer_types::chat::MessageRole;

use crate::state::AppState;

/// List chats, most recently active first.
pub async fn list_chats(state: &AppState, offset: u32, limit: u32, json: bool) -> Result<()> {
    let chats = state.chat_service.list_chats(offset, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!();
        println!("  {} No chats stored yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Chat").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Last activity").fg(Color::White),
    ]);

    for chat in &chats {
        table.add_row(vec![
            Cell::new(chat.chat_id.as_str()).fg(Color::Cyan),
            Cell::new(&chat.title).fg(Color::White),
            Cell::new(chat.message_count.to_string()).fg(Color::White),
            Cell::new(chat.started_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
            Cell::new(chat.updated_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} chat{}",
        style(chats.len()).bold(),
        if chats.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print one chat's messages in chronological order.
pub async fn show_history(
    state: &AppState,
    chat_id: &str,
    offset: u32,
    limit: u32,
    json: bool,
) -> Result<()> {
    let messages = state
        .chat_service
        .history(chat_id, offset, limit)
        .await
        .with_context(|| format!("Failed to load chat '{chat_id}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    println!();
    for msg in &messages {
        let label = match msg.role {
            MessageRole::User => style("You").green().bold(),
            MessageRole::Assistant => style("Assistant").cyan().bold(),
            MessageRole::System => style("System").dim().bold(),
        };
        println!(
            "  {label} {}",
            style(msg.timestamp.format("%Y-%m-%d %H:%M:%S")).dim()
        );
        for line in msg.content.lines() {
            println!("    {line}");
        }
        println!();
    }

    Ok(())
}

/// Delete a chat, confirming first unless `force` or `json`.
pub async fn delete_chat(state: &AppState, chat_id: &str, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete chat '{}' and all its messages?",
                style(chat_id).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = state.chat_service.delete_chat(chat_id).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"chat_id": chat_id, "deleted": deleted})
        );
    } else {
        println!(
            "  {} Chat '{}' deleted ({} messages).",
            style("x").red().bold(),
            chat_id,
            deleted
        );
    }

    Ok(())
}

/// Show the system prompt, or replace it when `new_prompt` is given.
pub async fn system_prompt(
    state: &AppState,
    chat_id: &str,
    new_prompt: Option<&str>,
    json: bool,
) -> Result<()> {
    let message = match new_prompt {
        Some(prompt) => Some(state.chat_service.set_system_prompt(chat_id, prompt).await?),
        None => state.chat_service.system_prompt(chat_id).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }

    match message {
        Some(m) => {
            if new_prompt.is_some() {
                println!("  {} System prompt updated.", style("✓").green().bold());
            }
            println!();
            println!("  {}", m.content);
            println!();
        }
        None => println!(
            "  {} Chat '{}' has no system prompt.",
            style("i").blue().bold(),
            chat_id
        ),
    }

    Ok(())
}
