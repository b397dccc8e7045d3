use crate::models::{ModelInfo, ToolCall};
use colored::*;
use std::io::{self, Write};

/// Writes a streamed content fragment without a trailing newline.
pub fn display_delta(delta: &str) {
    print!("{}", delta);
    let _ = io::stdout().flush();
}

/// Display content received in one piece
pub fn display_content(content: &str) {
    if content.ends_with('\n') {
        print!("{}", content);
    } else {
        println!("{}", content);
    }
}

pub fn display_status(status: &str) {
    eprintln!("{}", format!("[lmchat] {}", status).dimmed());
}

/// Display the tool calls the model requested
pub fn display_tool_calls(tool_calls: &[ToolCall]) {
    println!();
    println!("{}", "Tool calls requested:".cyan().bold());
    for call in tool_calls {
        let id = if call.id.is_empty() { "-" } else { call.id.as_str() };
        println!("  {} {} {}", call.name().cyan(), format!("[{}]", id).dimmed(), call.function.arguments);
    }
}

pub fn display_models(models: &[ModelInfo]) {
    if models.is_empty() {
        println!("{}", "No models reported by the server.".yellow());
        return;
    }

    for model in models {
        let line = model.to_string();
        if model.is_loaded() {
            println!("{} {}", "*".green().bold(), line);
        } else {
            println!("  {}", line);
        }
    }
}

pub fn display_cancelled() {
    println!();
    eprintln!("{}", "Cancelled.".yellow());
}

pub fn display_error(error: &dyn std::fmt::Display) {
    eprintln!("{} {}", "Error:".red(), error);
}
