//! Built-in chat commands
//!
//! Anything that does not start with `/` is treated as a question.

use colored::*;
use std::path::PathBuf;

/// Chat command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    /// List documents readable by the current role
    Docs,
    Stats,
    /// Show the current role, or switch to another
    Role { name: Option<String> },
    /// Upload a file as the current role
    Ingest {
        path: PathBuf,
        department: Option<String>,
    },
    Clear,
    Unknown { input: String },
}

/// Parse input into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let unknown = || Command::Unknown {
        input: input.to_string(),
    };

    let Some(body) = trimmed.strip_prefix('/') else {
        return unknown();
    };

    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(name) = parts.first() else {
        return unknown();
    };

    match name.to_lowercase().as_str() {
        "help" | "h" => Command::Help,
        "exit" | "quit" | "q" => Command::Exit,
        "docs" => Command::Docs,
        "stats" => Command::Stats,
        "role" => Command::Role {
            name: parts.get(1).map(|s| s.to_string()),
        },
        "ingest" | "upload" => match parts.get(1) {
            Some(path) => Command::Ingest {
                path: PathBuf::from(path),
                department: parts.get(2).map(|s| s.to_lowercase()),
            },
            None => unknown(),
        },
        "clear" | "cls" => Command::Clear,
        _ => unknown(),
    }
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}

/// Display help information
pub fn show_help() {
    println!("\n{}", "Available Commands:".bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    let commands = [
        ("/help, /h", "Show this help message"),
        ("/docs", "List documents your role can read"),
        ("/stats", "Show query and access statistics"),
        ("/role [name]", "Show or switch the active role"),
        ("/ingest <path> [dept]", "Upload a .md, .csv or .txt file"),
        ("/clear, /cls", "Clear screen"),
        ("/exit, /quit, /q", "Exit"),
    ];

    for (cmd, desc) in commands {
        println!("  {:<24} {}", cmd.green(), desc);
    }

    println!("\n{}", "Usage:".bold());
    println!("  - Type a question directly (no / prefix)");
    println!("  - Answers only draw on documents your role may read");
    println!("  - Press {} or {} to exit", "Ctrl-D".cyan(), "/exit".cyan());
    println!();
}
