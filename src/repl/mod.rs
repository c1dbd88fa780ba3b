//! Interactive chat session
//!
//! One role per session (switchable with `/role`). Questions go through the
//! pipeline; slash commands are handled locally.

pub mod commands;
pub mod input;

use anyhow::Result;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::documents::DocumentId;
use crate::errors::RagError;
use crate::pipeline::{Answer, Pipeline};
use crate::repl::commands::{is_command, show_help, Command};
pub use crate::repl::input::{InputEvent, InputHandler};

/// Chat session coordinator
pub struct ChatSession {
    input: InputHandler,
    pipeline: Arc<Pipeline>,
    role: String,
    questions: usize,
}

impl ChatSession {
    pub fn new(pipeline: Arc<Pipeline>, role: &str, history: Option<PathBuf>) -> Result<Self> {
        let input = match history {
            Some(path) => InputHandler::with_history(path)?,
            None => InputHandler::new()?,
        };

        Ok(ChatSession {
            input,
            pipeline,
            role: role.to_string(),
            questions: 0,
        })
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn show_welcome(&self) {
        println!("{}", "rolerag chat".bold().cyan());
        println!(
            "Signed in as {} ({} documents loaded). Type {} for commands.\n",
            self.role.green(),
            self.pipeline.document_count(),
            "/help".cyan()
        );
        if !self.pipeline.policy().roles().contains(self.role.as_str()) {
            println!(
                "{}",
                format!("Role '{}' is not in the access policy; no documents will match.", self.role)
                    .yellow()
            );
        }
    }

    /// Read-eval-print until `/exit` or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        self.show_welcome();

        loop {
            match self.input.read_line()? {
                InputEvent::Line(line) => {
                    if !self.handle_input(&line).await? {
                        break;
                    }
                }
                InputEvent::Interrupted => {
                    println!("\nUse /exit to quit gracefully");
                }
                InputEvent::Eof => break,
            }
        }

        self.input.save_history()
    }

    /// Handle a line of input; returns false when the session should end
    pub async fn handle_input(&mut self, input: &str) -> Result<bool> {
        if input.trim().is_empty() {
            return Ok(true);
        }

        if !is_command(input) {
            self.questions += 1;
            match self.pipeline.ask(input, &self.role).await {
                Ok(answer) => print_answer(&answer),
                Err(e) => print_error(&e),
            }
            return Ok(true);
        }

        match commands::parse(input) {
            Command::Help => show_help(),
            Command::Exit => {
                println!("{}", "Goodbye!".green());
                return Ok(false);
            }
            Command::Docs => self.show_docs(),
            Command::Stats => self.show_stats(),
            Command::Role { name: None } => println!("Current role: {}", self.role.green()),
            Command::Role { name: Some(name) } => {
                println!("Switched role: {} -> {}", self.role, name.green());
                self.role = name;
            }
            Command::Ingest { path, department } => {
                match self.ingest_file(&path, department.as_deref()).await {
                    Ok(id) => println!("{}", format!("Ingested {} as {}", path.display(), id).green()),
                    Err(e) => print_error(&e),
                }
            }
            Command::Clear => print!("\x1B[2J\x1B[1;1H"),
            Command::Unknown { input } => {
                println!("{}", format!("Unknown command: {}", input).red());
                println!("Type {} for available commands", "/help".cyan());
            }
        }

        Ok(true)
    }

    /// Upload a file as the current role, labelled by its file name
    pub async fn ingest_file(&self, path: &Path, department: Option<&str>) -> crate::Result<DocumentId> {
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RagError::Validation(format!("Invalid file path: {}", path.display())))?;

        let content = tokio::fs::read_to_string(path).await?;
        self.pipeline
            .ingest_as(&self.role, &content, source, department)
            .await
    }

    fn show_docs(&self) {
        let docs = self.pipeline.documents_for(&self.role);
        if docs.is_empty() {
            println!("{}", format!("No documents accessible to {}.", self.role).yellow());
            return;
        }

        println!("\n{}", format!("Documents for {} ({}):", self.role, docs.len()).bold().cyan());
        println!("{}", "=".repeat(60).cyan());
        for doc in docs {
            println!("  {:<8} {:<12} {}", doc.id.to_string().cyan(), doc.department, doc.source);
        }
        println!();
    }

    fn show_stats(&self) {
        let stats = self.pipeline.telemetry().get_stats();

        println!("\n{}", "Session Statistics:".bold().cyan());
        println!("{}", "=".repeat(60).cyan());
        println!("  Role:               {}", self.role.green());
        println!("  Questions asked:    {}", self.questions.to_string().green());
        println!("  Documents loaded:   {}", stats.documents_registered.to_string().green());
        println!("  Queries served:     {}", stats.queries_served.to_string().green());
        println!("  Empty results:      {}", stats.empty_results.to_string().green());
        println!("  Candidates denied:  {}", stats.candidates_denied.to_string().green());
        println!("  Index drift:        {}", stats.candidates_dropped.to_string().green());
        println!();
    }
}

/// Print an answer with its sources
pub fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.answer);
    if !answer.sources.is_empty() {
        println!("{}", "Sources:".bold());
        for source in &answer.sources {
            println!("  - {}", source.dimmed());
        }
        println!();
    }
}

fn print_error(err: &RagError) {
    if err.is_downstream() {
        eprintln!("{} {}", "Service error:".red().bold(), err);
    } else {
        eprintln!("{} {}", "Error:".red().bold(), err);
    }
}
