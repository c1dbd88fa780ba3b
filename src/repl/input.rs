//! Line input for the chat session
//!
//! Readline editing with persistent history.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::DefaultEditor;
use std::path::PathBuf;

const DEFAULT_PROMPT: &str = ">rolerag: ";

/// What a single read produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D
    Eof,
}

/// Readline interface with optional on-disk history
pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
    prompt: String,
}

impl InputHandler {
    pub fn new() -> Result<Self> {
        Ok(InputHandler {
            editor: DefaultEditor::new()?,
            history_path: None,
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    /// Create input handler that loads and saves history at `history_file`
    pub fn with_history(history_file: PathBuf) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;

        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(InputHandler {
            editor,
            history_path: Some(history_file),
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    pub fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
    }

    /// Read one trimmed line; non-empty lines go into history
    pub fn read_line(&mut self) -> Result<InputEvent> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(InputEvent::Line(trimmed.to_string()))
            }
            Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
            Err(ReadlineError::Eof) => Ok(InputEvent::Eof),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    /// Save history to disk
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(ref path) = self.history_path {
            self.editor.save_history(path)?;
        }
        Ok(())
    }

    pub fn history_len(&self) -> usize {
        self.editor.history().len()
    }
}
