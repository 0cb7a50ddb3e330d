//! The shell's read-eval loop and its mutable session state.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::alias::AliasStore;
use crate::command::ExitCode;
use crate::executor;
use crate::lexer;
use crate::parser;

/// Session state threaded through every command: the alias table and the
/// history of entered lines.
#[derive(Debug, Default)]
pub struct ShellState {
    pub aliases: AliasStore,
    pub history: Vec<String>,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One shell session. Owns the state and drives one of the three input
/// modes: an interactive line editor, piped standard input, or a script
/// file.
#[derive(Debug, Default)]
pub struct Shell {
    state: ShellState,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interactive mode: prompt with the current directory, read with line
    /// editing, run until `exit` or end of input. Ctrl-C abandons the
    /// current line; Ctrl-D ends the session.
    pub fn run_interactive(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().context("initialize line editor")?;

        loop {
            let prompt = match std::env::current_dir() {
                Ok(cwd) => format!("{} $ ", cwd.display()),
                Err(_) => "$ ".to_string(),
            };

            match editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(trimmed);
                    if trimmed == "exit" {
                        println!("Exiting shell");
                        break;
                    }
                    self.state.history.push(trimmed.to_string());
                    self.eval_line(trimmed);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err).context("read line"),
            }
        }

        Ok(())
    }

    /// Non-interactive mode: commands arrive on standard input, one per
    /// line, with no prompt and no line editing.
    pub fn run_noninteractive(&mut self) -> Result<()> {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.context("read standard input")?;
            if !self.feed_line(&line) {
                break;
            }
        }
        Ok(())
    }

    /// Script mode: commands come from a file, one per line. A file that
    /// cannot be opened is an error for the caller to report.
    pub fn run_script(&mut self, path: &Path) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("open script {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("read script {}", path.display()))?;
            if !self.feed_line(&line) {
                break;
            }
        }
        Ok(())
    }

    /// Shared per-line handling for the scripted modes. Returns false when
    /// the session should end.
    fn feed_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        if trimmed == "exit" {
            println!("Exiting shell");
            return false;
        }
        self.state.history.push(trimmed.to_string());
        self.eval_line(trimmed);
        true
    }

    /// Tokenizes, parses and executes one line, reporting parse errors on
    /// standard error. Returns the exit status of the line.
    pub fn eval_line(&mut self, line: &str) -> ExitCode {
        let tokens = lexer::tokenize(line, ' ');
        tracing::debug!(?tokens, "tokenized line");

        match parser::parse_tokens(&tokens, &self.state.aliases) {
            Ok(chain) => executor::execute_chain(&mut self.state, chain),
            Err(err) => {
                eprintln!("chainsh: {err}");
                -1
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }
}
