//! Turns a token sequence into an executable [`CommandChain`].
//!
//! The grammar is flat enough that a straight left-to-right token consumer
//! covers it:
//!
//! ```text
//! chain      := command (chain_op command)*
//! chain_op   := ';' | '&&' | '||'
//! command    := simple ('|' simple)*
//! simple     := word (word | redir)*
//! redir      := ('<' | '>' | '>>') word
//! ```
//!
//! The parser does real work beyond recognizing the grammar: it opens
//! redirection files, creates the pipe pair joining adjacent simple
//! commands, expands aliases on head words and wildcards on argument words.
//! Every descriptor it opens goes straight into an `OwnedFd` inside the
//! plan, so bailing out with an error at any point closes whatever was
//! opened so far.

use std::env;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;

use nix::unistd;
use thiserror::Error;

use crate::alias::AliasStore;
use crate::command::{ChainOp, Command, CommandChain, SimpleCommand};
use crate::lexer;

/// Everything that can go wrong while building the plan.
///
/// Each variant's `Display` form is the user-facing diagnostic.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parse error near '|': no command to pipe from")]
    PipeWithoutCommand,
    #[error("parse error near '|': cannot pipe to multiple commands")]
    PipeAfterOutputRedirect,
    #[error("parse error near '{0}': redirection before any command")]
    RedirectWithoutCommand(String),
    #[error("cannot redirect output to multiple targets")]
    DuplicateOutput,
    #[error("cannot redirect input from multiple sources")]
    DuplicateInput,
    #[error("missing file name after '{0}'")]
    MissingRedirectTarget(String),
    #[error("parse error: expected a command after '|'")]
    IncompletePipeline,
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot create pipe: {0}")]
    Pipe(nix::Error),
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Parses `tokens` into a command chain, resolving aliases from `aliases`.
pub fn parse_tokens(tokens: &[String], aliases: &AliasStore) -> Result<CommandChain, ParseError> {
    Parser {
        tokens,
        pos: 0,
        aliases,
    }
    .parse()
}

const OPERATORS: &[&str] = &["|", ";", "&&", "||", "<", ">", ">>", "&"];

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
    aliases: &'a AliasStore,
}

impl<'a> Parser<'a> {
    fn next_token(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).map(String::as_str);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_token(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn parse(mut self) -> Result<CommandChain, ParseError> {
        let mut chain = CommandChain::default();

        while self.pos < self.tokens.len() {
            let mut command = Command::default();
            let mut simple = SimpleCommand::default();

            while let Some(token) = self.next_token() {
                if let Some(op) = ChainOp::from_token(token) {
                    command.operator = Some(op);
                    break;
                }
                match token {
                    "|" => self.pipe(&mut command, &mut simple)?,
                    ">" | ">>" => self.redirect_output(token, &mut simple)?,
                    "<" => self.redirect_input(&mut simple)?,
                    "&" => command.background = true,
                    t if t.trim().is_empty() => {}
                    word => self.push_word(word, &mut simple)?,
                }
            }

            if simple.name.is_some() {
                command.push_simple(simple);
            } else if simple.input.is_some() || simple.output.is_some() {
                // A pipe ran off the end of the pipeline: `a |` or `a | ; b`.
                return Err(ParseError::IncompletePipeline);
            }

            tracing::debug!(
                simples = command.simples.len(),
                operator = ?command.operator,
                background = command.background,
                "parsed pipeline"
            );
            chain.push(command);
        }

        Ok(chain)
    }

    /// Connects the current simple command to a fresh one through a pipe.
    fn pipe(&mut self, command: &mut Command, simple: &mut SimpleCommand) -> Result<(), ParseError> {
        if simple.name.is_none() {
            return Err(ParseError::PipeWithoutCommand);
        }
        if simple.output.is_some() {
            return Err(ParseError::PipeAfterOutputRedirect);
        }

        let (read_end, write_end) = unistd::pipe().map_err(ParseError::Pipe)?;
        simple.output = Some(write_end);
        command.push_simple(std::mem::take(simple));
        simple.input = Some(read_end);
        Ok(())
    }

    /// Handles `>` and `>>`: opens the target and installs it as the
    /// current simple command's output.
    fn redirect_output(&mut self, op: &str, simple: &mut SimpleCommand) -> Result<(), ParseError> {
        if simple.name.is_none() {
            return Err(ParseError::RedirectWithoutCommand(op.to_string()));
        }
        let target = self.take_redirect_target(op)?;
        if simple.output.is_some() {
            return Err(ParseError::DuplicateOutput);
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).mode(0o644);
        if op == ">>" {
            options.append(true);
        } else {
            options.truncate(true);
        }
        let file = options.open(target).map_err(|source| ParseError::Open {
            path: target.to_string(),
            source,
        })?;
        simple.output = Some(file.into());
        Ok(())
    }

    /// Handles `<`: opens the target read-only and installs it as the
    /// current simple command's input.
    fn redirect_input(&mut self, simple: &mut SimpleCommand) -> Result<(), ParseError> {
        if simple.name.is_none() {
            return Err(ParseError::RedirectWithoutCommand("<".to_string()));
        }
        let target = self.take_redirect_target("<")?;
        if simple.input.is_some() {
            return Err(ParseError::DuplicateInput);
        }

        let file = OpenOptions::new()
            .read(true)
            .open(target)
            .map_err(|source| ParseError::Open {
                path: target.to_string(),
                source,
            })?;
        simple.input = Some(file.into());
        Ok(())
    }

    /// Consumes the filename token following a redirection operator.
    fn take_redirect_target(&mut self, op: &str) -> Result<&'a str, ParseError> {
        match self.peek_token() {
            Some(token) if !OPERATORS.contains(&token) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(ParseError::MissingRedirectTarget(op.to_string())),
        }
    }

    /// Handles an ordinary word: quote stripping, then alias expansion in
    /// head position, otherwise tilde + wildcard expansion.
    fn push_word(&mut self, word: &str, simple: &mut SimpleCommand) -> Result<(), ParseError> {
        let word = lexer::strip_quotes(word);

        // Aliases expand only in command position, and the replacement text
        // is re-tokenized on spaces with no further alias or glob pass.
        if simple.name.is_none() {
            if let Some(replacement) = self.aliases.get(&word) {
                tracing::debug!(alias = %word, %replacement, "expanding alias");
                for token in lexer::tokenize(replacement, ' ') {
                    if !token.trim().is_empty() {
                        simple.push_arg(token);
                    }
                }
                return Ok(());
            }
        }

        for path in expand_word(&word)? {
            simple.push_arg(path);
        }
        Ok(())
    }
}

/// Expands a leading tilde and filename wildcards in `word`.
///
/// A pattern that matches nothing yields the input word unchanged, the way
/// `glob(3)` behaves with `GLOB_NOCHECK`.
fn expand_word(word: &str) -> Result<Vec<String>, ParseError> {
    let expanded = expand_tilde(word);
    if !expanded.contains(['*', '?', '[']) {
        return Ok(vec![expanded]);
    }

    let paths = glob::glob(&expanded).map_err(|source| ParseError::Pattern {
        pattern: expanded.clone(),
        source,
    })?;
    let matches: Vec<String> = paths
        .filter_map(Result::ok)
        .map(|path| path.to_string_lossy().into_owned())
        .collect();

    if matches.is_empty() {
        Ok(vec![expanded])
    } else {
        Ok(matches)
    }
}

/// Replaces a leading `~` (bare or followed by `/`) with `$HOME`.
fn expand_tilde(word: &str) -> String {
    if let Some(rest) = word.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Ok(home) = env::var("HOME") {
                return format!("{home}{rest}");
            }
        }
    }
    word.to_string()
}
