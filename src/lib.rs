//! chainsh: a small command shell.
//!
//! A line of input flows through three stages. The [`lexer`] splits it
//! into quote-aware tokens, the [`parser`] turns the tokens into a
//! [`command::CommandChain`] with every pipe and redirection descriptor
//! already opened, and the [`executor`] runs the chain, dispatching each
//! simple command to a [`builtin`] handler or to fork + exec.
//!
//! [`shell::Shell`] ties the stages together into interactive, piped and
//! script sessions.

pub mod alias;
pub mod builtin;
pub mod command;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod shell;

pub use shell::{Shell, ShellState};
