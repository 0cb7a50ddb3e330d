//! The executable plan built by the parser.
//!
//! One input line parses into a [`CommandChain`]: an ordered sequence of
//! pipelines ([`Command`]) joined by chaining operators, where each pipeline
//! is a sequence of [`SimpleCommand`]s connected head-to-tail by pipes.
//!
//! File descriptors are carried as [`OwnedFd`], so every pipe end and opened
//! redirection file has exactly one owner and is closed when its node is
//! dropped — on normal completion, on a mid-parse error, or when a chain is
//! abandoned half-executed.

use std::fmt;
use std::os::fd::OwnedFd;

use nix::unistd::Pid;

use crate::builtin::BuiltinFn;
use crate::shell::ShellState;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure,
/// mirroring the convention used by POSIX shells.
pub type ExitCode = i32;

/// Binds a simple command to the code that will run it: either a builtin
/// handler resolved by name at parse time, or the fork+exec path.
#[derive(Clone, Copy, Debug, Default)]
pub enum Handler {
    /// An in-process builtin handler.
    Builtin(BuiltinFn),
    /// An external program, launched via fork + exec.
    #[default]
    External,
}

impl Handler {
    /// Resolves the handler for `name` through the builtin registry.
    pub fn for_name(name: &str) -> Self {
        match crate::builtin::lookup(name) {
            Some(f) => Handler::Builtin(f),
            None => Handler::External,
        }
    }
}

/// A single program invocation: a name, its argument vector, and the file
/// descriptors it reads from and writes to.
///
/// `input`/`output` of `None` mean the shell's own stdin/stdout. Anything
/// else (a pipe end or an opened redirection file) is owned by this node
/// and closed when it is dropped or taken.
#[derive(Debug, Default)]
pub struct SimpleCommand {
    /// Program to run; set from the first pushed argument.
    pub name: Option<String>,
    /// Argument vector; position 0 equals `name`.
    pub args: Vec<String>,
    /// Input descriptor, or `None` for the shell's stdin.
    pub input: Option<OwnedFd>,
    /// Output descriptor, or `None` for the shell's stdout.
    pub output: Option<OwnedFd>,
    /// Pid of the spawned child; `None` for builtins or before spawn.
    pub pid: Option<Pid>,
    /// How this command is executed.
    pub handler: Handler,
}

impl SimpleCommand {
    /// Appends an argument; the first one also becomes the command name.
    pub fn push_arg(&mut self, arg: impl Into<String>) {
        let arg = arg.into();
        if self.name.is_none() {
            self.name = Some(arg.clone());
        }
        self.args.push(arg);
    }

    /// Runs this command's handler.
    pub fn execute(&mut self, state: &mut ShellState) -> anyhow::Result<ExitCode> {
        match self.handler {
            Handler::Builtin(f) => f(state, self),
            Handler::External => crate::executor::execute_process(self),
        }
    }
}

/// The operator joining one pipeline to the next in a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainOp {
    /// `;` — run the next pipeline unconditionally.
    Seq,
    /// `&&` — run the next pipeline only if the last status was 0.
    And,
    /// `||` — run the next pipeline only if the last status was non-zero.
    Or,
}

impl ChainOp {
    /// Recognizes a chaining-operator token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ";" => Some(ChainOp::Seq),
            "&&" => Some(ChainOp::And),
            "||" => Some(ChainOp::Or),
            _ => None,
        }
    }
}

impl fmt::Display for ChainOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainOp::Seq => ";",
            ChainOp::And => "&&",
            ChainOp::Or => "||",
        })
    }
}

/// A pipeline: one or more simple commands connected by pipes.
#[derive(Debug, Default)]
pub struct Command {
    /// The piped simple commands, in source order.
    pub simples: Vec<SimpleCommand>,
    /// Trailing `&` was present. Parsed but not acted upon; the core does
    /// no job control.
    pub background: bool,
    /// Operator joining this pipeline to the next one, `None` on the last.
    pub operator: Option<ChainOp>,
}

impl Command {
    /// Finalizes `simple` into this pipeline, binding its handler by name.
    pub fn push_simple(&mut self, mut simple: SimpleCommand) {
        if let Some(name) = &simple.name {
            simple.handler = Handler::for_name(name);
        }
        self.simples.push(simple);
    }
}

/// An ordered sequence of pipelines joined by `;`, `&&`, `||`.
#[derive(Debug, Default)]
pub struct CommandChain {
    pub commands: Vec<Command>,
}

impl CommandChain {
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
