//! Executes a parsed command chain.
//!
//! `execute_chain` walks the pipelines honoring the short-circuit rules of
//! `;`, `&&` and `||`; `execute_command` runs one pipeline's simple commands
//! in source order, dispatching each to its builtin handler or to
//! fork + exec. The chain is consumed, so every descriptor the parser opened
//! is closed by the time `execute_chain` returns regardless of which
//! commands actually ran.

use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use anyhow::{Context, Result};
use nix::libc;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult};

use crate::command::{ChainOp, Command, CommandChain, ExitCode, SimpleCommand};
use crate::shell::ShellState;

/// Runs a whole chain and returns the exit status of the last command that
/// actually ran.
///
/// The head pipeline always runs. Each following pipeline runs or is
/// skipped according to its predecessor's chaining operator; a skipped
/// pipeline leaves the last status untouched. A malformed chain (empty, or
/// missing an operator between pipelines) yields -1.
pub fn execute_chain(state: &mut ShellState, chain: CommandChain) -> ExitCode {
    if chain.is_empty() {
        tracing::debug!("empty command chain");
        return -1;
    }

    let mut last_status = 0;
    let mut previous_op = None;
    let mut first = true;

    for mut command in chain.commands {
        let run = match (first, previous_op) {
            (true, _) => true,
            (false, Some(ChainOp::Seq)) => true,
            (false, Some(ChainOp::And)) => last_status == 0,
            (false, Some(ChainOp::Or)) => last_status != 0,
            (false, None) => {
                tracing::debug!("missing chaining operator between pipelines");
                return -1;
            }
        };

        if run {
            last_status = execute_command(state, &mut command);
        } else {
            tracing::debug!(operator = ?previous_op, last_status, "skipping pipeline");
        }

        previous_op = command.operator;
        first = false;
        // dropping `command` here closes the fds of skipped pipelines
    }

    last_status
}

/// Runs one pipeline.
///
/// Simple commands run in source order; the first non-zero status aborts
/// the pipeline and becomes its status. After each successful simple
/// command its non-default descriptors are closed so that pipe readers see
/// EOF and redirection files are flushed to disk.
pub fn execute_command(state: &mut ShellState, command: &mut Command) -> ExitCode {
    if command.simples.is_empty() {
        tracing::debug!("refusing to execute an empty pipeline");
        return -1;
    }

    for simple in command.simples.iter_mut() {
        tracing::debug!(name = ?simple.name, "executing simple command");
        let status = match simple.execute(state) {
            Ok(status) => status,
            Err(err) => {
                eprintln!("chainsh: {err:#}");
                -1
            }
        };

        if status != 0 {
            return status;
        }

        // first (and only) closer of this command's pipe ends / files
        drop(simple.input.take());
        drop(simple.output.take());
    }

    0
}

/// The external-process handler: fork, wire descriptors, exec, wait.
///
/// The parent records the child's pid on the simple command and waits for
/// that specific pid. Death by signal is reported as `128 + signo`, the
/// usual shell convention.
pub fn execute_process(simple: &mut SimpleCommand) -> Result<ExitCode> {
    // SAFETY: the child only calls async-signal-safe-ish dup2/exec and
    // exits via _exit on failure; it never returns into the shell loop.
    match unsafe { unistd::fork() }.context("fork")? {
        ForkResult::Child => run_child(simple),
        ForkResult::Parent { child } => {
            simple.pid = Some(child);
            tracing::debug!(name = ?simple.name, pid = %child, "waiting for child");
            match waitpid(child, None).context("waitpid")? {
                WaitStatus::Exited(_, code) => Ok(code),
                WaitStatus::Signaled(_, signal, _) => Ok(128 + signal as i32),
                status => {
                    tracing::debug!(?status, "unexpected wait status");
                    Ok(-1)
                }
            }
        }
    }
}

/// Child-side half of `execute_process`. Never returns.
fn run_child(simple: &SimpleCommand) -> ! {
    let err = match exec_child(simple) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    let name = simple.name.as_deref().unwrap_or("?");
    eprintln!("{name}: {err:#}");
    let _ = io::stderr().flush();
    // SAFETY: plain process exit without running parent-owned destructors.
    unsafe { libc::_exit(1) }
}

/// Installs the child's descriptors over stdin/stdout and execs. Only ever
/// returns on failure.
fn exec_child(simple: &SimpleCommand) -> Result<std::convert::Infallible, anyhow::Error> {
    if let Some(fd) = &simple.input {
        unistd::dup2(fd.as_raw_fd(), libc::STDIN_FILENO).context("dup2 stdin")?;
    }
    if let Some(fd) = &simple.output {
        unistd::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO).context("dup2 stdout")?;
    }

    let name = CString::new(simple.name.clone().unwrap_or_default())?;
    let argv = simple
        .args
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    // execvp performs the PATH search; on success it does not return
    let never = unistd::execvp(&name, &argv)?;
    match never {}
}

/// Saves the shell's stdin/stdout, installs a simple command's descriptors
/// in their place, and restores the originals on drop.
///
/// This is how builtins honor redirection without forking. The redirection
/// descriptors passed in are closed as part of installation; the saved
/// duplicates are closed on restore. Guards are created at most once per
/// builtin invocation, so the save slots are never re-entered.
#[derive(Debug)]
pub struct FdGuard {
    saved_stdin: Option<OwnedFd>,
    saved_stdout: Option<OwnedFd>,
}

impl FdGuard {
    /// Redirects the shell's stdin/stdout to `input`/`output` where given.
    pub fn install(input: Option<OwnedFd>, output: Option<OwnedFd>) -> nix::Result<Self> {
        let mut guard = FdGuard {
            saved_stdin: None,
            saved_stdout: None,
        };

        if let Some(fd) = input {
            let saved = unistd::dup(libc::STDIN_FILENO)?;
            // SAFETY: dup returned a fresh descriptor not owned elsewhere.
            guard.saved_stdin = Some(unsafe { OwnedFd::from_raw_fd(saved) });
            unistd::dup2(fd.as_raw_fd(), libc::STDIN_FILENO)?;
            // `fd` drops here, closing the parser-opened descriptor
        }

        if let Some(fd) = output {
            let _ = io::stdout().flush();
            let saved = unistd::dup(libc::STDOUT_FILENO)?;
            // SAFETY: dup returned a fresh descriptor not owned elsewhere.
            guard.saved_stdout = Some(unsafe { OwnedFd::from_raw_fd(saved) });
            unistd::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO)?;
        }

        Ok(guard)
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        if let Some(saved) = self.saved_stdout.take() {
            let _ = io::stdout().flush();
            let _ = unistd::dup2(saved.as_raw_fd(), libc::STDOUT_FILENO);
            // `saved` drops here, closing the duplicate
        }
        if let Some(saved) = self.saved_stdin.take() {
            let _ = unistd::dup2(saved.as_raw_fd(), libc::STDIN_FILENO);
        }
    }
}
