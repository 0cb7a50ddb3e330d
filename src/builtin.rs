//! Built-in commands executed in-process.
//!
//! Builtins share one signature and are resolved through a static registry;
//! any name not found there falls through to the external-process handler.
//! Handlers return their status through `anyhow::Result`; the executor
//! turns an `Err` into a stderr diagnostic and status -1, so handlers are
//! free to `bail!` with a message and a cause chain.
//!
//! Builtins that produce output honor redirections without forking: they
//! install the command's descriptors over the shell's own stdin/stdout for
//! the duration of the call through [`FdGuard`].

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::command::{ExitCode, SimpleCommand};
use crate::executor::FdGuard;
use crate::shell::ShellState;

/// The common handler signature for all builtins.
pub type BuiltinFn = fn(&mut ShellState, &mut SimpleCommand) -> Result<ExitCode>;

/// Registry of builtin commands. Names not listed here dispatch to the
/// external-process handler.
const REGISTRY: &[(&str, BuiltinFn)] = &[
    ("cd", cd),
    ("pwd", pwd),
    ("echo", echo),
    ("exit", exit),
    ("alias", alias),
    ("unalias", unalias),
    ("history", history),
];

/// Looks up the builtin handler registered under `name`.
pub fn lookup(name: &str) -> Option<BuiltinFn> {
    REGISTRY
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, handler)| *handler)
}

/// `cd [path]` — change directory, defaulting to `$HOME`.
///
/// Does not touch file descriptors; it produces no output.
fn cd(_state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    if simple.args.len() > 2 {
        bail!("cd: too many arguments");
    }

    let target = match simple.args.get(1) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env::var("HOME").context("cd: HOME not set")?),
    };

    env::set_current_dir(&target).with_context(|| format!("cd: {}", target.display()))?;
    Ok(0)
}

/// `pwd` — print the current working directory.
fn pwd(_state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    if simple.args.len() > 1 {
        bail!("pwd: too many arguments");
    }

    let cwd = env::current_dir().context("pwd")?;
    let _guard = FdGuard::install(simple.input.take(), simple.output.take())?;
    let mut out = io::stdout();
    writeln!(out, "{}", cwd.display())?;
    out.flush()?;
    Ok(0)
}

/// `echo [args...]` — print the arguments joined by single spaces.
fn echo(_state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    let _guard = FdGuard::install(simple.input.take(), simple.output.take())?;
    let mut out = io::stdout();
    writeln!(out, "{}", simple.args[1..].join(" "))?;
    out.flush()?;
    Ok(0)
}

/// `exit [n]` — terminate the shell process.
///
/// With no argument exits 0; with an all-digits argument exits with that
/// value; anything else is a diagnostic and a non-terminal return.
fn exit(_state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    if simple.args.len() > 2 {
        bail!("exit: too many arguments");
    }

    let code = match simple.args.get(1) {
        None => 0,
        Some(arg) if arg.chars().all(|c| c.is_ascii_digit()) && !arg.is_empty() => {
            match arg.parse::<i32>() {
                Ok(code) => code,
                Err(_) => bail!("exit: {arg}: numeric argument out of range"),
            }
        }
        Some(arg) => bail!("exit: {arg}: numeric argument required"),
    };

    println!("Exiting shell");
    std::process::exit(code)
}

/// `alias [name [text]]` — list, query, or create alias bindings.
fn alias(state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    if simple.args.len() > 3 {
        bail!("alias: too many arguments");
    }

    let _guard = FdGuard::install(simple.input.take(), simple.output.take())?;
    let mut out = io::stdout();
    match simple.args.len() {
        1 => {
            for (name, text) in state.aliases.list() {
                writeln!(out, "{name}='{text}'")?;
            }
        }
        2 => {
            let name = &simple.args[1];
            if let Some(text) = state.aliases.get(name) {
                writeln!(out, "{name}='{text}'")?;
            }
        }
        _ => state.aliases.set(&simple.args[1], &simple.args[2]),
    }
    out.flush()?;
    Ok(0)
}

/// `unalias name` — remove an alias binding.
fn unalias(state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    match simple.args.len() {
        1 => bail!("unalias: too few arguments"),
        2 => {}
        _ => bail!("unalias: too many arguments"),
    }

    let name = &simple.args[1];
    if state.aliases.remove(name).is_none() {
        bail!("unalias: {name}: not found");
    }
    Ok(0)
}

/// `history` — print the line history with 1-based indices.
fn history(state: &mut ShellState, simple: &mut SimpleCommand) -> Result<ExitCode> {
    if simple.args.len() > 1 {
        bail!("history: too many arguments");
    }

    let _guard = FdGuard::install(simple.input.take(), simple.output.take())?;
    let mut out = io::stdout();
    for (index, line) in state.history.iter().enumerate() {
        writeln!(out, "{} {}", index + 1, line)?;
    }
    out.flush()?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_process_state;
    use std::fs;
    use std::os::fd::OwnedFd;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir =
            std::env::temp_dir().join(format!("builtin_test_{}_{}", std::process::id(), nanos));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn simple_with_args(args: &[&str]) -> SimpleCommand {
        let mut simple = SimpleCommand::default();
        for arg in args {
            simple.push_arg(*arg);
        }
        simple
    }

    fn output_to(simple: &mut SimpleCommand, path: &Path) {
        let file = fs::File::create(path).expect("create capture file");
        simple.output = Some(OwnedFd::from(file));
    }

    #[test]
    fn test_lookup_known_and_unknown() {
        assert!(lookup("cd").is_some());
        assert!(lookup("history").is_some());
        assert!(lookup("ls").is_none());
    }

    #[test]
    fn test_cd_changes_directory() {
        let _lock = lock_process_state();
        let orig = env::current_dir().unwrap();
        let dir = make_unique_temp_dir();
        let canonical = fs::canonicalize(&dir).unwrap();

        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["cd", canonical.to_str().unwrap()]);
        assert_eq!(cd(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(fs::canonicalize(env::current_dir().unwrap()).unwrap(), canonical);

        env::set_current_dir(&orig).unwrap();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_cd_nonexistent_fails_and_keeps_cwd() {
        let _lock = lock_process_state();
        let orig = env::current_dir().unwrap();

        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["cd", "/definitely/not/there"]);
        assert!(cd(&mut state, &mut simple).is_err());
        assert_eq!(env::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_too_many_arguments() {
        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["cd", "a", "b"]);
        assert!(cd(&mut state, &mut simple).is_err());
    }

    #[test]
    fn test_echo_writes_to_redirected_output() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir();
        let path = dir.join("echo.out");

        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["echo", "hello", "world"]);
        output_to(&mut simple, &path);
        assert_eq!(echo(&mut state, &mut simple).unwrap(), 0);

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_echo_with_no_args_prints_newline() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir();
        let path = dir.join("echo.out");

        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["echo"]);
        output_to(&mut simple, &path);
        assert_eq!(echo(&mut state, &mut simple).unwrap(), 0);

        assert_eq!(fs::read_to_string(&path).unwrap(), "\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_pwd_prints_cwd() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir();
        let path = dir.join("pwd.out");

        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["pwd"]);
        output_to(&mut simple, &path);
        assert_eq!(pwd(&mut state, &mut simple).unwrap(), 0);

        let expected = format!("{}\n", env::current_dir().unwrap().display());
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_alias_set_query_and_list() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir();
        let mut state = ShellState::new();

        let mut simple = simple_with_args(&["alias", "ll", "ls -l"]);
        assert_eq!(alias(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(state.aliases.get("ll"), Some("ls -l"));

        let path = dir.join("alias.out");
        let mut simple = simple_with_args(&["alias", "ll"]);
        output_to(&mut simple, &path);
        assert_eq!(alias(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ll='ls -l'\n");

        let path = dir.join("alias_list.out");
        let mut simple = simple_with_args(&["alias"]);
        output_to(&mut simple, &path);
        assert_eq!(alias(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ll='ls -l'\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_alias_query_absent_prints_nothing() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir();
        let path = dir.join("alias.out");

        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["alias", "nope"]);
        output_to(&mut simple, &path);
        assert_eq!(alias(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_unalias_removes_binding() {
        let mut state = ShellState::new();
        state.aliases.set("ll", "ls -l");
        let mut simple = simple_with_args(&["unalias", "ll"]);
        assert_eq!(unalias(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(state.aliases.get("ll"), None);
    }

    #[test]
    fn test_unalias_errors() {
        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["unalias"]);
        assert!(unalias(&mut state, &mut simple).is_err());
        let mut simple = simple_with_args(&["unalias", "missing"]);
        assert!(unalias(&mut state, &mut simple).is_err());
    }

    #[test]
    fn test_exit_rejects_non_numeric_argument() {
        let mut state = ShellState::new();
        let mut simple = simple_with_args(&["exit", "abc"]);
        assert!(exit(&mut state, &mut simple).is_err());
        let mut simple = simple_with_args(&["exit", "12x"]);
        assert!(exit(&mut state, &mut simple).is_err());
    }

    #[test]
    fn test_history_prints_indexed_entries() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir();
        let path = dir.join("history.out");

        let mut state = ShellState::new();
        state.history.push("echo one".to_string());
        state.history.push("pwd".to_string());

        let mut simple = simple_with_args(&["history"]);
        output_to(&mut simple, &path);
        assert_eq!(history(&mut state, &mut simple).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1 echo one\n2 pwd\n");
        let _ = fs::remove_dir_all(dir);
    }
}
