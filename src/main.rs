use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use tracing_subscriber::EnvFilter;

use chainsh::Shell;

/// A small command shell with pipes, redirections, chaining operators and
/// aliases. With no argument it reads commands from standard input,
/// interactively when attached to a terminal; with a script path it runs
/// the script line by line.
#[derive(FromArgs, Debug)]
struct Invocation {
    /// script file to execute instead of reading standard input
    #[argh(positional)]
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let invocation: Invocation = argh::from_env();
    let mut shell = Shell::new();

    let result = match &invocation.script {
        Some(path) => shell.run_script(path),
        None if io::stdin().is_terminal() => shell.run_interactive(),
        None => shell.run_noninteractive(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chainsh: {err:#}");
            ExitCode::FAILURE
        }
    }
}
