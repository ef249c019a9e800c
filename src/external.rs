use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::session::Session;
use anyhow::Result;
use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::rc::Rc;
use tracing::debug;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The process returned this code.
    Code(ExitCode),
    /// The process was killed by this signal number.
    Signal(i32),
}

impl Exit {
    pub fn success(self) -> bool {
        self == Exit::Code(0)
    }

    /// Shell-style exit code; a signal maps to `128 + signal`.
    pub fn code(self) -> ExitCode {
        match self {
            Exit::Code(code) => code,
            Exit::Signal(signal) => 128 + signal,
        }
    }
}

impl From<ExitStatus> for Exit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Exit::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Exit::Signal(signal);
            }
        }
        Exit::Code(-1)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Exit::Code(code) => write!(f, "exit status {}", code),
            Exit::Signal(signal) => match signal_name(signal) {
                Some(name) => write!(f, "signal: {}", name),
                None => write!(f, "signal: signal {}", signal),
            },
        }
    }
}

fn signal_name(signal: i32) -> Option<&'static str> {
    Some(match signal {
        1 => "hangup",
        2 => "interrupt",
        3 => "quit",
        4 => "illegal instruction",
        6 => "aborted",
        8 => "floating point exception",
        9 => "killed",
        11 => "segmentation fault",
        13 => "broken pipe",
        14 => "alarm clock",
        15 => "terminated",
        _ => return None,
    })
}

/// Host capability for running a program to completion.
///
/// The shell never touches `std::process` outside of an implementation of this
/// trait, so the dispatch loop can be exercised with a fake launcher.
pub trait Launcher {
    /// Run `program` with `args` inside `cwd`, block until it exits and report
    /// how it ended. Errors mean the program could not be started at all.
    fn launch(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Exit>;
}

/// Launches real processes, looked up on `PATH`.
///
/// The child inherits the environment together with the shell's stdin,
/// stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostLauncher;

impl Launcher for HostLauncher {
    fn launch(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Exit> {
        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let executable =
            find_command_path(&search_paths, cwd, Path::new(program)).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "executable file not found in $PATH")
            })?;
        debug!(
            program,
            executable = %executable.display(),
            ?args,
            "spawning external command"
        );

        let status = std::process::Command::new(&executable)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        let exit = Exit::from(status);
        debug!(program, %exit, "external command finished");
        Ok(exit)
    }
}

/// Command that is not a builtin.
pub struct ExternalCommand {
    name: String,
    args: Vec<String>,
    launcher: Rc<dyn Launcher>,
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        // Anything buffered must reach the terminal before the child writes.
        stdout.flush()?;
        match self.launcher.launch(&self.name, &self.args, &session.current_dir) {
            Ok(exit) if exit.success() => Ok(0),
            Ok(exit) => {
                writeln!(stdout, "Error executing command '{}': {}", self.name, exit)?;
                Ok(exit.code())
            }
            Err(e) => {
                debug!(name = %self.name, error = %e, "failed to launch external command");
                writeln!(stdout, "Error executing command '{}': {}", self.name, e)?;
                Ok(if e.kind() == io::ErrorKind::NotFound {
                    127
                } else {
                    126
                })
            }
        }
    }
}

/// Catch-all factory: every name reaching it is delegated to the launcher.
///
/// Must be registered after all builtins.
pub struct ExternalFactory {
    launcher: Rc<dyn Launcher>,
}

impl ExternalFactory {
    pub fn new(launcher: Rc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

impl Default for ExternalFactory {
    fn default() -> Self {
        Self::new(Rc::new(HostLauncher))
    }
}

impl CommandFactory for ExternalFactory {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand {
            name: name.to_owned(),
            args: args.iter().map(|x| x.to_string()).collect(),
            launcher: Rc::clone(&self.launcher),
        }))
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returned if it is a file.
/// - Path with more than one component (`bin/tool`, `./tool`): resolved against
///   `cwd` and returned if it is a file.
/// - Single component: each directory in `search_paths` is tried in order.
/// - Empty path: `None`.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return find_by_path(path);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) if !path.starts_with(".") => find_in_path(search_paths, x.as_os_str()),
        _ => find_by_path(&cwd.join(path)),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths).find_map(|dir| find_by_path(&dir.join(cmd)))
}

fn find_by_path(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        Some(path.to_owned())
    } else {
        None
    }
}
