use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::error::{OperationContext, ShellError};
use crate::fsops::{self, FileReport};
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{self, Write};
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. Every token after the command
/// name is an operand; only a leading `--help` is interpreted by argh.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Minimum operand count together with the wording of the usage error
    /// printed when fewer are given.
    fn required() -> Option<(usize, &'static str)> {
        None
    }

    /// Executes the command, writing its output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                debug!(command = T::name(), error = %e, "builtin failed");
                writeln!(stdout, "{}", e)?;
                Ok(1)
            }
        }
    }
}

/// Stand-in for a builtin whose arguments were rejected (or `--help`).
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        let wants_help = args.first() == Some(&"--help");
        if let Some((count, what)) = T::required() {
            if args.len() < count && !wants_help {
                let usage = ShellError::Usage {
                    command: T::name(),
                    what,
                };
                return Some(Box::new(InvalidArgs {
                    output: format!("{}\n", usage),
                    is_error: true,
                }));
            }
        }
        let operands: Vec<&str> = if wants_help {
            args.to_vec()
        } else {
            std::iter::once("--").chain(args.iter().copied()).collect()
        };
        Some(match T::from_args(&[name], &operands) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// List the entries of the current directory; directories are marked [DIR].
pub struct Ls {
    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let mut entries = fs::read_dir(&session.current_dir)
            .and_then(|dir| dir.collect::<io::Result<Vec<_>>>())
            .operation("Error reading directory")?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let name = entry.file_name();
            let is_dir = entry
                .file_type()
                .operation("Error reading directory")?
                .is_dir();
            if is_dir {
                writeln!(stdout, "[DIR]   {}", name.to_string_lossy())?;
            } else {
                writeln!(stdout, "{}", name.to_string_lossy())?;
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a path argument"))
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let new_dir = session.resolve(&self.target);
        if !new_dir.exists() {
            return Err(ShellError::NotFound {
                what: "Directory",
                name: self.target,
            }
            .into());
        }

        let canonical = fs::canonicalize(&new_dir).operation("Error resolving path")?;
        env::set_current_dir(&canonical).operation("Error changing directory")?;
        debug!(dir = %canonical.display(), "changed directory");
        session.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {
    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create an empty file, truncating it if it already exists.
pub struct Touch {
    #[argh(positional)]
    /// file to create.
    pub file: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Touch {
    fn name() -> &'static str {
        "touch"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a file name"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let path = session.resolve(&self.file);
        fs::File::create(&path).operation("Error creating file")?;
        writeln!(stdout, "File created: {}", path.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create a directory (mode 755). Parent directories must already exist.
pub struct Mkdir {
    #[argh(positional)]
    /// directory to create.
    pub dir: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a directory name"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let path = session.resolve(&self.dir);
        fsops::create_dir(&path).operation("Error creating directory")?;
        writeln!(stdout, "Directory created: {}", path.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove a file or an empty directory. `rm /f NAME` removes NAME recursively.
pub struct Rm {
    #[argh(positional)]
    /// the force flag `/f`, or the file or directory to remove.
    pub first: String,

    #[argh(positional)]
    /// the target when the first operand is `/f`.
    pub rest: Vec<String>,
}

impl Rm {
    /// The flag only counts when it directly follows `rm` and a name follows it.
    fn target(&self) -> (bool, &str) {
        match self.rest.first() {
            Some(name) if self.first == "/f" => (true, name),
            _ => (false, &self.first),
        }
    }
}

impl BuiltinCommand for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a file or directory name"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let (force, name) = self.target();
        let path = session.resolve(name);

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ShellError::NotFound {
                    what: "File or directory",
                    name: name.to_owned(),
                }
                .into());
            }
            Err(e) => {
                return Err(ShellError::operation("Error accessing file or directory", e).into());
            }
        };

        if force {
            if meta.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            }
            .operation("Error force deleting file or directory")?;
            writeln!(stdout, "Force deleted: {}", path.display())?;
        } else if meta.is_dir() {
            fs::remove_dir(&path).operation("Error removing directory")?;
            writeln!(stdout, "Directory removed: {}", path.display())?;
        } else {
            fs::remove_file(&path).operation("Error removing file")?;
            writeln!(stdout, "File removed: {}", path.display())?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the content of a file.
pub struct Cat {
    #[argh(positional)]
    /// file to print.
    pub file: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a file name"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let content = fs::read(session.resolve(&self.file)).operation("Error reading file")?;
        stdout.write_all(&content)?;
        writeln!(stdout)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by spaces.
pub struct Echo {
    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a message"))
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Clear the terminal screen.
pub struct Clear {
    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        write!(stdout, "\x1b[H\x1b[2J")?;
        stdout.flush()?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Copy a file, or a directory tree recursively.
pub struct Cp {
    #[argh(positional)]
    /// file or directory to copy.
    pub source: String,

    #[argh(positional)]
    /// destination path; existing files are overwritten.
    pub dest: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Cp {
    fn name() -> &'static str {
        "cp"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((2, "source and destination"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let src = session.resolve(&self.source);
        let dest = session.resolve(&self.dest);

        let Ok(meta) = fs::metadata(&src) else {
            return Err(ShellError::NotFound {
                what: "Source file or directory",
                name: self.source,
            }
            .into());
        };

        if meta.is_dir() {
            fsops::copy_recursive(&src, &dest).operation("Error copying directory")?;
            writeln!(stdout, "Directory copied: {} to {}", self.source, self.dest)?;
        } else {
            fsops::copy_recursive(&src, &dest).operation("Error copying file")?;
            writeln!(stdout, "File copied: {} to {}", self.source, self.dest)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Move or rename a file or directory.
pub struct Mv {
    #[argh(positional)]
    /// file or directory to move.
    pub source: String,

    #[argh(positional)]
    /// new path.
    pub dest: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Mv {
    fn name() -> &'static str {
        "mv"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((2, "source and destination"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        fs::rename(session.resolve(&self.source), session.resolve(&self.dest))
            .operation("Error moving or renaming")?;
        writeln!(stdout, "Moved/Renamed: {} to {}", self.source, self.dest)?;
        Ok(0)
    }
}

/// One-line manual pages.
fn manual_entry(command: &str) -> Option<&'static str> {
    Some(match command {
        "ls" => "ls: List directory contents",
        "cd" => "cd: Change the current directory",
        "touch" => "touch: Create a new empty file",
        "mkdir" => "mkdir: Create a new directory",
        "rm" => "rm: Remove files or directories",
        "cp" => "cp: Copy files or directories",
        "mv" => "mv: Move or rename files or directories",
        "echo" => "echo: Display a message",
        "clear" => "clear: Clear the terminal screen",
        _ => return None,
    })
}

#[derive(FromArgs)]
/// Show a short description of a command.
pub struct Man {
    #[argh(positional)]
    /// command to describe.
    pub command: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Man {
    fn name() -> &'static str {
        "man"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a command to display help for"))
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        match manual_entry(&self.command) {
            Some(line) => writeln!(stdout, "{}", line)?,
            None => writeln!(stdout, "No manual entry for: {}", self.command)?,
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the permission bits of a file, e.g. `chmod 644 notes.txt`.
pub struct Chmod {
    #[argh(positional)]
    /// permission bits in octal.
    pub mode: String,

    #[argh(positional)]
    /// file or directory to change.
    pub file: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

/// Parse an octal permission string such as `755`.
pub fn parse_mode(mode: &str) -> Result<u32, ShellError> {
    u32::from_str_radix(mode, 8)
        .ok()
        .filter(|bits| *bits <= 0o7777)
        .ok_or_else(|| ShellError::Parse(mode.to_owned()))
}

impl BuiltinCommand for Chmod {
    fn name() -> &'static str {
        "chmod"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((2, "permissions and file name"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let mode = parse_mode(&self.mode)?;
        let path = session.resolve(&self.file);
        fsops::set_mode(&path, mode).operation("Error changing permissions")?;
        writeln!(stdout, "Permissions changed for: {}", path.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Show name, size, permissions, type and modification time of a path.
pub struct Stat {
    #[argh(positional)]
    /// file or directory to inspect.
    pub file: String,

    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Stat {
    fn name() -> &'static str {
        "stat"
    }

    fn required() -> Option<(usize, &'static str)> {
        Some((1, "a file or directory name"))
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let report =
            FileReport::read(&session.resolve(&self.file)).operation("Error retrieving file info")?;
        writeln!(stdout, "{}", report)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional)]
    /// ignored.
    pub _extra: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "Exiting Shell...")?;
        session.should_exit = true;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env as stdenv;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use tempfile::{TempDir, tempdir};

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Restores the process working directory when dropped.
    struct RestoreCwd {
        orig: PathBuf,
        _lock: MutexGuard<'static, ()>,
    }

    impl RestoreCwd {
        fn new() -> Self {
            let _lock = lock_current_dir();
            Self {
                orig: stdenv::current_dir().unwrap(),
                _lock,
            }
        }
    }

    impl Drop for RestoreCwd {
        fn drop(&mut self) {
            let _ = stdenv::set_current_dir(&self.orig);
        }
    }

    fn scratch() -> (TempDir, Session) {
        let tmp = tempdir().unwrap();
        let session = Session::at(tmp.path());
        (tmp, session)
    }

    /// Runs `name args..` through the factory, the same path the interpreter takes.
    fn run(session: &mut Session, name: &str, args: &[&str]) -> (ExitCode, String) {
        macro_rules! try_all {
            ($($ty:ty),*) => {
                None$(.or_else(|| Factory::<$ty>::default().try_create(session, name, args)))*
            };
        }
        let cmd = try_all!(
            Ls, Cd, Pwd, Touch, Mkdir, Rm, Cat, Echo, Clear, Cp, Mv, Man, Chmod, Stat, Exit
        )
        .expect("not a builtin");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, session).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let mut session = Session::at("/var/tmp");
        let (code, out) = run(&mut session, "pwd", &[]);
        assert_eq!(code, 0);
        assert_eq!(out, "/var/tmp\n");
    }

    #[test]
    fn test_echo_joins_with_single_spaces() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "echo", &["a", "b", "c"]);
        assert_eq!(code, 0);
        assert_eq!(out, "a b c\n");
    }

    #[test]
    fn test_echo_keeps_dash_tokens() {
        let (_tmp, mut session) = scratch();
        let (_, out) = run(&mut session, "echo", &["-n", "--verbose", "x"]);
        assert_eq!(out, "-n --verbose x\n");
    }

    #[test]
    fn test_missing_arguments_print_usage() {
        let (_tmp, mut session) = scratch();
        let cases = [
            ("cd", "Error: 'cd' command requires a path argument.\n"),
            ("touch", "Error: 'touch' command requires a file name.\n"),
            ("mkdir", "Error: 'mkdir' command requires a directory name.\n"),
            ("rm", "Error: 'rm' command requires a file or directory name.\n"),
            ("cat", "Error: 'cat' command requires a file name.\n"),
            ("echo", "Error: 'echo' command requires a message.\n"),
            ("cp", "Error: 'cp' command requires source and destination.\n"),
            ("mv", "Error: 'mv' command requires source and destination.\n"),
            ("man", "Error: 'man' command requires a command to display help for.\n"),
            ("chmod", "Error: 'chmod' command requires permissions and file name.\n"),
            ("stat", "Error: 'stat' command requires a file or directory name.\n"),
        ];
        for (name, expected) in cases {
            let (code, out) = run(&mut session, name, &[]);
            assert_eq!(code, 1, "{name}");
            assert_eq!(out, expected);
        }

        let (_, out) = run(&mut session, "cp", &["only-source"]);
        assert_eq!(out, "Error: 'cp' command requires source and destination.\n");
    }

    #[test]
    fn test_help_flag_prints_description() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "chmod", &["--help"]);
        assert_eq!(code, 0);
        assert!(out.contains("Usage: chmod"), "{out}");
    }

    #[test]
    fn test_ls_marks_directories_and_sorts() {
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("b.txt"), "").unwrap();
        fs::create_dir(tmp.path().join("a_dir")).unwrap();
        fs::write(tmp.path().join("c.txt"), "").unwrap();

        let (code, out) = run(&mut session, "ls", &[]);
        assert_eq!(code, 0);
        assert_eq!(out, "[DIR]   a_dir\nb.txt\nc.txt\n");
    }

    #[test]
    fn test_ls_unreadable_dir_reports_error() {
        let (tmp, _) = scratch();
        let mut session = Session::at(tmp.path().join("gone"));
        let (code, out) = run(&mut session, "ls", &[]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error reading directory: "), "{out}");
    }

    #[test]
    fn test_mkdir_then_cd_updates_session() {
        let _cwd = RestoreCwd::new();
        let (tmp, mut session) = scratch();

        let (_, out) = run(&mut session, "mkdir", &["d"]);
        assert_eq!(out, format!("Directory created: {}\n", tmp.path().join("d").display()));

        let (code, _) = run(&mut session, "cd", &["d"]);
        assert_eq!(code, 0);

        let expected = fs::canonicalize(tmp.path().join("d")).unwrap();
        assert_eq!(session.current_dir, expected);
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), expected);
    }

    #[test]
    fn test_cd_parent_is_normalized() {
        let _cwd = RestoreCwd::new();
        let (tmp, mut session) = scratch();
        fs::create_dir(tmp.path().join("inner")).unwrap();
        session.current_dir = tmp.path().join("inner");

        run(&mut session, "cd", &[".."]);
        assert_eq!(session.current_dir, fs::canonicalize(tmp.path()).unwrap());
    }

    #[test]
    fn test_cd_nonexistent_path_leaves_session() {
        let _cwd = RestoreCwd::new();
        let (tmp, mut session) = scratch();
        let orig = stdenv::current_dir().unwrap();

        let (code, out) = run(&mut session, "cd", &["nope"]);
        assert_eq!(code, 1);
        assert_eq!(out, "Error: Directory does not exist: nope\n");
        assert_eq!(session.current_dir, tmp.path());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_into_file_fails() {
        let _cwd = RestoreCwd::new();
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("plain"), "").unwrap();

        let (code, out) = run(&mut session, "cd", &["plain"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error changing directory: "), "{out}");
        assert_eq!(session.current_dir, tmp.path());
    }

    #[test]
    fn test_touch_creates_and_truncates() {
        let (tmp, mut session) = scratch();
        let path = tmp.path().join("f.txt");
        fs::write(&path, "old content").unwrap();

        let (code, out) = run(&mut session, "touch", &["f.txt"]);
        assert_eq!(code, 0);
        assert_eq!(out, format!("File created: {}\n", path.display()));
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_touch_then_stat_reports_empty_file() {
        let (_tmp, mut session) = scratch();
        run(&mut session, "touch", &["f"]);

        let (code, out) = run(&mut session, "stat", &["f"]);
        assert_eq!(code, 0);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name: f");
        assert_eq!(lines[1], "Size: 0 bytes");
        assert_eq!(lines[3], "Is Directory: false");
        assert!(lines[4].starts_with("Last Modified: "));
    }

    #[test]
    fn test_stat_missing_target() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "stat", &["ghost"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error retrieving file info: "), "{out}");
    }

    #[test]
    fn test_mkdir_without_parent_fails() {
        let (tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "mkdir", &["a/b"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error creating directory: "), "{out}");
        assert!(!tmp.path().join("a").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_mkdir_uses_fixed_mode() {
        let (tmp, mut session) = scratch();
        run(&mut session, "mkdir", &["d"]);
        let meta = fs::metadata(tmp.path().join("d")).unwrap();
        assert!(meta.is_dir());
        // umask may only clear bits
        assert_eq!(fsops::permission_bits(&meta) & !0o755, 0);
    }

    #[test]
    fn test_rm_non_empty_dir_needs_force() {
        let (tmp, mut session) = scratch();
        let dir = tmp.path().join("d");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inside.txt"), "x").unwrap();

        let (code, out) = run(&mut session, "rm", &["d"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error removing directory: "), "{out}");
        assert!(dir.exists());

        let (code, out) = run(&mut session, "rm", &["/f", "d"]);
        assert_eq!(code, 0);
        assert_eq!(out, format!("Force deleted: {}\n", dir.display()));
        assert!(!dir.exists());
    }

    #[test]
    fn test_rm_trailing_flag_is_not_force() {
        let (tmp, mut session) = scratch();
        let dir = tmp.path().join("d");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inside.txt"), "x").unwrap();

        let (code, _) = run(&mut session, "rm", &["d", "/f"]);
        assert_eq!(code, 1);
        assert!(dir.exists());
    }

    #[test]
    fn test_rm_file_and_empty_dir() {
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("f"), "x").unwrap();
        fs::create_dir(tmp.path().join("empty")).unwrap();

        let (_, out) = run(&mut session, "rm", &["f"]);
        assert_eq!(out, format!("File removed: {}\n", tmp.path().join("f").display()));
        let (_, out) = run(&mut session, "rm", &["empty"]);
        assert_eq!(out, format!("Directory removed: {}\n", tmp.path().join("empty").display()));
        assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_rm_missing_target() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "rm", &["/f", "ghost"]);
        assert_eq!(code, 1);
        assert_eq!(out, "Error: File or directory does not exist: ghost\n");
    }

    #[test]
    fn test_rm_target_parsing() {
        let rm = |first: &str, rest: &[&str]| Rm {
            first: first.to_string(),
            rest: rest.iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(rm("/f", &["d"]).target(), (true, "d"));
        assert_eq!(rm("d", &["/f"]).target(), (false, "d"));
        assert_eq!(rm("/f", &[]).target(), (false, "/f"));
    }

    #[test]
    fn test_cat_prints_content_with_newline() {
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("note"), "hello\nworld").unwrap();

        let (code, out) = run(&mut session, "cat", &["note"]);
        assert_eq!(code, 0);
        assert_eq!(out, "hello\nworld\n");
    }

    #[test]
    fn test_cat_missing_file() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "cat", &["nothing"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error reading file: "), "{out}");
    }

    #[test]
    fn test_clear_emits_escape_sequence() {
        let (_tmp, mut session) = scratch();
        let (_, out) = run(&mut session, "clear", &[]);
        assert_eq!(out, "\x1b[H\x1b[2J");
    }

    #[test]
    fn test_cp_file_and_directory() {
        let (tmp, mut session) = scratch();
        fs::create_dir_all(tmp.path().join("src/nested")).unwrap();
        fs::write(tmp.path().join("src/nested/a.txt"), "A").unwrap();
        fs::write(tmp.path().join("one.txt"), "1").unwrap();

        let (_, out) = run(&mut session, "cp", &["one.txt", "two.txt"]);
        assert_eq!(out, "File copied: one.txt to two.txt\n");
        assert_eq!(fs::read_to_string(tmp.path().join("two.txt")).unwrap(), "1");

        let (_, out) = run(&mut session, "cp", &["src", "copy"]);
        assert_eq!(out, "Directory copied: src to copy\n");
        assert_eq!(
            fs::read_to_string(tmp.path().join("copy/nested/a.txt")).unwrap(),
            "A"
        );
    }

    #[test]
    fn test_cp_onto_same_file_keeps_content() {
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("f"), "precious").unwrap();

        let (code, out) = run(&mut session, "cp", &["f", "./f"]);
        assert_eq!(code, 0);
        assert_eq!(out, "File copied: f to ./f\n");

        run(&mut session, "cp", &["f", "f"]);
        assert_eq!(fs::read_to_string(tmp.path().join("f")).unwrap(), "precious");
    }

    #[test]
    fn test_cp_missing_source() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "cp", &["ghost", "x"]);
        assert_eq!(code, 1);
        assert_eq!(out, "Error: Source file or directory does not exist: ghost\n");
    }

    #[test]
    fn test_mv_renames() {
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("old"), "data").unwrap();

        let (code, out) = run(&mut session, "mv", &["old", "new"]);
        assert_eq!(code, 0);
        assert_eq!(out, "Moved/Renamed: old to new\n");
        assert!(!tmp.path().join("old").exists());
        assert_eq!(fs::read_to_string(tmp.path().join("new")).unwrap(), "data");
    }

    #[test]
    fn test_mv_missing_source() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "mv", &["ghost", "new"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error moving or renaming: "), "{out}");
    }

    #[test]
    fn test_man_known_and_unknown() {
        let (_tmp, mut session) = scratch();
        let (_, out) = run(&mut session, "man", &["mv"]);
        assert_eq!(out, "mv: Move or rename files or directories\n");
        let (_, out) = run(&mut session, "man", &["stat"]);
        assert_eq!(out, "No manual entry for: stat\n");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert!(matches!(parse_mode("9"), Err(ShellError::Parse(_))));
        assert!(matches!(parse_mode("rwx"), Err(ShellError::Parse(_))));
        assert!(matches!(parse_mode("77777"), Err(ShellError::Parse(_))));
    }

    #[test]
    fn test_chmod_invalid_mode() {
        let (tmp, mut session) = scratch();
        fs::write(tmp.path().join("f"), "").unwrap();
        let (code, out) = run(&mut session, "chmod", &["8x", "f"]);
        assert_eq!(code, 1);
        assert_eq!(out, "Error: Invalid permission format.\n");
    }

    #[test]
    fn test_chmod_missing_file() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "chmod", &["644", "ghost"]);
        assert_eq!(code, 1);
        assert!(out.starts_with("Error changing permissions: "), "{out}");
    }

    #[test]
    #[cfg(unix)]
    fn test_chmod_then_stat_reports_bits() {
        let (tmp, mut session) = scratch();
        let path: &Path = &tmp.path().join("f");
        fs::write(path, "").unwrap();

        let (code, out) = run(&mut session, "chmod", &["644", "f"]);
        assert_eq!(code, 0);
        assert_eq!(out, format!("Permissions changed for: {}\n", path.display()));

        let (_, out) = run(&mut session, "stat", &["f"]);
        assert!(out.contains("Permissions: -rw-r--r--\n"), "{out}");
        assert_eq!(fsops::permission_bits(&fs::metadata(path).unwrap()), 0o644);
    }

    #[test]
    fn test_exit_raises_flag() {
        let (_tmp, mut session) = scratch();
        let (code, out) = run(&mut session, "exit", &[]);
        assert_eq!(code, 0);
        assert_eq!(out, "Exiting Shell...\n");
        assert!(session.should_exit);
    }

    #[test]
    fn test_factory_ignores_other_names() {
        let session = Session::at("/");
        assert!(Factory::<Pwd>::default().try_create(&session, "PWD", &[]).is_none());
    }
}
