use crate::command::{CommandFactory, ExitCode, Invocation};
use crate::external::{ExternalFactory, Launcher};
use crate::session::Session;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the builtins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The interactive filesystem shell.
///
/// The interpreter owns the [`Session`] and a list of [`CommandFactory`] objects
/// that are queried in order to create commands by name. See [`Default`] for the
/// command table included out of the box.
///
/// Example
/// ```
/// use fsh::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let code = sh.execute_line("echo hello world", &mut out).unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self::with_session(Session::new(), commands)
    }

    /// Create an interpreter over an existing session.
    pub fn with_session(session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { session, commands }
    }

    /// The standard command table, delegating unknown names to `launcher`.
    pub fn with_launcher(session: Session, launcher: Rc<dyn Launcher>) -> Self {
        use crate::builtin::*;
        Self::with_session(
            session,
            vec![
                Box::new(Factory::<Ls>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Pwd>::default()),
                Box::new(Factory::<Touch>::default()),
                Box::new(Factory::<Mkdir>::default()),
                Box::new(Factory::<Rm>::default()),
                Box::new(Factory::<Cat>::default()),
                Box::new(Factory::<Echo>::default()),
                Box::new(Factory::<Clear>::default()),
                Box::new(Factory::<Cp>::default()),
                Box::new(Factory::<Mv>::default()),
                Box::new(Factory::<Man>::default()),
                Box::new(Factory::<Chmod>::default()),
                Box::new(Factory::<Stat>::default()),
                Box::new(Factory::<Exit>::default()),
                Box::new(ExternalFactory::new(launcher)),
            ],
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.session.should_exit
    }

    /// The prompt shown before each line: `<current dir>$ `.
    pub fn prompt(&self) -> String {
        format!("{}$ ", self.session.current_dir.display())
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Returns the command's exit code or an error if no factory accepts the
    /// name or writing to `stdout` fails.
    pub fn run(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.session, name, args) {
                debug!(name, ?args, "dispatching");
                return cmd.execute(stdout, &mut self.session);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Tokenize one input line and run it. Blank lines succeed without output.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        match Invocation::parse(line) {
            Some(inv) => self.run(&inv.name, &inv.args(), stdout),
            None => Ok(0),
        }
    }

    /// Interactive Read-Eval-Print Loop on the terminal.
    ///
    /// Runs until `exit` or end of input. Ctrl-C drops the current line; other
    /// read failures are treated as an empty line.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();
        info!(dir = %self.session.current_dir.display(), "shell started");

        while !self.should_exit() {
            let line = match rl.readline(&self.prompt()) {
                Ok(line) => {
                    remember(&mut rl, &line);
                    line
                }
                Err(ReadlineError::Interrupted) => String::new(),
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    warn!(error = %err, "failed to read input line");
                    String::new()
                }
            };
            self.dispatch(&line, &mut stdout);
        }

        info!("shell stopped");
        Ok(())
    }

    /// Same loop as [`Interpreter::repl`] over arbitrary streams, without line
    /// editing. Used when standard input is not a terminal.
    pub fn repl_from(
        &mut self,
        mut input: impl BufRead,
        mut output: impl Write,
    ) -> std::io::Result<()> {
        while !self.should_exit() {
            write!(output, "{}", self.prompt())?;
            output.flush()?;

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "failed to read input line");
                    line.clear();
                }
            }
            self.dispatch(&line, &mut output);
        }
        Ok(())
    }

    fn dispatch(&mut self, line: &str, stdout: &mut dyn Write) {
        if let Err(err) = self.execute_line(line, stdout) {
            warn!(error = %err, line, "command could not be completed");
        }
        if let Err(err) = stdout.flush() {
            warn!(error = %err, "failed to flush output");
        }
    }
}

/// Add a non-blank line to the editor history. A failure is logged and the
/// loop carries on.
fn remember(rl: &mut DefaultEditor, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    if let Err(err) = rl.add_history_entry(line) {
        warn!(error = %err, "failed to record history");
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the full command table (`ls`, `cd`, `pwd`,
    /// `touch`, `mkdir`, `rm`, `cat`, `echo`, `clear`, `cp`, `mv`, `man`,
    /// `chmod`, `stat`, `exit`) and the host process launcher for everything else.
    fn default() -> Self {
        Self::with_launcher(Session::new(), Rc::new(crate::external::HostLauncher))
    }
}
