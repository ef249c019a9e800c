//! An interactive shell for everyday filesystem chores.
//!
//! A fixed table of builtins (`ls`, `cd`, `pwd`, `touch`, `mkdir`, `rm`, `cat`,
//! `echo`, `clear`, `cp`, `mv`, `man`, `chmod`, `stat`, `exit`) runs in-process;
//! any other command name is handed to the operating system as an external
//! program.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`],
//! [`session`] and [`external`] expose the traits and types needed to plug in
//! extra commands or a different process launcher.

mod builtin;
pub mod command;
pub mod error;
pub mod external;
pub mod fsops;
mod interpreter;
pub mod session;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
