/*
 * User Interface Utilities
 *
 * This module contains the shell and its command history.
 */

pub mod history;
pub mod kshell;

pub use history::CommandHistory;
pub use kshell::{KShell, ShellStatus};
