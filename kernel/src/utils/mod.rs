/*
 * Kernel Utilities
 *
 * Support code shared by the subsystems: the logging backend and the
 * text shell.
 */

pub mod debug;
pub mod ui;
