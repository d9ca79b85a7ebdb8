/*
 * Simulator Logging System
 *
 * This module implements the logging backend for the simulated kernel.
 * It plugs into the `log` facade, so every subsystem logs with the usual
 * log::info!/debug!/warn! macros and this backend decides what is printed.
 *
 * Why this is important:
 * - Core workers narrate their dispatches ("[Core 0] Running PID 1 (init)")
 * - Different log levels filter the narration from the internals
 * - Output goes to stderr, keeping stdout for the shell's own output
 *
 * The maximum level can be changed at runtime with set_level().
 */

use std::io::Write;

use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// Logger implementation for the simulator
struct SimLogger;

impl log::Log for SimLogger {
    /// Checks the record against the runtime maximum level.
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    /// Writes the record as one line to stderr.
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_record(record);
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// The SimLogger instance used for logging.
static LOGGER: SimLogger = SimLogger;

/// Render a record the way it is printed
pub fn format_record(record: &Record) -> String {
    format!("[{}] {}", record.level(), record.args())
}

/// Install the logger with an initial maximum level
///
/// Only the first call succeeds; later calls return the error from the
/// `log` crate and leave the installed logger untouched.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

/// Change the maximum level at runtime
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    #[test]
    fn test_format_record() {
        let line = format_record(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("[{}] stalled", "Core 2"))
                .build(),
        );
        assert_eq!(line, "[WARN] [Core 2] stalled");
    }
}
