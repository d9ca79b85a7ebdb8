/*
 * Command History
 *
 * Bounded history of the lines typed into the shell. Fixed capacity,
 * no heap growth: once full, the oldest entry is dropped for each new one.
 * Blank lines are not recorded, and over-long lines are cut at
 * MAX_LINE_LENGTH bytes (on a character boundary).
 */

use heapless::{Deque, String};

pub const MAX_LINE_LENGTH: usize = 256;
pub const MAX_HISTORY_ENTRIES: usize = 16;

pub struct CommandHistory {
    entries: Deque<String<MAX_LINE_LENGTH>, MAX_HISTORY_ENTRIES>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Record a line
    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let mut entry = String::new();
        for ch in line.chars() {
            if entry.push(ch).is_err() {
                break;
            }
        }

        if self.entries.is_full() {
            // Remove oldest entry if history is full
            self.entries.pop_front();
        }
        let _ = self.entries.push_back(entry);
    }

    /// Entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_oldest_when_full() {
        let mut history = CommandHistory::new();
        for i in 0..MAX_HISTORY_ENTRIES + 2 {
            history.push(&format!("cmd{}", i));
        }
        history.push("   ");

        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries().next(), Some("cmd2"));
        assert_eq!(history.entries().last(), Some("cmd17"));
    }

    #[test]
    fn test_long_lines_are_cut() {
        let mut history = CommandHistory::new();
        history.push(&"x".repeat(MAX_LINE_LENGTH + 10));
        assert_eq!(history.entries().next().map(str::len), Some(MAX_LINE_LENGTH));
    }
}
