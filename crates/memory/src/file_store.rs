//! File-based history persistence — JSON-lines storage.
//!
//! Each line is a JSON-encoded [`ConversationTurn`], oldest first. The
//! file is human-inspectable and survives process restarts.

use ponder_core::error::HistoryError;
use ponder_core::message::ConversationTurn;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A JSONL file holding one conversation history.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load turns from disk.
    ///
    /// A missing file is an empty history. Lines that are not valid UTF-8
    /// or fail to parse are skipped with a warning. Any other read failure
    /// is an error, so the caller never mistakes an unreadable file for an
    /// empty one.
    pub fn load(&self) -> Result<Vec<ConversationTurn>, HistoryError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HistoryError::Storage(format!(
                    "Failed to read history file {}: {e}",
                    self.path.display()
                )));
            }
        };

        let turns: Vec<ConversationTurn> = bytes
            .split(|&b| b == b'\n')
            .enumerate()
            .filter_map(|(index, line)| {
                let line = match std::str::from_utf8(line) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(line = index + 1, error = %e, "Skipping non-UTF-8 history line");
                        return None;
                    }
                };
                if line.trim().is_empty() {
                    return None;
                }
                match serde_json::from_str::<ConversationTurn>(line) {
                    Ok(turn) => Some(turn),
                    Err(e) => {
                        warn!(line = index + 1, error = %e, "Skipping corrupted history line");
                        None
                    }
                }
            })
            .collect();

        debug!(path = %self.path.display(), count = turns.len(), "History file loaded");
        Ok(turns)
    }

    /// Rewrite the file with `turns`.
    ///
    /// The new content goes to `<path>.tmp` and is renamed into place.
    pub fn save(&self, turns: &[ConversationTurn]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HistoryError::Storage(format!("Failed to create history directory: {e}"))
                })?;
            }
        }

        let mut content = String::new();
        for turn in turns {
            let line = serde_json::to_string(turn).map_err(|e| {
                HistoryError::Storage(format!("Failed to serialize history turn: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, &content)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                HistoryError::Storage(format!(
                    "Failed to write history file {}: {e}",
                    self.path.display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_core::message::Role;

    #[test]
    fn missing_file_is_empty() {
        let file = HistoryFile::new("/nonexistent/dir/history.jsonl");
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = HistoryFile::new(dir.path().join("nested").join("history.jsonl"));
        let turns = vec![
            ConversationTurn::new(Role::User, "What is 12 * 8?", Some(6)),
            ConversationTurn::new(Role::Assistant, "96", Some(1)),
        ];

        file.save(&turns).unwrap();
        assert_eq!(file.load().unwrap(), turns);
        assert!(!dir.path().join("nested").join("history.jsonl.tmp").exists());
    }

    #[test]
    fn corrupted_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        std::fs::write(
            &path,
            concat!(
                "{\"role\":\"user\",\"content\":\"hi\",\"tokens\":1}\n",
                "{not json}\n",
                "\n",
                "{\"role\":\"assistant\",\"content\":\"hello\"}\n",
            ),
        )
        .unwrap();

        let turns = HistoryFile::new(&path).load().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "hello");
        assert_eq!(turns[1].tokens, None);
    }

    #[test]
    fn non_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let mut bytes = b"{\"role\":\"user\",\"content\":\"q\",\"tokens\":1}\n".to_vec();
        bytes.extend_from_slice(b"{\"role\":\"assistant\",\"content\":\"\xff\"}\n");
        bytes.extend_from_slice(b"{\"role\":\"assistant\",\"content\":\"a\",\"tokens\":1}\n");
        std::fs::write(&path, bytes).unwrap();

        let turns = HistoryFile::new(&path).load().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "a");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as one.
        let err = HistoryFile::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, HistoryError::Storage(_)));
    }
}
