//! Session file reading and writing.
//!
//! A session file is one JSON object keyed by session id:
//!
//! ```json
//! {
//!   "s1": { "user_id": "u123", "created_at": 1700000000.25, "expires_at": 1700000003.25 }
//! }
//! ```
//!
//! Writes go to a uniquely named temporary file in the target's directory
//! that is then renamed over the target, so a failed write leaves any
//! previous file intact and concurrent writers never share a temp file.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::types::Session;

/// Write `sessions` to `path`, replacing any existing file.
pub fn write_sessions(path: &Path, sessions: &HashMap<String, Session>) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;

    // Sorted keys keep files diffable.
    let ordered: BTreeMap<&String, &Session> = sessions.iter().collect();
    let json = serde_json::to_string_pretty(&ordered)?;

    // Dropping the temp file on an error path removes it.
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| SessionError::io(parent, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| SessionError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| SessionError::io(path, e.error))?;

    debug!(path = %path.display(), sessions = sessions.len(), "Session file written");
    Ok(())
}

/// Read a session file.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_sessions(path: &Path) -> Result<Option<HashMap<String, Session>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SessionError::io(path, e)),
    };

    let sessions: HashMap<String, Session> =
        serde_json::from_str(&content).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(path = %path.display(), sessions = sessions.len(), "Session file read");
    Ok(Some(sessions))
}
