//! Token wire format: `<session_id>.<hex signature>`.
//!
//! Tokens are split on the *last* delimiter. Signatures are hex and never
//! contain one, so session ids that include `.` still parse back to
//! themselves.

/// Separator between the session id and its signature.
pub const DELIMITER: char = '.';

/// Join a session id and its signature into a token.
pub fn encode(session_id: &str, signature: &str) -> String {
    format!("{}{}{}", session_id, DELIMITER, signature)
}

/// Split a token into `(session_id, signature)`.
///
/// Returns `None` when the delimiter is missing or either half is empty.
pub fn decode(token: &str) -> Option<(&str, &str)> {
    let (session_id, signature) = token.rsplit_once(DELIMITER)?;
    if session_id.is_empty() || signature.is_empty() {
        return None;
    }
    Some((session_id, signature))
}
