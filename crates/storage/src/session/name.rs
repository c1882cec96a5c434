//! Session file naming
//!
//! Every per-session file is named `{prefix}_{id}_{timestamp}` where both
//! `prefix` and `id` are escaped by doubling the separator. An escaped
//! string only ever contains even runs of `_`, so the separator between
//! prefix and id is the single odd run left in the name once the trailing
//! `_{timestamp}` is split off.
//!
//! ```text
//! bt-session_a__b_1700000000000
//! └──prefix─┘ └id┘ └─timestamp─┘      id = "a_b"
//! ```

/// Separator between the three name fields
pub const SEPARATOR: char = '_';

const DOUBLE_SEPARATOR: &str = "__";

/// A file name decoded into its session fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    /// Original file name
    pub file: String,
    /// Unescaped prefix
    pub prefix: String,
    /// Unescaped session id
    pub session_id: String,
    /// Session start timestamp
    pub timestamp: i64,
}

/// Escape a name component by doubling every separator
pub fn escape(name: &str) -> String {
    name.replace(SEPARATOR, DOUBLE_SEPARATOR)
}

/// Reverse [`escape`]
pub fn unescape(name: &str) -> String {
    name.replace(DOUBLE_SEPARATOR, "_")
}

/// Build a session file name from its unescaped components
pub fn encode(prefix: &str, session_id: &str, timestamp: i64) -> String {
    format!(
        "{}{SEPARATOR}{}{SEPARATOR}{timestamp}",
        escape(prefix),
        escape(session_id)
    )
}

/// Decode a file name into its session fields
///
/// Returns `None` for anything that is not a session file: no separator,
/// a non-numeric timestamp segment, or no prefix/id boundary.
pub fn decode(file: &str) -> Option<DecodedName> {
    let timestamp_sep = file.rfind(SEPARATOR)?;
    let timestamp = file[timestamp_sep + 1..].parse::<i64>().ok()?;

    let head = &file[..timestamp_sep];
    let id_sep = find_prefix_separator(head)?;

    let prefix = &head[..id_sep];
    let escaped_id = &head[id_sep + 1..];
    if prefix.is_empty() || escaped_id.is_empty() {
        return None;
    }

    Some(DecodedName {
        file: file.to_string(),
        prefix: unescape(prefix),
        session_id: unescape(escaped_id),
        timestamp,
    })
}

/// Position of the prefix/id separator: the first `_` of the right-most
/// odd-length run of separators
fn find_prefix_separator(head: &str) -> Option<usize> {
    let bytes = head.as_bytes();
    let sep = SEPARATOR as u8;
    let mut end = bytes.len();

    while end > 0 {
        if bytes[end - 1] != sep {
            end -= 1;
            continue;
        }

        let mut start = end;
        while start > 0 && bytes[start - 1] == sep {
            start -= 1;
        }

        if (end - start) % 2 == 1 {
            return Some(start);
        }
        end = start;
    }

    None
}

#[cfg(test)]
#[path = "name_test.rs"]
mod name_test;
