//! Reads the tail of a host transcript (JSON lines).

use serde_json::Value;
use std::path::Path;

/// The most recent user and assistant text in a transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastTurn {
    pub user: Option<String>,
    pub assistant: Option<String>,
}

impl LastTurn {
    /// Both sides joined, lowercased; what stop keywords are checked against.
    pub fn search_text(&self) -> String {
        [self.user.as_deref(), self.assistant.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.assistant.is_none()
    }
}

/// Read the last turn from a transcript file. A missing or unreadable file
/// yields an empty turn.
pub fn read_last_turn(path: &Path) -> LastTurn {
    match std::fs::read_to_string(path) {
        Ok(raw) => parse_last_turn(&raw),
        Err(e) => {
            tracing::debug!("Transcript {} unreadable: {}", path.display(), e);
            LastTurn::default()
        }
    }
}

/// Scan lines from the end; malformed lines are skipped. User entries that
/// carry only tool results do not count as user text.
pub fn parse_last_turn(raw: &str) -> LastTurn {
    let mut turn = LastTurn::default();
    for line in raw.lines().rev() {
        if turn.user.is_some() && turn.assistant.is_some() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(message) = entry.get("message") else {
            continue;
        };
        let role = message
            .get("role")
            .or_else(|| entry.get("type"))
            .and_then(Value::as_str);
        let slot = match role {
            Some("user") => &mut turn.user,
            Some("assistant") => &mut turn.assistant,
            _ => continue,
        };
        if slot.is_some() {
            continue;
        }
        if let Some(text) = message.get("content").and_then(message_text) {
            *slot = Some(text);
        }
    }
    turn
}

fn message_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };
    (!text.trim().is_empty()).then_some(text)
}
