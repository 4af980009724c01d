//! Hook protocol and decision encoding for skillcue.
//!
//! Events: UserPromptSubmit / PreToolUse / PostToolUse / Stop
//! Decisions: allow / deny / ask

pub mod encoder;
pub mod transcript;
pub mod types;

pub use encoder::{
    MAX_BLOCK_CONTENT_BYTES, encode_pre_tool, encode_prompt, encode_stop, render_reminders,
};
pub use transcript::{LastTurn, parse_last_turn, read_last_turn};
pub use types::*;
