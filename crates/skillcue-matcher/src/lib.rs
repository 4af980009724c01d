//! Trigger matching and scoring for skillcue.
//!
//! Trigger kinds: prompt / file / shadow / pre_tool / stop, plus
//! validation rules over modified files.
//! All matching is pure: nothing here reads or writes session state.

pub mod compiled;
pub mod content;
pub mod limit;
pub mod matcher;
pub mod types;
pub mod validation;

pub use compiled::{CompiledSkill, Trigger};
pub use limit::limit_matches;
pub use matcher::RuleMatcher;
pub use types::*;
