//! Match results. Produced per invocation and never persisted.

use skillcue_types::{Priority, SkillRule};

/// Anything that can be ranked by its owning skill's priority.
pub trait Ranked {
    fn priority(&self) -> Priority;
}

/// A skill surfaced by prompt text and/or candidate files.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatch<'a> {
    pub skill_name: &'a str,
    pub rule: &'a SkillRule,
    pub score: u32,
    pub prompt_match: bool,
    pub file_match: bool,
}

impl Ranked for SkillMatch<'_> {
    fn priority(&self) -> Priority {
        self.rule.priority
    }
}

/// A skill whose pre-tool trigger fired for a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct PreToolMatch<'a> {
    pub skill_name: &'a str,
    pub rule: &'a SkillRule,
    pub tool_name: String,
    /// The first input pattern that matched, if the trigger declares any.
    pub matched_pattern: Option<String>,
}

/// A non-blocking suggestion from shadow triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMatch<'a> {
    pub skill_name: &'a str,
    pub rule: &'a SkillRule,
    pub score: u32,
    /// `Detected: "<keyword>"` or `Pattern matched: <pattern>`.
    pub reason: String,
}

impl Ranked for ShadowMatch<'_> {
    fn priority(&self) -> Priority {
        self.rule.priority
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopMatch<'a> {
    pub skill_name: &'a str,
    pub rule: &'a SkillRule,
    pub matched_keyword: String,
    /// The caller must make a follow-up free-text judgment before acting.
    pub requires_prompt_evaluation: bool,
}

/// One failed validation rule, listing every modified file that failed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReminder<'a> {
    pub rule_name: String,
    pub skill_name: &'a str,
    pub priority: Priority,
    /// Never empty.
    pub failed_files: Vec<String>,
    pub message: String,
}

impl Ranked for ValidationReminder<'_> {
    fn priority(&self) -> Priority {
        self.priority
    }
}
