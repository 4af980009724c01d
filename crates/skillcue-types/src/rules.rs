//! Declarative skill rules: the shape of `skill-rules.toml` / `skill-rules.json`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cap on non-critical suggestions per prompt.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;

/// Default session cache location, relative to the project root.
pub const DEFAULT_CACHE_DIRECTORY: &str = ".claude/cache/skillcue";

/// Default cooldown window for re-suggesting a skill.
pub const DEFAULT_RECENT_ACTIVATION_MINUTES: u64 = 5;

/// Default age after which session records are garbage-collected.
pub const DEFAULT_SESSION_RETENTION_HOURS: u64 = 24;

/// Default number of session records kept by a cleanup pass.
pub const DEFAULT_MAX_SESSIONS: usize = 100;

/// The full rule set loaded from the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: Settings,
    /// Skill name -> rule, in declaration order. Declaration order is the
    /// final tie-break when ranking matches.
    #[serde(default)]
    pub skills: IndexMap<String, SkillRule>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            settings: Settings::default(),
            skills: IndexMap::new(),
        }
    }
}

impl RuleSet {
    /// Look up a skill rule by exact (case-sensitive) name.
    pub fn skill(&self, name: &str) -> Option<&SkillRule> {
        self.skills.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Global engine settings. Every field has a default, so a partial
/// `[settings]` table keeps defaults for whatever it omits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub max_suggestions: usize,
    pub cache_directory: PathBuf,
    pub enable_debug_logging: bool,
    pub scoring: ScoringWeights,
    pub thresholds: Thresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            cache_directory: PathBuf::from(DEFAULT_CACHE_DIRECTORY),
            enable_debug_logging: false,
            scoring: ScoringWeights::default(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Score contributed by each independently satisfied trigger clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    pub keyword: u32,
    pub intent_pattern: u32,
    pub file_path_match: u32,
    pub file_content_match: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword: 10,
            intent_pattern: 20,
            file_path_match: 15,
            file_content_match: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    pub recent_activation_minutes: u64,
    pub session_retention_hours: u64,
    pub max_sessions: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            recent_activation_minutes: DEFAULT_RECENT_ACTIVATION_MINUTES,
            session_retention_hours: DEFAULT_SESSION_RETENTION_HOURS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// What kind of guidance a skill provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    #[default]
    Domain,
    Guardrail,
    Workflow,
}

/// Caller-visible effect of a skill match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    #[default]
    Suggest,
    Warn,
    Block,
    /// Never auto-loaded; reachable only through shadow triggers.
    Manual,
}

/// Ranking class. Variant order is rank order: `Critical` sorts first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank, critical = 0 through low = 3.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// One skill's trigger declaration as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRule {
    #[serde(rename = "type", default)]
    pub skill_type: SkillType,
    #[serde(default)]
    pub enforcement: Enforcement,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_triggers: Option<PromptTriggers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_triggers: Option<FileTriggers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_triggers: Option<PromptTriggers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_tool_triggers: Option<PreToolTriggers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_triggers: Option<StopTriggers>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
}

/// Keyword and intent-regex triggers evaluated against prompt text.
/// Shared by `promptTriggers` and `shadowTriggers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTriggers {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub intent_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTriggers {
    /// Globs over project-relative paths.
    #[serde(default)]
    pub path_patterns: Vec<String>,
    /// Regexes over file content.
    #[serde(default)]
    pub content_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreToolTriggers {
    pub tool_name: String,
    #[serde(default)]
    pub input_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTriggers {
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Free-text question the caller must answer before acting on the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_evaluation: Option<String>,
}

/// A post-hoc check over modified files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub name: String,
    pub condition: ValidationCondition,
    pub requirement: Requirement,
    #[serde(default)]
    pub reminder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCondition {
    /// Regex over the project-relative path.
    pub path_pattern: String,
}

/// Evidence a candidate file must show to pass a validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    /// The candidate's content must match this regex.
    Pattern { pattern: String },
    /// A companion path must exist; `${filename}` is replaced with the
    /// candidate's base name without extension.
    #[serde(rename_all = "camelCase")]
    FileExists { file_exists: String },
}
