//! Skill rule loading for skillcue.
//!
//! Reads `.claude/skills/skill-rules.toml` (canonical) or the legacy
//! `.claude/skills/skill-rules.json` sibling. Loading never fails: a missing
//! or unparsable file yields the built-in default rule set, and individual
//! malformed skills are skipped.

use indexmap::IndexMap;
use serde::Deserialize;
use skillcue_types::{ConfigError, RuleSet, Settings, SkillRule, ValidationRule};
use std::path::{Path, PathBuf};

/// Directory holding the rule file and one sub-directory per skill.
pub const SKILLS_DIR: &str = ".claude/skills";

/// Canonical rule file name.
pub const RULES_FILE: &str = "skill-rules.toml";

/// Legacy rule file name, used only when the canonical file is absent.
pub const LEGACY_RULES_FILE: &str = "skill-rules.json";

/// Skill body file inside each skill's directory.
pub const SKILL_BODY_FILE: &str = "SKILL.md";

/// Resolved configuration for one hook invocation.
#[derive(Debug, Clone)]
pub struct SkillcueConfig {
    pub project_root: PathBuf,
    /// The file the rules came from, if any was found and parsed.
    pub rules_path: Option<PathBuf>,
    pub rules: RuleSet,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub project_dir: Option<PathBuf>,
    /// Explicit rule file, bypassing the canonical/legacy lookup.
    pub config_path: Option<PathBuf>,
}

impl SkillcueConfig {
    /// Load configuration, falling back to defaults on any error.
    ///
    /// Project root precedence (highest to lowest):
    /// 1. `--project-dir`
    /// 2. `CLAUDE_PROJECT_DIR`
    /// 3. the `cwd` reported by the hook input
    /// 4. the process working directory
    pub fn load(overrides: CliOverrides, hook_cwd: Option<&str>) -> Self {
        let project_root = resolve_project_root(overrides.project_dir, hook_cwd);

        let (rules_path, rules) = match overrides.config_path {
            Some(path) => {
                let rules = load_rules_file(&path).unwrap_or_else(|e| {
                    tracing::warn!("{e}; using default rules");
                    RuleSet::default()
                });
                (Some(path), rules)
            }
            None => match try_load(&project_root) {
                Ok(Some((path, rules))) => (Some(path), rules),
                Ok(None) => (None, RuleSet::default()),
                Err(e) => {
                    tracing::warn!("{e}; using default rules");
                    (None, RuleSet::default())
                }
            },
        };

        Self {
            project_root,
            rules_path,
            rules,
        }
    }

    /// Absolute directory for session records.
    pub fn cache_dir(&self) -> PathBuf {
        let dir = &self.rules.settings.cache_directory;
        if dir.is_absolute() {
            dir.clone()
        } else {
            self.project_root.join(dir)
        }
    }

    pub fn skill_exists(&self, name: &str) -> bool {
        skill_exists(&self.project_root, name)
    }

    pub fn load_content(&self, name: &str) -> Option<String> {
        load_content(&self.project_root, name)
    }
}

/// Load the project's rule set. Never fails.
pub fn load(project_root: &Path) -> RuleSet {
    match try_load(project_root) {
        Ok(Some((_, rules))) => rules,
        Ok(None) => RuleSet::default(),
        Err(e) => {
            tracing::warn!("{e}; using default rules");
            RuleSet::default()
        }
    }
}

/// Load the project's rule set, reporting which file was used.
///
/// Returns `Ok(None)` when neither the canonical nor the legacy file exists.
/// Errors only when the chosen file exists but cannot be read or parsed.
pub fn try_load(project_root: &Path) -> Result<Option<(PathBuf, RuleSet)>, ConfigError> {
    let skills_dir = project_root.join(SKILLS_DIR);
    let canonical = skills_dir.join(RULES_FILE);
    let legacy = skills_dir.join(LEGACY_RULES_FILE);

    let path = if canonical.is_file() {
        canonical
    } else if legacy.is_file() {
        tracing::debug!("Using legacy rule file {}", legacy.display());
        legacy
    } else {
        return Ok(None);
    };

    let rules = load_rules_file(&path)?;
    Ok(Some((path, rules)))
}

/// Read and parse one rule file. The format is picked by extension:
/// `.json` is JSON, anything else is TOML.
pub fn load_rules_file(path: &Path) -> Result<RuleSet, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let format = if path.extension().is_some_and(|ext| ext == "json") {
        RulesFormat::Json
    } else {
        RulesFormat::Toml
    };
    parse_rules(&content, format).map_err(|message| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesFormat {
    Toml,
    Json,
}

/// Top-level document with every section kept as raw JSON, so that one bad
/// skill or a bad settings table cannot take down the rest of the file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRuleSet {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    settings: Option<serde_json::Value>,
    #[serde(default)]
    skills: Option<IndexMap<String, serde_json::Value>>,
}

/// Parse rule-file text. Document-level syntax errors are returned;
/// everything below the top level degrades to defaults.
pub fn parse_rules(content: &str, format: RulesFormat) -> Result<RuleSet, String> {
    // TOML is lifted into a JSON value first so both formats share one
    // lenient decoding path. `preserve_order` keeps declaration order.
    let document: serde_json::Value = match format {
        RulesFormat::Toml => toml::from_str(content).map_err(|e| e.to_string())?,
        RulesFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
    };
    let raw: RawRuleSet = serde_json::from_value(document).map_err(|e| e.to_string())?;
    Ok(build_rule_set(raw))
}

fn build_rule_set(raw: RawRuleSet) -> RuleSet {
    let defaults = RuleSet::default();

    let mut settings = match raw.settings {
        Some(value) => serde_json::from_value::<Settings>(value).unwrap_or_else(|e| {
            let err = ConfigError::InvalidValue {
                key: "settings".into(),
                message: e.to_string(),
            };
            tracing::warn!("{err}; using default settings");
            Settings::default()
        }),
        None => Settings::default(),
    };
    if settings.max_suggestions == 0 {
        tracing::warn!("settings.maxSuggestions must be at least 1; using 1");
        settings.max_suggestions = 1;
    }

    // Keys land in a fresh map as plain strings, so a key such as
    // `__proto__` is just another skill name.
    let mut skills: IndexMap<String, SkillRule> = IndexMap::new();
    for (name, value) in raw.skills.unwrap_or_default() {
        if name.is_empty() {
            tracing::warn!("Skipping skill with empty name");
            continue;
        }
        match decode_skill(&name, value) {
            Ok(rule) => {
                skills.insert(name, rule);
            }
            Err(e) => {
                let err = ConfigError::InvalidSkill {
                    name,
                    message: e.to_string(),
                };
                tracing::warn!("{err}; skipping");
            }
        }
    }

    RuleSet {
        version: raw.version.unwrap_or(defaults.version),
        description: raw.description.unwrap_or(defaults.description),
        settings,
        skills,
    }
}

/// Decode one skill. Validation rules are decoded one at a time, so a
/// malformed rule is dropped without taking the skill's triggers with it.
fn decode_skill(
    name: &str,
    mut value: serde_json::Value,
) -> Result<SkillRule, serde_json::Error> {
    let raw_validations = value
        .as_object_mut()
        .and_then(|fields| fields.remove("validationRules"));
    let mut rule: SkillRule = serde_json::from_value(value)?;
    if let Some(raw) = raw_validations {
        rule.validation_rules = decode_validation_rules(name, raw);
    }
    Ok(rule)
}

fn decode_validation_rules(skill: &str, raw: serde_json::Value) -> Vec<ValidationRule> {
    let entries = match raw {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Null => return Vec::new(),
        other => {
            tracing::warn!("Skill '{skill}': validationRules must be a list, got {other}; ignoring");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<ValidationRule>(entry) {
            Ok(rule) => Some(rule),
            Err(e) => {
                let err = ConfigError::InvalidSkill {
                    name: skill.to_string(),
                    message: format!("validationRules[{i}]: {e}"),
                };
                tracing::warn!("{err}; skipping rule");
                None
            }
        })
        .collect()
}

/// Resolve the project root for this invocation.
pub fn resolve_project_root(explicit: Option<PathBuf>, hook_cwd: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Ok(dir) = std::env::var("CLAUDE_PROJECT_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(cwd) = hook_cwd.filter(|c| !c.is_empty()) {
        return PathBuf::from(cwd);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// A skill name is usable as a directory name only if it cannot escape
/// the skills directory.
fn is_safe_skill_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

fn skill_body_path(project_root: &Path, name: &str) -> Option<PathBuf> {
    is_safe_skill_name(name).then(|| {
        project_root
            .join(SKILLS_DIR)
            .join(name)
            .join(SKILL_BODY_FILE)
    })
}

/// Whether the skill has a body file on disk.
pub fn skill_exists(project_root: &Path, name: &str) -> bool {
    skill_body_path(project_root, name).is_some_and(|p| p.is_file())
}

/// The skill's body text, or `None` if absent or unreadable.
pub fn load_content(project_root: &Path, name: &str) -> Option<String> {
    let path = skill_body_path(project_root, name)?;
    match std::fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillcue_types::{Enforcement, Priority, Requirement, SkillType};
    use tempfile::TempDir;

    fn write_rules(dir: &Path, file: &str, content: &str) {
        let skills_dir = dir.join(SKILLS_DIR);
        std::fs::create_dir_all(&skills_dir).unwrap();
        std::fs::write(skills_dir.join(file), content).unwrap();
    }

    const SAMPLE_TOML: &str = r#"
version = "1.0"
description = "Project skills"

[settings]
maxSuggestions = 2

[settings.scoring]
keyword = 5

[skills.backend-dev]
type = "domain"
enforcement = "suggest"
priority = "high"
description = "Backend guidelines"

[skills.backend-dev.promptTriggers]
keywords = ["controller", "service"]
intentPatterns = ["(create|add).*route"]

[skills.backend-dev.fileTriggers]
pathPatterns = ["src/api/**/*.ts"]
contentPatterns = ["express\\.Router"]

[skills.db-guard]
type = "guardrail"
enforcement = "block"
priority = "critical"
description = "Database safety"

[skills.db-guard.preToolTriggers]
toolName = "Bash"
inputPatterns = ["drop\\s+table"]

[[skills.db-guard.validationRules]]
name = "migration-test"
condition = { pathPattern = "migrations/.*\\.sql$" }
requirement = { fileExists = "tests/${filename}.rs" }
reminder = "Every migration needs a test"
"#;

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let rules = load(tmp.path());
        assert_eq!(rules, RuleSet::default());
        assert!(try_load(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_toml_parse() {
        let tmp = TempDir::new().unwrap();
        write_rules(tmp.path(), RULES_FILE, SAMPLE_TOML);

        let rules = load(tmp.path());
        assert_eq!(rules.description, "Project skills");
        assert_eq!(rules.settings.max_suggestions, 2);
        assert_eq!(rules.settings.scoring.keyword, 5);
        assert_eq!(rules.settings.scoring.intent_pattern, 20);
        assert_eq!(rules.skills.len(), 2);

        let backend = rules.skill("backend-dev").unwrap();
        assert_eq!(backend.priority, Priority::High);
        assert_eq!(
            backend.prompt_triggers.as_ref().unwrap().keywords,
            vec!["controller", "service"]
        );

        let guard = rules.skill("db-guard").unwrap();
        assert_eq!(guard.skill_type, SkillType::Guardrail);
        assert_eq!(guard.enforcement, Enforcement::Block);
        assert!(matches!(
            guard.validation_rules[0].requirement,
            Requirement::FileExists { .. }
        ));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let tmp = TempDir::new().unwrap();
        write_rules(
            tmp.path(),
            RULES_FILE,
            r#"
[skills.zeta]
description = "z"
[skills.alpha]
description = "a"
[skills.mid]
description = "m"
"#,
        );
        let rules = load(tmp.path());
        let names: Vec<&str> = rules.skills.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_legacy_json_fallback() {
        let tmp = TempDir::new().unwrap();
        write_rules(
            tmp.path(),
            LEGACY_RULES_FILE,
            r#"{"version": "1.0", "skills": {"frontend": {"priority": "low"}}}"#,
        );
        let (path, rules) = try_load(tmp.path()).unwrap().unwrap();
        assert!(path.ends_with(LEGACY_RULES_FILE));
        assert_eq!(rules.skill("frontend").unwrap().priority, Priority::Low);
    }

    #[test]
    fn test_canonical_wins_over_legacy() {
        let tmp = TempDir::new().unwrap();
        write_rules(tmp.path(), RULES_FILE, "[skills.from-toml]\n");
        write_rules(
            tmp.path(),
            LEGACY_RULES_FILE,
            r#"{"skills": {"from-json": {}}}"#,
        );
        let rules = load(tmp.path());
        assert!(rules.skill("from-toml").is_some());
        assert!(rules.skill("from-json").is_none());
    }

    #[test]
    fn test_unparsable_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        write_rules(tmp.path(), RULES_FILE, "this is = = not toml [");
        assert_eq!(load(tmp.path()), RuleSet::default());
        assert!(matches!(
            try_load(tmp.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_null_skills_is_empty() {
        let rules = parse_rules(r#"{"skills": null}"#, RulesFormat::Json).unwrap();
        assert!(rules.skills.is_empty());
    }

    #[test]
    fn test_invalid_skill_is_skipped() {
        let rules = parse_rules(
            r#"{"skills": {
                "bad": {"enforcement": "explode"},
                "good": {"enforcement": "warn"}
            }}"#,
            RulesFormat::Json,
        )
        .unwrap();
        assert!(rules.skill("bad").is_none());
        assert_eq!(rules.skill("good").unwrap().enforcement, Enforcement::Warn);
    }

    #[test]
    fn test_malformed_validation_rule_skips_only_that_rule() {
        let rules = parse_rules(
            r#"{"skills": {"backend": {
                "promptTriggers": {"keywords": ["api"]},
                "validationRules": [
                    {"name": "typo", "condition": {"pathPattern": "^src/"}, "requirement": {"fileExist": "t"}},
                    {"condition": {"pathPattern": "^src/"}, "requirement": {"pattern": "x"}},
                    {"name": "ok", "condition": {"pathPattern": "^src/"}, "requirement": {"pattern": "x"}}
                ]
            }}}"#,
            RulesFormat::Json,
        )
        .unwrap();
        let backend = rules.skill("backend").unwrap();
        assert_eq!(
            backend.prompt_triggers.as_ref().unwrap().keywords,
            vec!["api".to_string()]
        );
        assert_eq!(backend.validation_rules.len(), 1);
        assert_eq!(backend.validation_rules[0].name, "ok");
    }

    #[test]
    fn test_non_list_validation_rules_ignored() {
        let rules = parse_rules(
            r#"{"skills": {"s": {"description": "kept", "validationRules": {"name": "x"}}}}"#,
            RulesFormat::Json,
        )
        .unwrap();
        let s = rules.skill("s").unwrap();
        assert_eq!(s.description, "kept");
        assert!(s.validation_rules.is_empty());
    }

    #[test]
    fn test_invalid_settings_fall_back() {
        let rules = parse_rules(
            r#"{"settings": {"maxSuggestions": "many"}, "skills": {"a": {}}}"#,
            RulesFormat::Json,
        )
        .unwrap();
        assert_eq!(rules.settings, Settings::default());
        assert!(rules.skill("a").is_some());
    }

    #[test]
    fn test_zero_max_suggestions_clamped() {
        let rules =
            parse_rules(r#"{"settings": {"maxSuggestions": 0}}"#, RulesFormat::Json).unwrap();
        assert_eq!(rules.settings.max_suggestions, 1);
    }

    #[test]
    fn test_prototype_keys_are_plain_entries() {
        let rules = parse_rules(
            r#"{"skills": {
                "__proto__": {"description": "inert"},
                "constructor": {"priority": "high"},
                "normal": {}
            }}"#,
            RulesFormat::Json,
        )
        .unwrap();
        assert_eq!(rules.skills.len(), 3);
        assert_eq!(rules.skill("__proto__").unwrap().description, "inert");
        assert_eq!(
            rules.skill("constructor").unwrap().priority,
            Priority::High
        );
        // Nothing leaked into the other entries.
        assert_eq!(rules.skill("normal").unwrap().description, "");
        assert_eq!(rules.skill("normal").unwrap().priority, Priority::Medium);
    }

    #[test]
    fn test_load_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        write_rules(tmp.path(), RULES_FILE, SAMPLE_TOML);
        assert_eq!(load(tmp.path()), load(tmp.path()));
    }

    #[test]
    fn test_skill_content_lookup() {
        let tmp = TempDir::new().unwrap();
        let skill_dir = tmp.path().join(SKILLS_DIR).join("backend-dev");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join(SKILL_BODY_FILE), "# Backend\nUse services.").unwrap();

        assert!(skill_exists(tmp.path(), "backend-dev"));
        assert_eq!(
            load_content(tmp.path(), "backend-dev").as_deref(),
            Some("# Backend\nUse services.")
        );
        assert!(!skill_exists(tmp.path(), "missing"));
        assert!(load_content(tmp.path(), "missing").is_none());
    }

    #[test]
    fn test_skill_names_cannot_escape_skills_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(SKILLS_DIR)).unwrap();
        std::fs::write(tmp.path().join(".claude").join(SKILL_BODY_FILE), "secret").unwrap();

        assert!(!skill_exists(tmp.path(), ".."));
        assert!(load_content(tmp.path(), "../x").is_none());
    }

    #[test]
    fn test_explicit_config_path_and_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{"settings": {"cacheDirectory": "state"}, "skills": {"x": {}}}"#,
        )
        .unwrap();

        let config = SkillcueConfig::load(
            CliOverrides {
                project_dir: Some(tmp.path().to_path_buf()),
                config_path: Some(path.clone()),
            },
            None,
        );
        assert_eq!(config.rules_path.as_deref(), Some(path.as_path()));
        assert!(config.rules.skill("x").is_some());
        assert_eq!(config.cache_dir(), tmp.path().join("state"));
    }
}
