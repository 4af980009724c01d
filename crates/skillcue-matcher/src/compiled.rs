//! Triggers compiled once per rule set.
//!
//! A `SkillRule` carries up to five optional trigger tables; here each
//! declared table becomes one `Trigger` variant with its regexes and globs
//! already built. Patterns that fail to compile are dropped with a warning,
//! and the clause they belonged to can only be satisfied by the survivors.

use crate::content::Candidate;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};
use skillcue_types::{
    FileTriggers, PreToolTriggers, PromptTriggers, Requirement, SkillRule, StopTriggers,
    ValidationRule,
};
use std::path::{Path, PathBuf};

/// One declared trigger table, compiled.
#[derive(Debug)]
pub enum Trigger {
    Prompt(PromptMatcher),
    File(FileMatcher),
    Shadow(PromptMatcher),
    PreTool(PreToolMatcher),
    Stop(StopMatcher),
}

/// A skill with its triggers and validation rules ready to evaluate.
#[derive(Debug)]
pub struct CompiledSkill<'a> {
    pub name: &'a str,
    pub rule: &'a SkillRule,
    pub triggers: Vec<Trigger>,
    pub validations: Vec<CompiledValidation<'a>>,
}

impl<'a> CompiledSkill<'a> {
    pub fn compile(name: &'a str, rule: &'a SkillRule) -> Self {
        let mut triggers = Vec::new();
        if let Some(t) = &rule.prompt_triggers {
            triggers.push(Trigger::Prompt(PromptMatcher::compile(name, "promptTriggers", t)));
        }
        if let Some(t) = &rule.file_triggers {
            triggers.push(Trigger::File(FileMatcher::compile(name, t)));
        }
        if let Some(t) = &rule.shadow_triggers {
            triggers.push(Trigger::Shadow(PromptMatcher::compile(name, "shadowTriggers", t)));
        }
        if let Some(t) = &rule.pre_tool_triggers {
            triggers.push(Trigger::PreTool(PreToolMatcher::compile(name, t)));
        }
        if let Some(t) = &rule.stop_triggers {
            triggers.push(Trigger::Stop(StopMatcher::compile(t)));
        }

        let validations = rule
            .validation_rules
            .iter()
            .filter_map(|v| CompiledValidation::compile(name, v))
            .collect();

        Self {
            name,
            rule,
            triggers,
            validations,
        }
    }

    pub fn prompt(&self) -> Option<&PromptMatcher> {
        self.triggers.iter().find_map(|t| match t {
            Trigger::Prompt(m) => Some(m),
            _ => None,
        })
    }

    pub fn file(&self) -> Option<&FileMatcher> {
        self.triggers.iter().find_map(|t| match t {
            Trigger::File(m) => Some(m),
            _ => None,
        })
    }

    pub fn shadow(&self) -> Option<&PromptMatcher> {
        self.triggers.iter().find_map(|t| match t {
            Trigger::Shadow(m) => Some(m),
            _ => None,
        })
    }

    pub fn pre_tool(&self) -> Option<&PreToolMatcher> {
        self.triggers.iter().find_map(|t| match t {
            Trigger::PreTool(m) => Some(m),
            _ => None,
        })
    }

    pub fn stop(&self) -> Option<&StopMatcher> {
        self.triggers.iter().find_map(|t| match t {
            Trigger::Stop(m) => Some(m),
            _ => None,
        })
    }
}

/// Build a regex, logging and discarding it if it does not compile.
fn compile_regex(skill: &str, field: &str, pattern: &str, case_insensitive: bool) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Skill '{skill}': skipping invalid {field} pattern '{pattern}': {e}");
            None
        }
    }
}

fn compile_glob(skill: &str, pattern: &str) -> Option<Glob> {
    match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob),
        Err(e) => {
            tracing::warn!("Skill '{skill}': skipping invalid path pattern '{pattern}': {e}");
            None
        }
    }
}

/// Which clauses of a prompt trigger fired, with the first hit of each.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PromptHit<'m> {
    pub keyword: Option<&'m str>,
    pub intent: Option<&'m str>,
}

/// Keywords (case-insensitive substring) and intent regexes (case-insensitive).
#[derive(Debug)]
pub struct PromptMatcher {
    /// (as written, lowercased)
    keywords: Vec<(String, String)>,
    /// (as written, compiled)
    intents: Vec<(String, Regex)>,
}

impl PromptMatcher {
    fn compile(skill: &str, field: &str, triggers: &PromptTriggers) -> Self {
        let keywords = triggers
            .keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| (k.clone(), k.to_lowercase()))
            .collect();
        let intents = triggers
            .intent_patterns
            .iter()
            .filter_map(|p| compile_regex(skill, field, p, true).map(|re| (p.clone(), re)))
            .collect();
        Self { keywords, intents }
    }

    /// Evaluate against the prompt; `prompt_lower` is `prompt.to_lowercase()`.
    pub fn evaluate(&self, prompt: &str, prompt_lower: &str) -> PromptHit<'_> {
        PromptHit {
            keyword: self
                .keywords
                .iter()
                .find(|(_, lower)| prompt_lower.contains(lower.as_str()))
                .map(|(original, _)| original.as_str()),
            intent: self
                .intents
                .iter()
                .find(|(_, re)| re.is_match(prompt))
                .map(|(pattern, _)| pattern.as_str()),
        }
    }
}

/// Outcome of a file trigger over a set of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileHit {
    None,
    /// A path glob matched and no content patterns are declared.
    Path,
    /// One file matched both a path glob and a content pattern.
    PathAndContent,
    /// Content patterns only; some candidate's content matched.
    Content,
}

#[derive(Debug)]
pub struct FileMatcher {
    /// `None` when no path patterns were declared.
    paths: Option<GlobSet>,
    /// `None` when no content patterns were declared.
    contents: Option<Vec<Regex>>,
}

impl FileMatcher {
    fn compile(skill: &str, triggers: &FileTriggers) -> Self {
        let paths = (!triggers.path_patterns.is_empty()).then(|| {
            let mut builder = GlobSetBuilder::new();
            for pattern in &triggers.path_patterns {
                if let Some(glob) = compile_glob(skill, pattern) {
                    builder.add(glob);
                }
            }
            builder.build().unwrap_or_else(|e| {
                tracing::warn!("Skill '{skill}': failed to build path matcher: {e}");
                GlobSet::empty()
            })
        });
        let contents = (!triggers.content_patterns.is_empty()).then(|| {
            triggers
                .content_patterns
                .iter()
                .filter_map(|p| compile_regex(skill, "contentPatterns", p, false))
                .collect()
        });
        Self { paths, contents }
    }

    pub fn path_matches(&self, rel_path: &str) -> bool {
        self.paths.as_ref().is_some_and(|g| g.is_match(rel_path))
    }

    fn content_matches(&self, candidate: &Candidate) -> bool {
        let Some(contents) = &self.contents else {
            return false;
        };
        if contents.is_empty() {
            return false;
        }
        match candidate.content() {
            Some(text) => contents.iter().any(|re| re.is_match(text)),
            None => false,
        }
    }

    pub fn evaluate(&self, candidates: &[Candidate]) -> FileHit {
        match (&self.paths, &self.contents) {
            (Some(paths), None) => {
                if candidates.iter().any(|c| paths.is_match(&c.rel_path)) {
                    FileHit::Path
                } else {
                    FileHit::None
                }
            }
            (Some(paths), Some(_)) => {
                // The same file has to satisfy both clauses.
                if candidates
                    .iter()
                    .any(|c| paths.is_match(&c.rel_path) && self.content_matches(c))
                {
                    FileHit::PathAndContent
                } else {
                    FileHit::None
                }
            }
            (None, Some(_)) => {
                if candidates.iter().any(|c| self.content_matches(c)) {
                    FileHit::Content
                } else {
                    FileHit::None
                }
            }
            (None, None) => FileHit::None,
        }
    }
}

#[derive(Debug)]
pub struct PreToolMatcher {
    tool_name: String,
    /// `None` when no input patterns were declared.
    inputs: Option<Vec<(String, Regex)>>,
}

impl PreToolMatcher {
    fn compile(skill: &str, triggers: &PreToolTriggers) -> Self {
        let inputs = (!triggers.input_patterns.is_empty()).then(|| {
            triggers
                .input_patterns
                .iter()
                .filter_map(|p| {
                    compile_regex(skill, "inputPatterns", p, false).map(|re| (p.clone(), re))
                })
                .collect()
        });
        Self {
            tool_name: triggers.tool_name.clone(),
            inputs,
        }
    }

    /// `None` if the trigger does not fire; otherwise the first matching
    /// input pattern (absent when no patterns are declared).
    pub fn evaluate(&self, tool_name: &str, input_text: &str) -> Option<Option<&str>> {
        if self.tool_name != tool_name {
            return None;
        }
        match &self.inputs {
            None => Some(None),
            Some(inputs) => inputs
                .iter()
                .find(|(_, re)| re.is_match(input_text))
                .map(|(pattern, _)| Some(pattern.as_str())),
        }
    }
}

#[derive(Debug)]
pub struct StopMatcher {
    keywords: Vec<(String, String)>,
    prompt_evaluation: Option<String>,
}

impl StopMatcher {
    fn compile(triggers: &StopTriggers) -> Self {
        Self {
            keywords: triggers
                .keywords
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| (k.clone(), k.to_lowercase()))
                .collect(),
            prompt_evaluation: triggers.prompt_evaluation.clone(),
        }
    }

    /// First keyword found in the (already lowercased) text.
    pub fn evaluate(&self, text_lower: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(_, lower)| text_lower.contains(lower.as_str()))
            .map(|(original, _)| original.as_str())
    }

    pub fn prompt_evaluation(&self) -> Option<&str> {
        self.prompt_evaluation.as_deref()
    }
}

#[derive(Debug)]
pub enum CompiledRequirement {
    Pattern(Regex),
    FileExists(String),
}

impl CompiledRequirement {
    /// Whether `candidate` satisfies the requirement.
    pub fn is_satisfied(&self, project_root: &Path, candidate: &Candidate) -> bool {
        match self {
            CompiledRequirement::Pattern(re) => re.is_match(candidate.content().unwrap_or("")),
            CompiledRequirement::FileExists(template) => {
                companion_path(project_root, template, &candidate.rel_path).exists()
            }
        }
    }
}

/// Substitute `${filename}` (base name without extension) into `template`.
pub fn companion_path(project_root: &Path, template: &str, rel_path: &str) -> PathBuf {
    let stem = Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    project_root.join(template.replace("${filename}", &stem))
}

#[derive(Debug)]
pub struct CompiledValidation<'a> {
    pub name: &'a str,
    pub condition: Regex,
    pub requirement: CompiledRequirement,
    pub reminder: &'a str,
}

impl<'a> CompiledValidation<'a> {
    fn compile(skill: &str, rule: &'a ValidationRule) -> Option<Self> {
        let field = format!("validationRules[{}].condition", rule.name);
        let condition = compile_regex(skill, &field, &rule.condition.path_pattern, false)?;
        let requirement = match &rule.requirement {
            Requirement::Pattern { pattern } => {
                let field = format!("validationRules[{}].requirement", rule.name);
                CompiledRequirement::Pattern(compile_regex(skill, &field, pattern, false)?)
            }
            Requirement::FileExists { file_exists } => {
                CompiledRequirement::FileExists(file_exists.clone())
            }
        };
        Some(Self {
            name: &rule.name,
            condition,
            requirement,
            reminder: &rule.reminder,
        })
    }
}
