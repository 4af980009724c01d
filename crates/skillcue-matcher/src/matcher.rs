//! Rule matcher: evaluates compiled skill triggers against live signals.

use crate::compiled::{CompiledSkill, FileHit};
use crate::content::candidates;
use crate::types::{PreToolMatch, ShadowMatch, SkillMatch, StopMatch};
use skillcue_types::{Enforcement, RuleSet, ScoringWeights};
use std::path::{Path, PathBuf};

/// Evaluates a rule set's triggers. Built once per invocation; every
/// `match_*` method is pure.
pub struct RuleMatcher<'a> {
    skills: Vec<CompiledSkill<'a>>,
    weights: ScoringWeights,
    project_root: PathBuf,
}

impl<'a> RuleMatcher<'a> {
    /// Compile every skill in declaration order.
    pub fn new(rules: &'a RuleSet, project_root: impl Into<PathBuf>) -> Self {
        let skills = rules
            .skills
            .iter()
            .map(|(name, rule)| CompiledSkill::compile(name, rule))
            .collect();
        Self {
            skills,
            weights: rules.settings.scoring,
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The compiled form of one skill, after invalid patterns were dropped.
    pub fn skill(&self, name: &str) -> Option<&CompiledSkill<'a>> {
        self.skills.iter().find(|s| s.name == name)
    }

    /// Score every non-manual skill against the prompt and candidate files.
    ///
    /// Score is the sum of the weights of each independently satisfied
    /// clause: keyword, intent, file path, file content. Zero-score skills
    /// are dropped. Results are ordered by priority, then score descending,
    /// then declaration order.
    pub fn match_prompt(&self, prompt: &str, file_paths: &[String]) -> Vec<SkillMatch<'a>> {
        self.score_skills(Some(prompt), file_paths)
    }

    /// File-trigger-only scoring over the same candidates `match_prompt` takes.
    pub fn match_files(&self, file_paths: &[String]) -> Vec<SkillMatch<'a>> {
        self.score_skills(None, file_paths)
    }

    fn score_skills(&self, prompt: Option<&str>, file_paths: &[String]) -> Vec<SkillMatch<'a>> {
        let prompt_lower = prompt.map(str::to_lowercase);
        let files = candidates(&self.project_root, file_paths);
        let w = self.weights;

        let mut matches = Vec::new();
        for skill in &self.skills {
            if skill.rule.enforcement == Enforcement::Manual {
                continue;
            }

            let mut prompt_score = 0;
            if let (Some(prompt_trigger), Some(prompt), Some(prompt_lower)) =
                (skill.prompt(), prompt, prompt_lower.as_deref())
            {
                let hit = prompt_trigger.evaluate(prompt, prompt_lower);
                if hit.keyword.is_some() {
                    prompt_score += w.keyword;
                }
                if hit.intent.is_some() {
                    prompt_score += w.intent_pattern;
                }
            }

            let file_score = match skill.file() {
                Some(file_trigger) if !files.is_empty() => {
                    file_hit_score(file_trigger.evaluate(&files), w)
                }
                _ => 0,
            };

            let score = prompt_score + file_score;
            if score == 0 {
                continue;
            }
            tracing::debug!(
                "Skill '{}' scored {} (prompt {}, file {})",
                skill.name,
                score,
                prompt_score,
                file_score
            );
            matches.push(SkillMatch {
                skill_name: skill.name,
                rule: skill.rule,
                score,
                prompt_match: prompt_score > 0,
                file_match: file_score > 0,
            });
        }

        sort_by_rank(&mut matches);
        matches
    }

    /// Shadow triggers for every skill, whatever its enforcement. This is
    /// the only path through which `manual` skills surface.
    pub fn match_shadow_triggers(&self, prompt: &str) -> Vec<ShadowMatch<'a>> {
        let prompt_lower = prompt.to_lowercase();
        let w = self.weights;

        let mut matches: Vec<ShadowMatch<'a>> = self
            .skills
            .iter()
            .filter_map(|skill| {
                let hit = skill.shadow()?.evaluate(prompt, &prompt_lower);
                let mut score = 0;
                if hit.keyword.is_some() {
                    score += w.keyword;
                }
                if hit.intent.is_some() {
                    score += w.intent_pattern;
                }
                if score == 0 {
                    return None;
                }
                let reason = match (hit.keyword, hit.intent) {
                    (Some(keyword), _) => format!("Detected: \"{keyword}\""),
                    (None, Some(pattern)) => format!("Pattern matched: {pattern}"),
                    (None, None) => return None,
                };
                Some(ShadowMatch {
                    skill_name: skill.name,
                    rule: skill.rule,
                    score,
                    reason,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.rule
                .priority
                .cmp(&b.rule.priority)
                .then(b.score.cmp(&a.score))
        });
        matches
    }

    /// Skills whose pre-tool trigger names `tool_name` exactly and, if they
    /// declare input patterns, has one matching `tool_input_text`.
    /// Returned in declaration order; there is no score.
    pub fn match_pre_tool_triggers(
        &self,
        tool_name: &str,
        tool_input_text: &str,
    ) -> Vec<PreToolMatch<'a>> {
        self.skills
            .iter()
            .filter_map(|skill| {
                let matched_pattern = skill.pre_tool()?.evaluate(tool_name, tool_input_text)?;
                tracing::debug!("Pre-tool trigger fired for '{}' on {}", skill.name, tool_name);
                Some(PreToolMatch {
                    skill_name: skill.name,
                    rule: skill.rule,
                    tool_name: tool_name.to_string(),
                    matched_pattern: matched_pattern.map(str::to_string),
                })
            })
            .collect()
    }

    /// Skills with a stop keyword present in `prompt` (case-insensitive).
    pub fn match_stop_triggers(&self, prompt: &str) -> Vec<StopMatch<'a>> {
        let prompt_lower = prompt.to_lowercase();
        self.skills
            .iter()
            .filter_map(|skill| {
                let stop = skill.stop()?;
                let keyword = stop.evaluate(&prompt_lower)?;
                Some(StopMatch {
                    skill_name: skill.name,
                    rule: skill.rule,
                    matched_keyword: keyword.to_string(),
                    requires_prompt_evaluation: stop.prompt_evaluation().is_some(),
                })
            })
            .collect()
    }
}

fn file_hit_score(hit: FileHit, w: ScoringWeights) -> u32 {
    match hit {
        FileHit::None => 0,
        FileHit::Path => w.file_path_match,
        FileHit::PathAndContent => w.file_path_match + w.file_content_match,
        FileHit::Content => w.file_content_match,
    }
}

/// Priority ascending (critical first), then score descending. The sort is
/// stable, so declaration order breaks remaining ties.
fn sort_by_rank(matches: &mut [SkillMatch<'_>]) {
    matches.sort_by(|a, b| {
        a.rule
            .priority
            .cmp(&b.rule.priority)
            .then(b.score.cmp(&a.score))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillcue_config::{RulesFormat, parse_rules};
    use skillcue_types::Priority;
    use tempfile::TempDir;

    fn rules(json: serde_json::Value) -> RuleSet {
        parse_rules(&json.to_string(), RulesFormat::Json).unwrap()
    }

    fn names<'a>(matches: &[SkillMatch<'a>]) -> Vec<&'a str> {
        matches.iter().map(|m| m.skill_name).collect()
    }

    #[test]
    fn test_keyword_and_intent_scores() {
        let rs = rules(serde_json::json!({"skills": {
            "backend": {"promptTriggers": {
                "keywords": ["controller"],
                "intentPatterns": ["(create|add).*endpoint"]
            }}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");

        let kw = m.match_prompt("fix the Controller", &[]);
        assert_eq!(kw[0].score, 10);
        assert!(kw[0].prompt_match);
        assert!(!kw[0].file_match);

        let both = m.match_prompt("add an endpoint to the controller", &[]);
        assert_eq!(both[0].score, 30);

        assert!(m.match_prompt("unrelated", &[]).is_empty());
    }

    #[test]
    fn test_full_score_is_sum_of_all_four_weights() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src/api")).unwrap();
        std::fs::write(
            tmp.path().join("src/api/users.ts"),
            "const r = express.Router();",
        )
        .unwrap();

        let rs = rules(serde_json::json!({"skills": {
            "backend": {
                "promptTriggers": {"keywords": ["route"], "intentPatterns": ["add.*route"]},
                "fileTriggers": {
                    "pathPatterns": ["src/api/**/*.ts"],
                    "contentPatterns": ["express\\.Router"]
                }
            }
        }}));
        let m = RuleMatcher::new(&rs, tmp.path());
        let result = m.match_prompt("add a route", &["src/api/users.ts".to_string()]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].score, 10 + 20 + 15 + 15);
        assert!(result[0].prompt_match && result[0].file_match);
    }

    #[test]
    fn test_path_and_content_both_required() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("plain.ts"), "nothing interesting").unwrap();

        let rs = rules(serde_json::json!({"skills": {
            "router": {"fileTriggers": {
                "pathPatterns": ["*.ts"],
                "contentPatterns": ["Router"]
            }}
        }}));
        let m = RuleMatcher::new(&rs, tmp.path());
        assert!(m.match_files(&["plain.ts".to_string()]).is_empty());
    }

    #[test]
    fn test_path_and_content_must_hold_for_same_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.ts"), "no match here").unwrap();
        std::fs::write(tmp.path().join("b.md"), "Router").unwrap();

        let rs = rules(serde_json::json!({"skills": {
            "router": {"fileTriggers": {
                "pathPatterns": ["*.ts"],
                "contentPatterns": ["Router"]
            }}
        }}));
        let m = RuleMatcher::new(&rs, tmp.path());
        let files = vec!["a.ts".to_string(), "b.md".to_string()];
        assert!(m.match_files(&files).is_empty());
    }

    #[test]
    fn test_file_score_counted_once_per_skill() {
        let rs = rules(serde_json::json!({"skills": {
            "rust": {"fileTriggers": {"pathPatterns": ["**/*.rs"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let files: Vec<String> = (0..5).map(|i| format!("src/f{i}.rs")).collect();
        let result = m.match_files(&files);
        assert_eq!(result[0].score, 15);
    }

    #[test]
    fn test_content_only_trigger() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("x.py"), "import torch").unwrap();

        let rs = rules(serde_json::json!({"skills": {
            "ml": {"fileTriggers": {"contentPatterns": ["import torch"]}}
        }}));
        let m = RuleMatcher::new(&rs, tmp.path());
        let result = m.match_files(&["x.py".to_string()]);
        assert_eq!(result[0].score, 15);
    }

    #[test]
    fn test_large_files_never_match_content() {
        let tmp = TempDir::new().unwrap();
        let mut big = "Router ".repeat(200_000).into_bytes();
        big.truncate(crate::content::MAX_CONTENT_BYTES as usize);
        std::fs::write(tmp.path().join("big.ts"), big).unwrap();

        let rs = rules(serde_json::json!({"skills": {
            "with-content": {"fileTriggers": {
                "pathPatterns": ["*.ts"], "contentPatterns": ["Router"]
            }},
            "path-only": {"fileTriggers": {"pathPatterns": ["*.ts"]}}
        }}));
        let m = RuleMatcher::new(&rs, tmp.path());
        let result = m.match_files(&["big.ts".to_string()]);
        assert_eq!(names(&result), vec!["path-only"]);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let rs = rules(serde_json::json!({"skills": {
            "c": {"fileTriggers": {"contentPatterns": ["x"]}},
            "p": {"fileTriggers": {"pathPatterns": ["*.md"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let result = m.match_files(&["gone.rs".to_string(), "README.md".to_string()]);
        assert_eq!(names(&result), vec!["p"]);
    }

    #[test]
    fn test_manual_skills_excluded_from_prompt_matching() {
        let rs = rules(serde_json::json!({"skills": {
            "manual-one": {
                "enforcement": "manual",
                "promptTriggers": {"keywords": ["deploy"]},
                "fileTriggers": {"pathPatterns": ["**"]},
                "shadowTriggers": {"keywords": ["deploy"]}
            }
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        assert!(m.match_prompt("deploy now", &[]).is_empty());
        assert!(m.match_files(&["a.rs".to_string()]).is_empty());

        let shadow = m.match_shadow_triggers("deploy now");
        assert_eq!(shadow.len(), 1);
        assert_eq!(shadow[0].skill_name, "manual-one");
    }

    #[test]
    fn test_ordering_priority_then_score_then_declaration() {
        let rs = rules(serde_json::json!({"skills": {
            "low-high-score": {"priority": "low", "promptTriggers": {
                "keywords": ["api"], "intentPatterns": ["api"]}},
            "high-a": {"priority": "high", "promptTriggers": {"keywords": ["api"]}},
            "high-b": {"priority": "high", "promptTriggers": {"keywords": ["api"]}},
            "high-best": {"priority": "high", "promptTriggers": {
                "keywords": ["api"], "intentPatterns": ["api"]}},
            "crit": {"priority": "critical", "promptTriggers": {"keywords": ["api"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let result = m.match_prompt("api", &[]);
        assert_eq!(
            names(&result),
            vec!["crit", "high-best", "high-a", "high-b", "low-high-score"]
        );
    }

    #[test]
    fn test_no_triggers_never_match() {
        let rs = rules(serde_json::json!({"skills": {"bare": {"priority": "critical"}}}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        assert!(m.match_prompt("anything at all", &["a.rs".to_string()]).is_empty());
        assert!(m.match_shadow_triggers("anything").is_empty());
        assert!(m.match_pre_tool_triggers("Bash", "ls").is_empty());
        assert!(m.match_stop_triggers("anything").is_empty());
    }

    #[test]
    fn test_invalid_patterns_never_abort_matching() {
        let rs = rules(serde_json::json!({"skills": {
            "broken": {
                "promptTriggers": {"intentPatterns": ["(unclosed"]},
                "fileTriggers": {"pathPatterns": ["[z-a]"], "contentPatterns": ["*bad"]},
                "shadowTriggers": {"intentPatterns": ["(("]},
                "preToolTriggers": {"toolName": "Bash", "inputPatterns": ["[oops"]}
            },
            "healthy": {
                "promptTriggers": {"keywords": ["hello"]},
                "shadowTriggers": {"keywords": ["hello"]},
                "preToolTriggers": {"toolName": "Bash"}
            }
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        assert_eq!(names(&m.match_prompt("hello (unclosed", &["a".to_string()])), vec!["healthy"]);
        assert_eq!(m.match_shadow_triggers("hello ((").len(), 1);
        let pre = m.match_pre_tool_triggers("Bash", "[oops");
        assert_eq!(pre.len(), 1);
        assert_eq!(pre[0].skill_name, "healthy");
    }

    #[test]
    fn test_shadow_reasons() {
        let rs = rules(serde_json::json!({"skills": {
            "kw": {"shadowTriggers": {"keywords": ["Docker"], "intentPatterns": ["contain"]}},
            "re": {"shadowTriggers": {"intentPatterns": ["k8s|kubernetes"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");

        let result = m.match_shadow_triggers("docker containers on kubernetes");
        assert_eq!(result.len(), 2);
        let kw = result.iter().find(|s| s.skill_name == "kw").unwrap();
        assert_eq!(kw.reason, "Detected: \"Docker\"");
        assert_eq!(kw.score, 30);
        let re = result.iter().find(|s| s.skill_name == "re").unwrap();
        assert_eq!(re.reason, "Pattern matched: k8s|kubernetes");
        assert_eq!(re.score, 20);
    }

    #[test]
    fn test_pre_tool_git_push_guard() {
        let rs = rules(serde_json::json!({"skills": {
            "git-push-guard": {
                "enforcement": "block",
                "preToolTriggers": {"toolName": "Bash", "inputPatterns": ["git.*push.*--force"]}
            }
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");

        let hit = m.match_pre_tool_triggers("Bash", "git push --force origin main");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].skill_name, "git-push-guard");
        assert_eq!(hit[0].tool_name, "Bash");
        assert_eq!(hit[0].matched_pattern.as_deref(), Some("git.*push.*--force"));

        assert!(m.match_pre_tool_triggers("Bash", "git status").is_empty());
        assert!(m.match_pre_tool_triggers("bash", "git push --force").is_empty());
    }

    #[test]
    fn test_pre_tool_first_matching_pattern_recorded() {
        let rs = rules(serde_json::json!({"skills": {
            "rm": {"preToolTriggers": {"toolName": "Bash", "inputPatterns": ["sudo", "rm -rf"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let hit = m.match_pre_tool_triggers("Bash", "rm -rf / && sudo reboot");
        assert_eq!(hit[0].matched_pattern.as_deref(), Some("sudo"));
    }

    #[test]
    fn test_stop_triggers() {
        let rs = rules(serde_json::json!({"skills": {
            "tests-run": {"stopTriggers": {
                "keywords": ["implemented", "Done"],
                "promptEvaluation": "Did the assistant run the test suite?"
            }},
            "plain": {"stopTriggers": {"keywords": ["done"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let result = m.match_stop_triggers("All DONE, feature implemented");
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].matched_keyword, "implemented");
        assert!(result[0].requires_prompt_evaluation);
        assert_eq!(result[1].matched_keyword, "done");
        assert!(!result[1].requires_prompt_evaluation);
        assert!(m.match_stop_triggers("still working").is_empty());
    }

    #[test]
    fn test_match_files_ignores_prompt_triggers() {
        let rs = rules(serde_json::json!({"skills": {
            "catch-all-intent": {"promptTriggers": {"intentPatterns": [".*"]}},
            "md": {"fileTriggers": {"pathPatterns": ["*.md"]}}
        }}));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let result = m.match_files(&["README.md".to_string()]);
        assert_eq!(names(&result), vec!["md"]);
        assert!(!result[0].prompt_match);
    }

    #[test]
    fn test_custom_weights() {
        let rs = rules(serde_json::json!({
            "settings": {"scoring": {"keyword": 1, "intentPattern": 2}},
            "skills": {"s": {
                "priority": "high",
                "promptTriggers": {"keywords": ["x"], "intentPatterns": ["x"]}
            }}
        }));
        let m = RuleMatcher::new(&rs, "/nonexistent");
        let result = m.match_prompt("x", &[]);
        assert_eq!(result[0].score, 3);
        assert_eq!(result[0].rule.priority, Priority::High);
    }

    #[test]
    fn test_compiled_skill_lookup() {
        let rs = rules(serde_json::json!({"skills": {"api": {
            "promptTriggers": {"keywords": ["api"]},
            "fileTriggers": {"pathPatterns": ["src/**"]},
            "validationRules": [
                {"name": "bad", "condition": {"pathPattern": "(("}, "requirement": {"pattern": "x"}},
                {"name": "good", "condition": {"pathPattern": "^src/"}, "requirement": {"pattern": "x"}}
            ]
        }}}));
        let m = RuleMatcher::new(&rs, "/nonexistent");

        let api = m.skill("api").unwrap();
        assert_eq!(api.triggers.len(), 2);
        assert_eq!(api.validations.len(), 1);
        assert_eq!(api.validations[0].name, "good");
        assert!(m.skill("missing").is_none());
    }
}
