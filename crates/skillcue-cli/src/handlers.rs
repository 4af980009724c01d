//! One handler per hook event.

use anyhow::{Context, Result};
use chrono::Utc;
use skillcue_config::SkillcueConfig;
use skillcue_hooks::{
    HookInput, HookOutput, encode_pre_tool, encode_prompt, encode_stop, read_last_turn,
};
use skillcue_matcher::content::relativize;
use skillcue_matcher::{RuleMatcher, ShadowMatch, SkillMatch, limit_matches};
use skillcue_session::{SessionStore, to_chrono};
use skillcue_types::{Priority, SkillType};
use std::path::Path;
use std::time::Duration;

/// Session GC runs on every Nth tool use.
pub const CLEANUP_INTERVAL: u64 = 50;

/// PreToolUse: gate the tool call. Needs no session state, so it runs even
/// when the session cache cannot be opened.
pub fn pre_tool_use(config: &SkillcueConfig, input: &HookInput) -> HookOutput {
    let Some(tool_name) = input.tool_name.as_deref() else {
        return HookOutput::empty();
    };
    let matcher = RuleMatcher::new(&config.rules, config.project_root.clone());
    let matches = matcher.match_pre_tool_triggers(tool_name, &input.tool_input_text());
    encode_pre_tool(&matches, |name| config.load_content(name))
}

/// Loaded configuration plus the session store it points at.
pub struct Hooks {
    config: SkillcueConfig,
    store: SessionStore,
}

impl Hooks {
    pub async fn open(config: SkillcueConfig) -> Result<Self> {
        let cache_dir = config.cache_dir();
        let store = SessionStore::new(&cache_dir)
            .await
            .with_context(|| format!("Failed to open session cache {}", cache_dir.display()))?;
        Ok(Self { config, store })
    }

    fn matcher(&self) -> RuleMatcher<'_> {
        RuleMatcher::new(&self.config.rules, self.config.project_root.clone())
    }

    fn cooldown(&self) -> chrono::Duration {
        let minutes = self.config.rules.settings.thresholds.recent_activation_minutes;
        to_chrono(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// UserPromptSubmit: surface matching skills as prompt context and
    /// record them in the session.
    pub async fn prompt_submit(&self, input: &HookInput) -> Result<HookOutput> {
        let Some(prompt) = input.prompt.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Ok(HookOutput::empty());
        };
        let rules = &self.config.rules;
        if rules.is_empty() {
            return Ok(HookOutput::empty());
        }

        let now = Utc::now();
        let cooldown = self.cooldown();
        let mut session = self.store.load(&input.session_id).await?;
        session.prune_stale_activations(cooldown, now);

        let matcher = self.matcher();
        let fresh: Vec<SkillMatch<'_>> = matcher
            .match_prompt(prompt, &session.modified_files)
            .into_iter()
            .filter(|m| {
                let cooling = m.rule.priority != Priority::Critical
                    && session.is_recently_activated(m.skill_name, cooldown, now);
                if cooling {
                    tracing::debug!("Skipping '{}': activated recently", m.skill_name);
                }
                !cooling
            })
            .collect();
        let max = rules.settings.max_suggestions;
        let surfaced = limit_matches(fresh, max);

        let related: Vec<ShadowMatch<'_>> = matcher
            .match_shadow_triggers(prompt)
            .into_iter()
            .filter(|s| !surfaced.iter().any(|m| m.skill_name == s.skill_name))
            .collect();
        let related = limit_matches(related, max);

        let names: Vec<String> = surfaced.iter().map(|m| m.skill_name.to_string()).collect();
        let domains: Vec<String> = surfaced
            .iter()
            .filter(|m| m.rule.skill_type == SkillType::Domain)
            .map(|m| m.skill_name.to_string())
            .collect();
        for name in &names {
            session.record_activation(name, now);
        }
        session.set_current_prompt_skills(&names);
        session.add_active_domains(&domains);
        self.store.save(&input.session_id, &session).await?;

        tracing::debug!(
            "Prompt surfaced {} skill(s), {} related",
            surfaced.len(),
            related.len()
        );
        Ok(encode_prompt(&surfaced, &related, |name| {
            self.config.load_content(name)
        }))
    }

    /// PostToolUse: track edited files and count tool uses. Never says anything.
    pub async fn post_tool_use(&self, input: &HookInput) -> Result<HookOutput> {
        if let Some(path) = input.edited_file() {
            let rel = relativize(&self.config.project_root, path);
            if self.store.add_modified_file(&input.session_id, &rel).await? {
                tracing::debug!("Tracking modified file {rel}");
            }
        }

        let count = self.store.increment_tool_use_count(&input.session_id).await?;
        if count % CLEANUP_INTERVAL == 0 {
            match self.cleanup().await {
                Ok(removed) => tracing::debug!("Periodic cleanup removed {removed} session(s)"),
                Err(e) => tracing::warn!("Periodic cleanup failed: {e:#}"),
            }
        }
        Ok(HookOutput::empty())
    }

    /// Stop: stop-keyword check-ins plus validation reminders for the
    /// skills active in this session.
    pub async fn stop(&self, input: &HookInput) -> Result<HookOutput> {
        if input.stop_hook_active {
            return Ok(HookOutput::empty());
        }
        let session = self.store.load(&input.session_id).await?;
        let matcher = self.matcher();

        let turn = input
            .transcript_path
            .as_deref()
            .map(|p| read_last_turn(Path::new(p)))
            .unwrap_or_default();
        let stop_matches = if turn.is_empty() {
            Vec::new()
        } else {
            matcher.match_stop_triggers(&turn.search_text())
        };

        let mut active = session.current_prompt_skills.clone();
        active.extend(session.active_domains.iter().cloned());
        active.extend(
            matcher
                .match_files(&session.modified_files)
                .into_iter()
                .map(|m| m.skill_name.to_string()),
        );
        let reminders = matcher.apply_validation_rules(&session.modified_files, &active);

        Ok(encode_stop(&stop_matches, &reminders))
    }

    /// Garbage-collect session records per the configured thresholds.
    pub async fn cleanup(&self) -> Result<usize> {
        let thresholds = &self.config.rules.settings.thresholds;
        let retention = Duration::from_secs(thresholds.session_retention_hours.saturating_mul(3600));
        let removed = self
            .store
            .cleanup_old_sessions(retention, thresholds.max_sessions)
            .await?;
        Ok(removed)
    }
}
