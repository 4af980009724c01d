//! Validation rules: post-hoc evidence checks over modified files.

use crate::content::candidates;
use crate::matcher::RuleMatcher;
use crate::types::ValidationReminder;

impl<'a> RuleMatcher<'a> {
    /// Run the validation rules of each active skill over `modified_files`.
    ///
    /// A file is a candidate for a rule when its path matches the rule's
    /// condition; it fails when the requirement is not met. All failures
    /// for one rule fold into one reminder. Reminders are ordered by the
    /// owning skill's priority, keeping encounter order within a priority.
    pub fn apply_validation_rules(
        &self,
        modified_files: &[String],
        active_skill_names: &[String],
    ) -> Vec<ValidationReminder<'a>> {
        let files = candidates(self.project_root(), modified_files);
        if files.is_empty() {
            return Vec::new();
        }

        let mut seen: Vec<&str> = Vec::new();
        let mut reminders = Vec::new();
        for name in active_skill_names {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);

            let Some(skill) = self.skill(name) else {
                tracing::debug!("Active skill '{name}' is not in the rule set");
                continue;
            };

            for validation in &skill.validations {
                let failed_files: Vec<String> = files
                    .iter()
                    .filter(|f| validation.condition.is_match(&f.rel_path))
                    .filter(|f| {
                        !validation
                            .requirement
                            .is_satisfied(self.project_root(), f)
                    })
                    .map(|f| f.rel_path.clone())
                    .collect();

                if failed_files.is_empty() {
                    continue;
                }
                tracing::debug!(
                    "Validation '{}' ({}) failed for {} file(s)",
                    validation.name,
                    skill.name,
                    failed_files.len()
                );
                reminders.push(ValidationReminder {
                    rule_name: validation.name.to_string(),
                    skill_name: skill.name,
                    priority: skill.rule.priority,
                    failed_files,
                    message: validation.reminder.to_string(),
                });
            }
        }

        reminders.sort_by_key(|r| r.priority);
        reminders
    }
}
