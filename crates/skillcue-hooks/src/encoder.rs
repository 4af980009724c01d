//! Decision encoder: turns matcher output into hook protocol output.

use crate::types::{HookOutput, PermissionDecision};
use skillcue_matcher::{PreToolMatch, ShadowMatch, SkillMatch, StopMatch, ValidationReminder};
use skillcue_types::util::truncate_with_note;
use skillcue_types::{Enforcement, Priority, SkillType};
use std::fmt::Write;

/// Skill body attached to a deny decision is cut at this size.
pub const MAX_BLOCK_CONTENT_BYTES: usize = 4 * 1024;

/// Skill bodies inlined into prompt context are cut at this size.
pub const MAX_INLINE_CONTENT_BYTES: usize = 16 * 1024;

/// Encode a tool-gating decision.
///
/// The first `block` match denies, carrying the skill's description and
/// body. Otherwise all `warn` matches fold into one advisory context and
/// the call is allowed. Anything else says nothing.
pub fn encode_pre_tool(
    matches: &[PreToolMatch<'_>],
    load_content: impl Fn(&str) -> Option<String>,
) -> HookOutput {
    if let Some(block) = matches
        .iter()
        .find(|m| m.rule.enforcement == Enforcement::Block)
    {
        let mut reason = format!(
            "{} blocked by skill '{}': {}",
            block.tool_name,
            block.skill_name,
            describe(&block.rule.description)
        );
        if let Some(pattern) = &block.matched_pattern {
            let _ = write!(reason, " (matched `{pattern}`)");
        }
        if let Some(body) = load_content(block.skill_name) {
            let body = body.trim();
            if !body.is_empty() {
                reason.push_str("\n\n");
                reason.push_str(&truncate_with_note(body, MAX_BLOCK_CONTENT_BYTES));
            }
        }
        tracing::debug!("Denying {} via skill '{}'", block.tool_name, block.skill_name);
        return HookOutput::permission(PermissionDecision::Deny, Some(reason), None);
    }

    let warnings: Vec<String> = matches
        .iter()
        .filter(|m| m.rule.enforcement == Enforcement::Warn)
        .map(|m| {
            format!(
                "⚠ {} ({}): {}",
                m.skill_name,
                m.rule.priority.as_str(),
                describe(&m.rule.description)
            )
        })
        .collect();
    if warnings.is_empty() {
        return HookOutput::empty();
    }
    HookOutput::permission(PermissionDecision::Allow, None, Some(warnings.join("\n")))
}

/// Encode the context block for a submitted prompt.
///
/// Guardrail skills of critical priority are guaranteed and get their body
/// inlined; the other matches are suggested; shadow matches are related.
pub fn encode_prompt(
    matches: &[SkillMatch<'_>],
    related: &[ShadowMatch<'_>],
    load_content: impl Fn(&str) -> Option<String>,
) -> HookOutput {
    let (guaranteed, suggested): (Vec<&SkillMatch<'_>>, Vec<&SkillMatch<'_>>) =
        matches.iter().partition(|m| is_guaranteed(m));
    if guaranteed.is_empty() && suggested.is_empty() && related.is_empty() {
        return HookOutput::empty();
    }

    let mut out = String::from("<skill-activation>\n");

    if !guaranteed.is_empty() {
        out.push_str("<guaranteed>\n");
        for m in &guaranteed {
            let _ = writeln!(
                out,
                "<skill name=\"{}\" priority=\"{}\">",
                m.skill_name,
                m.rule.priority.as_str()
            );
            let _ = writeln!(out, "{}", describe(&m.rule.description));
            if let Some(body) = load_content(m.skill_name) {
                let body = body.trim();
                if !body.is_empty() {
                    let _ = writeln!(
                        out,
                        "\n{}",
                        truncate_with_note(body, MAX_INLINE_CONTENT_BYTES)
                    );
                }
            }
            out.push_str("</skill>\n");
        }
        out.push_str("</guaranteed>\n");
    }

    if !suggested.is_empty() {
        out.push_str("<suggested>\n");
        for m in &suggested {
            let _ = writeln!(
                out,
                "- {} [{}]: {}",
                m.skill_name,
                m.rule.priority.as_str(),
                describe(&m.rule.description)
            );
        }
        out.push_str("</suggested>\n");
    }

    if !related.is_empty() {
        out.push_str("<related>\n");
        for m in related {
            let _ = writeln!(
                out,
                "- {}: {} ({})",
                m.skill_name,
                describe(&m.rule.description),
                m.reason
            );
        }
        out.push_str("</related>\n");
    }

    out.push_str("</skill-activation>");
    HookOutput::prompt_context(out)
}

/// Encode the end-of-turn report. `{}` when there is nothing to say.
pub fn encode_stop(
    stop_matches: &[StopMatch<'_>],
    reminders: &[ValidationReminder<'_>],
) -> HookOutput {
    let mut sections = Vec::new();
    if !stop_matches.is_empty() {
        sections.push(render_stop_matches(stop_matches));
    }
    if !reminders.is_empty() {
        sections.push(render_reminders(reminders));
    }
    if sections.is_empty() {
        return HookOutput::empty();
    }
    HookOutput::system_message(sections.join("\n\n"))
}

/// `⚠ <rule> (<skill>): <message>` followed by one indented line per file.
pub fn render_reminders(reminders: &[ValidationReminder<'_>]) -> String {
    let mut out = String::new();
    for (i, r) in reminders.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "⚠ {} ({}): {}", r.rule_name, r.skill_name, r.message);
        for file in &r.failed_files {
            let _ = write!(out, "\n  - {file}");
        }
    }
    out
}

fn render_stop_matches(matches: &[StopMatch<'_>]) -> String {
    let mut out = String::from("Before finishing, review:");
    for m in matches {
        let _ = write!(
            out,
            "\n● {} (\"{}\"): {}",
            m.skill_name,
            m.matched_keyword,
            describe(&m.rule.description)
        );
        if m.requires_prompt_evaluation {
            if let Some(question) = m
                .rule
                .stop_triggers
                .as_ref()
                .and_then(|t| t.prompt_evaluation.as_deref())
            {
                let _ = write!(out, "\n  ? {question}");
            }
        }
    }
    out
}

fn is_guaranteed(m: &SkillMatch<'_>) -> bool {
    m.rule.skill_type == SkillType::Guardrail && m.rule.priority == Priority::Critical
}

fn describe(description: &str) -> &str {
    if description.trim().is_empty() {
        "(no description)"
    } else {
        description.trim()
    }
}
