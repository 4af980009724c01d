//! Wire types for the hook protocol.

use serde::{Deserialize, Serialize};

/// Tools whose `file_path` is recorded as a modified file.
pub const FILE_EDIT_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];

/// Events the engine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEventName {
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    Stop,
}

/// JSON payload the host sends on stdin. Only `session_id` is required;
/// everything else depends on the event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_event_name: Option<HookEventName>,
    /// UserPromptSubmit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// PreToolUse / PostToolUse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    /// Stop: set when the host is already continuing because of a Stop hook.
    #[serde(default)]
    pub stop_hook_active: bool,
}

impl HookInput {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The text input patterns are matched against: the `command` field when
    /// present, otherwise every string value in the tool input joined by
    /// newlines.
    pub fn tool_input_text(&self) -> String {
        let Some(input) = &self.tool_input else {
            return String::new();
        };
        if let Some(command) = input.get("command").and_then(|v| v.as_str()) {
            return command.to_string();
        }
        let mut parts = Vec::new();
        collect_strings(input, &mut parts);
        parts.join("\n")
    }

    /// The file an editing tool touched, if this is one.
    pub fn edited_file(&self) -> Option<&str> {
        let tool = self.tool_name.as_deref()?;
        if !FILE_EDIT_TOOLS.contains(&tool) {
            return None;
        }
        let input = self.tool_input.as_ref()?;
        input
            .get("file_path")
            .or_else(|| input.get("notebook_path"))
            .and_then(|v| v.as_str())
            .filter(|p| !p.is_empty())
    }
}

fn collect_strings<'v>(value: &'v serde_json::Value, out: &mut Vec<&'v str>) {
    match value {
        serde_json::Value::String(s) => out.push(s),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Tool-gating verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
    /// Defer to the user. Part of the vocabulary; no enforcement maps to it.
    Ask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: HookEventName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<PermissionDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// JSON object written to stdout. The default value serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookOutput {
    /// "Nothing to say": allow, no comment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hook_specific_output.is_none() && self.system_message.is_none()
    }

    pub fn permission(
        decision: PermissionDecision,
        reason: Option<String>,
        context: Option<String>,
    ) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: HookEventName::PreToolUse,
                permission_decision: Some(decision),
                permission_decision_reason: reason,
                additional_context: context,
            }),
            system_message: None,
        }
    }

    pub fn prompt_context(context: String) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: HookEventName::UserPromptSubmit,
                permission_decision: None,
                permission_decision_reason: None,
                additional_context: Some(context),
            }),
            system_message: None,
        }
    }

    pub fn system_message(message: String) -> Self {
        Self {
            hook_specific_output: None,
            system_message: Some(message),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
