//! Command request and response types

use serde::{Deserialize, Serialize};

/// A slash command as received from the chat host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArgs {
    /// Full command line, e.g. `/pagerduty oncall`
    pub command: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
}

impl CommandArgs {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible only to the user who ran the command
    #[default]
    Ephemeral,
    InChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub response_type: ResponseType,
    pub text: String,
}

impl CommandResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: text.into(),
        }
    }
}

/// Autocomplete tree registered with the chat host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteData {
    pub trigger: String,
    pub hint: String,
    pub help_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_commands: Vec<AutocompleteData>,
}

impl AutocompleteData {
    pub fn new(trigger: &str, hint: &str, help_text: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            hint: hint.to_string(),
            help_text: help_text.to_string(),
            sub_commands: Vec::new(),
        }
    }

    pub fn add_command(&mut self, command: AutocompleteData) {
        self.sub_commands.push(command);
    }
}
