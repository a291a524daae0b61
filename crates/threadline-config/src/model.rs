//! Configuration schema for Threadline.

use serde::{Deserialize, Serialize};

/// Placeholder in `completion.success_message` replaced by the tool name.
pub const TOOL_NAME_PLACEHOLDER: &str = "{tool_name}";

/// Root config for Threadline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadlineConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl ThreadlineConfig {
    /// Defaults, with whole sections replaced through the builder.
    pub fn builder() -> ThreadlineConfigBuilder {
        ThreadlineConfigBuilder::new()
    }
}

/// Builder for assembling a `ThreadlineConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ThreadlineConfigBuilder {
    config: ThreadlineConfig,
}

impl ThreadlineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ThreadlineConfig::default(),
        }
    }

    /// Replace the tool completion configuration.
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.config.completion = completion;
        self
    }

    /// Replace the migration configuration.
    pub fn migration(mut self, migration: MigrationConfig) -> Self {
        self.config.migration = migration;
        self
    }

    /// Finalize and return the built `ThreadlineConfig`.
    pub fn build(self) -> ThreadlineConfig {
        self.config
    }
}

/// Tool completion coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Step cap applied to each scheduled continuation.
    #[serde(default = "default_max_continuation_steps")]
    pub max_continuation_steps: u32,
    /// Message recorded for successful tool outcomes. `{tool_name}` is
    /// replaced with the tool's name.
    #[serde(default = "default_success_message")]
    pub success_message: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_continuation_steps: default_max_continuation_steps(),
            success_message: default_success_message(),
        }
    }
}

impl CompletionConfig {
    /// Render the success message for a tool.
    pub fn success_message_for(&self, tool_name: &str) -> String {
        self.success_message.replace(TOOL_NAME_PLACEHOLDER, tool_name)
    }
}

fn default_max_continuation_steps() -> u32 {
    1
}

fn default_success_message() -> String {
    "The {tool_name} action completed successfully.".to_string()
}

/// Thread ownership migration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Threads fetched per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = ThreadlineConfig::default();
        assert_eq!(config.completion.max_continuation_steps, 1);
        assert_eq!(config.migration.page_size, 50);
    }

    #[test]
    fn success_message_substitutes_tool_name() {
        let completion = CompletionConfig::default();
        assert_eq!(
            completion.success_message_for("send_email"),
            "The send_email action completed successfully."
        );

        let custom = CompletionConfig {
            success_message: "{tool_name} ok ({tool_name})".to_string(),
            ..CompletionConfig::default()
        };
        assert_eq!(custom.success_message_for("fetch"), "fetch ok (fetch)");
    }

    #[test]
    fn builder_replaces_sections() {
        let config = ThreadlineConfig::builder()
            .migration(MigrationConfig { page_size: 10 })
            .build();
        assert_eq!(config.migration.page_size, 10);
        assert_eq!(config.completion.max_continuation_steps, 1);
    }
}
