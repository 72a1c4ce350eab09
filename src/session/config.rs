//! Session configuration

use std::time::Duration;

use tokio::runtime::Handle;

/// Configuration for an interactive session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Entry point to trigger, the first registered one when unset
    pub entry_point: Option<String>,

    /// Input key used when the entry node declares none
    pub default_input_key: String,

    /// Node that receives form responses
    pub form_response_node: String,

    /// Characters of streaming text shown in the live preview
    pub preview_chars: usize,

    /// Characters of tool output shown in history
    pub tool_preview_chars: usize,

    /// Upper bound for a single runtime call, `None` waits forever
    ///
    /// A timed out call ends the interaction while the runtime may still be
    /// working on it.
    pub call_timeout: Option<Duration>,

    /// Runtime that executes runtime calls, the current one when unset
    pub dispatch: Option<Handle>,

    /// Display events buffered for a slow surface
    pub display_capacity: usize,
}

impl SessionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            entry_point: None,
            default_input_key: "input".to_string(),
            form_response_node: "artifact_form".to_string(),
            preview_chars: 80,
            tool_preview_chars: 200,
            call_timeout: None,
            dispatch: None,
            display_capacity: 256,
        }
    }

    /// Set the entry point to trigger
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = Some(entry_point.into());
        self
    }

    /// Set the fallback input key
    pub fn with_default_input_key(mut self, key: impl Into<String>) -> Self {
        self.default_input_key = key.into();
        self
    }

    /// Set the node receiving form responses
    pub fn with_form_response_node(mut self, node_id: impl Into<String>) -> Self {
        self.form_response_node = node_id.into();
        self
    }

    /// Set the live preview width
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Set the tool output preview width
    pub fn with_tool_preview_chars(mut self, chars: usize) -> Self {
        self.tool_preview_chars = chars;
        self
    }

    /// Set the call timeout
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run runtime calls on a dedicated tokio runtime
    pub fn with_dispatch(mut self, handle: Handle) -> Self {
        self.dispatch = Some(handle);
        self
    }

    /// Set the display buffer size, at least one event
    pub fn with_display_capacity(mut self, capacity: usize) -> Self {
        self.display_capacity = capacity.max(1);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.entry_point, None);
        assert_eq!(config.default_input_key, "input");
        assert_eq!(config.form_response_node, "artifact_form");
        assert_eq!(config.preview_chars, 80);
        assert_eq!(config.tool_preview_chars, 200);
        assert_eq!(config.call_timeout, None);
        assert!(config.dispatch.is_none());
        assert_eq!(config.display_capacity, 256);
    }

    #[test]
    fn test_builder_methods() {
        let config = SessionConfig::new()
            .with_entry_point("deploy")
            .with_default_input_key("request")
            .with_form_response_node("form_reply")
            .with_preview_chars(40)
            .with_display_capacity(0)
            .with_call_timeout(Some(Duration::from_secs(5)));

        assert_eq!(config.entry_point.as_deref(), Some("deploy"));
        assert_eq!(config.default_input_key, "request");
        assert_eq!(config.form_response_node, "form_reply");
        assert_eq!(config.preview_chars, 40);
        assert_eq!(config.display_capacity, 1);
        assert_eq!(config.call_timeout, Some(Duration::from_secs(5)));
    }
}
