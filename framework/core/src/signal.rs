//! The two ways the speed test executable tells us it finished normally.

/// A streamed JSON message that marks the end of a run, e.g. `{"info":"eof"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSentinel {
    /// The field of the JSON object to inspect.
    pub field: String,
    /// The string value of [`Self::field`] that signals completion.
    pub value: String,
}

impl Default for CompletionSentinel {
    fn default() -> Self {
        Self {
            field: "info".to_string(),
            value: "eof".to_string(),
        }
    }
}

impl CompletionSentinel {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check whether a single line of output is the sentinel message.
    ///
    /// Lines that are not JSON objects, or whose field is missing or not a string, never match.
    pub fn matches(&self, line: &str) -> bool {
        let line = line.trim();
        if !line.starts_with('{') {
            return false;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(message) => {
                message.get(&self.field).and_then(|v| v.as_str()) == Some(self.value.as_str())
            }
            Err(e) => {
                log::trace!("Ignoring output line that is not a JSON message: {e}");
                false
            }
        }
    }
}

/// A literal string written into the log file when the executable terminates normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMarker(pub String);

impl Default for LogMarker {
    fn default() -> Self {
        Self("--EOF--".to_string())
    }
}

impl LogMarker {
    pub fn is_present_in(&self, content: &str) -> bool {
        content.contains(&self.0)
    }
}
