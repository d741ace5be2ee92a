/// Returned when a batch cannot start at all.
///
/// This is the only error that stops a batch. Failures of individual targets are recorded against
/// that target and the batch moves on to the next one, so nothing after the input list has been
/// read should produce this error.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("Batch aborted: {msg}")]
pub struct BatchAbortError {
    msg: String,
}

impl BatchAbortError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl Default for BatchAbortError {
    fn default() -> Self {
        Self {
            msg: "No targets to run".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_display_abort_reason() {
        let err = BatchAbortError::new("URL list 'urls.txt' not found");
        assert_eq!(
            err.to_string(),
            "Batch aborted: URL list 'urls.txt' not found"
        );
        assert_eq!(err.message(), "URL list 'urls.txt' not found");
    }

    #[test]
    fn test_should_be_usable_as_anyhow_error() {
        let err: anyhow::Error = BatchAbortError::default().into();
        assert!(err.is::<BatchAbortError>());
        assert_eq!(err.to_string(), "Batch aborted: No targets to run");
    }
}
