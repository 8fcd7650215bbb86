use std::io;

use thiserror::Error;

/// Failure of a single persistent-store operation.
///
/// The Display text is what the user sees; the underlying fault is kept as the
/// error source for logs.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Error opening database")]
    Open(#[source] StoreFault),
    #[error("Failed to retrieve test history.")]
    Read(#[source] StoreFault),
    #[error("Failed to save the test.")]
    Save(#[source] StoreFault),
    #[error("Failed to clear test history.")]
    Clear(#[source] StoreFault),
}

#[derive(Debug, Error)]
pub enum StoreFault {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed history table: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported history schema version {found} (expected {expected})")]
    Schema { found: u32, expected: u32 },
    #[error("history table lock poisoned")]
    Poisoned,
}

/// Which generation call failed; only changes the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationTarget {
    Notes,
    Flashcards,
    MockTest,
}

impl GenerationTarget {
    pub fn failure_message(self) -> &'static str {
        match self {
            GenerationTarget::Notes => "Failed to generate revision notes. Please try again.",
            GenerationTarget::Flashcards => {
                "Failed to generate flashcards. The AI couldn't process the request."
            }
            GenerationTarget::MockTest => {
                "Failed to generate the mock test. Please try adjusting your options."
            }
        }
    }
}

/// Coarse error returned by every AI gateway call.
#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("{}", .target.failure_message())]
    Generation {
        target: GenerationTarget,
        #[source]
        source: GatewayFault,
    },
    #[error("Failed to analyze the question paper. Please ensure it's a valid PDF.")]
    Analysis(#[source] GatewayFault),
    #[error("The AI could not evaluate your answer at this time. Please try again.")]
    Evaluation(#[source] GatewayFault),
}

impl RemoteServiceError {
    pub fn fault(&self) -> &GatewayFault {
        match self {
            RemoteServiceError::Generation { source, .. } => source,
            RemoteServiceError::Analysis(fault) | RemoteServiceError::Evaluation(fault) => fault,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayFault {
    #[error("no API key configured (set {0} or GEMINI_API_KEY)")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response contained no text")]
    EmptyResponse,
    #[error("response was not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("network support is disabled in this build")]
    NetworkDisabled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn storage_error_displays_user_message_and_keeps_source() {
        let err = StorageError::Save(StoreFault::Io(io::Error::new(
            io::ErrorKind::StorageFull,
            "disk full",
        )));
        assert_eq!(err.to_string(), "Failed to save the test.");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }

    #[test]
    fn generation_message_follows_target() {
        let err = RemoteServiceError::Generation {
            target: GenerationTarget::Flashcards,
            source: GatewayFault::EmptyResponse,
        };
        assert!(err.to_string().starts_with("Failed to generate flashcards."));
        assert!(matches!(err.fault(), GatewayFault::EmptyResponse));
    }
}
