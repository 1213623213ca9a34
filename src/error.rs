use thiserror::Error;

/// Result type for signalflow operations.
///
/// An `Err` crossing a protocol method (`on_next`, `on_error`, `on_complete`)
/// carries only *fatal* escalations that bypass the stage protocol; every
/// recoverable failure is converged onto the terminal error channel instead.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can flow through a stage chain or escalate out of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A side-effect callback failed and the sequence can still terminate
    /// normally through the error channel.
    #[error("stage callback failed: {0}")]
    Callback(String),

    /// An unrecoverable failure. Bypasses the protocol and propagates
    /// directly to the invoking caller instead of terminating the sequence.
    #[error("fatal stage failure: {0}")]
    Fatal(String),

    /// The stage protocol was violated (double subscribe, zero demand,
    /// value delivered past termination under a fail-loud drop policy).
    #[error("protocol violation: {0}")]
    Violation(String),

    /// A failure originating in the upstream source.
    #[error("source failure: {0}")]
    Source(String),

    /// The ultimate consumer registered no error handler. Recognized and
    /// swallowed by upstream stages rather than re-escalated.
    #[error("error callback not implemented")]
    ErrorCallbackMissing,

    /// Cannot build a chain with no stages.
    #[error("cannot build a chain with no stages")]
    EmptyChain,

    /// A primary failure carrying a secondary one as auxiliary context.
    #[error("{primary} (suppressed: {suppressed})")]
    Suppressed {
        primary: Box<FlowError>,
        suppressed: Box<FlowError>,
    },

    /// A failure decorated with the call site of the stage it passed through.
    #[error("at {site}: {source}")]
    Traced { site: String, source: Box<FlowError> },
}

impl FlowError {
    /// Whether this failure is unrecoverable and must bypass the protocol.
    pub fn is_fatal(&self) -> bool {
        match self {
            FlowError::Fatal(_) => true,
            FlowError::Suppressed { primary, .. } => primary.is_fatal(),
            FlowError::Traced { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Whether this is the "consumer registered no error handler" condition.
    pub fn is_error_callback_missing(&self) -> bool {
        match self {
            FlowError::ErrorCallbackMissing => true,
            FlowError::Traced { source, .. } => source.is_error_callback_missing(),
            _ => false,
        }
    }

    /// Attach `suppressed` to `self` as auxiliary context, keeping `self`
    /// as the primary failure.
    pub fn with_suppressed(self, suppressed: FlowError) -> FlowError {
        FlowError::Suppressed {
            primary: Box::new(self),
            suppressed: Box::new(suppressed),
        }
    }

    /// Wrap this failure with the call-site description of the stage it
    /// passed through.
    pub fn traced(self, site: impl Into<String>) -> FlowError {
        FlowError::Traced {
            site: site.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(FlowError::Fatal("oom".into()).is_fatal());
        assert!(!FlowError::Callback("oops".into()).is_fatal());
        assert!(!FlowError::Violation("bad demand".into()).is_fatal());
    }

    #[test]
    fn test_fatal_survives_wrapping() {
        let e = FlowError::Fatal("oom".into())
            .with_suppressed(FlowError::Callback("aux".into()))
            .traced("src/main.rs:10");
        assert!(e.is_fatal());
    }

    #[test]
    fn test_suppressed_keeps_primary() {
        let e = FlowError::Source("boom".into()).with_suppressed(FlowError::Callback("cb".into()));
        match e {
            FlowError::Suppressed { primary, .. } => {
                assert_eq!(*primary, FlowError::Source("boom".into()));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_error_callback_missing_recognized_through_trace() {
        let e = FlowError::ErrorCallbackMissing.traced("lib.rs:1");
        assert!(e.is_error_callback_missing());
        assert!(!FlowError::Callback("x".into()).is_error_callback_missing());
    }
}
