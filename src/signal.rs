use crate::error::FlowError;
use std::fmt;
use std::sync::Arc;

/// The kind of event a [`Signal`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// The subscription handshake.
    Subscribe,
    /// A value moving downstream.
    Next,
    /// Terminal failure.
    Error,
    /// Terminal successful completion.
    Complete,
}

/// A small immutable key/value capture attached to a stage at composition
/// time and surfaced on every signal view.
///
/// `with` never mutates in place; it returns a new context sharing nothing
/// mutable with the old one.
#[derive(Debug, Clone, Default)]
pub struct Context {
    entries: Option<Arc<Vec<(String, String)>>>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new context with `key` set to `value`, replacing any
    /// previous entry for the same key.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Context {
        let key = key.into();
        let mut entries: Vec<(String, String)> = self
            .entries
            .as_deref()
            .map(|e| e.iter().filter(|(k, _)| *k != key).cloned().collect())
            .unwrap_or_default();
        entries.push((key, value.into()));
        Context {
            entries: Some(Arc::new(entries)),
        }
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .as_deref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the context holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.as_deref().map_or(true, |e| e.is_empty())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.as_deref().map_or(0, |e| e.len())
    }
}

/// A borrowed view of one signal flowing through a stage.
///
/// The view is valid only for the duration of the callback invocation it is
/// handed to; the borrows make retaining it past the callback a compile
/// error rather than a documented footgun.
pub struct Signal<'a, T> {
    kind: SignalKind,
    value: Option<&'a T>,
    error: Option<&'a FlowError>,
    context: &'a Context,
}

impl<'a, T> Signal<'a, T> {
    /// A subscription signal.
    pub fn subscribe(context: &'a Context) -> Self {
        Signal {
            kind: SignalKind::Subscribe,
            value: None,
            error: None,
            context,
        }
    }

    /// A next-value signal viewing `value`.
    pub fn next(value: &'a T, context: &'a Context) -> Self {
        Signal {
            kind: SignalKind::Next,
            value: Some(value),
            error: None,
            context,
        }
    }

    /// A terminal error signal viewing `error`.
    pub fn error(error: &'a FlowError, context: &'a Context) -> Self {
        Signal {
            kind: SignalKind::Error,
            value: None,
            error: Some(error),
            context,
        }
    }

    /// A terminal completion signal.
    pub fn complete(context: &'a Context) -> Self {
        Signal {
            kind: SignalKind::Complete,
            value: None,
            error: None,
            context,
        }
    }

    /// The kind of this signal.
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// The value carried by a `Next` signal.
    pub fn value(&self) -> Option<&'a T> {
        self.value
    }

    /// The failure carried by an `Error` signal.
    pub fn err(&self) -> Option<&'a FlowError> {
        self.error
    }

    /// The context captured by the owning stage.
    pub fn context(&self) -> &'a Context {
        self.context
    }

    /// Whether this is a terminal (error or complete) signal.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SignalKind::Error | SignalKind::Complete)
    }
}

impl<'a, T> Clone for Signal<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Signal<'a, T> {}

impl<'a, T: fmt::Debug> fmt::Debug for Signal<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("error", &self.error)
            .finish()
    }
}
