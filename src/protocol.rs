use crate::error::{FlowError, Result};
use std::sync::Arc;

/// The demand side of the stage protocol.
///
/// `request` and `cancel` may be called from any thread, at any time,
/// concurrently with the signal channel and with each other. Implementations
/// must never block; pass-throughs are wait-free. `cancel` is idempotent.
pub trait Subscription: Send + Sync {
    /// Ask the upstream for `n` more values. `n == 0` is a protocol
    /// violation and must be reported, never panicked on. The violation
    /// cannot surface as an error signal: demand arrives on the wait-free
    /// demand channel, possibly from a foreign thread, and re-entering the
    /// serial signal channel from there would break its non-overlapping
    /// guarantee. Implementations log the violation and divert it through
    /// the dropped-error hook family instead.
    fn request(&self, n: u64);

    /// Cooperatively stop the upstream. Must not be blocked by concurrent
    /// delivery.
    fn cancel(&self);
}

/// Negotiated fusion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionMode {
    /// No fusion; values flow through per-value demand accounting.
    None,
    /// Synchronous fusion: the queue is finite and exhaustion means
    /// completion.
    Sync,
    /// Asynchronous fusion: completion arrives through the normal
    /// `on_complete` channel.
    Async,
}

/// The fusion mode a downstream asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedFusion {
    /// Synchronous fusion only.
    Sync,
    /// Asynchronous fusion only.
    Async,
    /// Whatever the upstream can grant.
    Any,
}

impl RequestedFusion {
    /// Whether a `Sync` grant satisfies this request.
    pub fn allows_sync(&self) -> bool {
        matches!(self, RequestedFusion::Sync | RequestedFusion::Any)
    }

    /// Whether an `Async` grant satisfies this request.
    pub fn allows_async(&self) -> bool {
        matches!(self, RequestedFusion::Async | RequestedFusion::Any)
    }
}

/// A fusion negotiation request.
///
/// `thread_barrier` declares that fused values will be polled from a thread
/// other than the signal channel's; stages whose callback was not declared
/// safe for that must reject the negotiation.
#[derive(Debug, Clone, Copy)]
pub struct FusionRequest {
    pub mode: RequestedFusion,
    pub thread_barrier: bool,
}

impl FusionRequest {
    /// Request synchronous fusion.
    pub fn sync() -> Self {
        FusionRequest {
            mode: RequestedFusion::Sync,
            thread_barrier: false,
        }
    }

    /// Request asynchronous fusion.
    pub fn r#async() -> Self {
        FusionRequest {
            mode: RequestedFusion::Async,
            thread_barrier: false,
        }
    }

    /// Request any fusion mode.
    pub fn any() -> Self {
        FusionRequest {
            mode: RequestedFusion::Any,
            thread_barrier: false,
        }
    }

    /// Mark the request as crossing a thread barrier.
    pub fn across_threads(mut self) -> Self {
        self.thread_barrier = true;
        self
    }
}

/// A subscription that additionally exposes a pollable queue, letting
/// adjacent stages exchange values without per-value demand bookkeeping.
pub trait QueueSubscription<T>: Subscription {
    /// Negotiate a fusion mode. Returns [`FusionMode::None`] when the
    /// request cannot be satisfied.
    fn request_fusion(&self, request: FusionRequest) -> FusionMode;

    /// Pull the next fused value. `Ok(None)` is the empty marker.
    fn poll(&self) -> Result<Option<T>>;

    /// Number of values currently queued.
    fn len(&self) -> usize;

    /// Whether the queue is currently empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all queued values.
    fn clear(&self);
}

/// The upstream handle a stage receives in `on_subscribe`, with its queue
/// capability resolved once at composition time.
#[derive(Clone)]
pub enum Upstream<T> {
    /// Demand-only upstream.
    Demand(Arc<dyn Subscription>),
    /// Upstream exposing a pollable queue.
    Fused(Arc<dyn QueueSubscription<T>>),
}

impl<T: Send + 'static> Upstream<T> {
    /// Forward demand upstream.
    pub fn request(&self, n: u64) {
        match self {
            Upstream::Demand(s) => s.request(n),
            Upstream::Fused(s) => s.request(n),
        }
    }

    /// Forward cancellation upstream.
    pub fn cancel(&self) {
        match self {
            Upstream::Demand(s) => s.cancel(),
            Upstream::Fused(s) => s.cancel(),
        }
    }

    /// The queue surface, when the upstream has one.
    pub fn queue(&self) -> Option<&Arc<dyn QueueSubscription<T>>> {
        match self {
            Upstream::Demand(_) => None,
            Upstream::Fused(s) => Some(s),
        }
    }

    /// A plain subscription view of this upstream, for diagnostics.
    pub fn as_subscription(&self) -> Arc<dyn Subscription> {
        match self {
            Upstream::Demand(s) => Arc::clone(s),
            Upstream::Fused(s) => Arc::new(QueueAsSubscription(Arc::clone(s))),
        }
    }
}

/// Demand-only adapter over a fused subscription.
struct QueueAsSubscription<T>(Arc<dyn QueueSubscription<T>>);

impl<T: Send + 'static> Subscription for QueueAsSubscription<T> {
    fn request(&self, n: u64) {
        self.0.request(n);
    }

    fn cancel(&self) {
        self.0.cancel();
    }
}

/// The consumer side of the stage protocol.
///
/// The signal channel (`on_subscribe`, `on_next`, `on_error`, `on_complete`)
/// is serial and non-overlapping by upstream contract: no thread affinity may
/// be assumed across calls, but no concurrency among them either. Exactly one
/// `on_subscribe` precedes any data signal; at most one terminal signal
/// follows.
///
/// An `Err` return is a fatal escalation that bypasses the protocol and must
/// reach the invoking caller; it is never used for recoverable failures.
pub trait Subscriber<T>: Send {
    /// Receive the upstream handle. Called exactly once per well-behaved
    /// upstream.
    fn on_subscribe(&mut self, upstream: Upstream<T>);

    /// Receive one value.
    fn on_next(&mut self, value: T) -> Result<()>;

    /// Receive the terminal failure.
    fn on_error(&mut self, error: FlowError) -> Result<()>;

    /// Receive the terminal completion.
    fn on_complete(&mut self) -> Result<()>;
}

/// A subscriber that can report, per value, whether it accepted it.
///
/// `try_on_next` returning `false` means the value was consumed but filtered
/// out without being forwarded, and without consuming outstanding demand.
pub trait ConditionalSubscriber<T>: Subscriber<T> {
    /// Offer one value; returns whether it was accepted.
    fn try_on_next(&mut self, value: T) -> Result<bool>;
}

impl<T, S: Subscriber<T> + ?Sized> Subscriber<T> for Box<S> {
    fn on_subscribe(&mut self, upstream: Upstream<T>) {
        (**self).on_subscribe(upstream)
    }

    fn on_next(&mut self, value: T) -> Result<()> {
        (**self).on_next(value)
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        (**self).on_error(error)
    }

    fn on_complete(&mut self) -> Result<()> {
        (**self).on_complete()
    }
}

impl<T, S: ConditionalSubscriber<T> + ?Sized> ConditionalSubscriber<T> for Box<S> {
    fn try_on_next(&mut self, value: T) -> Result<bool> {
        (**self).try_on_next(value)
    }
}

/// A stage surface exposing both the signal channel and capability queries.
pub trait StageSubscriber<T>: Subscriber<T> + Inspect {}

impl<T, S: Subscriber<T> + Inspect> StageSubscriber<T> for S {}

/// A conditional stage surface with capability queries.
pub trait ConditionalStageSubscriber<T>: ConditionalSubscriber<T> + Inspect {}

impl<T, S: ConditionalSubscriber<T> + Inspect> ConditionalStageSubscriber<T> for S {}

/// A downstream consumer with its conditional capability resolved once at
/// composition time.
pub enum Downstream<T> {
    /// Always-accepting consumer.
    Plain(Box<dyn Subscriber<T>>),
    /// Consumer exposing conditional acceptance.
    Conditional(Box<dyn ConditionalSubscriber<T>>),
}

impl<T> Downstream<T> {
    /// Wrap a plain subscriber.
    pub fn plain(subscriber: impl Subscriber<T> + 'static) -> Self {
        Downstream::Plain(Box::new(subscriber))
    }

    /// Wrap a conditional subscriber.
    pub fn conditional(subscriber: impl ConditionalSubscriber<T> + 'static) -> Self {
        Downstream::Conditional(Box::new(subscriber))
    }

    /// Whether the consumer exposes conditional acceptance.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Downstream::Conditional(_))
    }

    pub(crate) fn on_subscribe(&mut self, upstream: Upstream<T>) {
        match self {
            Downstream::Plain(s) => s.on_subscribe(upstream),
            Downstream::Conditional(s) => s.on_subscribe(upstream),
        }
    }

    pub(crate) fn on_next(&mut self, value: T) -> Result<()> {
        match self {
            Downstream::Plain(s) => s.on_next(value),
            Downstream::Conditional(s) => s.on_next(value),
        }
    }

    pub(crate) fn on_error(&mut self, error: FlowError) -> Result<()> {
        match self {
            Downstream::Plain(s) => s.on_error(error),
            Downstream::Conditional(s) => s.on_error(error),
        }
    }

    pub(crate) fn on_complete(&mut self) -> Result<()> {
        match self {
            Downstream::Plain(s) => s.on_complete(),
            Downstream::Conditional(s) => s.on_complete(),
        }
    }
}

/// Capability keys answerable by every stage, for diagnostic tooling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    /// The stage's upstream reference.
    Parent,
    /// Whether the stage has reached terminal state.
    Terminated,
}

/// Values returned by capability queries.
pub enum AttrValue {
    /// An upstream reference.
    Subscription(Arc<dyn Subscription>),
    /// A boolean capability.
    Bool(bool),
}

impl AttrValue {
    /// The boolean payload, if this is a boolean attribute.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Subscription(_) => None,
        }
    }
}

/// Diagnostic introspection, orthogonal to the data/control protocol.
pub trait Inspect {
    /// Answer a capability query, or `None` when the key is not understood.
    fn attr(&self, key: Attr) -> Option<AttrValue>;
}
