//! The side-effecting stage: runs a caller-supplied handler against every
//! signal passing through, then forwards the signal unchanged.
//!
//! One generic stage covers the four capability combinations. Fusion
//! capability and cross-thread callback safety are declared up front through
//! [`StageOptions`]; the conditional path is resolved by the shape of the
//! downstream handed to [`build`].

use crate::erased::{DynStage, EraseStage, TypedFront};
use crate::error::{FlowError, Result};
use crate::hooks::{self, CallSite};
use crate::protocol::{
    Attr, AttrValue, ConditionalStageSubscriber, ConditionalSubscriber, Downstream, FusionMode,
    FusionRequest, Inspect, QueueSubscription, StageSubscriber, Subscriber, Subscription, Upstream,
};
use crate::signal::{Context, Signal};
use arc_swap::ArcSwapOption;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The caller-supplied signal observer.
///
/// The signal view is valid only for the duration of the call. An `Err`
/// return diverts the sequence: recoverable failures converge onto the
/// terminal error channel, fatal ones escalate past the protocol.
pub type SignalHandler<T> = Arc<dyn Fn(&Signal<'_, T>) -> Result<()> + Send + Sync>;

/// Capabilities and placement of a stage, fixed at composition time.
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Whether the stage participates in fusion negotiation at all.
    pub fusion_capable: bool,
    /// Whether the handler may run on a thread other than the signal
    /// channel's. Gates fusion requests that cross a thread barrier.
    pub barrier_safe: bool,
    /// Whether this is the outermost stage of its chain, eligible for
    /// last-stage decoration.
    pub terminal: bool,
    /// Diagnostic context surfaced on every signal view.
    pub context: Context,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the stage to take part in fusion negotiation.
    pub fn fuseable(mut self) -> Self {
        self.fusion_capable = true;
        self
    }

    /// Declare the handler safe to run across a thread barrier.
    pub fn barrier_safe(mut self) -> Self {
        self.barrier_safe = true;
        self
    }

    /// Mark the stage as the outermost of its chain.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Attach a diagnostic context.
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

/// State shared between the stage (signal channel) and the subscription
/// handed downstream (demand channel, any thread).
struct PeekLink<T> {
    handler: SignalHandler<T>,
    upstream: ArcSwapOption<Upstream<T>>,
    terminated: AtomicBool,
    sync_fused: AtomicBool,
    fusion_capable: bool,
    barrier_safe: bool,
    context: Context,
}

impl<T: Send + 'static> Subscription for PeekLink<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            tracing::warn!("non-positive demand requested");
            let violation = FlowError::Violation("zero demand requested".into());
            if let Err(e) = hooks::error_dropped(&violation, &self.context) {
                tracing::warn!(error = %e, "dropped-error hook failed reporting bad demand");
            }
            return;
        }
        if let Some(up) = self.upstream.load_full() {
            up.request(n);
        }
    }

    fn cancel(&self) {
        if let Some(up) = self.upstream.load_full() {
            up.cancel();
        }
    }
}

impl<T: Send + 'static> QueueSubscription<T> for PeekLink<T> {
    fn request_fusion(&self, request: FusionRequest) -> FusionMode {
        if !self.fusion_capable {
            return FusionMode::None;
        }
        if request.thread_barrier && !self.barrier_safe {
            return FusionMode::None;
        }
        let Some(up) = self.upstream.load_full() else {
            return FusionMode::None;
        };
        let Some(queue) = up.queue() else {
            return FusionMode::None;
        };
        let granted = queue.request_fusion(request);
        if granted == FusionMode::Sync {
            self.sync_fused.store(true, Ordering::Release);
        }
        granted
    }

    fn poll(&self) -> Result<Option<T>> {
        let Some(up) = self.upstream.load_full() else {
            return Ok(None);
        };
        let Some(queue) = up.queue() else {
            return Ok(None);
        };
        match queue.poll()? {
            Some(value) => {
                let signal = Signal::next(&value, &self.context);
                if let Err(e) = (self.handler)(&signal) {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    let any: &(dyn Any + Send) = &value;
                    return Err(hooks::map_operator_error(e, Some(any)));
                }
                Ok(Some(value))
            }
            None => {
                // Under synchronous fusion the empty marker is completion;
                // the completion callback must fire exactly once.
                if self.sync_fused.load(Ordering::Acquire)
                    && !self.terminated.swap(true, Ordering::AcqRel)
                {
                    (self.handler)(&Signal::complete(&self.context))?;
                }
                Ok(None)
            }
        }
    }

    fn len(&self) -> usize {
        match self.upstream.load_full() {
            Some(up) => up.queue().map_or(0, |q| q.len()),
            None => 0,
        }
    }

    fn clear(&self) {
        if let Some(up) = self.upstream.load_full() {
            if let Some(q) = up.queue() {
                q.clear();
            }
        }
    }
}

/// The side-effecting stage itself.
pub struct PeekStage<T> {
    downstream: Downstream<T>,
    link: Arc<PeekLink<T>>,
}

impl<T: Send + 'static> PeekStage<T> {
    /// Wrap `downstream` with a stage running `handler` on every signal.
    pub fn new<F>(handler: F, downstream: Downstream<T>, options: StageOptions) -> Self
    where
        F: Fn(&Signal<'_, T>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            downstream,
            link: Arc::new(PeekLink {
                handler: Arc::new(handler),
                upstream: ArcSwapOption::empty(),
                terminated: AtomicBool::new(false),
                sync_fused: AtomicBool::new(false),
                fusion_capable: options.fusion_capable,
                barrier_safe: options.barrier_safe,
                context: options.context,
            }),
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for PeekStage<T> {
    fn on_subscribe(&mut self, upstream: Upstream<T>) {
        if self.link.upstream.load().is_some() {
            // The redundant upstream is stopped and the violation surfaces
            // as an error signal on the active sequence.
            upstream.cancel();
            tracing::warn!("subscription handshake repeated");
            let violation = FlowError::Violation("subscription handshake repeated".into());
            if let Err(e) = self.on_error(violation) {
                tracing::warn!(error = %e, "escalation while reporting a duplicate handshake");
            }
            return;
        }
        self.link.upstream.store(Some(Arc::new(upstream)));
        let link = Arc::clone(&self.link);
        let handle: Upstream<T> = if self.link.fusion_capable {
            Upstream::Fused(link as Arc<dyn QueueSubscription<T>>)
        } else {
            Upstream::Demand(link as Arc<dyn Subscription>)
        };
        self.downstream.on_subscribe(handle);
    }

    fn on_next(&mut self, value: T) -> Result<()> {
        if self.link.terminated.load(Ordering::Acquire) {
            let any: &(dyn Any + Send) = &value;
            return hooks::next_dropped(any, &self.link.context);
        }
        let signal = Signal::next(&value, &self.link.context);
        if let Err(e) = (self.link.handler)(&signal) {
            if e.is_fatal() {
                return Err(e);
            }
            let mapped = {
                let any: &(dyn Any + Send) = &value;
                hooks::map_operator_error(e, Some(any))
            };
            return self.on_error(mapped);
        }
        self.downstream.on_next(value)
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        if self.link.terminated.swap(true, Ordering::AcqRel) {
            return hooks::error_dropped(&error, &self.link.context);
        }
        let mut error = error;
        if let Err(cb_err) = (self.link.handler)(&Signal::error(&error, &self.link.context)) {
            if cb_err.is_fatal() {
                return Err(cb_err);
            }
            let mapped = {
                let any: &(dyn Any + Send) = &error;
                hooks::map_operator_error(cb_err, Some(any))
            };
            error = error.with_suppressed(mapped);
        }
        match self.downstream.on_error(error) {
            // The ultimate consumer having no error handler is terminal in
            // itself, not something to re-escalate.
            Err(e) if e.is_error_callback_missing() => Ok(()),
            other => other,
        }
    }

    fn on_complete(&mut self) -> Result<()> {
        if self.link.terminated.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(cb_err) = (self.link.handler)(&Signal::complete(&self.link.context)) {
            if cb_err.is_fatal() {
                return Err(cb_err);
            }
            // Re-open the terminal gate so the failure runs the full error
            // path, completion callback included upstream of it.
            self.link.terminated.store(false, Ordering::Release);
            let mapped = hooks::map_operator_error(cb_err, None);
            return self.on_error(mapped);
        }
        self.downstream.on_complete()
    }
}

impl<T: Clone + Send + 'static> ConditionalSubscriber<T> for PeekStage<T> {
    fn try_on_next(&mut self, value: T) -> Result<bool> {
        if self.link.terminated.load(Ordering::Acquire) {
            let any: &(dyn Any + Send) = &value;
            hooks::next_dropped(any, &self.link.context)?;
            return Ok(false);
        }
        let retained = value.clone();
        let accepted = match &mut self.downstream {
            Downstream::Conditional(s) => s.try_on_next(value)?,
            Downstream::Plain(s) => {
                s.on_next(value)?;
                true
            }
        };
        // The side effect fires only for values the downstream accepted;
        // declined values consumed no demand and were never observed.
        if accepted {
            (self.link.handler)(&Signal::next(&retained, &self.link.context))?;
        }
        Ok(accepted)
    }
}

impl<T: Send + 'static> Inspect for PeekStage<T> {
    fn attr(&self, key: Attr) -> Option<AttrValue> {
        match key {
            Attr::Parent => self
                .link
                .upstream
                .load_full()
                .map(|up| AttrValue::Subscription(up.as_subscription())),
            Attr::Terminated => Some(AttrValue::Bool(self.link.terminated.load(Ordering::Acquire))),
        }
    }
}

/// A composed stage with its conditional capability resolved.
pub enum BuiltStage<T> {
    Plain(Box<dyn StageSubscriber<T>>),
    Conditional(Box<dyn ConditionalStageSubscriber<T>>),
}

impl<T: Send + 'static> BuiltStage<T> {
    /// Whether the stage exposes conditional acceptance.
    pub fn is_conditional(&self) -> bool {
        matches!(self, BuiltStage::Conditional(_))
    }

    /// Use this stage as the downstream of another.
    pub fn into_downstream(self) -> Downstream<T> {
        match self {
            BuiltStage::Plain(s) => Downstream::Plain(Box::new(s)),
            BuiltStage::Conditional(s) => Downstream::Conditional(Box::new(s)),
        }
    }
}

impl<T: Send + 'static> Inspect for BuiltStage<T> {
    fn attr(&self, key: Attr) -> Option<AttrValue> {
        match self {
            BuiltStage::Plain(s) => s.attr(key),
            BuiltStage::Conditional(s) => s.attr(key),
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for BuiltStage<T> {
    fn on_subscribe(&mut self, upstream: Upstream<T>) {
        match self {
            BuiltStage::Plain(s) => s.on_subscribe(upstream),
            BuiltStage::Conditional(s) => s.on_subscribe(upstream),
        }
    }

    fn on_next(&mut self, value: T) -> Result<()> {
        match self {
            BuiltStage::Plain(s) => s.on_next(value),
            BuiltStage::Conditional(s) => s.on_next(value),
        }
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        match self {
            BuiltStage::Plain(s) => s.on_error(error),
            BuiltStage::Conditional(s) => s.on_error(error),
        }
    }

    fn on_complete(&mut self) -> Result<()> {
        match self {
            BuiltStage::Plain(s) => s.on_complete(),
            BuiltStage::Conditional(s) => s.on_complete(),
        }
    }
}

/// Build a side-effecting stage around `downstream`, applying whatever
/// global decoration is installed at call time.
///
/// An undecorated build is zero-cost: no boxing of values, and the
/// conditional fast path survives. Any decoration routes values through the
/// erased surface, which is always plain.
#[track_caller]
pub fn build<T, F>(handler: F, downstream: Downstream<T>, options: StageOptions) -> BuiltStage<T>
where
    T: Clone + Send + 'static,
    F: Fn(&Signal<'_, T>) -> Result<()> + Send + Sync + 'static,
{
    let registry = hooks::global();
    let conditional = downstream.is_conditional();
    let terminal = options.terminal;

    let capture = registry.call_site_capture_enabled();
    let site = if capture { Some(CallSite::capture()) } else { None };

    let stage = PeekStage::new(handler, downstream, options);

    let wants_decoration = registry.has_each_stage_hooks()
        || (terminal && registry.has_last_stage_hooks())
        || capture;
    if !wants_decoration {
        return if conditional {
            BuiltStage::Conditional(Box::new(stage))
        } else {
            BuiltStage::Plain(Box::new(stage))
        };
    }

    let mut erased: DynStage = Box::new(EraseStage::<T, _>::new(stage));
    erased = registry.decorate_each(erased);
    if let Some(site) = site {
        erased = hooks::attach_call_site(erased, site);
    }
    if terminal {
        erased = registry.decorate_last(erased);
    }
    BuiltStage::Plain(Box::new(TypedFront::new(erased)))
}
