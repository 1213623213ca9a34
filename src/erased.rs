//! Type-erased stage surface.
//!
//! Global stage decorators must wrap stages of any value type, so the hook
//! registry operates on a stage whose items are boxed. The typed factory
//! bridges into this representation only when decorators are actually
//! installed; an undecorated chain never boxes a value.

use crate::error::{FlowError, Result};
use crate::protocol::{
    Attr, AttrValue, FusionMode, FusionRequest, Inspect, QueueSubscription, Subscriber,
    Subscription, Upstream,
};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// A value with its type erased for transport through decorated stages.
pub type ErasedItem = Box<dyn Any + Send>;

/// The stage protocol over erased items.
pub trait ErasedStage: Send {
    /// Receive the upstream handle.
    fn on_subscribe(&mut self, upstream: Upstream<ErasedItem>);
    /// Receive one erased value.
    fn on_next(&mut self, value: ErasedItem) -> Result<()>;
    /// Receive the terminal failure.
    fn on_error(&mut self, error: FlowError) -> Result<()>;
    /// Receive the terminal completion.
    fn on_complete(&mut self) -> Result<()>;
    /// Capability query, forwarded through decorations.
    fn attr(&self, key: Attr) -> Option<AttrValue>;
}

/// A boxed, possibly decorated, type-erased stage.
pub type DynStage = Box<dyn ErasedStage>;

fn type_mismatch() -> FlowError {
    FlowError::Violation("value type mismatch through a decorated stage".into())
}

/// Erasing adapter: presents a typed stage as an [`ErasedStage`].
pub(crate) struct EraseStage<T, S> {
    inner: S,
    _marker: PhantomData<fn(T)>,
}

impl<T, S> EraseStage<T, S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T, S> ErasedStage for EraseStage<T, S>
where
    T: Send + 'static,
    S: Subscriber<T> + Inspect + Send,
{
    fn on_subscribe(&mut self, upstream: Upstream<ErasedItem>) {
        let typed = match upstream {
            Upstream::Demand(s) => Upstream::Demand(s),
            Upstream::Fused(qs) => Upstream::Fused(Arc::new(DowncastQueue::<T> {
                inner: qs,
                _marker: PhantomData,
            }) as Arc<dyn QueueSubscription<T>>),
        };
        self.inner.on_subscribe(typed);
    }

    fn on_next(&mut self, value: ErasedItem) -> Result<()> {
        match value.downcast::<T>() {
            Ok(v) => self.inner.on_next(*v),
            Err(_) => Err(type_mismatch()),
        }
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        self.inner.on_error(error)
    }

    fn on_complete(&mut self) -> Result<()> {
        self.inner.on_complete()
    }

    fn attr(&self, key: Attr) -> Option<AttrValue> {
        self.inner.attr(key)
    }
}

/// Typed front over a decorated stage: what the upstream ends up talking to.
pub(crate) struct TypedFront<T> {
    inner: DynStage,
    _marker: PhantomData<fn(T)>,
}

impl<T> TypedFront<T> {
    pub(crate) fn new(inner: DynStage) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for TypedFront<T> {
    fn on_subscribe(&mut self, upstream: Upstream<T>) {
        let erased = match upstream {
            Upstream::Demand(s) => Upstream::Demand(s),
            Upstream::Fused(qs) => Upstream::Fused(Arc::new(BoxingQueue { inner: qs })
                as Arc<dyn QueueSubscription<ErasedItem>>),
        };
        self.inner.on_subscribe(erased);
    }

    fn on_next(&mut self, value: T) -> Result<()> {
        self.inner.on_next(Box::new(value))
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        self.inner.on_error(error)
    }

    fn on_complete(&mut self) -> Result<()> {
        self.inner.on_complete()
    }
}

impl<T> Inspect for TypedFront<T> {
    fn attr(&self, key: Attr) -> Option<AttrValue> {
        self.inner.attr(key)
    }
}

/// Queue adapter boxing polled values on the way out.
struct BoxingQueue<T> {
    inner: Arc<dyn QueueSubscription<T>>,
}

impl<T: Send + 'static> Subscription for BoxingQueue<T> {
    fn request(&self, n: u64) {
        self.inner.request(n);
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

impl<T: Send + 'static> QueueSubscription<ErasedItem> for BoxingQueue<T> {
    fn request_fusion(&self, request: FusionRequest) -> FusionMode {
        self.inner.request_fusion(request)
    }

    fn poll(&self) -> Result<Option<ErasedItem>> {
        Ok(self.inner.poll()?.map(|v| Box::new(v) as ErasedItem))
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// Queue adapter downcasting polled values back to their concrete type.
struct DowncastQueue<T> {
    inner: Arc<dyn QueueSubscription<ErasedItem>>,
    _marker: PhantomData<fn(T)>,
}

impl<T: Send + 'static> Subscription for DowncastQueue<T> {
    fn request(&self, n: u64) {
        self.inner.request(n);
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

impl<T: Send + 'static> QueueSubscription<T> for DowncastQueue<T> {
    fn request_fusion(&self, request: FusionRequest) -> FusionMode {
        self.inner.request_fusion(request)
    }

    fn poll(&self) -> Result<Option<T>> {
        match self.inner.poll()? {
            None => Ok(None),
            Some(item) => match item.downcast::<T>() {
                Ok(v) => Ok(Some(*v)),
                Err(_) => Err(type_mismatch()),
            },
        }
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&self) {
        self.inner.clear();
    }
}
