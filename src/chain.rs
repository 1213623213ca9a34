//! Composition of several side-effecting stages into one chain.
//!
//! Stages are listed in signal order: the first added stage observes a
//! signal first. That outermost stage, the one a source attaches to, is the
//! chain's terminal stage and the only one eligible for last-stage
//! decoration.

use crate::error::{FlowError, Result};
use crate::peek::{build, BuiltStage, StageOptions};
use crate::protocol::Downstream;
use crate::signal::Signal;

type BoxedHandler<T> = Box<dyn Fn(&Signal<'_, T>) -> Result<()> + Send + Sync>;

/// Builder assembling a chain of side-effecting stages.
pub struct ChainBuilder<T> {
    stages: Vec<(BoxedHandler<T>, StageOptions)>,
}

impl<T: Clone + Send + 'static> ChainBuilder<T> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage with default options.
    pub fn peek<F>(self, handler: F) -> Self
    where
        F: Fn(&Signal<'_, T>) -> Result<()> + Send + Sync + 'static,
    {
        self.peek_with(handler, StageOptions::new())
    }

    /// Append a stage with explicit options. The terminal marker is managed
    /// by the builder and overwritten at build time.
    pub fn peek_with<F>(mut self, handler: F, options: StageOptions) -> Self
    where
        F: Fn(&Signal<'_, T>) -> Result<()> + Send + Sync + 'static,
    {
        self.stages.push((Box::new(handler), options));
        self
    }

    /// Number of stages added so far.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Compose the stages around `consumer`, innermost first, and return the
    /// subscriber the source should be attached to.
    pub fn build(self, consumer: Downstream<T>) -> Result<BuiltStage<T>> {
        if self.stages.is_empty() {
            return Err(FlowError::EmptyChain);
        }
        let mut downstream = consumer;
        for (index, (handler, mut options)) in self.stages.into_iter().enumerate().rev() {
            // The outermost stage, the one a source attaches to, is the
            // chain's terminal stage.
            options.terminal = index == 0;
            let built = build(handler, downstream, options);
            if index == 0 {
                return Ok(built);
            }
            downstream = built.into_downstream();
        }
        Err(FlowError::EmptyChain)
    }
}

impl<T: Clone + Send + 'static> Default for ChainBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Subscriber, Upstream};
    use crate::signal::SignalKind;
    use crate::source::VecSource;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Sink;

    impl Subscriber<u32> for Sink {
        fn on_subscribe(&mut self, upstream: Upstream<u32>) {
            upstream.request(u64::MAX);
        }

        fn on_next(&mut self, _value: u32) -> Result<()> {
            Ok(())
        }

        fn on_error(&mut self, _error: FlowError) -> Result<()> {
            Ok(())
        }

        fn on_complete(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_empty_chain_is_an_error() {
        let result = ChainBuilder::<u32>::new().build(Downstream::plain(Sink));
        assert!(matches!(result, Err(FlowError::EmptyChain)));
    }

    #[test]
    fn test_stages_observe_in_addition_order() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let t1 = Arc::clone(&trail);
        let t2 = Arc::clone(&trail);

        let chain = ChainBuilder::<u32>::new()
            .peek(move |signal| {
                if let Some(v) = signal.value() {
                    t1.lock().push(("first", *v));
                }
                Ok(())
            })
            .peek(move |signal| {
                if let Some(v) = signal.value() {
                    t2.lock().push(("second", *v));
                }
                Ok(())
            })
            .build(Downstream::plain(Sink))
            .unwrap();

        VecSource::new(vec![1, 2]).subscribe(chain.into_downstream());

        assert_eq!(
            *trail.lock(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn test_every_stage_sees_completion() {
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let k1 = Arc::clone(&kinds);
        let k2 = Arc::clone(&kinds);

        let chain = ChainBuilder::<u32>::new()
            .peek(move |signal| {
                if signal.kind() == SignalKind::Complete {
                    k1.lock().push("first");
                }
                Ok(())
            })
            .peek(move |signal| {
                if signal.kind() == SignalKind::Complete {
                    k2.lock().push("second");
                }
                Ok(())
            })
            .build(Downstream::plain(Sink))
            .unwrap();

        VecSource::new(vec![1]).subscribe(chain.into_downstream());

        assert_eq!(*kinds.lock(), vec!["first", "second"]);
    }
}
