//! A demand-driven stream-processing core with side-effecting stages and
//! process-wide hooks.
//!
//! Values flow through a serial signal channel (`on_subscribe`, `on_next`,
//! one terminal signal) while demand and cancellation travel the other way
//! on any thread. The central stage observes every signal through a
//! caller-supplied handler and forwards it unchanged.
//!
//! # Features
//!
//! - One generic side-effecting stage covering plain, fused, conditional,
//!   and fused-conditional composition
//! - Sync/async fusion negotiation with pollable queues between stages
//! - Conditional delivery: side effects fire only for accepted values
//! - Six families of process-wide hooks: stage decoration (each/last),
//!   error remapping, dropped-signal observers, schedule-task decoration
//! - Call-site capture for error diagnostics, off by default
//!
//! # Example
//!
//! ```ignore
//! use signalflow::{ChainBuilder, Downstream, VecSource};
//!
//! let chain = ChainBuilder::new()
//!     .peek(|signal| {
//!         if let Some(v) = signal.value() {
//!             println!("saw {v}");
//!         }
//!         Ok(())
//!     })
//!     .build(Downstream::plain(consumer))?;
//!
//! VecSource::new(vec![1, 2, 3]).subscribe(chain.into_downstream());
//! ```

pub mod chain;
pub mod erased;
pub mod error;
pub mod hooks;
pub mod peek;
pub mod protocol;
pub mod queue;
pub mod sched;
pub mod signal;
pub mod source;

// Re-exports for convenience
pub use chain::ChainBuilder;
pub use erased::{DynStage, ErasedItem, ErasedStage};
pub use error::{FlowError, Result};
pub use hooks::{CallSite, HookRegistry};
pub use peek::{build, BuiltStage, PeekStage, SignalHandler, StageOptions};
pub use protocol::{
    Attr, AttrValue, ConditionalStageSubscriber, ConditionalSubscriber, Downstream, FusionMode,
    FusionRequest, Inspect, QueueSubscription, RequestedFusion, StageSubscriber, Subscriber,
    Subscription, Upstream,
};
pub use queue::{FusedQueue, OverflowPolicy, QueueSource};
pub use signal::{Context, Signal, SignalKind};
pub use source::VecSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
