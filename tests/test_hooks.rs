use parking_lot::Mutex;
use signalflow::{
    hooks, sched, ChainBuilder, Downstream, DynStage, ErasedItem, ErasedStage, FlowError,
    PeekStage, Result, Signal, SignalKind, StageOptions, Subscriber, Upstream,
};
use signalflow::{Attr, AttrValue, Inspect};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Every test here mutates the process-wide registry, so they are serialized
// and run against a freshly reset state.
static GUARD: Mutex<()> = Mutex::new(());

fn with_registry<F: FnOnce()>(f: F) {
    let _guard = GUARD.lock();
    hooks::reset_all();
    f();
    hooks::reset_all();
}

struct Sink {
    values: Arc<Mutex<Vec<u32>>>,
    errors: Arc<Mutex<Vec<FlowError>>>,
}

impl Sink {
    #[allow(clippy::type_complexity)]
    fn new() -> (Self, Arc<Mutex<Vec<u32>>>, Arc<Mutex<Vec<FlowError>>>) {
        let values = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                values: Arc::clone(&values),
                errors: Arc::clone(&errors),
            },
            values,
            errors,
        )
    }
}

impl Subscriber<u32> for Sink {
    fn on_subscribe(&mut self, _upstream: Upstream<u32>) {}

    fn on_next(&mut self, value: u32) -> Result<()> {
        self.values.lock().push(value);
        Ok(())
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        self.errors.lock().push(error);
        Ok(())
    }

    fn on_complete(&mut self) -> Result<()> {
        Ok(())
    }
}

struct CountingStage {
    inner: DynStage,
    nexts: Arc<AtomicUsize>,
}

impl ErasedStage for CountingStage {
    fn on_subscribe(&mut self, upstream: Upstream<ErasedItem>) {
        self.inner.on_subscribe(upstream);
    }

    fn on_next(&mut self, value: ErasedItem) -> Result<()> {
        self.nexts.fetch_add(1, Ordering::SeqCst);
        self.inner.on_next(value)
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

#[test]
fn test_each_stage_decorator_observes_values_through_the_bridge() {
    with_registry(|| {
        let nexts = Arc::new(AtomicUsize::new(0));
        let n2 = Arc::clone(&nexts);
        hooks::on_each_stage_named("count", move |stage| {
            Box::new(CountingStage {
                inner: stage,
                nexts: Arc::clone(&n2),
            })
        });

        let (sink, values, _) = Sink::new();
        let mut built = signalflow::build(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        built.on_next(1).unwrap();
        built.on_next(2).unwrap();
        built.on_complete().unwrap();

        assert_eq!(nexts.load(Ordering::SeqCst), 2);
        assert_eq!(*values.lock(), vec![1, 2]);
    });
}

#[test]
fn test_last_stage_decoration_applies_to_the_outermost_stage_only() {
    with_registry(|| {
        let each_calls = Arc::new(AtomicUsize::new(0));
        let last_calls = Arc::new(AtomicUsize::new(0));
        let e2 = Arc::clone(&each_calls);
        let l2 = Arc::clone(&last_calls);
        hooks::on_each_stage_named("each", move |stage| {
            e2.fetch_add(1, Ordering::SeqCst);
            stage
        });
        hooks::on_last_stage_named("last", move |stage| {
            l2.fetch_add(1, Ordering::SeqCst);
            stage
        });

        let (sink, values, _) = Sink::new();
        let mut built = ChainBuilder::<u32>::new()
            .peek(|_| Ok(()))
            .peek(|_| Ok(()))
            .peek(|_| Ok(()))
            .build(Downstream::plain(sink))
            .unwrap();

        assert_eq!(each_calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_calls.load(Ordering::SeqCst), 1);

        built.on_next(9).unwrap();
        assert_eq!(*values.lock(), vec![9]);
    });
}

#[test]
fn test_decorated_stage_still_answers_capability_queries() {
    with_registry(|| {
        let nexts = Arc::new(AtomicUsize::new(0));
        let n2 = Arc::clone(&nexts);
        hooks::on_each_stage_named("count", move |stage| {
            Box::new(CountingStage {
                inner: stage,
                nexts: Arc::clone(&n2),
            })
        });

        let (sink, _, _) = Sink::new();
        let mut built = signalflow::build(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        // The query tunnels through every decoration layer to the stage.
        assert_eq!(
            built.attr(Attr::Terminated).and_then(|v| v.as_bool()),
            Some(false)
        );
        built.on_complete().unwrap();
        assert_eq!(
            built.attr(Attr::Terminated).and_then(|v| v.as_bool()),
            Some(true)
        );
    });
}

#[test]
fn test_stage_decoration_is_not_retroactive() {
    with_registry(|| {
        let nexts = Arc::new(AtomicUsize::new(0));

        let (sink, values, _) = Sink::new();
        let mut before = signalflow::build(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        let n2 = Arc::clone(&nexts);
        hooks::on_each_stage_named("count", move |stage| {
            Box::new(CountingStage {
                inner: stage,
                nexts: Arc::clone(&n2),
            })
        });

        before.on_next(1).unwrap();
        assert_eq!(nexts.load(Ordering::SeqCst), 0);
        assert_eq!(*values.lock(), vec![1]);
    });
}

#[test]
fn test_call_site_capture_traces_errors() {
    with_registry(|| {
        hooks::enable_call_site_capture();

        let (sink, _, errors) = Sink::new();
        let mut built = signalflow::build(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        built.on_error(FlowError::Source("boom".into())).unwrap();

        let errors = errors.lock();
        match &errors[0] {
            FlowError::Traced { site, source } => {
                assert!(site.contains("test_hooks.rs"), "unexpected site {site}");
                assert_eq!(**source, FlowError::Source("boom".into()));
            }
            other => panic!("expected a traced error, got {other}"),
        }
    });
}

#[test]
fn test_operator_error_remap_applies_to_handler_failures() {
    with_registry(|| {
        hooks::on_operator_error_named("wrap", |error, data| {
            let detail = data
                .and_then(|d| d.downcast_ref::<u32>())
                .map(|v| v.to_string())
                .unwrap_or_default();
            FlowError::Callback(format!("wrapped[{detail}]: {error}"))
        });

        let (sink, _, errors) = Sink::new();
        let mut stage = PeekStage::new(
            |signal: &Signal<'_, u32>| match signal.kind() {
                SignalKind::Next => Err(FlowError::Callback("observer".into())),
                _ => Ok(()),
            },
            Downstream::plain(sink),
            StageOptions::new(),
        );

        stage.on_next(7).unwrap();

        let errors = errors.lock();
        assert_eq!(
            errors[0],
            FlowError::Callback("wrapped[7]: stage callback failed: observer".into())
        );
    });
}

#[test]
fn test_next_dropped_hook_sees_post_terminal_values() {
    with_registry(|| {
        let dropped = Arc::new(Mutex::new(Vec::new()));
        let d2 = Arc::clone(&dropped);
        hooks::on_next_dropped_named("capture", move |value, _ctx| {
            if let Some(v) = value.downcast_ref::<u32>() {
                d2.lock().push(*v);
            }
            Ok(())
        });

        let (sink, values, _) = Sink::new();
        let mut stage = PeekStage::new(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        stage.on_next(1).unwrap();
        stage.on_complete().unwrap();
        stage.on_next(2).unwrap();
        stage.on_next(3).unwrap();

        assert_eq!(*values.lock(), vec![1]);
        assert_eq!(*dropped.lock(), vec![2, 3]);
    });
}

#[test]
fn test_next_dropped_fail_policy_escalates() {
    with_registry(|| {
        hooks::on_next_dropped_fail();

        let (sink, _, _) = Sink::new();
        let mut stage = PeekStage::new(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        stage.on_complete().unwrap();
        let err = stage.on_next(2).unwrap_err();
        assert!(matches!(err, FlowError::Violation(_)));
    });
}

#[test]
fn test_error_dropped_hook_sees_post_terminal_errors() {
    with_registry(|| {
        let dropped = Arc::new(Mutex::new(Vec::new()));
        let d2 = Arc::clone(&dropped);
        hooks::on_error_dropped_named("capture", move |error, _ctx| {
            d2.lock().push(error.clone());
            Ok(())
        });

        let (sink, _, errors) = Sink::new();
        let mut stage = PeekStage::new(
            |_: &Signal<'_, u32>| Ok(()),
            Downstream::plain(sink),
            StageOptions::new(),
        );

        stage.on_complete().unwrap();
        stage.on_error(FlowError::Source("late".into())).unwrap();

        assert!(errors.lock().is_empty());
        assert_eq!(*dropped.lock(), vec![FlowError::Source("late".into())]);
    });
}

#[test]
fn test_schedule_bridge_installs_and_uninstalls_exactly_once() {
    with_registry(|| {
        let base = sched::global().keys().len();
        let wraps = Arc::new(AtomicUsize::new(0));

        let w1 = Arc::clone(&wraps);
        assert!(hooks::add_schedule_decorator("a", move |task| {
            let w1 = Arc::clone(&w1);
            Box::new(move || {
                w1.fetch_add(1, Ordering::SeqCst);
                task();
            })
        }));
        // One bridge entry no matter how many decorators are registered.
        assert_eq!(sched::global().keys().len(), base + 1);

        let w2 = Arc::clone(&wraps);
        assert!(hooks::add_schedule_decorator("b", move |task| {
            let w2 = Arc::clone(&w2);
            Box::new(move || {
                w2.fetch_add(1, Ordering::SeqCst);
                task();
            })
        }));
        assert!(!hooks::add_schedule_decorator("b", |task| task));
        assert_eq!(sched::global().keys().len(), base + 1);

        let ran = Arc::new(AtomicUsize::new(0));
        let r2 = Arc::clone(&ran);
        sched::decorate(Box::new(move || {
            r2.fetch_add(1, Ordering::SeqCst);
        }))();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(wraps.load(Ordering::SeqCst), 2);

        assert!(hooks::remove_schedule_decorator("a"));
        assert_eq!(sched::global().keys().len(), base + 1);
        assert!(hooks::remove_schedule_decorator("b"));
        assert_eq!(sched::global().keys().len(), base);

        // A fresh empty-to-non-empty transition installs the bridge again.
        assert!(hooks::add_schedule_decorator("a", |task| task));
        assert_eq!(sched::global().keys().len(), base + 1);
        hooks::reset_schedule_decorators();
        assert_eq!(sched::global().keys().len(), base);
    });
}

#[test]
fn test_schedule_decoration_applies_live_registrations() {
    with_registry(|| {
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        hooks::add_schedule_decorator("outer-candidate", move |task| {
            let o1 = Arc::clone(&o1);
            Box::new(move || {
                o1.lock().push("first");
                task();
            })
        });
        let o2 = Arc::clone(&order);
        hooks::add_schedule_decorator("added-later", move |task| {
            let o2 = Arc::clone(&o2);
            Box::new(move || {
                o2.lock().push("second");
                task();
            })
        });

        let o3 = Arc::clone(&order);
        sched::decorate(Box::new(move || {
            o3.lock().push("task");
        }))();

        // Later registrations wrap earlier ones, so they run first.
        assert_eq!(*order.lock(), vec!["second", "first", "task"]);
    });
}

#[test]
fn test_reset_all_returns_the_registry_to_defaults() {
    with_registry(|| {
        let base = sched::global().keys().len();
        hooks::on_each_stage_named("k", |stage| stage);
        hooks::on_last_stage_named("k", |stage| stage);
        hooks::on_operator_error_named("k", |e, _| e);
        hooks::on_next_dropped_named("k", |_, _| Ok(()));
        hooks::on_error_dropped_named("k", |_, _| Ok(()));
        hooks::add_schedule_decorator("k", |task| task);
        hooks::enable_call_site_capture();

        hooks::reset_all();

        assert!(!hooks::global().has_each_stage_hooks());
        assert!(!hooks::global().has_last_stage_hooks());
        assert!(!hooks::call_site_capture_enabled());
        assert_eq!(sched::global().keys().len(), base);

        let e = FlowError::Source("same".into());
        assert_eq!(hooks::map_operator_error(e.clone(), None), e);
    });
}
