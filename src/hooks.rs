//! Process-wide, runtime-mutable interception points applied across every
//! stage chain.
//!
//! Six hook families are kept: each-stage decoration, last-stage decoration,
//! operator-error remapping, dropped-next and dropped-error callbacks, and
//! schedule-task decoration. Mutation of a family is serialized under one
//! mutex; after every mutation a single composed function is recomputed and
//! published into a lock-free slot, so hot-path reads are one acquire load.

use crate::erased::{DynStage, ErasedItem, ErasedStage};
use crate::error::{FlowError, Result};
use crate::protocol::{Attr, AttrValue, Upstream};
use crate::sched::{self, Task, TaskDecorator};
use crate::signal::Context;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// A decoration applied to a newly built stage.
pub type StageDecorator = Arc<dyn Fn(DynStage) -> DynStage + Send + Sync>;

/// Maps a failure, plus the optional originating data, to a replacement
/// failure.
pub type ErrorMapper = Arc<dyn Fn(FlowError, Option<&(dyn Any + Send)>) -> FlowError + Send + Sync>;

/// Fired for a next-value signal that could not be legitimately delivered.
pub type NextDroppedHook = Arc<dyn Fn(&(dyn Any + Send), &Context) -> Result<()> + Send + Sync>;

/// Fired for an error signal that could not be legitimately delivered.
pub type ErrorDroppedHook = Arc<dyn Fn(&FlowError, &Context) -> Result<()> + Send + Sync>;

const SCHEDULE_BRIDGE_PREFIX: &str = "signalflow.hooks.schedule";
const NEXT_DROPPED_FAIL_KEY: &str = "signalflow.hooks.nextDroppedFail";

/// An opaque record of the call site a stage was assembled at.
#[derive(Clone, Debug)]
pub struct CallSite {
    description: Arc<str>,
}

impl CallSite {
    /// Build a record from an arbitrary description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into().into(),
        }
    }

    /// Capture the caller's source location.
    #[track_caller]
    pub fn capture() -> Self {
        let loc = Location::caller();
        Self::new(format!("{}:{}", loc.file(), loc.line()))
    }

    /// The textual description of the site.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// One hook family: insertion-ordered keyed entries plus the published
/// composition.
struct HookFamily<C: Clone> {
    name: &'static str,
    entries: Mutex<Vec<(String, C)>>,
    composed: Arc<ArcSwapOption<C>>,
    compose: fn(Vec<C>) -> C,
}

impl<C: Clone> HookFamily<C> {
    fn new(name: &'static str, compose: fn(Vec<C>) -> C) -> Self {
        Self {
            name,
            entries: Mutex::new(Vec::new()),
            composed: Arc::new(ArcSwapOption::empty()),
            compose,
        }
    }

    /// Add or replace the entry under `key`. Replacement keeps the entry's
    /// original position in the composition order.
    fn register(&self, key: String, entry: C) {
        tracing::debug!(family = self.name, key = %key, "registering hook");
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = entry;
        } else {
            entries.push((key, entry));
        }
        self.republish(&entries);
    }

    fn remove(&self, key: &str) -> bool {
        tracing::debug!(family = self.name, key = %key, "removing hook");
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        let removed = entries.len() != before;
        if removed {
            self.republish(&entries);
        }
        removed
    }

    fn reset(&self) {
        tracing::debug!(family = self.name, "resetting hook family");
        let mut entries = self.entries.lock();
        entries.clear();
        self.republish(&entries);
    }

    /// Lock-free read of the published composition. `None` means the family
    /// is empty and the caller's default behavior applies.
    fn snapshot(&self) -> Option<Arc<C>> {
        self.composed.load_full()
    }

    fn republish(&self, entries: &[(String, C)]) {
        if entries.is_empty() {
            self.composed.store(None);
        } else {
            let list: Vec<C> = entries.iter().map(|(_, c)| c.clone()).collect();
            self.composed.store(Some(Arc::new((self.compose)(list))));
        }
    }

    #[cfg(test)]
    fn keys(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(k, _)| k.clone()).collect()
    }
}

fn compose_stage_decorators(list: Vec<StageDecorator>) -> StageDecorator {
    Arc::new(move |stage| list.iter().fold(stage, |s, d| d(s)))
}

fn compose_error_mappers(list: Vec<ErrorMapper>) -> ErrorMapper {
    Arc::new(move |error, data| list.iter().fold(error, |e, f| f(e, data)))
}

fn compose_next_dropped(list: Vec<NextDroppedHook>) -> NextDroppedHook {
    Arc::new(move |value, ctx| {
        for hook in &list {
            hook(value, ctx)?;
        }
        Ok(())
    })
}

fn compose_error_dropped(list: Vec<ErrorDroppedHook>) -> ErrorDroppedHook {
    Arc::new(move |error, ctx| {
        for hook in &list {
            hook(error, ctx)?;
        }
        Ok(())
    })
}

fn compose_task_decorators(list: Vec<TaskDecorator>) -> TaskDecorator {
    Arc::new(move |task| list.iter().fold(task, |t, d| d(t)))
}

fn auto_key<F>() -> String {
    std::any::type_name::<F>().to_string()
}

/// The registry of all six hook families.
///
/// A fresh registry is empty; every default behavior lives with the caller
/// of the corresponding dispatch method. The process-wide instance is
/// reachable through [`global`], with free functions mirroring its surface.
pub struct HookRegistry {
    each_stage: HookFamily<StageDecorator>,
    last_stage: HookFamily<StageDecorator>,
    operator_error: HookFamily<ErrorMapper>,
    next_dropped: HookFamily<NextDroppedHook>,
    error_dropped: HookFamily<ErrorDroppedHook>,
    schedule: HookFamily<TaskDecorator>,
    capture_call_sites: AtomicBool,
}

impl HookRegistry {
    /// An empty registry with every family unset.
    pub fn new() -> Self {
        Self {
            each_stage: HookFamily::new("onEachStage", compose_stage_decorators),
            last_stage: HookFamily::new("onLastStage", compose_stage_decorators),
            operator_error: HookFamily::new("onOperatorError", compose_error_mappers),
            next_dropped: HookFamily::new("onNextDropped", compose_next_dropped),
            error_dropped: HookFamily::new("onErrorDropped", compose_error_dropped),
            schedule: HookFamily::new("onSchedule", compose_task_decorators),
            capture_call_sites: AtomicBool::new(false),
        }
    }

    // --- each-stage decoration -------------------------------------------

    /// Register a decorator applied to every newly built stage, keyed by the
    /// function's own textual description.
    pub fn on_each_stage<F>(&self, decorator: F)
    where
        F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
    {
        self.on_each_stage_named(auto_key::<F>(), decorator);
    }

    /// Register or replace a named each-stage decorator.
    pub fn on_each_stage_named<F>(&self, key: impl Into<String>, decorator: F)
    where
        F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
    {
        self.each_stage.register(key.into(), Arc::new(decorator));
    }

    /// Remove the each-stage decorator under `key`.
    pub fn remove_on_each_stage(&self, key: &str) -> bool {
        self.each_stage.remove(key)
    }

    /// Clear the each-stage family.
    pub fn reset_on_each_stage(&self) {
        self.each_stage.reset();
    }

    /// Whether any each-stage decorator is installed.
    pub fn has_each_stage_hooks(&self) -> bool {
        self.each_stage.snapshot().is_some()
    }

    /// Apply the each-stage composition to `stage`.
    pub fn decorate_each(&self, stage: DynStage) -> DynStage {
        match self.each_stage.snapshot() {
            Some(composed) => composed(stage),
            None => stage,
        }
    }

    // --- last-stage decoration -------------------------------------------

    /// Register a decorator applied only to the outermost stage of a
    /// composed chain, keyed by the function's own textual description.
    pub fn on_last_stage<F>(&self, decorator: F)
    where
        F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
    {
        self.on_last_stage_named(auto_key::<F>(), decorator);
    }

    /// Register or replace a named last-stage decorator.
    pub fn on_last_stage_named<F>(&self, key: impl Into<String>, decorator: F)
    where
        F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
    {
        self.last_stage.register(key.into(), Arc::new(decorator));
    }

    /// Remove the last-stage decorator under `key`.
    pub fn remove_on_last_stage(&self, key: &str) -> bool {
        self.last_stage.remove(key)
    }

    /// Clear the last-stage family.
    pub fn reset_on_last_stage(&self) {
        self.last_stage.reset();
    }

    /// Whether any last-stage decorator is installed.
    pub fn has_last_stage_hooks(&self) -> bool {
        self.last_stage.snapshot().is_some()
    }

    /// Apply the last-stage composition to `stage`.
    pub fn decorate_last(&self, stage: DynStage) -> DynStage {
        match self.last_stage.snapshot() {
            Some(composed) => composed(stage),
            None => stage,
        }
    }

    // --- operator-error remapping ----------------------------------------

    /// Register an error remapping, keyed by the function's own textual
    /// description.
    pub fn on_operator_error<F>(&self, mapper: F)
    where
        F: Fn(FlowError, Option<&(dyn Any + Send)>) -> FlowError + Send + Sync + 'static,
    {
        self.on_operator_error_named(auto_key::<F>(), mapper);
    }

    /// Register or replace a named error remapping.
    pub fn on_operator_error_named<F>(&self, key: impl Into<String>, mapper: F)
    where
        F: Fn(FlowError, Option<&(dyn Any + Send)>) -> FlowError + Send + Sync + 'static,
    {
        self.operator_error.register(key.into(), Arc::new(mapper));
    }

    /// Remove the error remapping under `key`.
    pub fn remove_on_operator_error(&self, key: &str) -> bool {
        self.operator_error.remove(key)
    }

    /// Clear the error-remap family.
    pub fn reset_on_operator_error(&self) {
        self.operator_error.reset();
    }

    /// Thread `error` through the remap chain in registration order; `data`
    /// is passed unchanged to every entry. With no entries the error is
    /// returned unchanged.
    pub fn map_operator_error(
        &self,
        error: FlowError,
        data: Option<&(dyn Any + Send)>,
    ) -> FlowError {
        match self.operator_error.snapshot() {
            Some(composed) => composed(error, data),
            None => error,
        }
    }

    // --- dropped-next ------------------------------------------------------

    /// Register a dropped-next callback, keyed by the function's own textual
    /// description.
    pub fn on_next_dropped<F>(&self, hook: F)
    where
        F: Fn(&(dyn Any + Send), &Context) -> Result<()> + Send + Sync + 'static,
    {
        self.on_next_dropped_named(auto_key::<F>(), hook);
    }

    /// Register or replace a named dropped-next callback.
    pub fn on_next_dropped_named<F>(&self, key: impl Into<String>, hook: F)
    where
        F: Fn(&(dyn Any + Send), &Context) -> Result<()> + Send + Sync + 'static,
    {
        self.next_dropped.register(key.into(), Arc::new(hook));
    }

    /// Replace the dropped-next family with a fail-loud policy: any diverted
    /// value surfaces a violation to the triggering caller.
    pub fn on_next_dropped_fail(&self) {
        self.next_dropped.reset();
        self.on_next_dropped_named(NEXT_DROPPED_FAIL_KEY, |_, _| {
            Err(FlowError::Violation(
                "onNext signal delivered past termination".into(),
            ))
        });
    }

    /// Remove the dropped-next callback under `key`.
    pub fn remove_on_next_dropped(&self, key: &str) -> bool {
        self.next_dropped.remove(key)
    }

    /// Restore the default dropped-next behavior (a debug log).
    pub fn reset_on_next_dropped(&self) {
        self.next_dropped.reset();
    }

    /// Divert a dropped next-value signal. Hooks fire sequentially with no
    /// isolation; a failing hook propagates to the triggering thread.
    pub fn next_dropped(&self, value: &(dyn Any + Send), context: &Context) -> Result<()> {
        match self.next_dropped.snapshot() {
            Some(composed) => composed(value, context),
            None => {
                tracing::debug!(?context, "onNext signal dropped past termination");
                Ok(())
            }
        }
    }

    // --- dropped-error -----------------------------------------------------

    /// Register a dropped-error callback, keyed by the function's own
    /// textual description.
    pub fn on_error_dropped<F>(&self, hook: F)
    where
        F: Fn(&FlowError, &Context) -> Result<()> + Send + Sync + 'static,
    {
        self.on_error_dropped_named(auto_key::<F>(), hook);
    }

    /// Register or replace a named dropped-error callback.
    pub fn on_error_dropped_named<F>(&self, key: impl Into<String>, hook: F)
    where
        F: Fn(&FlowError, &Context) -> Result<()> + Send + Sync + 'static,
    {
        self.error_dropped.register(key.into(), Arc::new(hook));
    }

    /// Remove the dropped-error callback under `key`.
    pub fn remove_on_error_dropped(&self, key: &str) -> bool {
        self.error_dropped.remove(key)
    }

    /// Restore the default dropped-error behavior (a debug log).
    pub fn reset_on_error_dropped(&self) {
        self.error_dropped.reset();
    }

    /// Divert a dropped error signal.
    pub fn error_dropped(&self, error: &FlowError, context: &Context) -> Result<()> {
        match self.error_dropped.snapshot() {
            Some(composed) => composed(error, context),
            None => {
                tracing::debug!(%error, "error signal dropped past termination");
                Ok(())
            }
        }
    }

    // --- schedule decoration ----------------------------------------------

    /// Add a schedule decorator under `key` if absent. The first entry in an
    /// empty family installs the wrapping policy into the scheduling bridge
    /// exactly once. Returns whether the decorator was added.
    pub fn add_schedule_decorator<F>(&self, key: impl Into<String>, decorator: F) -> bool
    where
        F: Fn(Task) -> Task + Send + Sync + 'static,
    {
        let key = key.into();
        let mut entries = self.schedule.entries.lock();
        if entries.iter().any(|(k, _)| *k == key) {
            return false;
        }
        let was_empty = entries.is_empty();
        entries.push((key, Arc::new(decorator)));
        self.schedule.republish(&entries);
        if was_empty {
            self.install_schedule_bridge();
        }
        true
    }

    /// Add or replace the schedule decorator under `key`.
    pub fn replace_schedule_decorator<F>(&self, key: impl Into<String>, decorator: F)
    where
        F: Fn(Task) -> Task + Send + Sync + 'static,
    {
        let key = key.into();
        let mut entries = self.schedule.entries.lock();
        let was_empty = entries.is_empty();
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = Arc::new(decorator);
        } else {
            entries.push((key, Arc::new(decorator)));
        }
        self.schedule.republish(&entries);
        if was_empty {
            self.install_schedule_bridge();
        }
    }

    /// Remove the schedule decorator under `key`; removing the last entry
    /// uninstalls the scheduling-bridge policy exactly once.
    pub fn remove_schedule_decorator(&self, key: &str) -> bool {
        let mut entries = self.schedule.entries.lock();
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        let removed = entries.len() != before;
        if removed {
            self.schedule.republish(&entries);
            if entries.is_empty() {
                sched::global().remove(&self.bridge_key());
            }
        }
        removed
    }

    /// Clear the schedule family, uninstalling the bridge policy if needed.
    pub fn reset_schedule_decorators(&self) {
        let mut entries = self.schedule.entries.lock();
        let was_empty = entries.is_empty();
        entries.clear();
        self.schedule.republish(&entries);
        if !was_empty {
            sched::global().remove(&self.bridge_key());
        }
    }

    /// The scheduling-bridge key for this registry. Keys are derived per
    /// instance so distinct registries install and uninstall their bridges
    /// independently of one another.
    fn bridge_key(&self) -> String {
        format!("{}.{:p}", SCHEDULE_BRIDGE_PREFIX, self as *const Self)
    }

    fn install_schedule_bridge(&self) {
        let slot = Arc::clone(&self.schedule.composed);
        sched::global().add(
            self.bridge_key(),
            Arc::new(move |task| match slot.load_full() {
                Some(composed) => composed(task),
                None => task,
            }),
        );
    }

    // --- call-site capture -------------------------------------------------

    /// Capture call sites on stages built from now on. Not retroactive.
    pub fn enable_call_site_capture(&self) {
        self.capture_call_sites.store(true, Ordering::Release);
    }

    /// Stop capturing call sites on newly built stages.
    pub fn disable_call_site_capture(&self) {
        self.capture_call_sites.store(false, Ordering::Release);
    }

    /// Whether newly built stages capture their call site.
    pub fn call_site_capture_enabled(&self) -> bool {
        self.capture_call_sites.load(Ordering::Acquire)
    }

    // --- test support ------------------------------------------------------

    /// Restore the whole registry to its default empty state.
    pub fn reset_all(&self) {
        self.reset_on_each_stage();
        self.reset_on_last_stage();
        self.reset_on_operator_error();
        self.reset_on_next_dropped();
        self.reset_on_error_dropped();
        self.reset_schedule_decorators();
        self.disable_call_site_capture();
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HookRegistry {
    fn drop(&mut self) {
        // A registry discarded with live schedule decorators must not leave
        // its bridge behind in the scheduling registry.
        if !self.schedule.entries.get_mut().is_empty() {
            sched::global().remove(&self.bridge_key());
        }
    }
}

/// The process-wide hook registry.
pub fn global() -> &'static HookRegistry {
    static HOOKS: OnceLock<HookRegistry> = OnceLock::new();
    HOOKS.get_or_init(HookRegistry::new)
}

/// Decorates a stage so that errors later passing through it surface the
/// given call-site record. This is the single stable entry point external
/// instrumentation tools may depend on.
pub fn attach_call_site(stage: DynStage, site: CallSite) -> DynStage {
    Box::new(CallSiteStage { inner: stage, site })
}

struct CallSiteStage {
    inner: DynStage,
    site: CallSite,
}

impl ErasedStage for CallSiteStage {
    fn on_subscribe(&mut self, upstream: Upstream<ErasedItem>) {
        self.inner.on_subscribe(upstream);
    }

    fn on_next(&mut self, value: ErasedItem) -> Result<()> {
        self.inner.on_next(value)
    }

    fn on_error(&mut self, error: FlowError) -> Result<()> {
        self.inner.on_error(error.traced(self.site.description()))
    }

    fn on_complete(&mut self) -> Result<()> {
        self.inner.on_complete()
    }

    fn attr(&self, key: Attr) -> Option<AttrValue> {
        self.inner.attr(key)
    }
}

// --- free functions over the process-wide registry -------------------------

/// See [`HookRegistry::on_each_stage`].
pub fn on_each_stage<F>(decorator: F)
where
    F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
{
    global().on_each_stage(decorator);
}

/// See [`HookRegistry::on_each_stage_named`].
pub fn on_each_stage_named<F>(key: impl Into<String>, decorator: F)
where
    F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
{
    global().on_each_stage_named(key, decorator);
}

/// See [`HookRegistry::remove_on_each_stage`].
pub fn remove_on_each_stage(key: &str) -> bool {
    global().remove_on_each_stage(key)
}

/// See [`HookRegistry::reset_on_each_stage`].
pub fn reset_on_each_stage() {
    global().reset_on_each_stage();
}

/// See [`HookRegistry::on_last_stage`].
pub fn on_last_stage<F>(decorator: F)
where
    F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
{
    global().on_last_stage(decorator);
}

/// See [`HookRegistry::on_last_stage_named`].
pub fn on_last_stage_named<F>(key: impl Into<String>, decorator: F)
where
    F: Fn(DynStage) -> DynStage + Send + Sync + 'static,
{
    global().on_last_stage_named(key, decorator);
}

/// See [`HookRegistry::remove_on_last_stage`].
pub fn remove_on_last_stage(key: &str) -> bool {
    global().remove_on_last_stage(key)
}

/// See [`HookRegistry::reset_on_last_stage`].
pub fn reset_on_last_stage() {
    global().reset_on_last_stage();
}

/// See [`HookRegistry::on_operator_error`].
pub fn on_operator_error<F>(mapper: F)
where
    F: Fn(FlowError, Option<&(dyn Any + Send)>) -> FlowError + Send + Sync + 'static,
{
    global().on_operator_error(mapper);
}

/// See [`HookRegistry::on_operator_error_named`].
pub fn on_operator_error_named<F>(key: impl Into<String>, mapper: F)
where
    F: Fn(FlowError, Option<&(dyn Any + Send)>) -> FlowError + Send + Sync + 'static,
{
    global().on_operator_error_named(key, mapper);
}

/// See [`HookRegistry::remove_on_operator_error`].
pub fn remove_on_operator_error(key: &str) -> bool {
    global().remove_on_operator_error(key)
}

/// See [`HookRegistry::reset_on_operator_error`].
pub fn reset_on_operator_error() {
    global().reset_on_operator_error();
}

/// See [`HookRegistry::map_operator_error`].
pub fn map_operator_error(error: FlowError, data: Option<&(dyn Any + Send)>) -> FlowError {
    global().map_operator_error(error, data)
}

/// See [`HookRegistry::on_next_dropped`].
pub fn on_next_dropped<F>(hook: F)
where
    F: Fn(&(dyn Any + Send), &Context) -> Result<()> + Send + Sync + 'static,
{
    global().on_next_dropped(hook);
}

/// See [`HookRegistry::on_next_dropped_named`].
pub fn on_next_dropped_named<F>(key: impl Into<String>, hook: F)
where
    F: Fn(&(dyn Any + Send), &Context) -> Result<()> + Send + Sync + 'static,
{
    global().on_next_dropped_named(key, hook);
}

/// See [`HookRegistry::on_next_dropped_fail`].
pub fn on_next_dropped_fail() {
    global().on_next_dropped_fail();
}

/// See [`HookRegistry::remove_on_next_dropped`].
pub fn remove_on_next_dropped(key: &str) -> bool {
    global().remove_on_next_dropped(key)
}

/// See [`HookRegistry::reset_on_next_dropped`].
pub fn reset_on_next_dropped() {
    global().reset_on_next_dropped();
}

/// See [`HookRegistry::next_dropped`].
pub fn next_dropped(value: &(dyn Any + Send), context: &Context) -> Result<()> {
    global().next_dropped(value, context)
}

/// See [`HookRegistry::on_error_dropped`].
pub fn on_error_dropped<F>(hook: F)
where
    F: Fn(&FlowError, &Context) -> Result<()> + Send + Sync + 'static,
{
    global().on_error_dropped(hook);
}

/// See [`HookRegistry::on_error_dropped_named`].
pub fn on_error_dropped_named<F>(key: impl Into<String>, hook: F)
where
    F: Fn(&FlowError, &Context) -> Result<()> + Send + Sync + 'static,
{
    global().on_error_dropped_named(key, hook);
}

/// See [`HookRegistry::remove_on_error_dropped`].
pub fn remove_on_error_dropped(key: &str) -> bool {
    global().remove_on_error_dropped(key)
}

/// See [`HookRegistry::reset_on_error_dropped`].
pub fn reset_on_error_dropped() {
    global().reset_on_error_dropped();
}

/// See [`HookRegistry::error_dropped`].
pub fn error_dropped(error: &FlowError, context: &Context) -> Result<()> {
    global().error_dropped(error, context)
}

/// See [`HookRegistry::add_schedule_decorator`].
pub fn add_schedule_decorator<F>(key: impl Into<String>, decorator: F) -> bool
where
    F: Fn(Task) -> Task + Send + Sync + 'static,
{
    global().add_schedule_decorator(key, decorator)
}

/// See [`HookRegistry::replace_schedule_decorator`].
pub fn replace_schedule_decorator<F>(key: impl Into<String>, decorator: F)
where
    F: Fn(Task) -> Task + Send + Sync + 'static,
{
    global().replace_schedule_decorator(key, decorator);
}

/// See [`HookRegistry::remove_schedule_decorator`].
pub fn remove_schedule_decorator(key: &str) -> bool {
    global().remove_schedule_decorator(key)
}

/// See [`HookRegistry::reset_schedule_decorators`].
pub fn reset_schedule_decorators() {
    global().reset_schedule_decorators();
}

/// See [`HookRegistry::enable_call_site_capture`].
pub fn enable_call_site_capture() {
    global().enable_call_site_capture();
}

/// See [`HookRegistry::disable_call_site_capture`].
pub fn disable_call_site_capture() {
    global().disable_call_site_capture();
}

/// See [`HookRegistry::call_site_capture_enabled`].
pub fn call_site_capture_enabled() -> bool {
    global().call_site_capture_enabled()
}

/// See [`HookRegistry::reset_all`].
pub fn reset_all() {
    global().reset_all();
}
