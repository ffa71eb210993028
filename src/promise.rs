//! # Synchronous promise chains
//!
//! A [`Promise`] is settled once, by the resolver function handed to
//! [`Promise::new`], and drives two ordered handler queues:
//!
//! - the **success track**, fed by [`Promise::then`]. Each handler receives
//!   the carried value and its return value becomes the carried value for
//!   the next handler.
//! - the **failure track**, fed by [`Promise::fails`]. Each handler receives
//!   the carried error and its return value becomes the carried error for the
//!   next handler. A handler returning a falsy value (see
//!   [`Value::is_truthy`]) has absorbed the error and no later failure
//!   handler runs.
//!
//! A success handler that raises ends the success track and moves the chain
//! onto the failure track with the raised error. There is no way back.
//!
//! ## Draining
//!
//! Everything happens on the caller's stack: settling a promise drains the
//! matching queue before `resolve`/`reject` return, and attaching a handler
//! to an already settled promise runs it before `then`/`fails` return.
//! Each handler is taken off its queue as it runs and dropped right after,
//! along with everything it captured. No borrow of the promise state is held
//! while a handler runs, so handlers may freely attach more handlers to the
//! promise being drained; those run after the handlers queued before them.
//!
//! [`Resolve`] and [`Reject`] only hold a weak reference to their promise.
//! A handler capturing them does not keep its own promise alive, and calling
//! them after every [`Promise`] handle is gone does nothing.
//!
//! `then` and `fails` return the promise itself. There is a single chain per
//! promise, not a tree of derived promises: attaching twice to the same
//! promise appends twice to the same queue.

use crate::core::Value;
use crate::error::PromiseError;
use crate::handler::{Callback, FAILED, HandlerResult, IntoHandler, IntoOutcome, RESOLVED, fulfill, guarded};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

static UNIQUE_ID_SEED: AtomicUsize = AtomicUsize::new(1);

fn generate_unique_id() -> usize {
    UNIQUE_ID_SEED.fetch_add(1, Ordering::SeqCst)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Unsettled,
    Resolved,
    Rejected,
}

struct PromiseState {
    id: usize,
    outcome: Outcome,
    value: Value,
    error: Value,
    // Handlers not yet run.
    on_resolved: VecDeque<Callback>,
    on_rejected: VecDeque<Callback>,
    resolved_attached: usize,
    rejected_attached: usize,
    // A failure handler returned a falsy value.
    absorbed: bool,
    draining: bool,
}

impl PromiseState {
    fn new() -> Self {
        Self {
            id: generate_unique_id(),
            outcome: Outcome::Unsettled,
            value: Value::Undefined,
            error: Value::Undefined,
            on_resolved: VecDeque::new(),
            on_rejected: VecDeque::new(),
            resolved_attached: 0,
            rejected_attached: 0,
            absorbed: false,
            draining: false,
        }
    }
}

/// Handle to a promise chain. Clones share the same chain.
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseState>>,
}

/// The `resolve` callback handed to a resolver function.
#[derive(Clone, Debug)]
pub struct Resolve {
    promise: Weak<RefCell<PromiseState>>,
}

/// The `reject` callback handed to a resolver function.
#[derive(Clone, Debug)]
pub struct Reject {
    promise: Weak<RefCell<PromiseState>>,
}

impl Resolve {
    /// Settle the promise with `value`. Ignored if it is already settled or
    /// no longer exists.
    pub fn call(&self, value: impl Into<Value>) {
        settle_weak(&self.promise, Outcome::Resolved, value.into());
    }
}

impl Reject {
    /// Settle the promise with `error`. Ignored if it is already settled or
    /// no longer exists.
    pub fn call(&self, error: impl Into<Value>) {
        settle_weak(&self.promise, Outcome::Rejected, error.into());
    }
}

fn settle_weak(promise: &Weak<RefCell<PromiseState>>, outcome: Outcome, payload: Value) {
    match promise.upgrade() {
        Some(inner) => Promise { inner }.settle(outcome, payload),
        None => log::trace!("settle: promise is gone, dropping {outcome:?} with {payload}"),
    }
}

// Clears the draining mark when dropped, unwinding included.
struct DrainGuard<'a> {
    promise: &'a Promise,
}

impl<'a> DrainGuard<'a> {
    fn enter(promise: &'a Promise) -> Option<Self> {
        let mut state = promise.inner.borrow_mut();
        if state.draining {
            return None;
        }
        state.draining = true;
        Some(DrainGuard { promise })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.promise.inner.try_borrow_mut() {
            state.draining = false;
        }
    }
}

impl Promise {
    /// Create a promise and run `resolver` immediately.
    ///
    /// The resolver receives the promise's [`Resolve`] and [`Reject`]
    /// handles. It may call one of them right away, keep them for later, or
    /// never call them at all, in which case the promise stays unsettled and
    /// handlers simply queue up.
    ///
    /// If the resolver returns an error (or panics) before settling, the
    /// promise is rejected with that error.
    ///
    /// ```
    /// use curler::{Promise, Value};
    ///
    /// let p = Promise::new(|resolve, _reject| resolve.call("success"));
    /// p.then(|r: Value| format!("{r} 2"))
    ///     .then(|r: Value| assert_eq!(r, Value::from("success 2")));
    /// ```
    pub fn new<F, R>(resolver: F) -> Promise
    where
        F: FnOnce(Resolve, Reject) -> R,
        R: IntoOutcome,
    {
        let promise = Promise {
            inner: Rc::new(RefCell::new(PromiseState::new())),
        };
        let resolve = Resolve {
            promise: Rc::downgrade(&promise.inner),
        };
        let reject = Reject {
            promise: Rc::downgrade(&promise.inner),
        };

        if let Err(err) = guarded(|| resolver(resolve, reject).into_outcome()) {
            log::debug!("Promise::new: resolver of promise #{} raised: {err}", promise.id());
            promise.settle(Outcome::Rejected, err.into_value());
        }
        promise
    }

    /// A promise already resolved with `value`.
    pub fn resolved(value: impl Into<Value>) -> Promise {
        let value = value.into();
        Promise::new(move |resolve, _| resolve.call(value))
    }

    /// A promise already rejected with `error`.
    pub fn rejected(error: impl Into<Value>) -> Promise {
        let error = error.into();
        Promise::new(move |_, reject| reject.call(error))
    }

    /// Attach a success handler.
    ///
    /// Queued while the promise is unsettled, run immediately against the
    /// current carried value once it is resolved, ignored once it is
    /// rejected. Capability objects are invoked through their `resolved`
    /// method.
    pub fn then(&self, handler: impl IntoHandler) -> &Self {
        self.attach(Outcome::Resolved, handler.into_handler().bind(RESOLVED));
        self
    }

    /// Attach a failure handler (the counterpart of JavaScript's `catch`).
    ///
    /// Queued while the promise is unsettled, run immediately once it is
    /// rejected, ignored once it is resolved or after an earlier failure
    /// handler absorbed the error. Capability objects are invoked through
    /// their `failed` method.
    ///
    /// The order of failure handlers matters: a catch-all handler that
    /// returns nothing stops every handler after it.
    pub fn fails(&self, handler: impl IntoHandler) -> &Self {
        self.attach(Outcome::Rejected, handler.into_handler().bind(FAILED));
        self
    }

    pub fn id(&self) -> usize {
        self.inner.borrow().id
    }

    pub fn outcome(&self) -> Outcome {
        self.inner.borrow().outcome
    }

    pub fn is_settled(&self) -> bool {
        self.outcome() != Outcome::Unsettled
    }

    /// The carried value; `Undefined` unless the promise is resolved.
    pub fn value(&self) -> Value {
        self.inner.borrow().value.clone()
    }

    /// The carried error; `Undefined` unless the promise is rejected.
    pub fn error(&self) -> Value {
        self.inner.borrow().error.clone()
    }

    /// Whether a failure handler has absorbed the error.
    pub fn is_absorbed(&self) -> bool {
        self.inner.borrow().absorbed
    }

    /// Number of handlers ever accepted on the success track.
    pub fn success_handler_count(&self) -> usize {
        self.inner.borrow().resolved_attached
    }

    /// Number of handlers ever accepted on the failure track.
    pub fn failure_handler_count(&self) -> usize {
        self.inner.borrow().rejected_attached
    }

    /// Number of handlers still waiting to run, on both tracks.
    pub fn pending_handler_count(&self) -> usize {
        let state = self.inner.borrow();
        state.on_resolved.len() + state.on_rejected.len()
    }

    pub(crate) fn settle(&self, outcome: Outcome, payload: Value) {
        // Handlers of the track that can no longer run; dropped once the
        // state is released.
        let stale;
        {
            let mut state = self.inner.borrow_mut();
            if state.outcome != Outcome::Unsettled {
                log::debug!(
                    "settle: promise #{} is already {:?}, ignoring {:?} with {payload}",
                    state.id,
                    state.outcome,
                    outcome
                );
                return;
            }
            log::debug!("settle: promise #{} {:?} with {payload}", state.id, outcome);
            state.outcome = outcome;
            match outcome {
                Outcome::Resolved => {
                    state.value = payload;
                    state.error = Value::Undefined;
                    stale = std::mem::take(&mut state.on_rejected);
                }
                Outcome::Rejected => {
                    state.error = payload;
                    state.value = Value::Undefined;
                    if state.on_rejected.is_empty() {
                        log::debug!("settle: promise #{} has no failure handlers yet", state.id);
                    }
                    stale = std::mem::take(&mut state.on_resolved);
                }
                Outcome::Unsettled => return,
            }
        }
        drop(stale);
        self.drain();
    }

    fn attach(&self, track: Outcome, callback: Callback) {
        let mut state = self.inner.borrow_mut();
        let run_now = match (state.outcome, track) {
            (Outcome::Unsettled, _) => false,
            (Outcome::Resolved, Outcome::Resolved) => true,
            (Outcome::Rejected, Outcome::Rejected) if !state.absorbed => true,
            _ => {
                log::trace!(
                    "attach: promise #{} is {:?} (absorbed: {}), dropping {:?} handler",
                    state.id,
                    state.outcome,
                    state.absorbed,
                    track
                );
                return;
            }
        };
        if track == Outcome::Resolved {
            state.on_resolved.push_back(callback);
            state.resolved_attached += 1;
        } else {
            state.on_rejected.push_back(callback);
            state.rejected_attached += 1;
        }
        drop(state);
        if run_now {
            self.drain();
        }
    }

    /// Run queued handlers of the active track until the queue is exhausted,
    /// the track is absorbed, or nothing is left to do. A nested call made
    /// while a drain is in progress returns at once; the outer loop picks up
    /// whatever was appended.
    fn drain(&self) {
        let Some(_guard) = DrainGuard::enter(self) else {
            return;
        };
        while let Some((track, callback, payload)) = self.next_step() {
            let result = fulfill(&callback, payload);
            let _discarded = self.complete_step(track, result);
        }
    }

    fn next_step(&self) -> Option<(Outcome, Callback, Value)> {
        let mut guard = self.inner.borrow_mut();
        let state = &mut *guard;
        match state.outcome {
            Outcome::Unsettled => None,
            Outcome::Resolved => {
                let callback = state.on_resolved.pop_front()?;
                Some((Outcome::Resolved, callback, state.value.clone()))
            }
            Outcome::Rejected => {
                if state.absorbed {
                    return None;
                }
                let callback = state.on_rejected.pop_front()?;
                Some((Outcome::Rejected, callback, state.error.clone()))
            }
        }
    }

    /// Record a handler's result. Returns the handlers that can no longer
    /// run because of it, for the caller to drop outside the borrow.
    fn complete_step(&self, track: Outcome, result: HandlerResult) -> VecDeque<Callback> {
        let mut state = self.inner.borrow_mut();
        match (track, result) {
            (Outcome::Resolved, Ok(value)) => state.value = value,
            (Outcome::Resolved, Err(err)) => {
                log::debug!(
                    "complete_step: success handler of promise #{} raised, moving to the failure track: {err}",
                    state.id
                );
                state.outcome = Outcome::Rejected;
                state.value = Value::Undefined;
                state.error = err.into_value();
                return std::mem::take(&mut state.on_resolved);
            }
            (Outcome::Rejected, Ok(error)) => {
                let absorbed = !error.is_truthy();
                state.error = error;
                if absorbed {
                    log::trace!("complete_step: promise #{} error absorbed", state.id);
                    state.absorbed = true;
                    return std::mem::take(&mut state.on_rejected);
                }
            }
            (Outcome::Rejected, Err(err)) => state.error = err.into_value(),
            (Outcome::Unsettled, _) => {}
        }
        VecDeque::new()
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => write!(
                f,
                "Promise {{ id: {}, outcome: {:?}, on_resolved: {}, on_rejected: {} }}",
                state.id,
                state.outcome,
                state.on_resolved.len(),
                state.on_rejected.len()
            ),
            Err(_) => write!(f, "Promise {{ <draining> }}"),
        }
    }
}

impl From<PromiseError> for Promise {
    fn from(err: PromiseError) -> Self {
        Promise::rejected(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_unsettled_queues_handlers() {
        let p = Promise::new(|_, _| ());
        p.then(|_: Value| ()).then(|_: Value| ()).fails(|_: Value| ());
        assert_eq!(p.outcome(), Outcome::Unsettled);
        assert_eq!(p.success_handler_count(), 2);
        assert_eq!(p.failure_handler_count(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Promise::resolved(1);
        let b = Promise::resolved(1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_first_settlement_wins() {
        let p = Promise::new(|resolve, reject| {
            resolve.call("first");
            reject.call("second");
            resolve.call("third");
        });
        assert_eq!(p.outcome(), Outcome::Resolved);
        assert_eq!(p.value(), Value::from("first"));
        assert_eq!(p.error(), Value::Undefined);
    }

    #[test]
    fn test_settling_clears_the_other_side() {
        let p = Promise::resolved("ok");
        p.then(|_: Value| Err::<Value, _>(PromiseError::message("bad")));
        assert_eq!(p.outcome(), Outcome::Rejected);
        assert_eq!(p.value(), Value::Undefined);
        assert_eq!(p.error(), Value::from(PromiseError::message("bad")));
    }

    #[test]
    fn test_drained_handlers_do_not_rerun() {
        let count = Rc::new(Cell::new(0));
        let p = Promise::resolved(0);
        let c = count.clone();
        p.then(move |_: Value| c.set(c.get() + 1));
        let c = count.clone();
        p.then(move |_: Value| c.set(c.get() + 1));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_debug_output() {
        let p = Promise::new(|_, _| ());
        p.then(|_: Value| ());
        let text = format!("{p:?}");
        assert!(text.contains("Unsettled"));
        assert!(text.contains("on_resolved: 1"));
    }

    #[test]
    fn test_run_handlers_are_released() {
        let token = Rc::new(());
        let p = Promise::resolved(1);
        for _ in 0..1000 {
            let t = token.clone();
            p.then(move |v: Value| {
                let _ = Rc::strong_count(&t);
                v
            });
        }
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(p.success_handler_count(), 1000);
        assert_eq!(p.pending_handler_count(), 0);
    }

    #[test]
    fn test_settling_drops_the_other_track() {
        let token = Rc::new(());
        let p = Promise::new(|_, _| ());
        let t = token.clone();
        p.fails(move |_: Value| {
            let _ = Rc::strong_count(&t);
        });
        assert_eq!(Rc::strong_count(&token), 2);
        p.settle(Outcome::Resolved, Value::from("ok"));
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(p.pending_handler_count(), 0);
    }

    #[test]
    fn test_handles_do_not_keep_promise_alive() {
        let slot = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let p = Promise::new(move |resolve, _| {
            *s.borrow_mut() = Some(resolve);
        });
        let weak = Rc::downgrade(&p.inner);
        let resolve = slot.borrow_mut().take();
        p.then(move |v: Value| {
            let _ = resolve.is_some();
            v
        });
        drop(p);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_settling_a_dropped_promise_is_ignored() {
        let slot = Rc::new(RefCell::new(None));
        let s = slot.clone();
        drop(Promise::new(move |_, reject| {
            *s.borrow_mut() = Some(reject);
        }));
        if let Some(reject) = slot.borrow_mut().take() {
            reject.call("late");
        }
    }

    #[test]
    fn test_drain_guard_resets_on_unwind() {
        let p = Promise::new(|_, _| ());
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = DrainGuard::enter(&p);
            assert!(p.inner.borrow().draining);
            panic!("unwinding out of a drain");
        }));
        assert!(unwound.is_err());
        assert!(!p.inner.borrow().draining);
        p.then(|_: Value| ());
        p.settle(Outcome::Resolved, Value::from(1));
        assert_eq!(p.pending_handler_count(), 0);
    }
}
