//! Futures and the microtask event loop.
//!
//! An `async` body runs eagerly until its first suspension; everything
//! after that is driven by microtasks, so completion callbacks never run
//! re-entrantly inside the code that completed the future.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{self, RtError};
use crate::generators::{GenFactory, Generator, Resume, Step};
use crate::value::Value;

type Completion = Box<dyn FnOnce(Result<Value, RtError>) + Send>;

enum FutureState {
    Pending { callbacks: Vec<Completion> },
    Resolved(Value),
    Failed(RtError),
}

/// A single-shot asynchronous result.
///
/// Cheap to clone; all clones observe the same completion. Completion is
/// at-most-once and callbacks run as microtasks, never inline.
#[derive(Clone)]
pub struct FutureValue {
    state: Arc<Mutex<FutureState>>,
}

impl FutureValue {
    /// A future awaiting completion.
    pub fn pending() -> Self {
        Self {
            state: Arc::new(Mutex::new(FutureState::Pending {
                callbacks: Vec::new(),
            })),
        }
    }

    /// An already-resolved future (`Future.value`).
    pub fn resolved(value: Value) -> Self {
        Self {
            state: Arc::new(Mutex::new(FutureState::Resolved(value))),
        }
    }

    /// An already-failed future (`Future.error`).
    pub fn failed(err: RtError) -> Self {
        Self {
            state: Arc::new(Mutex::new(FutureState::Failed(err))),
        }
    }

    /// Same underlying future?
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.state, &b.state)
    }

    /// Settle the future and schedule its callbacks. Completing an
    /// already-settled future is ignored.
    pub fn complete(&self, lp: &Arc<EventLoop>, result: Result<Value, RtError>) {
        let callbacks = {
            let mut state = self.state.lock();
            match &mut *state {
                FutureState::Pending { callbacks } => {
                    let callbacks = std::mem::take(callbacks);
                    *state = match &result {
                        Ok(value) => FutureState::Resolved(value.clone()),
                        Err(err) => FutureState::Failed(err.clone()),
                    };
                    callbacks
                }
                _ => {
                    tracing::debug!("ignoring second completion of a future");
                    return;
                }
            }
        };
        for callback in callbacks {
            let result = result.clone();
            lp.schedule(Box::new(move || callback(result)));
        }
    }

    /// Observe completion. Runs as a microtask even when the future has
    /// already settled, preserving ordering guarantees for awaiters.
    pub fn on_complete(&self, lp: &Arc<EventLoop>, callback: Completion) {
        let mut state = self.state.lock();
        match &mut *state {
            FutureState::Pending { callbacks } => callbacks.push(callback),
            FutureState::Resolved(value) => {
                let result = Ok(value.clone());
                lp.schedule(Box::new(move || callback(result)));
            }
            FutureState::Failed(err) => {
                let result = Err(err.clone());
                lp.schedule(Box::new(move || callback(result)));
            }
        }
    }

    /// Non-blocking snapshot of the settled result, if any.
    pub fn poll(&self) -> Option<Result<Value, RtError>> {
        match &*self.state.lock() {
            FutureState::Pending { .. } => None,
            FutureState::Resolved(value) => Some(Ok(value.clone())),
            FutureState::Failed(err) => Some(Err(err.clone())),
        }
    }
}

impl std::fmt::Debug for FutureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.lock() {
            FutureState::Pending { .. } => "pending",
            FutureState::Resolved(_) => "resolved",
            FutureState::Failed(_) => "failed",
        };
        write!(f, "FutureValue({state})")
    }
}

/// FIFO microtask queue.
///
/// The runtime has no built-in thread of its own; the host embedding it
/// decides when to drain the queue.
pub struct EventLoop {
    queue: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueue a microtask.
    pub fn schedule(&self, task: Box<dyn FnOnce() + Send>) {
        self.queue.lock().push_back(task);
    }

    /// Run microtasks until the queue is empty, including tasks scheduled
    /// by the tasks themselves. The queue lock is released around each
    /// task so tasks can schedule freely.
    pub fn run_until_idle(&self) {
        loop {
            let Some(task) = self.queue.lock().pop_front() else {
                return;
            };
            task();
        }
    }

    /// Number of queued microtasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Start an `async` body: run it eagerly to its first suspension and
/// return the future for its result.
pub(crate) fn run_async(lp: &Arc<EventLoop>, factory: &GenFactory) -> FutureValue {
    let future = FutureValue::pending();
    drive(factory(), future.clone(), Arc::clone(lp), Resume::Next);
    future
}

/// Advance an `async` body one suspension and wire up the continuation.
fn drive(mut gen: Box<dyn Generator>, future: FutureValue, lp: Arc<EventLoop>, input: Resume) {
    match gen.resume(input) {
        Ok(Step::Wait(awaited)) => {
            let loop_for_callback = Arc::clone(&lp);
            awaited.on_complete(
                &lp,
                Box::new(move |result| {
                    let input = match result {
                        Ok(value) => Resume::Value(value),
                        Err(err) => Resume::Failure(err),
                    };
                    drive(gen, future, loop_for_callback, input);
                }),
            );
        }
        Ok(Step::Done(value)) => future.complete(&lp, Ok(value)),
        Ok(Step::Emit(_) | Step::Delegate(_)) => {
            future.complete(&lp, Err(errors::yield_in_async()));
        }
        Err(err) => future.complete(&lp, Err(err.with_frame("async function body"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::runtime::Runtime;

    /// Awaits `input`, then resolves with the awaited value plus one.
    struct AddOne {
        input: FutureValue,
        started: bool,
    }

    impl Generator for AddOne {
        fn resume(&mut self, input: Resume) -> Result<Step, RtError> {
            if !self.started {
                self.started = true;
                return Ok(Step::Wait(self.input.clone()));
            }
            match input {
                Resume::Value(Value::Int(n)) => Ok(Step::Done(Value::Int(n + 1))),
                Resume::Failure(err) => Err(err),
                _ => Err(errors::structural("expected an int")),
            }
        }
    }

    #[test]
    fn async_body_runs_eagerly_then_suspends() {
        let rt = Runtime::new();
        let input = FutureValue::pending();
        let awaited = input.clone();
        let factory: GenFactory = Arc::new(move || {
            Box::new(AddOne {
                input: awaited.clone(),
                started: false,
            })
        });

        let result = rt.run_async(&factory);
        assert!(result.poll().is_none());

        input.complete(rt.event_loop(), Ok(Value::Int(41)));
        rt.event_loop().run_until_idle();
        assert_eq!(result.poll().unwrap().unwrap(), Value::Int(42));
    }

    #[test]
    fn awaiting_a_settled_future_still_defers() {
        let rt = Runtime::new();
        let factory: GenFactory = Arc::new(|| {
            Box::new(AddOne {
                input: FutureValue::resolved(Value::Int(1)),
                started: false,
            })
        });

        let result = rt.run_async(&factory);
        // Settled input or not, resumption waits for the loop.
        assert!(result.poll().is_none());
        rt.event_loop().run_until_idle();
        assert_eq!(result.poll().unwrap().unwrap(), Value::Int(2));
    }

    #[test]
    fn failed_await_propagates_unless_caught() {
        let rt = Runtime::new();
        let factory: GenFactory = Arc::new(|| {
            Box::new(AddOne {
                input: FutureValue::failed(RtError::new("boom")),
                started: false,
            })
        });

        let result = rt.run_async(&factory);
        rt.event_loop().run_until_idle();
        let err = result.poll().unwrap().unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(err.frames.iter().any(|f| f.contains("async function")));
    }

    #[test]
    fn completion_is_at_most_once() {
        let rt = Runtime::new();
        let future = FutureValue::pending();
        let observed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&observed);
        future.on_complete(
            rt.event_loop(),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        future.complete(rt.event_loop(), Ok(Value::Int(1)));
        future.complete(rt.event_loop(), Ok(Value::Int(2)));
        rt.event_loop().run_until_idle();
        assert_eq!(observed.load(Ordering::SeqCst), 1);
        assert_eq!(future.poll().unwrap().unwrap(), Value::Int(1));
    }

    #[test]
    fn yield_inside_async_function_is_an_error() {
        struct Yielder;

        impl Generator for Yielder {
            fn resume(&mut self, _input: Resume) -> Result<Step, RtError> {
                Ok(Step::Emit(Value::Int(1)))
            }
        }

        let rt = Runtime::new();
        let factory: GenFactory = Arc::new(|| Box::new(Yielder));
        let result = rt.run_async(&factory);
        rt.event_loop().run_until_idle();
        assert!(result.poll().unwrap().is_err());
    }
}
