//! `async*` streams.
//!
//! A stream is cold and single-subscription: nothing runs until `listen`,
//! and a second `listen` is an error. Events are pushed through the event
//! loop one microtask per element, so a subscriber never receives events
//! re-entrantly and cancellation takes effect between elements.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{self, RtError};
use crate::generators::{EventLoop, GenFactory, Generator, Resume, Step};
use crate::value::Value;

/// A cancellable push stream produced by an `async*` function.
pub struct StreamValue {
    factory: GenFactory,
    subscribed: Mutex<bool>,
}

impl StreamValue {
    pub(crate) fn new(factory: GenFactory) -> Self {
        Self {
            factory,
            subscribed: Mutex::new(false),
        }
    }

    /// Subscribe and start the body. At most one subscription per
    /// stream; the body does not run before this call.
    pub fn listen(
        &self,
        lp: &Arc<EventLoop>,
        handlers: StreamHandlers,
    ) -> Result<StreamSubscription, RtError> {
        {
            let mut subscribed = self.subscribed.lock();
            if *subscribed {
                return Err(errors::structural("stream has already been listened to"));
            }
            *subscribed = true;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let pump = Pump {
            stack: vec![(self.factory)()],
            handlers,
            lp: Arc::clone(lp),
            cancelled: Arc::clone(&cancelled),
        };
        lp.schedule(Box::new(move || pump.run(Resume::Next)));
        Ok(StreamSubscription { cancelled })
    }
}

impl std::fmt::Debug for StreamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamValue")
            .field("subscribed", &*self.subscribed.lock())
            .finish_non_exhaustive()
    }
}

/// Subscriber callbacks.
///
/// `on_error` is followed by `on_done`; the body is not resumed after an
/// error escapes it.
#[derive(Clone)]
pub struct StreamHandlers {
    pub on_data: Arc<dyn Fn(Value) + Send + Sync>,
    pub on_error: Arc<dyn Fn(RtError) + Send + Sync>,
    pub on_done: Arc<dyn Fn() + Send + Sync>,
}

/// Handle to an active subscription.
#[derive(Debug)]
pub struct StreamSubscription {
    cancelled: Arc<AtomicBool>,
}

impl StreamSubscription {
    /// Stop the stream. The body is not resumed again; `on_done` fires
    /// once the pump observes the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Drives one subscription's generator stack.
///
/// Each `Emit` delivers the element and reschedules as a fresh microtask;
/// `yield*` of another stream pushes its generator onto the stack.
struct Pump {
    stack: Vec<Box<dyn Generator>>,
    handlers: StreamHandlers,
    lp: Arc<EventLoop>,
    cancelled: Arc<AtomicBool>,
}

impl Pump {
    fn run(mut self, mut input: Resume) {
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                (self.handlers.on_done)();
                return;
            }
            let Some(gen) = self.stack.last_mut() else {
                (self.handlers.on_done)();
                return;
            };

            match gen.resume(input) {
                Ok(Step::Emit(value)) => {
                    (self.handlers.on_data)(value);
                    let lp = Arc::clone(&self.lp);
                    lp.schedule(Box::new(move || self.run(Resume::Next)));
                    return;
                }
                Ok(Step::Delegate(Value::Stream(inner))) => {
                    self.stack.push((inner.factory)());
                    input = Resume::Next;
                }
                Ok(Step::Delegate(other)) => {
                    (self.handlers.on_error)(errors::structural(format!(
                        "yield* target must be a stream, got {}",
                        other.kind_name()
                    )));
                    (self.handlers.on_done)();
                    return;
                }
                Ok(Step::Wait(awaited)) => {
                    let lp = Arc::clone(&self.lp);
                    awaited.on_complete(
                        &lp,
                        Box::new(move |result| {
                            if self.cancelled.load(Ordering::SeqCst) {
                                (self.handlers.on_done)();
                                return;
                            }
                            let input = match result {
                                Ok(value) => Resume::Value(value),
                                Err(err) => Resume::Failure(err),
                            };
                            self.run(input);
                        }),
                    );
                    return;
                }
                Ok(Step::Done(_)) => {
                    self.stack.pop();
                    input = Resume::Next;
                }
                Err(err) => {
                    (self.handlers.on_error)(err.with_frame("async* generator body"));
                    (self.handlers.on_done)();
                    return;
                }
            }
        }
    }
}
