//! Suspendable function bodies: `sync*`, `async`, and `async*`.
//!
//! The compiler lowers a suspendable body to a resumable state machine
//! implementing [`Generator`]. One protocol serves all three shapes; the
//! adapters in this module interpret the steps differently: a `sync*`
//! iterable pulls eagerly and rejects `Wait`, an `async` future rejects
//! `Emit`, and an `async*` stream pushes through the event loop.

mod future;
mod stream;
mod sync_star;

use std::sync::Arc;

pub use future::{EventLoop, FutureValue};
pub use stream::{StreamHandlers, StreamSubscription, StreamValue};
pub use sync_star::{GenIterator, IterableValue};

use crate::errors::RtError;
use crate::runtime::Runtime;
use crate::value::Value;

/// What a generator body did when resumed.
pub enum Step {
    /// `yield v`: hand one element to the consumer.
    Emit(Value),
    /// `yield* inner`: splice a whole sequence or stream in.
    Delegate(Value),
    /// `await f`: suspend until the future settles.
    Wait(FutureValue),
    /// The body returned (the value is meaningful for `async` only).
    Done(Value),
}

/// What the consumer feeds back into a suspended body.
pub enum Resume {
    /// Continue after a `yield` (or start the body).
    Next,
    /// An awaited future resolved with this value.
    Value(Value),
    /// An awaited future failed; the body may catch or propagate.
    Failure(RtError),
}

/// A resumable compiled function body.
///
/// `resume` drives the state machine one suspension forward. Returning
/// `Err` means an uncaught error escaped the body; the machine must not
/// be resumed afterwards.
pub trait Generator: Send {
    fn resume(&mut self, input: Resume) -> Result<Step, RtError>;
}

/// Builds a fresh state machine per traversal or subscription.
pub type GenFactory = Arc<dyn Fn() -> Box<dyn Generator> + Send + Sync>;

impl Runtime {
    /// Wrap a `sync*` body as a restartable lazy iterable.
    pub fn sync_star(&self, factory: GenFactory) -> Value {
        Value::iterable(IterableValue::new(factory))
    }

    /// Start an `async` body; the body runs eagerly until its first
    /// suspension, and the returned future settles through the event
    /// loop.
    pub fn run_async(&self, factory: &GenFactory) -> FutureValue {
        future::run_async(self.event_loop(), factory)
    }

    /// Wrap an `async*` body as a single-subscription cold stream.
    pub fn async_star(&self, factory: GenFactory) -> Value {
        Value::stream(StreamValue::new(factory))
    }
}
