//! `sync*` iterables.
//!
//! An iterable holds the generator factory, not a generator: every
//! traversal builds a fresh state machine, so iterating twice replays the
//! body from the start.

use crate::errors::{self, RtError, RtResult};
use crate::generators::{GenFactory, Generator, Resume, Step};
use crate::value::Value;

/// A restartable lazy sequence produced by a `sync*` function.
pub struct IterableValue {
    factory: GenFactory,
}

impl IterableValue {
    pub(crate) fn new(factory: GenFactory) -> Self {
        Self { factory }
    }

    /// Begin a fresh traversal.
    pub fn iter(&self) -> GenIterator {
        GenIterator {
            frames: vec![Frame::Gen((self.factory)())],
        }
    }

    /// Eagerly collect the whole sequence, stopping at the first error.
    pub fn drain(&self) -> Result<Vec<Value>, RtError> {
        self.iter().collect()
    }
}

/// One level of active `yield*` delegation.
enum Frame {
    Gen(Box<dyn Generator>),
    List { items: Vec<Value>, pos: usize },
}

/// Pull-based cursor over a `sync*` body.
///
/// Delegation (`yield* inner`) is a frame stack rather than recursion, so
/// deeply nested delegation cannot overflow the host stack. After an
/// error the cursor is exhausted.
pub struct GenIterator {
    frames: Vec<Frame>,
}

impl Iterator for GenIterator {
    type Item = RtResult;

    fn next(&mut self) -> Option<RtResult> {
        loop {
            let step = match self.frames.last_mut()? {
                Frame::List { items, pos } => {
                    if let Some(value) = items.get(*pos) {
                        let value = value.clone();
                        *pos += 1;
                        return Some(Ok(value));
                    }
                    self.frames.pop();
                    continue;
                }
                Frame::Gen(gen) => gen.resume(Resume::Next),
            };

            match step {
                Ok(Step::Emit(value)) => return Some(Ok(value)),
                Ok(Step::Delegate(Value::Iterable(inner))) => {
                    self.frames.push(Frame::Gen((inner.factory)()));
                }
                Ok(Step::Delegate(Value::List(list))) => {
                    self.frames.push(Frame::List {
                        items: list.snapshot(),
                        pos: 0,
                    });
                }
                Ok(Step::Delegate(other)) => {
                    self.frames.clear();
                    return Some(Err(errors::structural(format!(
                        "yield* target must be iterable, got {}",
                        other.kind_name()
                    ))));
                }
                Ok(Step::Wait(_)) => {
                    self.frames.clear();
                    return Some(Err(errors::await_in_sync_generator()));
                }
                Ok(Step::Done(_)) => {
                    self.frames.pop();
                }
                Err(err) => {
                    self.frames.clear();
                    return Some(Err(err.with_frame("sync* generator body")));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::RtErrorKind;
    use crate::runtime::Runtime;

    /// Yields `0..limit` one element per resumption.
    struct Counter {
        next: i64,
        limit: i64,
    }

    impl Generator for Counter {
        fn resume(&mut self, _input: Resume) -> Result<Step, RtError> {
            if self.next < self.limit {
                let value = Value::Int(self.next);
                self.next += 1;
                Ok(Step::Emit(value))
            } else {
                Ok(Step::Done(Value::Null))
            }
        }
    }

    fn counting(limit: i64) -> GenFactory {
        Arc::new(move || Box::new(Counter { next: 0, limit }))
    }

    #[test]
    fn traversal_is_restartable() {
        let rt = Runtime::new();
        let value = rt.sync_star(counting(3));
        let Value::Iterable(iterable) = &value else {
            panic!("expected iterable")
        };

        let expected = vec![Value::Int(0), Value::Int(1), Value::Int(2)];
        assert_eq!(iterable.drain().unwrap(), expected);
        assert_eq!(iterable.drain().unwrap(), expected);
    }

    #[test]
    fn interleaved_traversals_do_not_share_progress() {
        let rt = Runtime::new();
        let value = rt.sync_star(counting(3));
        let Value::Iterable(iterable) = &value else {
            panic!("expected iterable")
        };

        let mut a = iterable.iter();
        let mut b = iterable.iter();
        assert_eq!(a.next().unwrap().unwrap(), Value::Int(0));
        assert_eq!(a.next().unwrap().unwrap(), Value::Int(1));
        assert_eq!(b.next().unwrap().unwrap(), Value::Int(0));
        assert_eq!(a.next().unwrap().unwrap(), Value::Int(2));
        assert_eq!(b.next().unwrap().unwrap(), Value::Int(1));
        assert!(a.next().is_none());
        assert_eq!(b.next().unwrap().unwrap(), Value::Int(2));
        assert!(b.next().is_none());
    }

    #[test]
    fn delegation_splices_inner_sequences() {
        struct Outer {
            state: u8,
            inner: Value,
        }

        impl Generator for Outer {
            fn resume(&mut self, _input: Resume) -> Result<Step, RtError> {
                self.state += 1;
                match self.state {
                    1 => Ok(Step::Emit(Value::Int(10))),
                    2 => Ok(Step::Delegate(self.inner.clone())),
                    3 => Ok(Step::Emit(Value::Int(20))),
                    _ => Ok(Step::Done(Value::Null)),
                }
            }
        }

        let rt = Runtime::new();
        let inner = rt.sync_star(counting(2));
        let outer = rt.sync_star(Arc::new(move || {
            Box::new(Outer {
                state: 0,
                inner: inner.clone(),
            }) as Box<dyn Generator>
        }));

        let Value::Iterable(iterable) = &outer else {
            panic!("expected iterable")
        };
        assert_eq!(
            iterable.drain().unwrap(),
            vec![
                Value::Int(10),
                Value::Int(0),
                Value::Int(1),
                Value::Int(20)
            ]
        );
    }

    #[test]
    fn delegation_accepts_native_lists() {
        struct Splice {
            state: u8,
            list: Value,
        }

        impl Generator for Splice {
            fn resume(&mut self, _input: Resume) -> Result<Step, RtError> {
                self.state += 1;
                match self.state {
                    1 => Ok(Step::Delegate(self.list.clone())),
                    _ => Ok(Step::Done(Value::Null)),
                }
            }
        }

        let rt = Runtime::new();
        let list = Value::list(vec![Value::Int(7), Value::Int(8)]);
        let value = rt.sync_star(Arc::new(move || {
            Box::new(Splice {
                state: 0,
                list: list.clone(),
            }) as Box<dyn Generator>
        }));

        let Value::Iterable(iterable) = &value else {
            panic!("expected iterable")
        };
        assert_eq!(
            iterable.drain().unwrap(),
            vec![Value::Int(7), Value::Int(8)]
        );
    }

    #[test]
    fn await_inside_sync_generator_is_an_error() {
        struct Awaiter;

        impl Generator for Awaiter {
            fn resume(&mut self, _input: Resume) -> Result<Step, RtError> {
                Ok(Step::Wait(crate::generators::FutureValue::resolved(
                    Value::Null,
                )))
            }
        }

        let rt = Runtime::new();
        let value = rt.sync_star(Arc::new(|| Box::new(Awaiter) as Box<dyn Generator>));
        let Value::Iterable(iterable) = &value else {
            panic!("expected iterable")
        };
        let err = iterable.drain().unwrap_err();
        assert!(matches!(err.kind, RtErrorKind::Structural { .. }));
    }

    #[test]
    fn body_error_ends_traversal_with_a_frame() {
        struct Faulty {
            state: u8,
        }

        impl Generator for Faulty {
            fn resume(&mut self, _input: Resume) -> Result<Step, RtError> {
                self.state += 1;
                match self.state {
                    1 => Ok(Step::Emit(Value::Int(1))),
                    _ => Err(RtError::new("boom")),
                }
            }
        }

        let rt = Runtime::new();
        let value = rt.sync_star(Arc::new(|| Box::new(Faulty { state: 0 }) as Box<dyn Generator>));
        let Value::Iterable(iterable) = &value else {
            panic!("expected iterable")
        };

        let mut iter = iterable.iter();
        assert_eq!(iter.next().unwrap().unwrap(), Value::Int(1));
        let err = iter.next().unwrap().unwrap_err();
        assert!(err.frames.iter().any(|f| f.contains("sync*")));
        assert!(iter.next().is_none());
    }
}
