//! Instrumentation wrappers
//!
//! A wrapped callable behaves like the original except that counting is
//! enabled on the engine while its body runs. Results and errors pass
//! through untouched, and panics unwind through the wrapper after
//! counting has been switched off again.
//!
//! Generators get a dedicated wrapper: counting is on only between a
//! resumption and the next suspension, never while the caller holds the
//! suspended generator.

use crate::engine::{EnableGuard, TracingEngine};
use crate::stats::FunctionKey;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::marker::PhantomData;
use thiserror::Error;

/// Identity metadata carried from the original callable to its wrapper
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionMetadata {
    pub name: String,
    /// Module (or crate path) the function comes from
    pub module: String,
    pub doc: Option<String>,
    /// Free-form attributes
    pub attributes: BTreeMap<String, String>,
}

impl FunctionMetadata {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Plain callable with counting bracketed around each call
pub struct ProfiledFn<'e, E: TracingEngine + ?Sized, F> {
    engine: &'e E,
    key: FunctionKey,
    metadata: FunctionMetadata,
    func: F,
}

/// Register `key` with the engine and wrap `func`
pub fn wrap_function<'e, E, F>(
    engine: &'e E,
    key: FunctionKey,
    metadata: FunctionMetadata,
    func: F,
) -> ProfiledFn<'e, E, F>
where
    E: TracingEngine + ?Sized,
{
    engine.register(&key);
    ProfiledFn {
        engine,
        key,
        metadata,
        func,
    }
}

impl<'e, E: TracingEngine + ?Sized, F> ProfiledFn<'e, E, F> {
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        let _guard = EnableGuard::new(self.engine);
        (self.func)(args)
    }

    pub fn call_mut<A, R>(&mut self, args: A) -> R
    where
        F: FnMut(A) -> R,
    {
        let _guard = EnableGuard::new(self.engine);
        (self.func)(args)
    }

    pub fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    pub fn key(&self) -> &FunctionKey {
        &self.key
    }
}

/// Outcome of one generator step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorState<Y, R> {
    /// Suspended after producing a value
    Yielded(Y),
    /// Finished with a return value
    Complete(R),
}

/// A resumable computation
///
/// The first `resume` receives `None`; later ones carry the caller's value.
pub trait Generator {
    type Input;
    type Yield;
    type Return;
    type Error;

    fn resume(
        &mut self,
        input: Option<Self::Input>,
    ) -> Result<GeneratorState<Self::Yield, Self::Return>, Self::Error>;

    /// Raise `error` at the suspension point. By default the generator
    /// does not handle it and the error propagates.
    fn throw(
        &mut self,
        error: Self::Error,
    ) -> Result<GeneratorState<Self::Yield, Self::Return>, Self::Error> {
        Err(error)
    }
}

/// Generator backed by a closure
pub struct FromFn<F, I, Y, R, Err> {
    step: F,
    _types: PhantomData<fn(Option<I>) -> Result<GeneratorState<Y, R>, Err>>,
}

/// Build a generator from a step closure
pub fn from_fn<F, I, Y, R, Err>(step: F) -> FromFn<F, I, Y, R, Err>
where
    F: FnMut(Option<I>) -> Result<GeneratorState<Y, R>, Err>,
{
    FromFn {
        step,
        _types: PhantomData,
    }
}

impl<F, I, Y, R, Err> Generator for FromFn<F, I, Y, R, Err>
where
    F: FnMut(Option<I>) -> Result<GeneratorState<Y, R>, Err>,
{
    type Input = I;
    type Yield = Y;
    type Return = R;
    type Error = Err;

    fn resume(&mut self, input: Option<I>) -> Result<GeneratorState<Y, R>, Err> {
        (self.step)(input)
    }
}

/// Generator over an iterator; inputs are ignored
pub struct FromIter<I>(pub I);

impl<I: Iterator> Generator for FromIter<I> {
    type Input = ();
    type Yield = I::Item;
    type Return = ();
    type Error = Infallible;

    fn resume(&mut self, _input: Option<()>) -> Result<GeneratorState<I::Item, ()>, Infallible> {
        Ok(match self.0.next() {
            Some(item) => GeneratorState::Yielded(item),
            None => GeneratorState::Complete(()),
        })
    }
}

/// Misuse of a wrapped generator, or an error from its body
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResumeError<E> {
    #[error("generator already started; resume it with send()")]
    AlreadyStarted,

    #[error("can't send a value to a generator that has not started")]
    NotStarted,

    #[error("resumed exhausted sequence")]
    Exhausted,

    #[error("{0}")]
    Body(E),
}

impl<E> ResumeError<E> {
    /// The body's own error, if that is what this is
    pub fn into_body(self) -> Option<E> {
        match self {
            ResumeError::Body(e) => Some(e),
            _ => None,
        }
    }
}

/// Lifecycle of a wrapped generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeState {
    NotStarted,
    Suspended,
    Done,
}

type Step<G> = Result<
    GeneratorState<<G as Generator>::Yield, <G as Generator>::Return>,
    ResumeError<<G as Generator>::Error>,
>;

/// Generator with counting bracketed around every resumption
pub struct ProfiledGenerator<'e, E: TracingEngine + ?Sized, G> {
    engine: &'e E,
    inner: G,
    state: ResumeState,
}

impl<'e, E: TracingEngine + ?Sized, G: Generator> ProfiledGenerator<'e, E, G> {
    pub fn new(engine: &'e E, inner: G) -> Self {
        Self {
            engine,
            inner,
            state: ResumeState::NotStarted,
        }
    }

    pub fn state(&self) -> ResumeState {
        self.state
    }

    /// Run the body up to its first suspension
    pub fn start(&mut self) -> Step<G> {
        match self.state {
            ResumeState::NotStarted => self.step(|g| g.resume(None)),
            ResumeState::Suspended => Err(ResumeError::AlreadyStarted),
            ResumeState::Done => Err(ResumeError::Exhausted),
        }
    }

    /// Resume the body with `input`
    pub fn send(&mut self, input: G::Input) -> Step<G> {
        match self.state {
            ResumeState::Suspended => self.step(|g| g.resume(Some(input))),
            ResumeState::NotStarted => Err(ResumeError::NotStarted),
            ResumeState::Done => Err(ResumeError::Exhausted),
        }
    }

    /// Raise `error` inside the body at its suspension point
    pub fn throw(&mut self, error: G::Error) -> Step<G> {
        match self.state {
            ResumeState::Suspended => self.step(|g| g.throw(error)),
            // Never ran, so there is nothing to bracket
            ResumeState::NotStarted | ResumeState::Done => {
                self.state = ResumeState::Done;
                Err(ResumeError::Body(error))
            }
        }
    }

    /// Finish without resuming the body again
    pub fn close(&mut self) {
        self.state = ResumeState::Done;
    }

    fn step<F>(&mut self, resume: F) -> Step<G>
    where
        F: FnOnce(&mut G) -> Result<GeneratorState<G::Yield, G::Return>, G::Error>,
    {
        // Stays Done if the body completes, fails or panics
        self.state = ResumeState::Done;
        let outcome = {
            let _guard = EnableGuard::new(self.engine);
            resume(&mut self.inner)
        };
        if let Ok(GeneratorState::Yielded(_)) = outcome {
            self.state = ResumeState::Suspended;
        }
        outcome.map_err(ResumeError::Body)
    }
}

impl<E, G> Iterator for ProfiledGenerator<'_, E, G>
where
    E: TracingEngine + ?Sized,
    G: Generator,
    G::Input: Default,
{
    type Item = Result<G::Yield, G::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match self.state {
            ResumeState::NotStarted => self.start(),
            ResumeState::Suspended => self.send(G::Input::default()),
            ResumeState::Done => return None,
        };
        match step {
            Ok(GeneratorState::Yielded(item)) => Some(Ok(item)),
            Ok(GeneratorState::Complete(_)) => None,
            Err(ResumeError::Body(e)) => Some(Err(e)),
            Err(_) => None,
        }
    }
}

/// Generator factory whose generators are profiled
pub struct ProfiledGeneratorFn<'e, E: TracingEngine + ?Sized, F> {
    engine: &'e E,
    key: FunctionKey,
    metadata: FunctionMetadata,
    factory: F,
}

/// Register `key` with the engine and wrap a generator factory
///
/// Creating the generator runs none of its body, so only resumptions are
/// bracketed.
pub fn wrap_generator<'e, E, F>(
    engine: &'e E,
    key: FunctionKey,
    metadata: FunctionMetadata,
    factory: F,
) -> ProfiledGeneratorFn<'e, E, F>
where
    E: TracingEngine + ?Sized,
{
    engine.register(&key);
    ProfiledGeneratorFn {
        engine,
        key,
        metadata,
        factory,
    }
}

impl<'e, E: TracingEngine + ?Sized, F> ProfiledGeneratorFn<'e, E, F> {
    pub fn call<A, G>(&self, args: A) -> ProfiledGenerator<'e, E, G>
    where
        F: Fn(A) -> G,
        G: Generator,
    {
        ProfiledGenerator::new(self.engine, (self.factory)(args))
    }

    pub fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    pub fn key(&self) -> &FunctionKey {
        &self.key
    }
}
