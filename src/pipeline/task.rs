use super::sink::Sink;
use super::source::Source;
use crate::error::TickError;

/// Zero-argument, repeatable unit of work run once per tick.
pub trait Task {
    fn tick(&mut self) -> Result<(), TickError>;

    /// Called by the executor after a failed tick when fail-safe is enabled.
    fn fail_safe(&mut self) -> Result<(), TickError> {
        Ok(())
    }
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn tick(&mut self) -> Result<(), TickError> {
        (**self).tick()
    }

    fn fail_safe(&mut self) -> Result<(), TickError> {
        (**self).fail_safe()
    }
}

/// A fully assembled `Source -> Stage* -> Sink` chain.
#[derive(Debug, Clone)]
pub struct Pipeline<S, K> {
    source: S,
    sink: K,
}

impl<S, K> Pipeline<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self { source, sink }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }
}

impl<S, K> Task for Pipeline<S, K>
where
    S: Source,
    K: Sink<S::Output>,
{
    fn tick(&mut self) -> Result<(), TickError> {
        let value = self.source.produce()?;
        self.sink.consume(value)
    }

    fn fail_safe(&mut self) -> Result<(), TickError> {
        self.sink.fail_safe()
    }
}

/// Task backed by a closure.
#[derive(Clone)]
pub struct FnTask<F>(F);

pub fn task_fn<F>(f: F) -> FnTask<F>
where
    F: FnMut() -> Result<(), TickError>,
{
    FnTask(f)
}

impl<F> Task for FnTask<F>
where
    F: FnMut() -> Result<(), TickError>,
{
    fn tick(&mut self) -> Result<(), TickError> {
        (self.0)()
    }
}
