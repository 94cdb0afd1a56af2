use super::stage::Stage;
use crate::error::TickError;

/// Terminal side effect of a pipeline, usually an actuator write.
///
/// Failures are reported to the caller and never retried within the tick.
pub trait Sink<T> {
    fn consume(&mut self, input: T) -> Result<(), TickError>;

    /// Drives outputs to their safe state after a failed tick.
    fn fail_safe(&mut self) -> Result<(), TickError> {
        Ok(())
    }
}

impl<T, K: Sink<T> + ?Sized> Sink<T> for Box<K> {
    fn consume(&mut self, input: T) -> Result<(), TickError> {
        (**self).consume(input)
    }

    fn fail_safe(&mut self) -> Result<(), TickError> {
        (**self).fail_safe()
    }
}

/// A stage in front of a sink, itself a sink.
#[derive(Debug, Clone)]
pub struct Feed<St, K> {
    stage: St,
    sink: K,
}

impl<St, K> Feed<St, K> {
    pub fn new(stage: St, sink: K) -> Self {
        Self { stage, sink }
    }
}

impl<T, St, K> Sink<T> for Feed<St, K>
where
    St: Stage<T>,
    K: Sink<St::Output>,
{
    fn consume(&mut self, input: T) -> Result<(), TickError> {
        let value = self.stage.apply(input)?;
        self.sink.consume(value)
    }

    fn fail_safe(&mut self) -> Result<(), TickError> {
        self.sink.fail_safe()
    }
}

/// Infallible sink backed by a closure.
#[derive(Clone)]
pub struct FnSink<F>(F);

pub fn sink_fn<T, F>(f: F) -> FnSink<F>
where
    F: FnMut(T),
{
    FnSink(f)
}

impl<T, F> Sink<T> for FnSink<F>
where
    F: FnMut(T),
{
    fn consume(&mut self, input: T) -> Result<(), TickError> {
        (self.0)(input);
        Ok(())
    }
}

/// Fallible sink backed by a closure.
#[derive(Clone)]
pub struct TryFnSink<F>(F);

pub fn try_sink_fn<T, F>(f: F) -> TryFnSink<F>
where
    F: FnMut(T) -> Result<(), TickError>,
{
    TryFnSink(f)
}

impl<T, F> Sink<T> for TryFnSink<F>
where
    F: FnMut(T) -> Result<(), TickError>,
{
    fn consume(&mut self, input: T) -> Result<(), TickError> {
        (self.0)(input)
    }
}
