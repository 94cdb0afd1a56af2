use super::sink::{Feed, Sink};
use crate::error::TickError;

/// Transform invoked exactly once per tick, in pipeline order.
///
/// Any internal state (accumulators, previous error) belongs to the stage
/// instance and is only touched from `apply`.
pub trait Stage<T> {
    type Output;

    fn apply(&mut self, input: T) -> Result<Self::Output, TickError>;

    /// `Stage<T, R> . Stage<R, U> -> Stage<T, U>`
    fn and_then<N>(self, next: N) -> Compose<Self, N>
    where
        Self: Sized,
        N: Stage<Self::Output>,
    {
        Compose {
            first: self,
            second: next,
        }
    }

    /// `Stage<T, R> . Sink<R> -> Sink<T>`
    fn feed<K>(self, sink: K) -> Feed<Self, K>
    where
        Self: Sized,
        K: Sink<Self::Output>,
    {
        Feed::new(self, sink)
    }
}

impl<T, S: Stage<T> + ?Sized> Stage<T> for Box<S> {
    type Output = S::Output;

    fn apply(&mut self, input: T) -> Result<Self::Output, TickError> {
        (**self).apply(input)
    }
}

impl<T, S: Stage<T> + ?Sized> Stage<T> for &mut S {
    type Output = S::Output;

    fn apply(&mut self, input: T) -> Result<Self::Output, TickError> {
        (**self).apply(input)
    }
}

/// Two stages run back to back.
#[derive(Debug, Clone)]
pub struct Compose<A, B> {
    first: A,
    second: B,
}

impl<T, A, B> Stage<T> for Compose<A, B>
where
    A: Stage<T>,
    B: Stage<A::Output>,
{
    type Output = B::Output;

    fn apply(&mut self, input: T) -> Result<Self::Output, TickError> {
        let mid = self.first.apply(input)?;
        self.second.apply(mid)
    }
}

/// Infallible stage backed by a closure.
#[derive(Clone)]
pub struct FnStage<F>(F);

pub fn stage_fn<T, R, F>(f: F) -> FnStage<F>
where
    F: FnMut(T) -> R,
{
    FnStage(f)
}

impl<T, R, F> Stage<T> for FnStage<F>
where
    F: FnMut(T) -> R,
{
    type Output = R;

    fn apply(&mut self, input: T) -> Result<R, TickError> {
        Ok((self.0)(input))
    }
}

/// Fallible stage backed by a closure.
#[derive(Clone)]
pub struct TryFnStage<F>(F);

pub fn try_stage_fn<T, R, F>(f: F) -> TryFnStage<F>
where
    F: FnMut(T) -> Result<R, TickError>,
{
    TryFnStage(f)
}

impl<T, R, F> Stage<T> for TryFnStage<F>
where
    F: FnMut(T) -> Result<R, TickError>,
{
    type Output = R;

    fn apply(&mut self, input: T) -> Result<R, TickError> {
        (self.0)(input)
    }
}
