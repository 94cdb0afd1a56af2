use super::sink::Sink;
use super::stage::Stage;
use super::task::Pipeline;
use crate::error::TickError;

/// Produces one value per tick.
///
/// A source may read volatile external state (joystick axes, live setpoints)
/// but must not touch pipeline state.
pub trait Source {
    type Output;

    fn produce(&mut self) -> Result<Self::Output, TickError>;

    /// `Source<T> . Stage<T, R> -> Source<R>`
    fn then<St>(self, stage: St) -> Chain<Self, St>
    where
        Self: Sized,
        St: Stage<Self::Output>,
    {
        Chain {
            source: self,
            stage,
        }
    }

    /// `Source<T> . Sink<T> -> Task`
    fn into_sink<K>(self, sink: K) -> Pipeline<Self, K>
    where
        Self: Sized,
        K: Sink<Self::Output>,
    {
        Pipeline::new(self, sink)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    type Output = S::Output;

    fn produce(&mut self) -> Result<Self::Output, TickError> {
        (**self).produce()
    }
}

/// A source followed by a stage, itself a source.
#[derive(Debug, Clone)]
pub struct Chain<S, St> {
    source: S,
    stage: St,
}

impl<S, St> Chain<S, St> {
    pub fn into_parts(self) -> (S, St) {
        (self.source, self.stage)
    }

    pub fn stage(&self) -> &St {
        &self.stage
    }
}

impl<S, St> Source for Chain<S, St>
where
    S: Source,
    St: Stage<S::Output>,
{
    type Output = St::Output;

    fn produce(&mut self) -> Result<Self::Output, TickError> {
        let value = self.source.produce()?;
        self.stage.apply(value)
    }
}

/// Source backed by a closure.
#[derive(Clone)]
pub struct FnSource<F>(F);

pub fn source_fn<T, F>(f: F) -> FnSource<F>
where
    F: FnMut() -> T,
{
    FnSource(f)
}

impl<T, F> Source for FnSource<F>
where
    F: FnMut() -> T,
{
    type Output = T;

    fn produce(&mut self) -> Result<T, TickError> {
        Ok((self.0)())
    }
}
