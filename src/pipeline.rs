//! Pipeline primitives and their static composition.
//!
//! A pipeline is `Source -> Stage* -> Sink`. Composition is done with generic
//! combinators, so a value type mismatch between two links is a compile error:
//!
//! ```
//! use tank_drive_pipeline::pipeline::{source_fn, stage_fn, sink_fn, Source, Task};
//!
//! let mut seen = Vec::new();
//! let mut task = source_fn(|| 2.0_f64)
//!     .then(stage_fn(|v: f64| v * 3.0))
//!     .into_sink(sink_fn(|v: f64| seen.push(v)));
//! task.tick().unwrap();
//! drop(task);
//! assert_eq!(seen, vec![6.0]);
//! ```
//!
//! The combinators are associative: `(a.then(b)).then(c)` and
//! `a.then(b.and_then(c))` produce the same value on every tick.

pub mod sink;
pub mod source;
pub mod stage;
pub mod task;

pub use sink::{sink_fn, try_sink_fn, Feed, FnSink, Sink, TryFnSink};
pub use source::{source_fn, Chain, FnSource, Source};
pub use stage::{stage_fn, try_stage_fn, Compose, FnStage, Stage, TryFnStage};
pub use task::{task_fn, FnTask, Pipeline, Task};
