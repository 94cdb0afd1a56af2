//! Open-loop shaping stages applied after the controllers.

pub mod feed_forward;
pub mod resolve;
pub mod unit_scaler;

pub use feed_forward::{FeedForwardGains, FeedForwardStage};
pub use resolve::ResolveAbsentStage;
pub use unit_scaler::UnitScalerStage;
