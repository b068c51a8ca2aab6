//! Content evaluator adapters.

mod fixed;
mod remote;

pub use fixed::FixedScoreEvaluator;
pub use remote::{DEFAULT_EVALUATOR_TIMEOUT, RemoteEvaluator};
