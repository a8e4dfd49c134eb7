pub mod model;
pub mod ports;
pub mod service;

pub use model::{FeatureAccumulator, FeatureVector};
pub use service::{AggregateService, Aggregator};
