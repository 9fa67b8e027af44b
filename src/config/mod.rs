pub mod settings;

pub use settings::{AppConfig, CachePolicyKind, ClockFormat, LocationSource};
