pub mod aggregator;
pub mod resolver;
pub mod summary;

pub use aggregator::aggregate_positions;
pub use resolver::resolve_outcome;
pub use summary::{summarize, PositionSummary, SummaryStats};
