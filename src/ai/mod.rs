pub mod cache;
pub mod controller;
pub mod provider;
pub mod queue;

pub use cache::AnalysisCache;
pub use controller::{AiController, BudgetState, GateDecision};
pub use provider::{parse_analysis, AiProvider, OpenAiProvider, ProviderError};
pub use queue::RequestQueue;
