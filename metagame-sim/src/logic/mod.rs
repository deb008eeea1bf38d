pub mod aggregate;
pub mod batch;
pub mod reports;
pub mod scenario;
pub mod seeds;

pub use aggregate::{BatchSummary, summarize_batch};
pub use batch::BatchRunner;
pub use scenario::Scenario;
pub use seeds::{parse_cutoffs, resolve_seed_inputs, split_csv};
