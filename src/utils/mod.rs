pub mod convergence;
pub mod logging;
pub mod report;

pub use convergence::{Convergence, SolveStats, Termination};
pub use logging::init_tracing;
pub use report::SolveReport;
