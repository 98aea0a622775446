pub mod anomaly;
pub mod claim;
pub mod finding;
pub mod queue;
pub mod report;
