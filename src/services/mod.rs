pub mod analyzer;
pub mod matcher;
pub mod pipeline;
pub mod queue;
pub mod rules;
pub mod scorer;
pub mod semantic;
pub mod temporal;
