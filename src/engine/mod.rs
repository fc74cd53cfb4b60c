pub mod compat;
pub mod matching;
pub mod queue;
pub mod scoring;
