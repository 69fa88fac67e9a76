pub mod audit;
pub mod normalizer;
pub mod orchestrator;
pub mod queue;
pub mod reconciler;
pub mod scoring;
pub mod storage;
pub mod vision;
