pub mod analysis;
pub mod api;
pub mod asset;
pub mod job;
