pub mod aggregation;
pub mod export;
pub mod pipeline;
pub mod recognition;
pub mod shared;
pub mod tracking;
pub mod video;
