pub mod classifier;
pub mod pipeline;
pub mod source;
pub mod staging;
pub mod storage;
pub mod worker;
