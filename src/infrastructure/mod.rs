pub mod clock;
pub mod counters;
pub mod persistence;
pub mod storage;
