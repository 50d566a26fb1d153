pub mod cache;
pub mod db;
pub mod queue;
pub mod storage;
