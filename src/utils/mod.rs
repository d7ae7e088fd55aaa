pub mod error;
pub mod fits;
pub mod logger;
pub mod monitor;
pub mod task_pool;
pub mod validation;
