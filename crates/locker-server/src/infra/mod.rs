pub mod audit;
pub mod db;
pub mod metrics;
pub mod request_context;
