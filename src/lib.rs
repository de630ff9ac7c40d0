pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod posts;
pub mod provider;
pub mod resolver;
pub mod server;
pub mod storage;
pub mod types;
