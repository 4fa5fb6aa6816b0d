pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod logging;
pub mod normalize;
pub mod parser;
pub mod sources;
pub mod store;
pub mod types;
