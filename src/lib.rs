pub mod cache;
pub mod config;
pub mod errors;
pub mod mappings;
pub mod models;
pub mod resolvers;
pub mod service;
pub mod storage;
pub mod transport;
pub mod utils;
