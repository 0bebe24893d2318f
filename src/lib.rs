pub mod app;
pub mod config;
pub mod engine;
pub mod orchestration;
pub mod shared;
