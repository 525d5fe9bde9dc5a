pub mod analytics;
pub mod cli;
pub mod config;
pub mod llm;
pub mod samples;
pub mod session;
pub mod storage;
pub mod web;
