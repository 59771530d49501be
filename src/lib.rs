pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod graph;
pub mod store;
pub mod transcription;
pub mod webhook;
