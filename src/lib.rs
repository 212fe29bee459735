pub mod analyzer;
pub mod api;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod http;
pub mod humanize;
pub mod manual;
pub mod observability;
pub mod pipeline;
pub mod screenshots;
pub mod session;
pub mod storage;
