pub mod body;
pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod interval;
pub mod mesh;
pub mod output;
pub mod pool;
pub mod selector;
pub mod store;
pub mod timeline;
