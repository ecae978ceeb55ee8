pub mod config;
pub mod discovery;
pub mod encoding;
pub mod pipeline;
pub mod rename;
