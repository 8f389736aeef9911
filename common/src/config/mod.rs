mod app;
mod sink;

pub use app::{AppConfig, DbConfig, DumpConfig, SourceConfig};
pub use sink::SinkConfig;
