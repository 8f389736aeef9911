mod tracing_factory;

pub use tracing_factory::{OutputType, TracingFactory, TracingFactoryOptions};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Installs a bare stdout subscriber for test binaries; ignores a
/// subscriber already set by an earlier test in the same process.
pub fn init_test_log() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

