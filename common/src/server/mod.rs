use futures_util::future::join_all;

use crate::err::CdcError;

/// Anything the process brings up at startup and must bring down cleanly
/// at shutdown — the admin HTTP listener, a worker's checkpoint task, etc.
#[async_trait::async_trait]
pub trait Server: Send {
    async fn start(&mut self);

    async fn shutdown(&mut self, graceful: bool) -> Result<(), CdcError>;
}

/// Fans a single shutdown signal out to every registered [`Server`] and
/// waits for all of them, surfacing the first error (if any).
#[derive(Default)]
pub struct ShutdownHandle {
    services: Vec<Box<dyn Server>>,
}

impl ShutdownHandle {
    pub fn create() -> Self {
        Self { services: vec![] }
    }

    pub fn add_service(&mut self, server: Box<dyn Server>) {
        self.services.push(server);
    }

    pub async fn shutdown_services(&mut self, graceful: bool) -> Result<(), CdcError> {
        let futures = self.services.iter_mut().map(|s| s.shutdown(graceful));
        let results = join_all(futures).await;

        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }
}
