use std::sync::Arc;

use raidscope_core::{HttpExportSource, InstanceSession, SharedSession, ViewerConfig, ViewerHandle};
use tokio::sync::{Mutex, RwLock};

/// Holds all shared state for the CLI application.
#[derive(Clone)]
pub struct CliContext {
    pub config: Arc<RwLock<ViewerConfig>>,
    /// The open instance viewer. None until an instance is opened.
    viewer: Arc<Mutex<Option<ViewerHandle>>>,
}

impl CliContext {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            viewer: Arc::new(Mutex::new(None)),
        }
    }

    /// Open an instance, shutting down the previous one first.
    /// Returns the new session.
    pub async fn open(&self, instance_id: u64) -> SharedSession {
        self.close().await;

        let config = self.config.read().await.clone();
        let session = InstanceSession::new(Some(instance_id)).shared();
        let handle = ViewerHandle::spawn(
            HttpExportSource::from_config(&config),
            session.clone(),
            config.poll_interval(),
        );
        *self.viewer.lock().await = Some(handle);
        session
    }

    /// Stop polling and dispose the open session, if any
    pub async fn close(&self) -> bool {
        let handle = self.viewer.lock().await.take();
        match handle {
            Some(handle) => {
                handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    pub async fn session(&self) -> Option<SharedSession> {
        self.viewer
            .lock()
            .await
            .as_ref()
            .map(|handle| handle.session().clone())
    }

    pub async fn is_polling(&self) -> bool {
        self.viewer
            .lock()
            .await
            .as_ref()
            .is_some_and(ViewerHandle::is_running)
    }

    /// Ask the poller to load `kind` now. False without an open viewer.
    pub async fn load(&self, kind: raidscope_core::EventKind) -> bool {
        match self.viewer.lock().await.as_ref() {
            Some(handle) => handle.load(kind).await,
            None => false,
        }
    }

    pub async fn refresh(&self) -> bool {
        match self.viewer.lock().await.as_ref() {
            Some(handle) => handle.refresh().await,
            None => false,
        }
    }
}
