use tokio::task::JoinHandle;

/// Background tasks owned by a viewer session.
#[derive(Default)]
pub struct SyncTasks {
    pub poller: Option<JoinHandle<()>>,
}

impl SyncTasks {
    pub fn is_running(&self) -> bool {
        self.poller.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn abort_all(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}

impl Drop for SyncTasks {
    fn drop(&mut self) {
        self.abort_all();
    }
}
