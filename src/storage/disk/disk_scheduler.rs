use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::common::{Result, StrataError, DISK_QUEUE_DEPTH};

use super::DiskManager;

/// A page-file I/O request, answered on its callback channel.
pub enum DiskRequest {
    /// Replace a page file with `data`
    Write {
        file_name: String,
        data: Bytes,
        callback: Sender<Result<()>>,
    },
    /// Read a whole page file
    Read {
        file_name: String,
        callback: Sender<Result<Vec<u8>>>,
    },
    /// Delete a page file; answers whether it existed
    Remove {
        file_name: String,
        callback: Sender<Result<bool>>,
    },
}

/// DiskScheduler manages a background worker thread that processes page-file
/// requests in submission order.
pub struct DiskScheduler {
    /// The disk manager for actual I/O operations
    disk_manager: Arc<DiskManager>,
    /// Channel sender for queuing requests
    request_sender: Sender<DiskRequest>,
    /// Flag to signal shutdown
    shutdown: Arc<AtomicBool>,
    /// Handle to the background worker thread
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a new DiskScheduler with the given DiskManager.
    /// Spawns a background worker thread to process requests.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = bounded::<DiskRequest>(DISK_QUEUE_DEPTH);
        let shutdown = Arc::new(AtomicBool::new(false));

        let dm_clone = Arc::clone(&disk_manager);
        let shutdown_clone = Arc::clone(&shutdown);

        let worker_handle = thread::spawn(move || {
            Self::start_worker_thread(dm_clone, receiver, shutdown_clone);
        });

        Self {
            disk_manager,
            request_sender: sender,
            shutdown,
            worker_handle: Some(worker_handle),
        }
    }

    /// Schedules a disk request for processing by the background worker.
    pub fn schedule(&self, request: DiskRequest) -> Result<()> {
        self.request_sender
            .send(request)
            .map_err(|e| StrataError::DiskScheduler(format!("Failed to schedule request: {}", e)))
    }

    /// Writes a page file and waits for completion.
    pub fn schedule_write_sync(&self, file_name: &str, data: Bytes) -> Result<()> {
        let (tx, rx) = bounded(1);
        self.schedule(DiskRequest::Write {
            file_name: file_name.to_string(),
            data,
            callback: tx,
        })?;
        Self::wait(rx)
    }

    /// Reads a page file and waits for its contents.
    pub fn schedule_read_sync(&self, file_name: &str) -> Result<Vec<u8>> {
        let (tx, rx) = bounded(1);
        self.schedule(DiskRequest::Read {
            file_name: file_name.to_string(),
            callback: tx,
        })?;
        Self::wait(rx)
    }

    /// Deletes a page file and waits for completion.
    pub fn schedule_remove_sync(&self, file_name: &str) -> Result<bool> {
        let (tx, rx) = bounded(1);
        self.schedule(DiskRequest::Remove {
            file_name: file_name.to_string(),
            callback: tx,
        })?;
        Self::wait(rx)
    }

    fn wait<T>(rx: Receiver<Result<T>>) -> Result<T> {
        rx.recv().map_err(|e| {
            StrataError::DiskScheduler(format!("Failed to receive completion: {}", e))
        })?
    }

    /// The background worker thread function.
    /// Processes requests from the queue until shutdown is signaled.
    fn start_worker_thread(
        disk_manager: Arc<DiskManager>,
        receiver: Receiver<DiskRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Drain remaining requests before exiting
                while let Ok(request) = receiver.try_recv() {
                    Self::process_request(&disk_manager, request);
                }
                break;
            }

            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(request) => Self::process_request(&disk_manager, request),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Processes a single disk request and signals its callback.
    fn process_request(disk_manager: &DiskManager, request: DiskRequest) {
        match request {
            DiskRequest::Write {
                file_name,
                data,
                callback,
            } => {
                let _ = callback.send(disk_manager.write_page_file(&file_name, &data));
            }
            DiskRequest::Read {
                file_name,
                callback,
            } => {
                let _ = callback.send(disk_manager.read_page_file(&file_name));
            }
            DiskRequest::Remove {
                file_name,
                callback,
            } => {
                let _ = callback.send(disk_manager.remove_page_file(&file_name));
            }
        }
    }

    /// Returns a reference to the underlying DiskManager.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
