use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::common::{Result, SessionId, StorageConfig, StrataError};
use crate::concurrency::LockManager;
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::Database;

/// Engine-wide registry of databases, shared by all sessions.
pub struct Context {
    config: StorageConfig,
    disk_scheduler: Arc<DiskScheduler>,
    databases: RwLock<HashMap<String, Arc<Database>>>,
    lock_manager: LockManager,
    next_session: AtomicU64,
}

impl Context {
    /// Opens the data directory named by `config`, creating it if needed.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let disk_manager = Arc::new(DiskManager::new(config.data_dir())?);
        Ok(Self {
            disk_scheduler: Arc::new(DiskScheduler::new(disk_manager)),
            config,
            databases: RwLock::new(HashMap::new()),
            lock_manager: LockManager::new(),
            next_session: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the database called `name`, creating it first if absent.
    pub fn create_database_if_not_exists(&self, name: &str) -> Arc<Database> {
        let mut databases = self.databases.write();
        let database = databases.entry(name.to_string()).or_insert_with(|| {
            info!(database = name, "created database");
            Arc::new(Database::new(
                name,
                self.config.clone(),
                Arc::clone(&self.disk_scheduler),
            ))
        });
        Arc::clone(database)
    }

    pub fn database(&self, name: &str) -> Result<Arc<Database>> {
        self.databases
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StrataError::DatabaseNotExist(name.to_string()))
    }

    /// Removes a database and deletes all of its tables.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        let database = self
            .databases
            .write()
            .remove(name)
            .ok_or_else(|| StrataError::DatabaseNotExist(name.to_string()))?;
        database.drop_self()
    }

    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Persists every database.
    pub fn quit(&self) -> Result<()> {
        for database in self.databases.read().values() {
            database.persist()?;
        }
        info!("persisted all databases");
        Ok(())
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Allocates an id for a new session.
    pub fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed))
    }
}
