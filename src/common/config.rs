use std::path::{Path, PathBuf};

/// Byte budget of a single page, measured in row display bytes
pub const PAGE_BYTE_BUDGET: usize = 2048;

/// Number of pages a table keeps resident before evicting
pub const MAX_RESIDENT_PAGES: usize = 1000;

/// Directory page files are written to when none is configured
pub const DEFAULT_DATA_DIR: &str = "data";

/// Page files are named `page#_#{database}#_#{table}#_#{id}.data`
pub const PAGE_FILE_PREFIX: &str = "page";
pub const PAGE_FILE_SEPARATOR: &str = "#_#";
pub const PAGE_FILE_EXTENSION: &str = "data";

/// Leading bytes of every page file
pub const PAGE_FORMAT_MAGIC: [u8; 4] = *b"SPG1";

/// Current page file format version
pub const PAGE_FORMAT_VERSION: u16 = 1;

/// Depth of the disk scheduler's request queue
pub const DISK_QUEUE_DEPTH: usize = 128;

/// Storage settings threaded from the context down to every page store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    data_dir: PathBuf,
    page_byte_budget: usize,
    max_resident_pages: usize,
}

impl StorageConfig {
    /// Creates a config rooted at `data_dir` with default limits.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            page_byte_budget: PAGE_BYTE_BUDGET,
            max_resident_pages: MAX_RESIDENT_PAGES,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_page_byte_budget(mut self, budget: usize) -> Self {
        self.page_byte_budget = budget;
        self
    }

    /// Sets the resident page cap. A cap of zero is raised to one.
    pub fn with_max_resident_pages(mut self, cap: usize) -> Self {
        self.max_resident_pages = cap.max(1);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn page_byte_budget(&self) -> usize {
        self.page_byte_budget
    }

    pub fn max_resident_pages(&self) -> usize {
        self.max_resident_pages
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
