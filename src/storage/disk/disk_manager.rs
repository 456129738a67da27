use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::common::{
    PageId, Result, PAGE_FILE_EXTENSION, PAGE_FILE_PREFIX, PAGE_FILE_SEPARATOR,
};

/// DiskManager reads and writes whole page files inside one data directory.
/// Every page of every table lives in its own file, named after the
/// database, the table and the page id.
pub struct DiskManager {
    /// Directory holding the page files
    data_dir: PathBuf,
    /// Number of page files read
    num_reads: AtomicU32,
    /// Number of page files written
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Creates a DiskManager rooted at `data_dir`, creating the directory if
    /// it doesn't exist.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Returns the file name of a table page: `page#_#{db}#_#{table}#_#{id}.data`.
    pub fn page_file_name(database: &str, table: &str, page_id: PageId) -> String {
        format!(
            "{}{}.{}",
            Self::table_file_prefix(database, table),
            page_id.as_u32(),
            PAGE_FILE_EXTENSION
        )
    }

    fn table_file_prefix(database: &str, table: &str) -> String {
        format!(
            "{prefix}{sep}{database}{sep}{table}{sep}",
            prefix = PAGE_FILE_PREFIX,
            sep = PAGE_FILE_SEPARATOR,
        )
    }

    /// Returns the full path of a page file.
    pub fn page_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Writes a page file, replacing any previous contents.
    /// The data lands in a temporary file first and is renamed into place.
    pub fn write_page_file(&self, file_name: &str, data: &[u8]) -> Result<()> {
        let path = self.page_path(file_name);
        let tmp = path.with_extension("tmp");

        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_data()?;
        }
        fs::rename(&tmp, &path)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Reads a whole page file.
    pub fn read_page_file(&self, file_name: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.page_path(file_name))?;
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(data)
    }

    /// Deletes a page file. Returns false if it did not exist.
    pub fn remove_page_file(&self, file_name: &str) -> Result<bool> {
        match fs::remove_file(self.page_path(file_name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the page ids persisted for a table, in ascending order.
    pub fn list_table_pages(&self, database: &str, table: &str) -> Result<Vec<PageId>> {
        let prefix = Self::table_file_prefix(database, table);
        let suffix = format!(".{}", PAGE_FILE_EXTENSION);

        let mut pages = Vec::new();
        for dir_entry in fs::read_dir(&self.data_dir)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let id = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
                .and_then(|id| id.parse::<u32>().ok());
            if let Some(id) = id {
                pages.push(PageId::new(id));
            }
        }
        pages.sort();
        Ok(pages)
    }

    /// Returns the number of page files read.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page files written.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
