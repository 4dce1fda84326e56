//! Page Store - file I/O for the header and pages.
//!
//! The [`PageStore`] owns the open store file and handles all direct file
//! operations:
//! - Creating and validating the file
//! - Reading and writing the header region
//! - Reading and writing index and data pages through their codecs
//! - Holding the write lock of a read-write session

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, trace};

use crate::common::config::{DATA_PAGE_HEADER_SIZE, HEADER_SIZE, INDEX_PAGE_HEADER_SIZE, PAGE_SIZE};
use crate::common::{AccessMode, Error, PageId, Result, StoreConfig};
use crate::storage::header::Header;
use crate::storage::lock;
use crate::storage::page::{DataPage, DataRead, IndexPage, PageHeader};

/// Reads and writes pages of a single store file.
///
/// # File Layout
/// ```text
/// ┌──────────┬─────────┬─────────┬─────────┬─────────┐
/// │  Header  │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ (100 B)  │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └──────────┴─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// Page N is located at file offset `HEADER_SIZE + N × PAGE_SIZE`.
///
/// Pages are written partially: an index page writes its header and used
/// slots, an empty data page writes only its header. The file therefore may
/// end before the last page's 4KB boundary.
///
/// # Thread Safety
/// `PageStore` is **single-threaded**. All methods take `&self` because
/// `&File` implements `Read`, `Write` and `Seek`; the engine serializes
/// access.
pub struct PageStore {
    file: File,
    path: PathBuf,
    mode: AccessMode,
    locked: bool,
}

impl PageStore {
    /// Open a store file.
    ///
    /// `ReadWrite` creates the file if it does not exist, takes the write
    /// lock, and initializes an empty file with a header and root page.
    /// `ReadOnly` requires an existing file and takes no lock.
    ///
    /// # Errors
    /// - `Io(NotFound)` for a missing file opened read-only
    /// - `LockTimeout` if another writer holds the file
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode, config: &StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = match mode {
            AccessMode::ReadOnly => OpenOptions::new().read(true).open(&path)?,
            AccessMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?,
        };

        let mut store = Self {
            file,
            path,
            mode,
            locked: false,
        };

        if mode.is_writable() {
            lock::acquire(
                &store.file,
                config.lock_retry_limit,
                config.lock_retry_delay,
            )?;
            store.locked = true;

            if store.file_len()? == 0 {
                store.initialize()?;
            }
        }

        Ok(store)
    }

    /// Write the header and root index page of a new store.
    fn initialize(&mut self) -> Result<()> {
        self.write_header(&Header::new())?;
        self.write_index_page(&IndexPage::new_root())?;
        self.file.sync_all()?;
        info!(path = %self.path.display(), "created store file");
        Ok(())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Absolute file offset of a page.
    #[inline]
    pub fn page_offset(page_id: PageId) -> u64 {
        HEADER_SIZE as u64 + page_id.0 as u64 * PAGE_SIZE as u64
    }

    /// Current length of the file in bytes.
    pub fn file_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// True if any byte of the page's region has been written.
    pub fn contains_page(&self, page_id: PageId) -> Result<bool> {
        Ok(self.file_len()? > Self::page_offset(page_id))
    }

    // ========================================================================
    // HEADER
    // ========================================================================

    /// Read and validate the header region.
    pub fn read_header(&self) -> Result<Header> {
        let len = self.file_len()?;
        if len < HEADER_SIZE as u64 {
            return Err(Error::invalid_format(format!(
                "file is {len} bytes, shorter than the header"
            )));
        }
        let mut data = [0u8; HEADER_SIZE];
        self.read_at(0, &mut data)?;
        Header::from_bytes(&data)
    }

    pub fn write_header(&self, header: &Header) -> Result<()> {
        self.write_at(0, &header.to_bytes())?;
        trace!(last_page = header.last_page_id().0, "wrote header");
        Ok(())
    }

    // ========================================================================
    // PAGES
    // ========================================================================

    /// Read the 5-byte common header of a page, or `None` if the page lies
    /// beyond the end of the file.
    pub fn read_page_header(&self, page_id: PageId) -> Result<Option<PageHeader>> {
        let offset = Self::page_offset(page_id);
        if self.file_len()? < offset + PageHeader::SIZE as u64 {
            return Ok(None);
        }
        let mut data = [0u8; PageHeader::SIZE];
        self.read_at(offset, &mut data)?;
        Ok(Some(PageHeader::from_bytes(&data)))
    }

    /// Read an index page.
    ///
    /// # Errors
    /// `UnexpectedPageType` if the page is not an index page.
    pub fn read_index_page(&self, page_id: PageId) -> Result<IndexPage> {
        let offset = Self::page_offset(page_id);

        let mut prefix = [0u8; INDEX_PAGE_HEADER_SIZE];
        self.read_at(offset, &mut prefix)?;
        let highest_slot = IndexPage::parse_prefix(page_id, &prefix)?;

        let mut data = vec![0u8; IndexPage::encoded_len_for(highest_slot)];
        data[..INDEX_PAGE_HEADER_SIZE].copy_from_slice(&prefix);
        self.read_at(
            offset + INDEX_PAGE_HEADER_SIZE as u64,
            &mut data[INDEX_PAGE_HEADER_SIZE..],
        )?;

        trace!(%page_id, highest_slot, "read index page");
        IndexPage::from_bytes(page_id, &data)
    }

    pub fn write_index_page(&self, page: &IndexPage) -> Result<()> {
        self.write_at(Self::page_offset(page.page_id()), &page.to_bytes())?;
        trace!(page_id = %page.page_id(), highest_slot = page.highest_slot(), "wrote index page");
        Ok(())
    }

    /// Read a data page, with or without its payload.
    ///
    /// # Errors
    /// `UnexpectedPageType` if the page is not a data page.
    pub fn read_data_page(&self, page_id: PageId, mode: DataRead) -> Result<DataPage> {
        let offset = Self::page_offset(page_id);

        let mut header = [0u8; DATA_PAGE_HEADER_SIZE];
        self.read_at(offset, &mut header)?;
        let mut page = DataPage::from_header(page_id, &header)?;

        if mode == DataRead::Full && !page.is_empty() && page.len() > 0 {
            let mut payload = vec![0u8; page.len()];
            self.read_at(offset + DATA_PAGE_HEADER_SIZE as u64, &mut payload)?;
            page.set_payload(payload);
        }

        trace!(%page_id, ?mode, len = page.len(), "read data page");
        Ok(page)
    }

    /// Write a data page. Empty pages write their header only.
    pub fn write_data_page(&self, page: &DataPage) -> Result<()> {
        self.write_at(Self::page_offset(page.page_id()), &page.to_bytes())?;
        trace!(page_id = %page.page_id(), len = page.len(), "wrote data page");
        Ok(())
    }

    // ========================================================================
    // FILE CONTROL
    // ========================================================================

    /// Flush file contents to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Release the write lock, if held.
    pub fn unlock(&mut self) -> Result<()> {
        if self.locked {
            lock::release(&self.file)?;
            self.locked = false;
        }
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }
}
