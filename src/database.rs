//! Path-oriented facade over [`Engine`].
//!
//! Adds the file-system conveniences: storing files by path, reading into
//! files, exporting everything to a directory and shrinking the file by
//! rewriting its live entries.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::blob::BlobReader;
use crate::common::{AccessMode, EntryId, Error, Result, StoreConfig};
use crate::engine::Engine;
use crate::entry::Entry;

/// Export file-name pattern used by [`BlobDatabase::export`].
pub const DEFAULT_EXPORT_PATTERN: &str = "{filename}.{id}.{extension}";

/// A blob file opened by path.
///
/// # Example
/// ```no_run
/// use blobfile::{AccessMode, BlobDatabase};
///
/// let mut db = BlobDatabase::open("photos.db", AccessMode::ReadWrite)?;
/// let entry = db.store_file("holiday.jpg")?;
/// db.read_to_file(&entry.id(), "copy.jpg")?;
/// db.export("backup")?;
/// db.close()?;
/// # Ok::<(), blobfile::Error>(())
/// ```
pub struct BlobDatabase {
    engine: Option<Engine>,
    path: PathBuf,
    mode: AccessMode,
    config: StoreConfig,
}

impl BlobDatabase {
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        Self::open_with_config(path, mode, StoreConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        mode: AccessMode,
        config: StoreConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let engine = Engine::open_with_config(&path, mode, config.clone())?;
        Ok(Self {
            engine: Some(engine),
            path,
            mode,
            config,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying engine.
    ///
    /// # Errors
    /// `Closed` if a failed [`shrink`](Self::shrink) left the database
    /// without an open file.
    pub fn engine(&mut self) -> Result<&mut Engine> {
        self.engine.as_mut().ok_or(Error::Closed)
    }

    // ========================================================================
    // ENTRIES
    // ========================================================================

    /// Store the file at `path` under its file name.
    pub fn store_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Entry> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut input = BufReader::new(File::open(path)?);
        self.engine()?.insert(&name, &mut input)
    }

    /// Store everything `input` yields under `name`.
    pub fn store<R: Read + ?Sized>(&mut self, name: &str, input: &mut R) -> Result<Entry> {
        self.engine()?.insert(name, input)
    }

    /// Copy a blob into a new file at `path`.
    ///
    /// The file is only created if the entry exists.
    pub fn read_to_file<P: AsRef<Path>>(&mut self, id: &EntryId, path: P) -> Result<Option<Entry>> {
        let engine = self.engine()?;
        if engine.search(id)?.is_none() {
            return Ok(None);
        }

        let mut output = BufWriter::new(File::create(path)?);
        let entry = engine.read(id, &mut output)?;
        output.flush()?;
        Ok(entry)
    }

    pub fn read<W: Write + ?Sized>(&mut self, id: &EntryId, output: &mut W) -> Result<Option<Entry>> {
        self.engine()?.read(id, output)
    }

    pub fn open_read(&mut self, id: &EntryId) -> Result<Option<BlobReader<'_>>> {
        self.engine()?.open_read(id)
    }

    pub fn search(&mut self, id: &EntryId) -> Result<Option<Entry>> {
        self.engine()?.search(id)
    }

    pub fn delete(&mut self, id: &EntryId) -> Result<bool> {
        self.engine()?.delete(id)
    }

    pub fn list(&mut self) -> Result<Vec<Entry>> {
        self.engine()?.list()
    }

    // ========================================================================
    // BULK OPERATIONS
    // ========================================================================

    /// Write every entry into `dir` named by [`DEFAULT_EXPORT_PATTERN`].
    pub fn export<P: AsRef<Path>>(&mut self, dir: P) -> Result<Vec<PathBuf>> {
        self.export_with_pattern(dir, DEFAULT_EXPORT_PATTERN)
    }

    /// Write every entry into `dir`, creating it if needed.
    ///
    /// `pattern` names each file; `{id}`, `{filename}` (without extension)
    /// and `{extension}` are replaced per entry. Returns the written paths.
    pub fn export_with_pattern<P: AsRef<Path>>(
        &mut self,
        dir: P,
        pattern: &str,
    ) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for entry in self.list()? {
            let target = dir.join(export_file_name(pattern, &entry));
            if self.read_to_file(&entry.id(), &target)?.is_some() {
                written.push(target);
            }
        }

        info!(dir = %dir.display(), files = written.len(), "exported entries");
        Ok(written)
    }

    /// Rewrite the file with only its live entries, keeping their ids.
    ///
    /// The entries are replayed into `<stem>.temp<.ext>` next to the file,
    /// which then replaces the original. Returns the number of bytes saved.
    ///
    /// If this fails after the original was closed, later calls return
    /// `Closed`.
    ///
    /// # Errors
    /// `ReadOnly` if the database was opened read-only.
    pub fn shrink(&mut self) -> Result<u64> {
        if !self.mode.is_writable() {
            return Err(Error::ReadOnly);
        }
        let before = fs::metadata(&self.path)?.len();
        let temp_path = shrink_temp_path(&self.path);
        if temp_path.exists() {
            fs::remove_file(&temp_path)?;
        }
        info!(path = %self.path.display(), bytes = before, "shrinking");

        let mut temp =
            Engine::open_with_config(&temp_path, AccessMode::ReadWrite, self.config.clone())?;
        let engine = self.engine()?;
        let entries = engine.list()?;
        for entry in &entries {
            let Some(mut reader) = engine.open_read(&entry.id())? else {
                continue;
            };
            temp.insert_parts(entry.id(), entry.name(), entry.extension(), &mut reader)?;
        }
        temp.close()?;

        if let Some(engine) = self.engine.take() {
            engine.close()?;
        }
        fs::rename(&temp_path, &self.path)?;
        self.engine = Some(Engine::open_with_config(
            &self.path,
            self.mode,
            self.config.clone(),
        )?);

        let after = fs::metadata(&self.path)?.len();
        info!(
            path = %self.path.display(),
            entries = entries.len(),
            bytes = after,
            "shrink finished"
        );
        Ok(before.saturating_sub(after))
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub fn persist(&mut self) -> Result<()> {
        self.engine()?.persist()
    }

    pub fn close(mut self) -> Result<()> {
        match self.engine.take() {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }
}

/// File name for `entry` under an export pattern.
pub fn export_file_name(pattern: &str, entry: &Entry) -> String {
    pattern
        .replace("{id}", &entry.id().to_string())
        .replace("{filename}", entry.name())
        .replace("{extension}", entry.extension())
}

/// `dir/name.db` becomes `dir/name.temp.db`.
fn shrink_temp_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.temp.{}", ext.to_string_lossy()),
        None => format!("{stem}.temp"),
    };
    path.with_file_name(name)
}
