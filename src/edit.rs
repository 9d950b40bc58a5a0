use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: replace `[byte_start, byte_end)` of the
/// original text with `new_text`. A zero-length span is a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text for [byte_start, byte_end)
    pub new_text: String,
}

impl Edit {
    pub fn new(byte_start: usize, byte_end: usize, new_text: impl Into<String>) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.byte_start == self.byte_end
    }

    /// Half-open intersection test. An insertion only conflicts with an edit
    /// whose span strictly contains its offset.
    pub fn overlaps(&self, other: &Edit) -> bool {
        self.byte_start < other.byte_end && other.byte_start < self.byte_end
    }
}

/// Verification strategy for write safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large files)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{file} changed on disk since it was loaded")]
    BeforeTextMismatch { file: PathBuf },

    #[error("File I/O error on {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EditError {
    fn io(file: &Path, source: std::io::Error) -> Self {
        EditError::Io {
            file: file.to_path_buf(),
            source,
        }
    }
}

/// Result of writing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for applied/already-applied"]
pub enum EditResult {
    /// New content was written
    Applied { file: PathBuf, bytes_written: usize },
    /// File already held the new content
    AlreadyApplied { file: PathBuf },
}

/// Full-file replacement, guarded by what the file held when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FileWrite does nothing until apply() is called"]
pub struct FileWrite {
    pub file: PathBuf,
    pub expected_before: EditVerification,
    pub new_content: String,
}

impl FileWrite {
    pub fn new(file: impl Into<PathBuf>, original: &str, new_content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            expected_before: EditVerification::from_text(original),
            new_content: new_content.into(),
        }
    }

    /// Check the file on disk. `Ok(true)` means it already holds the new
    /// content.
    fn verify(&self) -> Result<bool, EditError> {
        let current = fs::read_to_string(&self.file).map_err(|e| EditError::io(&self.file, e))?;

        if current == self.new_content {
            return Ok(true);
        }

        if !self.expected_before.matches(&current) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
            });
        }

        Ok(false)
    }

    fn write(&self) -> Result<EditResult, EditError> {
        atomic_write(&self.file, self.new_content.as_bytes())?;

        // Update mtime so watchers and incremental builds notice the change
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.file, now).map_err(|e| EditError::io(&self.file, e))?;

        Ok(EditResult::Applied {
            file: self.file.clone(),
            bytes_written: self.new_content.len(),
        })
    }

    /// Verify and write this file atomically.
    pub fn apply(&self) -> Result<EditResult, EditError> {
        if self.verify()? {
            return Ok(EditResult::AlreadyApplied {
                file: self.file.clone(),
            });
        }
        self.write()
    }

    /// Verify every file first, then write them. A verification failure
    /// leaves all files untouched.
    pub fn apply_batch(writes: &[FileWrite]) -> Result<Vec<EditResult>, EditError> {
        let mut already = Vec::with_capacity(writes.len());
        for write in writes {
            already.push(write.verify()?);
        }

        let mut results = Vec::with_capacity(writes.len());
        for (write, already_applied) in writes.iter().zip(already) {
            if already_applied {
                results.push(EditResult::AlreadyApplied {
                    file: write.file.clone(),
                });
            } else {
                results.push(write.write()?);
            }
        }

        Ok(results)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| EditError::io(path, e))?;

    temp.write_all(content).map_err(|e| EditError::io(path, e))?;

    // Flush to disk (fsync)
    temp.as_file().sync_all().map_err(|e| EditError::io(path, e))?;

    // Keep the original file's permissions
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|e| EditError::io(path, e))?;
    }

    temp.persist(path).map_err(|e| EditError::io(path, e.error))?;

    Ok(())
}
