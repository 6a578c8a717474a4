//! Verified byte-span edits and atomic file writes.
//!
//! Every in-place rewrite ends here: each [`Replacement`] becomes an
//! [`Edit`] that remembers the text it expects to overwrite. A batch is
//! checked against the file as it is on disk right before writing, so a
//! file changed since it was read is left alone rather than corrupted.
//!
//! [`Replacement`]: crate::rewrite::Replacement

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with verification of the replaced text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied with Edit::apply_batch"]
pub struct Edit {
    pub file: PathBuf,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    pub new_text: String,
    /// What the span must contain before the edit applies
    pub expected_before: EditVerification,
}

/// How an edit recognises the text it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    ExactMatch(String),
    /// xxh3 of the expected text, used for large spans
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected) => xxh3_64(text.as_bytes()) == *expected,
        }
    }

    /// Exact text for short spans, a hash above 1 KiB.
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
    #[error("{file} changed since it was read: expected {expected} at byte {byte_start}, found {found:?}")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("edits overlap in {file} at byte {byte_start}")]
    Overlap { file: PathBuf, byte_start: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("edit would split a UTF-8 character")]
    InvalidUtf8Edit,
}

/// Outcome of writing one file's edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub file: PathBuf,
    /// Edits that changed text
    pub applied: usize,
    /// Edits whose span already held the new text
    pub already_applied: usize,
}

impl FileWrite {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

impl Edit {
    /// Create an edit expecting `expected_before` in the span.
    pub fn new(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        let expected = expected_before.into();
        Self::with_verification(
            file,
            byte_start,
            byte_end,
            new_text,
            EditVerification::from_text(&expected),
        )
    }

    pub fn with_verification(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        verification: EditVerification,
    ) -> Self {
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: verification,
        }
    }

    /// Check the edit against `content`; returns whether the span already
    /// holds the new text.
    fn validate(&self, content: &str) -> Result<bool, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }
        let current = content
            .get(self.byte_start..self.byte_end)
            .ok_or(EditError::InvalidUtf8Edit)?;

        if current == self.new_text {
            return Ok(true);
        }
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                expected: match &self.expected_before {
                    EditVerification::ExactMatch(text) => format!("{text:?}"),
                    EditVerification::Hash(hash) => format!("text with xxh3 {hash:016x}"),
                },
                found: current.to_string(),
            });
        }
        Ok(false)
    }

    /// Apply edits grouped by file; each file is rewritten atomically or
    /// not at all.
    ///
    /// All edits of a file are validated against its current contents and
    /// checked for overlap before anything is written. Files are processed
    /// in path order and the first failing file stops the batch; files
    /// written before it stay written.
    pub fn apply_batch(edits: Vec<Edit>) -> Result<Vec<FileWrite>, EditError> {
        let mut by_file: BTreeMap<PathBuf, Vec<Edit>> = BTreeMap::new();
        for edit in edits {
            by_file.entry(edit.file.clone()).or_default().push(edit);
        }

        let mut writes = Vec::with_capacity(by_file.len());
        for (file, mut edits) in by_file {
            edits.sort_by_key(|e| std::cmp::Reverse(e.byte_start));
            writes.push(apply_file_edits(&file, &edits)?);
        }
        Ok(writes)
    }
}

/// Apply edits sorted by descending `byte_start` to one file.
fn apply_file_edits(file: &Path, edits: &[Edit]) -> Result<FileWrite, EditError> {
    let original = fs::read_to_string(file)?;

    let mut already = Vec::with_capacity(edits.len());
    for edit in edits {
        already.push(edit.validate(&original)?);
    }
    for pair in edits.windows(2) {
        let (later, earlier) = (&pair[0], &pair[1]);
        if earlier.byte_end > later.byte_start {
            return Err(EditError::Overlap {
                file: file.to_path_buf(),
                byte_start: later.byte_start,
            });
        }
    }

    let mut content = original;
    let mut write = FileWrite {
        file: file.to_path_buf(),
        applied: 0,
        already_applied: 0,
    };
    for (edit, done) in edits.iter().zip(already) {
        if done {
            write.already_applied += 1;
            continue;
        }
        content.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
        write.applied += 1;
    }

    if write.changed() {
        atomic_write(file, content.as_bytes())?;
        filetime::set_file_mtime(file, filetime::FileTime::now())?;
        debug!(file = %file.display(), edits = write.applied, "wrote file");
    }
    Ok(write)
}

/// Tempfile in the same directory, fsync, rename over the target.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
