use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use bytes::Bytes;

/// Everything a visitor has answered so far, keyed by block id.
///
/// This map is the single input to every visibility and goto decision. It is
/// rebuilt nowhere: operations mutate it in place and derived state (the
/// visible queue, the current index) is recomputed from it on demand.
pub type AnswerPayload = AHashMap<String, AnswerEntry>;

/// The payload stored for one block: either a single record or a sequence of
/// records for multi-select style blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEntry {
    Single(AnswerRecord),
    Many(Vec<AnswerRecord>),
}

impl AnswerEntry {
    /// Iterates the records of this entry regardless of shape.
    pub fn records(&self) -> std::slice::Iter<'_, AnswerRecord> {
        match self {
            AnswerEntry::Single(record) => std::slice::from_ref(record).iter(),
            AnswerEntry::Many(records) => records.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnswerEntry::Single(_) => 1,
            AnswerEntry::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any record in this entry carries a file attachment.
    pub fn has_files(&self) -> bool {
        self.records().any(|record| record.is_file())
    }
}

/// One answered interaction: which widget produced it and what it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub action_id: String,
    pub data: AnswerData,
}

impl AnswerRecord {
    pub fn value(action_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            action_id: action_id.into(),
            data: AnswerData::Value(value),
        }
    }

    pub fn file(action_id: impl Into<String>, file: FileAttachment) -> Self {
        Self {
            action_id: action_id.into(),
            data: AnswerData::File(file),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.data, AnswerData::File(_))
    }

    /// The value this record exposes to condition evaluation. File answers
    /// compare by file name.
    pub fn comparable(&self) -> serde_json::Value {
        match &self.data {
            AnswerData::Value(value) => value.clone(),
            AnswerData::File(file) => serde_json::Value::String(file.file_name.clone()),
        }
    }
}

/// The data half of an [`AnswerRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerData {
    /// Any JSON scalar or structure a widget produced.
    Value(serde_json::Value),
    /// A file picked by the visitor, transmitted separately from the answers.
    File(FileAttachment),
}

impl fmt::Display for AnswerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerData::Value(value) => write!(f, "{value}"),
            AnswerData::File(file) => write!(f, "{}", file.file_name),
        }
    }
}

/// A file the visitor attached to a block, staged for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    pub file_name: String,
    pub size_bytes: u64,
    pub content: FileSource,
}

impl FileAttachment {
    pub fn from_bytes(file_name: impl Into<String>, content: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes: content.len() as u64,
            content: FileSource::Bytes(content),
        }
    }

    /// Stages a file on disk without reading it. The size is taken from file
    /// metadata so upload progress totals are known up front.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let size_bytes = std::fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            file_name,
            size_bytes,
            content: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Materializes the file content for transmission.
    pub fn bytes(&self) -> io::Result<Bytes> {
        match &self.content {
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => Ok(Bytes::from(std::fs::read(path)?)),
        }
    }
}

/// Where the bytes of a [`FileAttachment`] live until upload.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Bytes(Bytes),
    Path(PathBuf),
}
