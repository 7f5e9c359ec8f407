use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

const EDIT_CHANNEL_CAPACITY: usize = 256;

/// Canonical document identity. Edit events are matched against this, never
/// against content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Canonicalizes when possible so relative and absolute spellings of the
    /// same file compare equal.
    pub fn from_path(path: &Path) -> Self {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self(canonical.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait DocumentSource {
    fn identity(&self) -> DocumentId;
    fn text(&self) -> io::Result<String>;
}

#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
    identity: DocumentId,
}

impl FileDocument {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a readable file: {}", path.display()),
            ));
        }

        let identity = DocumentId::from_path(&path);
        Ok(Self { path, identity })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for FileDocument {
    fn identity(&self) -> DocumentId {
        self.identity.clone()
    }

    fn text(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct EditEvent {
    pub identity: DocumentId,
    pub new_text: String,
}

/// Fan-out channel for edit events. Publishing without subscribers is a
/// no-op.
#[derive(Debug, Clone)]
pub struct EditFeed {
    broadcaster: broadcast::Sender<EditEvent>,
}

impl Default for EditFeed {
    fn default() -> Self {
        let (broadcaster, _receiver) = broadcast::channel(EDIT_CHANNEL_CAPACITY);
        Self { broadcaster }
    }
}

impl EditFeed {
    pub fn publish(&self, event: EditEvent) {
        let _ = self.broadcaster.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditEvent> {
        self.broadcaster.subscribe()
    }
}
