use std::path::{Path, PathBuf};

/// One remote file to mirror. Produced by a task source, consumed exactly
/// once by one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Collection the file belongs to (crawl id or archive item).
    pub item: String,

    /// Bare file name, used for reporting.
    pub name: String,

    /// Fully qualified download URL.
    pub url: String,

    /// Final local path. Never holds partial bytes.
    pub dest: PathBuf,

    /// Expected MD5 (lowercase hex) when the store publishes one.
    pub checksum: Option<String>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        let dest = dest.into();
        let name = file_name_of(&dest);
        Self {
            item: name.clone(),
            name,
            url: url.into(),
            dest,
            checksum: None,
        }
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = item.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn maybe_checksum(mut self, checksum: Option<String>) -> Self {
        self.checksum = checksum;
        self
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string())
}
