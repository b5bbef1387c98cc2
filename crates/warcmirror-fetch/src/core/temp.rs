use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Temp-file path for resumable transfers: a hidden `.{name}` next to the
/// destination. Shared across sessions so a restart can resume it.
pub fn hidden_temp_path(dest: &Path) -> PathBuf {
    dest.with_file_name(format!(".{}", file_name(dest)))
}

/// Temp-file path for full-body transfers: `.{name}~w{worker}`. The worker
/// suffix keeps concurrent attempts at the same destination from writing
/// into each other's file.
pub fn worker_temp_path(dest: &Path, worker: usize) -> PathBuf {
    dest.with_file_name(format!(".{}~w{}", file_name(dest), worker))
}

fn file_name(dest: &Path) -> std::borrow::Cow<'_, str> {
    dest.file_name()
        .unwrap_or_else(|| OsStr::new("download"))
        .to_string_lossy()
}
