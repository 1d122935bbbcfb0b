use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn store_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/store.log")
}

pub fn chat_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/chat.log")
}

pub fn append_log_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}
