//! Delivery of exported files to the host

use crate::ViewerResult;
use meshlod_io::ExportPayload;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DOWNLOAD_MIME_TYPE: &str = "application/octet-stream";

/// An exported file ready to be saved by the host
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub payload: ExportPayload,
}

impl DownloadFile {
    pub fn new(file_name: impl Into<String>, payload: ExportPayload) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: DOWNLOAD_MIME_TYPE,
            payload,
        }
    }
}

/// Host file-save mechanism
pub trait DownloadSink {
    fn deliver(&mut self, file: DownloadFile) -> ViewerResult<()>;
}

/// Keeps delivered files in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub files: Vec<DownloadFile>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&DownloadFile> {
        self.files.last()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, file: DownloadFile) -> ViewerResult<()> {
        self.files.push(file);
        Ok(())
    }
}

/// Writes delivered files into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, file: DownloadFile) -> ViewerResult<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(&file.file_name);
        std::fs::write(&path, file.payload.as_bytes())?;
        info!(path = %path.display(), bytes = file.payload.len(), "saved download");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::new();
        sink.deliver(DownloadFile::new("a.obj", ExportPayload::Text("o a\n".into())))
            .unwrap();
        assert_eq!(sink.files.len(), 1);
        assert_eq!(sink.last().unwrap().mime_type, "application/octet-stream");
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let root = std::env::temp_dir().join(format!("meshlod-download-{}", std::process::id()));
        let mut sink = DirectorySink::new(&root);
        sink.deliver(DownloadFile::new("model.stl", ExportPayload::Binary(vec![1, 2, 3])))
            .unwrap();
        assert_eq!(std::fs::read(root.join("model.stl")).unwrap(), vec![1, 2, 3]);
        std::fs::remove_dir_all(&root).ok();
    }
}
