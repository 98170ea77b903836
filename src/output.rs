//! Append-only Markdown sinks.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receives rendered fragments in document order. No seeking, no rewriting.
pub trait DocumentWriter {
    fn append(&mut self, text: &str) -> io::Result<()>;
}

impl DocumentWriter for String {
    fn append(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

impl<W: DocumentWriter + ?Sized> DocumentWriter for &mut W {
    fn append(&mut self, text: &str) -> io::Result<()> {
        (**self).append(text)
    }
}

/// A buffered Markdown file on disk.
pub struct MarkdownFile {
    path: PathBuf,
    out: BufWriter<File>,
}

impl MarkdownFile {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered output and returns the file's path.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }
}

impl DocumentWriter for MarkdownFile {
    fn append(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }
}

/// The document being produced: a writer plus the directory that relative
/// image paths are resolved against.
pub struct OutputTarget<W> {
    base_dir: PathBuf,
    writer: W,
}

impl<W: DocumentWriter> OutputTarget<W> {
    pub fn new(base_dir: impl Into<PathBuf>, writer: W) -> Self {
        Self {
            base_dir: base_dir.into(),
            writer,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn append(&mut self, text: &str) -> io::Result<()> {
        self.writer.append(text)
    }

    /// Borrow the base directory and the writer at the same time.
    pub fn parts_mut(&mut self) -> (&Path, &mut W) {
        (&self.base_dir, &mut self.writer)
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}
