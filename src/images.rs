//! Image materialization: download referenced images next to the Markdown
//! document and reference them by their original relative path.

use crate::ast::DocumentNode;
use crate::fetch::{Fetch, FetchError, host_with_port};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

/// What to do when an image cannot be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePolicy {
    /// Log it, record a diagnostic and keep the image reference.
    #[default]
    Skip,
    /// Abort the conversion.
    Abort,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image has no `src` attribute")]
    MissingSource,

    #[error("unsupported image source `{source_attr}`")]
    UnsupportedSource { source_attr: String },

    #[error("image source `{source_attr}` does not resolve to a path inside the output directory")]
    UnsafePath { source_attr: String },

    #[error("failed to fetch image `{source_attr}`: {source}")]
    Fetch {
        source_attr: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to write image to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ImageError {
    /// Stable diagnostic code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            ImageError::MissingSource => "images.missing_source",
            ImageError::UnsupportedSource { .. } => "images.unsupported_source",
            ImageError::UnsafePath { .. } => "images.unsafe_path",
            ImageError::Fetch { .. } => "images.fetch_failed",
            ImageError::Write { .. } => "images.write_failed",
        }
    }
}

/// Destination for downloaded image bytes.
pub trait ImageSink {
    fn ensure_dir(&self, path: &Path) -> io::Result<()>;
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Writes images to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageSink;

impl ImageSink for FsImageSink {
    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }
}

/// Where an image comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// The `src` attribute as written in the page.
    pub source: String,
    /// Host for absolute sources; relative sources use the page's origin.
    pub host: Option<String>,
    /// The source's own path segments, e.g. `/images/foo.png`.
    pub path: String,
    /// On-disk destination under the document's base directory.
    pub destination: PathBuf,
}

impl ImageReference {
    /// Resolve a `src` attribute against the output base directory.
    ///
    /// Query strings and fragments are dropped, `.` segments are ignored and
    /// `..` segments are rejected so nothing is written outside `base_dir`.
    pub fn resolve(source: &str, base_dir: &Path) -> Result<Self, ImageError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ImageError::MissingSource);
        }

        let absolute = if trimmed.starts_with("//") {
            Url::parse(&format!("https:{trimmed}")).ok()
        } else {
            Url::parse(trimmed).ok()
        };

        let (host, raw_path) = match absolute {
            Some(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ImageError::UnsupportedSource {
                        source_attr: source.to_string(),
                    });
                }
                (host_with_port(&url), url.path().to_string())
            }
            None => {
                let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
                (None, trimmed[..end].to_string())
            }
        };

        let mut segments: Vec<&str> = Vec::new();
        for seg in raw_path.split(['/', '\\']) {
            match seg {
                "" | "." => {}
                ".." => {
                    return Err(ImageError::UnsafePath {
                        source_attr: source.to_string(),
                    });
                }
                s => segments.push(s),
            }
        }

        let mut destination = base_dir.to_path_buf();
        for seg in &segments {
            destination.push(seg);
        }

        // a drive prefix or root would let `push` escape the base directory.
        let escapes = segments.is_empty()
            || Path::new(&segments.join("/"))
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(ImageError::UnsafePath {
                source_attr: source.to_string(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            host,
            path: format!("/{}", segments.join("/")),
            destination,
        })
    }

    /// Host and path to download from. Relative sources are resolved against
    /// the URL of the page that references them.
    pub fn remote(&self, page_url: &Url) -> Result<(String, String), ImageError> {
        if let Some(host) = &self.host {
            return Ok((host.clone(), self.path.clone()));
        }

        let trimmed = self.source.trim();
        let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
        let unsupported = || ImageError::UnsupportedSource {
            source_attr: self.source.clone(),
        };
        let url = page_url.join(&trimmed[..end]).map_err(|_| unsupported())?;
        let host = host_with_port(&url).ok_or_else(unsupported)?;
        Ok((host, url.path().to_string()))
    }
}

/// Markdown image reference to the original source.
pub fn markdown_image(source: &str) -> String {
    format!("![]({source})")
}

/// Downloads images through a [`Fetch`] into an [`ImageSink`].
pub struct ImageMaterializer<'a> {
    fetcher: &'a dyn Fetch,
    sink: &'a dyn ImageSink,
    page_url: Url,
}

impl<'a> ImageMaterializer<'a> {
    /// `page_url` is the URL of the page being converted; relative image
    /// sources are fetched relative to it.
    pub fn new(fetcher: &'a dyn Fetch, sink: &'a dyn ImageSink, page_url: Url) -> Self {
        Self {
            fetcher,
            sink,
            page_url,
        }
    }

    /// Fetch the image behind `node`, write it under `base_dir` and return
    /// `![](<original src>)`.
    pub fn materialize(&self, node: &DocumentNode, base_dir: &Path) -> Result<String, ImageError> {
        let source = node.attr("src").ok_or(ImageError::MissingSource)?;
        let reference = ImageReference::resolve(source, base_dir)?;
        let (host, path) = reference.remote(&self.page_url)?;

        if let Some(parent) = reference.destination.parent() {
            self.sink
                .ensure_dir(parent)
                .map_err(|source| ImageError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let bytes = self
            .fetcher
            .fetch(&host, &path)
            .map_err(|e| ImageError::Fetch {
                source_attr: reference.source.clone(),
                source: e,
            })?;

        self.sink
            .write_file(&reference.destination, &bytes)
            .map_err(|source| ImageError::Write {
                path: reference.destination.clone(),
                source,
            })?;

        debug!(
            "image {}{} -> {} ({} bytes)",
            host,
            path,
            reference.destination.display(),
            bytes.len()
        );
        Ok(markdown_image(&reference.source))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::ast::NodeRole;

    fn img(src: &str) -> DocumentNode {
        DocumentNode::element(NodeRole::Image, vec![]).with_attr("src", src)
    }

    #[test]
    fn resolve_keeps_relative_segments_under_base_dir() {
        let r = ImageReference::resolve("images/foo.png", Path::new("out")).unwrap();
        assert_eq!(r.host, None);
        assert_eq!(r.path, "/images/foo.png");
        assert_eq!(r.destination, Path::new("out").join("images").join("foo.png"));
    }

    #[test]
    fn resolve_drops_query_fragment_and_dot_segments() {
        let r = ImageReference::resolve("./images/./a.png?v=2#top", Path::new("out")).unwrap();
        assert_eq!(r.path, "/images/a.png");
        assert_eq!(r.source, "./images/./a.png?v=2#top");
    }

    #[test]
    fn resolve_absolute_urls_use_their_own_host() {
        let r = ImageReference::resolve("http://cdn.example.com:8080/img/x.png", Path::new("o"))
            .unwrap();
        assert_eq!(r.host.as_deref(), Some("cdn.example.com:8080"));
        assert_eq!(r.path, "/img/x.png");
        assert_eq!(r.destination, Path::new("o").join("img").join("x.png"));

        let r = ImageReference::resolve("//cdn.example.com/y.png", Path::new("o")).unwrap();
        assert_eq!(r.host.as_deref(), Some("cdn.example.com"));
    }

    #[test]
    fn resolve_rejects_escapes_and_odd_schemes() {
        assert!(matches!(
            ImageReference::resolve("../secret.png", Path::new("o")),
            Err(ImageError::UnsafePath { .. })
        ));
        assert!(matches!(
            ImageReference::resolve("/", Path::new("o")),
            Err(ImageError::UnsafePath { .. })
        ));
        assert!(matches!(
            ImageReference::resolve("data:image/png;base64,AAAA", Path::new("o")),
            Err(ImageError::UnsupportedSource { .. })
        ));
        assert!(matches!(
            ImageReference::resolve("   ", Path::new("o")),
            Err(ImageError::MissingSource)
        ));
    }

    #[test]
    fn materialize_fetches_writes_and_returns_original_reference() {
        let fetcher = StaticFetcher::default().with("guides.rubyonrails.org/images/foo.png", b"PNG");
        let sink = MemorySink::default();
        let images = ImageMaterializer::new(
            &fetcher,
            &sink,
            page_url("https://guides.rubyonrails.org/layouts_and_rendering.html"),
        );

        let md = images.materialize(&img("images/foo.png"), Path::new("book")).unwrap();
        assert_eq!(md, "![](images/foo.png)");

        let dest = Path::new("book").join("images").join("foo.png");
        assert_eq!(sink.files.borrow().get(&dest).map(Vec::as_slice), Some(&b"PNG"[..]));
        assert_eq!(*sink.dirs.borrow(), vec![Path::new("book").join("images")]);
        assert_eq!(
            *fetcher.requests.borrow(),
            vec!["guides.rubyonrails.org/images/foo.png".to_string()]
        );
    }

    #[test]
    fn relative_sources_resolve_against_the_page_directory() {
        let fetcher =
            StaticFetcher::default().with("guides.rubyonrails.org/v6.1/images/foo.png", b"PNG");
        let sink = MemorySink::default();
        let images = ImageMaterializer::new(
            &fetcher,
            &sink,
            page_url("https://guides.rubyonrails.org/v6.1/layouts_and_rendering.html"),
        );

        let md = images.materialize(&img("images/foo.png"), Path::new("book")).unwrap();
        assert_eq!(md, "![](images/foo.png)");
        assert_eq!(
            *fetcher.requests.borrow(),
            vec!["guides.rubyonrails.org/v6.1/images/foo.png".to_string()]
        );
        // on disk the source's own segments are kept.
        let dest = Path::new("book").join("images").join("foo.png");
        assert!(sink.files.borrow().contains_key(&dest));
    }

    #[test]
    fn remote_location_of_each_source_kind() {
        let page = page_url("http://localhost:3000/v7.0/guide.html");
        let remote = |src: &str| {
            ImageReference::resolve(src, Path::new("o"))
                .unwrap()
                .remote(&page)
                .unwrap()
        };
        assert_eq!(
            remote("./images/a.png?v=2"),
            ("localhost:3000".to_string(), "/v7.0/images/a.png".to_string())
        );
        assert_eq!(
            remote("/images/a.png"),
            ("localhost:3000".to_string(), "/images/a.png".to_string())
        );
        assert_eq!(
            remote("https://cdn.example.com/x/a.png"),
            ("cdn.example.com".to_string(), "/x/a.png".to_string())
        );
    }

    #[test]
    fn materialize_surfaces_fetch_failures() {
        let fetcher = StaticFetcher::default();
        let sink = MemorySink::default();
        let images =
            ImageMaterializer::new(&fetcher, &sink, page_url("https://example.com/guide.html"));

        let err = images.materialize(&img("images/missing.png"), Path::new("b")).unwrap_err();
        assert_eq!(err.code(), "images.fetch_failed");
        assert!(err.to_string().contains("images/missing.png"), "{err}");
        assert!(sink.files.borrow().is_empty());
    }

    #[test]
    fn materialize_without_src_is_an_error() {
        let fetcher = StaticFetcher::default();
        let sink = MemorySink::default();
        let images =
            ImageMaterializer::new(&fetcher, &sink, page_url("https://example.com/guide.html"));

        let node = DocumentNode::element(NodeRole::Image, vec![]);
        assert!(matches!(
            images.materialize(&node, Path::new("b")),
            Err(ImageError::MissingSource)
        ));
        assert!(fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn fs_sink_writes_files_under_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::default().with("example.com/images/foo.png", b"\x89PNG");
        let images = ImageMaterializer::new(
            &fetcher,
            &FsImageSink,
            page_url("https://example.com/guide.html"),
        );

        let md = images.materialize(&img("images/foo.png"), dir.path()).unwrap();
        assert_eq!(md, "![](images/foo.png)");
        let written = fs::read(dir.path().join("images").join("foo.png")).unwrap();
        assert_eq!(written, b"\x89PNG");
    }
}
