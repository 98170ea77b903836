pub mod ast;
pub mod config;
pub mod fetch;
pub mod frontmatter;
pub mod images;
pub mod output;
pub mod parse;
pub mod render;

pub use config::Config;

use deunicode::deunicode;
use fetch::{Fetch, HttpFetcher};
use images::{FsImageSink, ImageMaterializer};
use log::{debug, info};
use output::{DocumentWriter, MarkdownFile, OutputTarget};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::OffsetDateTime;
use url::Url;
use walkdir::WalkDir;

/// Options controlling what gets written on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Also write the parsed page as JSON and render from the JSON read back.
    pub write_json: bool,

    /// If true, regenerate YAML frontmatter even when the destination `.md`
    /// already contains a frontmatter block.
    pub regenerate_frontmatter: bool,
}

/// Where a page came from.
#[derive(Debug, Clone)]
struct PageSource {
    page_id: String,
    url: Url,
    html_path: PathBuf,
}

/// Single page mode: fetch the page unless it is cached, then convert it.
///
/// Returns the path of the written Markdown file.
pub fn run(raw_url: &str, cfg: &Config, write_opts: &WriteOptions) -> Result<PathBuf, Box<dyn Error>> {
    let base = cfg.base_url()?;
    let url = resolve_page_url(raw_url, &base)?;
    let page_id = page_id_from_url(&url);

    let html_dir = cfg.html_dir();
    let md_dir = cfg.md_dir();
    fs::create_dir_all(&html_dir)?;
    fs::create_dir_all(&md_dir)?;

    let fetcher = HttpFetcher::new(&cfg.http_options(url.scheme()))?;

    // does ./docs/html/{page_id}.html exist? fetch if not.
    let html_path = html_dir.join(format!("{page_id}.html"));
    if html_path.exists() {
        debug!("using cached {}", html_path.display());
    } else {
        let html = fetcher.fetch_page(&url)?;
        fs::write(&html_path, &html)?;
        info!("fetched {url} -> {}", html_path.display());
    }

    let source = PageSource {
        page_id,
        url,
        html_path,
    };

    convert_page(&source, &md_dir, &fetcher, cfg, write_opts)
}

/// Bulk mode: regenerate the Markdown of every cached page under `docs_dir`.
pub fn regenerate_all(cfg: &Config, write_opts: &WriteOptions) -> Result<usize, Box<dyn Error>> {
    regenerate_all_in_dirs(&cfg.html_dir(), &cfg.md_dir(), cfg, write_opts)
}

/// Bulk mode: walk `html_root` and regenerate the corresponding Markdown files
/// under `md_root`, keeping the relative directory structure.
///
/// Pages are assumed to live under `base_url`; relative images are downloaded
/// relative to each page's URL there.
pub fn regenerate_all_in_dirs(
    html_root: &Path,
    md_root: &Path,
    cfg: &Config,
    write_opts: &WriteOptions,
) -> Result<usize, Box<dyn Error>> {
    let start_time = Instant::now();

    if !html_root.exists() {
        return Err(format!("HTML cache directory not found: {}", html_root.display()).into());
    }

    let base = cfg.base_url()?;
    let fetcher = HttpFetcher::new(&cfg.http_options(base.scheme()))?;

    let mut entries: Vec<_> = WalkDir::new(html_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "html")
        })
        .collect();

    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let total = entries.len();
    let mut count = 0;

    for entry in entries {
        let path = entry.path();
        let relative = path.strip_prefix(html_root)?;
        let md_dir = match relative.parent() {
            Some(parent) => md_root.join(parent),
            None => md_root.to_path_buf(),
        };
        fs::create_dir_all(&md_dir)?;

        let page_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index")
            .to_string();
        let url = base.join(&relative.to_string_lossy().replace('\\', "/"))?;

        let source = PageSource {
            page_id,
            url,
            html_path: path.to_path_buf(),
        };
        let md_path = convert_page(&source, &md_dir, &fetcher, cfg, write_opts)?;

        count += 1;

        let total_ms = start_time.elapsed().as_millis();
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        info!(
            "[{:>4}/{:>4}] [{:02}:{:02}.{:03}] Regenerated: {}",
            count,
            total,
            mins,
            secs,
            ms,
            md_path.display()
        );
    }

    let total_secs = start_time.elapsed().as_secs_f64();
    let avg_str = if count > 0 {
        format!("{:.3}s", total_secs / count as f64)
    } else {
        "-".to_string()
    };
    info!(
        "Done. Regenerated {} files in {:.3}s (avg {}/doc).",
        count, total_secs, avg_str
    );
    Ok(count)
}

fn convert_page(
    source: &PageSource,
    md_dir: &Path,
    fetcher: &dyn Fetch,
    cfg: &Config,
    write_opts: &WriteOptions,
) -> Result<PathBuf, Box<dyn Error>> {
    let html = read_html(&source.html_path)?;
    let parsed = parse::parse_page(&html, &cfg.parse_options())?;

    let page = if write_opts.write_json {
        let json_dir = cfg.json_dir();
        fs::create_dir_all(&json_dir)?;
        let json_path = json_dir.join(format!("{}.json", source.page_id));
        write_page_file(source, html.len(), &parsed, &json_path)?;
        read_page_file(&json_path)?.page
    } else {
        parsed.page
    };

    let title = page.title_text();
    let md_path = md_dir.join(format!("{}.md", slug_from_title(title.as_deref(), &source.page_id)));

    let sink = FsImageSink;
    let materializer = ImageMaterializer::new(fetcher, &sink, source.url.clone());
    let images = cfg.download_images.then_some(&materializer);

    let render_opts = cfg.render_options(OffsetDateTime::now_utc());
    let diagnostics = write_markdown_file(&md_path, &page, source, images, cfg, &render_opts, write_opts)?;

    info!(
        "converted {} -> {} ({} diagnostics)",
        source.url,
        md_path.display(),
        parsed.diagnostics.len() + diagnostics.len()
    );
    Ok(md_path)
}

fn read_html(path: &Path) -> Result<String, Box<dyn Error>> {
    let bytes = fs::read(path)?;

    // if we ever encounter invalid UTF-8, fallback to lossy conversion
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

fn write_page_file(
    source: &PageSource,
    byte_len: usize,
    parsed: &parse::ParseOutput,
    json_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let page_file = ast::PageFile {
        schema_version: ast::SCHEMA_VERSION,
        generator: ast::GeneratorInfo::default(),
        page_id: source.page_id.clone(),
        source: ast::SourceInfo {
            url: Some(source.url.to_string()),
            path: Some(source.html_path.to_string_lossy().to_string()),
            byte_len: byte_len as u64,
        },
        diagnostics: parsed.diagnostics.clone(),
        page: parsed.page.clone(),
    };

    // prettify JSON so it's easy to inspect / diff.
    let json = serde_json::to_string_pretty(&page_file)?;
    fs::write(json_path, json)?;
    debug!("wrote {}", json_path.display());
    Ok(())
}

fn read_page_file(json_path: &Path) -> Result<ast::PageFile, Box<dyn Error>> {
    let text = fs::read_to_string(json_path)?;
    let page_file: ast::PageFile = serde_json::from_str(&text)?;
    if page_file.schema_version != ast::SCHEMA_VERSION {
        return Err(format!(
            "{}: unsupported schema version {} (expected {})",
            json_path.display(),
            page_file.schema_version,
            ast::SCHEMA_VERSION
        )
        .into());
    }
    Ok(page_file)
}

fn write_markdown_file(
    md_path: &Path,
    page: &ast::Page,
    source: &PageSource,
    images: Option<&ImageMaterializer<'_>>,
    cfg: &Config,
    render_opts: &render::RenderOptions,
    write_opts: &WriteOptions,
) -> Result<Vec<ast::Diagnostic>, Box<dyn Error>> {
    let existing = if md_path.exists() {
        Some(fs::read_to_string(md_path)?)
    } else {
        None
    };

    let mut frontmatter_text: Option<String> = None;

    if let Some(existing_text) = existing.as_deref()
        && let Some((fm, _)) = frontmatter::split_yaml_frontmatter(existing_text)
        && !write_opts.regenerate_frontmatter
    {
        frontmatter_text = Some(fm);
    }

    if frontmatter_text.is_none() && (cfg.frontmatter || write_opts.regenerate_frontmatter) {
        let title = page.title_text();
        let mut fm = frontmatter::build_frontmatter(
            &source.page_id,
            source.url.as_str(),
            title.as_deref(),
            OffsetDateTime::now_utc(),
        );

        // keep unknown top-level keys of the block being replaced.
        if let Some(existing_text) = existing.as_deref() {
            frontmatter::merge_existing_frontmatter_for_regeneration(&mut fm, existing_text);
        }

        frontmatter_text = Some(fm.to_yaml_string());
    }

    // render in memory first; a failed render leaves the existing file alone.
    let base_dir = md_path.parent().unwrap_or(Path::new("."));
    let mut target = OutputTarget::new(base_dir, String::new());
    let diagnostics = render::render_page(page, &mut target, images, render_opts)?;
    let body = target.into_writer();

    let mut file = MarkdownFile::create(md_path)?;
    if let Some(fm) = frontmatter_text {
        file.append(&fm)?;
        if !fm.ends_with('\n') {
            file.append("\n")?;
        }
        // blank line after frontmatter for readability.
        file.append("\n")?;
    }
    file.append(&body)?;
    file.finish()?;
    Ok(diagnostics)
}

/// Resolve the page argument: an absolute URL, or a path relative to `base`.
pub fn resolve_page_url(raw: &str, base: &Url) -> Result<Url, Box<dyn Error>> {
    let raw = raw.trim();
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw)?,
        Err(e) => return Err(format!("invalid page URL `{raw}`: {e}").into()),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("page URL `{url}` must be http or https").into());
    }
    Ok(url)
}

/// Cache key for a page: its last path segment without the extension.
pub fn page_id_from_url(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segs| segs.rfind(|s| !s.is_empty()))
        .unwrap_or_default();
    let stem = Path::new(last)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(last);
    sanitize_page_id(stem)
}

pub(crate) fn sanitize_page_id(raw: &str) -> String {
    let mut id = raw.trim().replace(' ', "_");
    id = id.replace(['/', '\\'], "_");
    if id.is_empty() {
        id = "index".to_string();
    }
    id
}

/// Output file stem for a page: the transliterated title, spaces turned into
/// underscores, lowercased. Falls back to `page_id`.
pub fn slug_from_title(title: Option<&str>, page_id: &str) -> String {
    let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
        return page_id.to_string();
    };
    let slug: String = deunicode(title)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    if slug.trim_matches('_').is_empty() {
        page_id.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_ids_come_from_the_last_segment() {
        let url = Url::parse("https://guides.rubyonrails.org/layouts_and_rendering.html").unwrap();
        assert_eq!(page_id_from_url(&url), "layouts_and_rendering");

        let url = Url::parse("https://example.com/v7.1/getting%20started.html?x=1").unwrap();
        assert_eq!(page_id_from_url(&url), "getting%20started");

        let url = Url::parse("https://example.com/guides/routing/").unwrap();
        assert_eq!(page_id_from_url(&url), "routing");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(page_id_from_url(&url), "index");
    }

    #[test]
    fn relative_page_urls_resolve_against_base() {
        let base = Url::parse("https://guides.rubyonrails.org").unwrap();
        let url = resolve_page_url("routing.html", &base).unwrap();
        assert_eq!(url.as_str(), "https://guides.rubyonrails.org/routing.html");

        let url = resolve_page_url(" http://localhost:3000/a.html ", &base).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/a.html");

        assert!(resolve_page_url("file:///etc/passwd", &base).is_err());
    }

    #[test]
    fn slugs_follow_the_title() {
        assert_eq!(
            slug_from_title(Some("Layouts and Rendering in Rails"), "x"),
            "layouts_and_rendering_in_rails"
        );
        assert_eq!(slug_from_title(Some("Café: Über/Guide"), "x"), "cafe__uber_guide");
        assert_eq!(slug_from_title(Some("   "), "fallback"), "fallback");
        assert_eq!(slug_from_title(None, "fallback"), "fallback");
    }

    #[test]
    fn sanitize_page_id_replaces_separators() {
        assert_eq!(sanitize_page_id(" a b/c\\d "), "a_b_c_d");
        assert_eq!(sanitize_page_id(""), "index");
    }
}
