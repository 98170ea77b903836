//! AFL++ fuzz target for `guide2md`.
//!
//! This binary is stdin-driven so it can be used with AFL++.
//! Build and run it via `cargo-afl`:
//!
//! ```bash
//! cargo install cargo-afl
//!
//! cargo afl build --release --features afl_fuzz --bin guide2md_afl_parse
//!
//! mkdir -p fuzz/afl/out
//!
//! cargo afl fuzz \
//!   -i fuzz/afl/in \
//!   -o fuzz/afl/out \
//!   target/release/guide2md_afl_parse
//! ```
//!
//! Rust panics normally unwind and exit with a non-crashing status code.
//! AFL++ only treats crashes as signals/aborts, so any unwind becomes `abort()`.

use std::io::Read;

use guide2md::{ast::*, parse, render};

const MAX_INPUT_LEN: usize = 1_000_000; // 1MB guardrail; AFL++ will typically cap this anyway.

fn check_node(node: &DocumentNode, depth: usize) {
    assert!(
        depth <= parse::MAX_DEPTH + 1,
        "tree deeper than the clamp: {depth}"
    );
    if node.role == NodeRole::Text {
        assert!(node.children.is_empty(), "text leaf with children");
        assert!(node.text.is_some(), "text leaf without text");
    }
    for child in &node.children {
        check_node(child, depth + 1);
    }
}

fn validate_page(page: &Page) {
    check_node(&page.content, 0);
    if let Some(feature) = &page.feature {
        check_node(feature, 0);
    }
    if let Some(title) = &page.title {
        check_node(title, 0);
    }
}

fn run_one_input(data: &[u8]) {
    if data.len() > MAX_INPUT_LEN {
        return;
    }

    // lossy conversion keeps the harness total (no early returns that reduce coverage).
    let src = String::from_utf8_lossy(data).to_string();

    let out = parse::parse_html(&src);

    let page_file = PageFile {
        schema_version: SCHEMA_VERSION,
        generator: GeneratorInfo::default(),
        page_id: "fuzz".to_string(),
        source: SourceInfo {
            url: None,
            path: None,
            byte_len: src.len() as u64,
        },
        diagnostics: out.diagnostics,
        page: out.page,
    };

    validate_page(&page_file.page);

    // JSON round-trip must never panic and must be lossless.
    let json = serde_json::to_vec(&page_file).unwrap();
    let back: PageFile = serde_json::from_slice(&json).unwrap();
    assert_eq!(back.page, page_file.page, "JSON round-trip changed the page");

    // rendering without images cannot fail and must be deterministic.
    let opts = render::RenderOptions::default();
    let first = render::render_page_to_string(&back.page, &opts).unwrap();
    let second = render::render_page_to_string(&back.page, &opts).unwrap();
    assert_eq!(first, second, "rendering is not deterministic");
}

fn main() {
    let mut data = Vec::new();
    std::io::stdin().read_to_end(&mut data).unwrap();

    // convert any panic into an abort().
    if std::panic::catch_unwind(|| run_one_input(&data)).is_err() {
        std::process::abort();
    }
}
