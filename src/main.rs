//! guide2md - convert a guide page from HTML to Markdown

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use guide2md::images::ImagePolicy;
use guide2md::{Config, WriteOptions};

#[derive(Parser)]
#[command(name = "guide2md")]
#[command(version, about = "Convert a guide page from HTML to Markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    guide2md layouts_and_rendering.html           Convert one guide (relative to the base URL)
    guide2md --json https://example.com/a.html    Also dump the parsed page as JSON
    guide2md --regenerate-all --no-images         Rebuild Markdown for every cached page")]
struct Cli {
    /// Page URL, absolute or relative to the base URL
    #[arg(value_name = "URL", required_unless_present = "regenerate_all")]
    url: Option<String>,

    /// Regenerate Markdown for every cached page instead of converting one
    #[arg(long, conflicts_with = "url")]
    regenerate_all: bool,

    /// Write the parsed page as JSON and render from it
    #[arg(long)]
    json: bool,

    /// Do not download images; keep the references only
    #[arg(long)]
    no_images: bool,

    /// Abort the conversion when an image cannot be downloaded
    #[arg(long)]
    strict_images: bool,

    /// Write YAML frontmatter into new documents
    #[arg(long)]
    frontmatter: bool,

    /// Replace existing frontmatter, keeping unknown keys
    #[arg(long)]
    regenerate_frontmatter: bool,

    /// Omit the "Autocreated at" line
    #[arg(long)]
    no_stamp: bool,

    /// Origin of the guides
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Root of the html/, json/ and md/ directories
    #[arg(long, value_name = "DIR")]
    docs_dir: Option<PathBuf>,

    /// Language tag for fenced code blocks
    #[arg(long, value_name = "LANG")]
    code_lang: Option<String>,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags override whatever the configuration file said.
    fn apply(&self, cfg: &mut Config) {
        if let Some(base_url) = &self.base_url {
            cfg.base_url = base_url.clone();
        }
        if let Some(docs_dir) = &self.docs_dir {
            cfg.docs_dir = docs_dir.clone();
        }
        if let Some(lang) = &self.code_lang {
            cfg.code_language = lang.clone();
        }
        if self.no_images {
            cfg.download_images = false;
        }
        if self.strict_images {
            cfg.image_policy = ImagePolicy::Abort;
        }
        if self.frontmatter {
            cfg.frontmatter = true;
        }
        if self.no_stamp {
            cfg.autocreated_stamp = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load_from_yaml(path)?,
        None => Config::default(),
    };
    cli.apply(&mut cfg);
    cfg.validate()?;

    let write_opts = WriteOptions {
        write_json: cli.json,
        regenerate_frontmatter: cli.regenerate_frontmatter,
    };

    if cli.regenerate_all {
        guide2md::regenerate_all(&cfg, &write_opts)?;
        return Ok(());
    }

    let Some(url) = cli.url.as_deref() else {
        return Err("missing page URL".into());
    };
    let md_path = guide2md::run(url, &cfg, &write_opts)?;
    println!("{}", md_path.display());
    Ok(())
}
