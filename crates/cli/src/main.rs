mod echo;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use quire_core::{
    FetchConfig, Fetcher, NewArticle, Readability, ReadabilityConfig, fetch_file, fetch_stdin, is_probably_readable,
    materialize, normalize_url,
};
use serde::Serialize;
use time::OffsetDateTime;
use url::Url;

use crate::echo::{
    format_size, print_article_details, print_banner, print_detail, print_error, print_step, print_success,
    print_timing, print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Host used for the article URL of offline input without `--url`
const OFFLINE_BASE: &str = "http://localhost/";

/// Output format for the previewed article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {}. Valid options: json, html, text", s)),
        }
    }
}

/// Preview what ingesting a page would store, without a database
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "Preview article ingestion from a URL, file or stdin", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Article URL for file or stdin input, used to resolve relative links
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (json, html, text)
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    format: OutputFormat,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "20", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Minimum characters of article text
    #[arg(long, default_value = "140", value_name = "NUM")]
    char_threshold: usize,

    /// Maximum elements to parse (0 = unlimited)
    #[arg(long, default_value = "0", value_name = "NUM")]
    max_elements: usize,

    /// Strip images from output
    #[arg(long)]
    no_images: bool,

    /// Print progress and debug logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Where the HTML comes from
enum Source {
    Stdin,
    File(String),
    Remote(Url),
}

impl Source {
    fn resolve(input: &str) -> anyhow::Result<Self> {
        let has_scheme = input.contains("://");
        if input == "-" {
            Ok(Self::Stdin)
        } else if !has_scheme && (Path::new(input).exists() || input.ends_with(".html") || input.ends_with(".htm")) {
            Ok(Self::File(input.to_string()))
        } else {
            Ok(Self::Remote(normalize_url(input).context("Invalid input URL")?))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Stdin => "Reading from stdin".to_string(),
            Self::File(path) => format!("Reading from file {}", path.bright_white()),
            Self::Remote(url) => format!("Fetching from {}", url.as_str().bright_white().underline()),
        }
    }
}

/// JSON shape of a preview; the stored raw HTML is left out.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Preview<'a> {
    url: &'a str,
    title: &'a str,
    author: Option<&'a str>,
    domain: &'a str,
    site_name: Option<&'a str>,
    excerpt: Option<&'a str>,
    #[serde(with = "time::serde::rfc3339")]
    published_date: OffsetDateTime,
    word_count: i32,
    reading_time_minutes: f64,
    content_clean: &'a str,
    text_content: &'a str,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        print_banner();
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(tracing_subscriber::EnvFilter::new("quire_core=debug"))
            .init();
    }

    let source = Source::resolve(&args.input)?;
    let started = Instant::now();

    if args.verbose {
        print_step(1, 4, &source.describe());
    }

    let (html, url) = match source {
        Source::Stdin => (fetch_stdin().context("Failed to read from stdin")?, offline_url(args.url.as_deref(), "stdin")?),
        Source::File(path) => {
            let html = fetch_file(&path).with_context(|| format!("Failed to read file: {}", path))?;
            let name = Path::new(&path).file_name().and_then(|n| n.to_str()).unwrap_or("document");
            (html, offline_url(args.url.as_deref(), name)?)
        }
        Source::Remote(url) => {
            let mut config = FetchConfig { timeout: args.timeout, ..Default::default() };
            if let Some(user_agent) = args.user_agent.clone() {
                config.user_agent = user_agent;
            }
            let fetcher = Fetcher::new(config).context("Failed to build HTTP client")?;
            let html = fetcher.fetch(&url).await.context("Failed to fetch URL")?;
            (html, url)
        }
    };
    let read_time = started.elapsed();

    if args.verbose {
        print_detail("Size", &format_size(html.len()));
        print_timing("Read", read_time);
        if !is_probably_readable(&html) {
            print_warning("Page does not look like an article; extraction may fail");
        }
        eprintln!();
        print_step(2, 4, "Parsing HTML document");
    }

    let config = ReadabilityConfig::builder()
        .char_threshold(args.char_threshold)
        .max_elems_to_parse(args.max_elements)
        .preserve_images(!args.no_images)
        .build();
    let reader = Readability::with_config(config);

    let parse_started = Instant::now();
    let doc = reader.parse_document(&html, Some(&url)).context("Failed to parse HTML")?;
    if args.verbose {
        print_timing("Parse", parse_started.elapsed());
        eprintln!();
        print_step(3, 4, "Extracting main content");
    }

    let extract_started = Instant::now();
    let extraction = reader.extract(&doc).context("Failed to extract content")?;
    if args.verbose {
        print_timing("Extract", extract_started.elapsed());
    }

    let excerpt = extraction.excerpt.clone();
    let site_name = extraction.site_name.clone();
    let top_score = extraction.top_score;
    let article = materialize(&url, &html, doc.title().as_deref(), extraction, OffsetDateTime::now_utc())
        .context("Failed to build article")?;

    if args.verbose {
        print_article_details(&article, top_score);
        print_step(4, 4, "Writing output");
        print_detail("Format", &format!("{:?}", args.format));
        eprintln!();
    }

    let output = render(&article, excerpt.as_deref(), site_name.as_deref(), args.format)?;

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display()));
        }
        None => println!("{}", output),
    }

    Ok(())
}

fn offline_url(url: Option<&str>, name: &str) -> anyhow::Result<Url> {
    match url {
        Some(url) => normalize_url(url).context("Invalid --url"),
        None => Url::parse(OFFLINE_BASE)
            .and_then(|base| base.join(name))
            .context("Failed to build a URL for offline input"),
    }
}

fn render(
    article: &NewArticle, excerpt: Option<&str>, site_name: Option<&str>, format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Html => Ok(article.content_clean.clone()),
        OutputFormat::Text => Ok(article.text_content.clone()),
        OutputFormat::Json => {
            let preview = Preview {
                url: &article.url,
                title: &article.title,
                author: article.author.as_deref(),
                domain: &article.domain,
                site_name,
                excerpt,
                published_date: article.published_date,
                word_count: article.word_count,
                reading_time_minutes: article.reading_time_minutes(),
                content_clean: &article.content_clean,
                text_content: &article.text_content,
            };
            serde_json::to_string_pretty(&preview).context("Failed to serialize article")
        }
    }
}
