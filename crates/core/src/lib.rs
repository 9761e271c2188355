pub mod article;
pub mod dom_tree;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod metadata;
pub mod normalize;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod scoring;
pub mod store;
pub mod text;

pub use article::{Article, NewArticle, materialize};
#[doc(hidden)]
pub use dom_tree::{DomNode, DomTree, RenderPlan};
pub use error::{FetchFailure, QuireError, Result, StoreError};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
pub use fetch::{FetchConfig, Fetcher};
pub use fetch::{fetch_file, fetch_stdin, fetch_url};
pub use ingest::{IngestConfig, Ingestor};
pub use metadata::Metadata;
pub use normalize::{domain_of, normalize_url};
pub use parse::Document;
#[doc(hidden)]
pub use postprocess::{PostProcessConfig, postprocess_html};
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use readability::{
    Extraction, Readability, ReadabilityConfig, ReadabilityConfigBuilder, is_probably_readable, parse, parse_with_url,
};
#[doc(hidden)]
pub use scoring::{ScoreConfig, class_id_weight, link_density};
pub use store::{ArticleStore, MemoryStore, StoreResult};
pub use text::{count_words, html_to_text};
