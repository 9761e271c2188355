use std::sync::LazyLock;

use lol_html::html_content::Element;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::scoring::{POSITIVE_PATTERNS, UNLIKELY_PATTERNS};

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script tags (JSON-LD metadata scripts are kept)
    pub remove_scripts: bool,
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove forms and stray form controls
    pub remove_forms: bool,
    /// Whether to remove nav/aside/footer and ARIA navigation landmarks
    pub remove_navigation: bool,
    /// Whether to remove noscript, iframe, svg, canvas, object, embed and template
    pub remove_embeds: bool,
    /// Whether to remove unlikely candidates
    pub remove_unlikely: bool,
    /// Whether to keep positive candidates even if they match unlikely patterns
    pub keep_positive: bool,
    /// Whether to remove hidden elements
    pub remove_hidden: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_forms: true,
            remove_navigation: true,
            remove_embeds: true,
            remove_unlikely: true,
            keep_positive: true,
            remove_hidden: true,
            convert_urls: true,
            base_url: None,
        }
    }
}

const EMBED_TAGS: &[&str] = &["noscript", "iframe", "svg", "canvas", "object", "embed", "template"];
const FORM_TAGS: &[&str] = &["form", "button", "input", "select", "textarea"];
const NAVIGATION_TAGS: &[&str] = &["nav", "aside", "footer"];
const LANDMARK_ROLES: &[&str] = &["navigation", "complementary", "contentinfo", "banner", "menu", "dialog"];

/// Selector and attribute pairs holding URLs to resolve.
const RESOLVED_ATTRIBUTES: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("area[href]", "href"),
    ("link[href]", "href"),
    ("img[src]", "src"),
    ("source[src]", "src"),
    ("video[src]", "src"),
    ("audio[src]", "src"),
    ("track[src]", "src"),
    ("video[poster]", "poster"),
];

/// Tags that are never dropped as unlikely candidates.
const UNLIKELY_EXEMPT: &[&str] = &[
    "html", "body", "article", "main", "a", "table", "tbody", "thead", "tr", "td", "th", "pre", "code",
];

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());
static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| Regex::new(UNLIKELY_PATTERNS).unwrap());
static POSITIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(POSITIVE_PATTERNS).unwrap());

/// Preprocess HTML by removing non-content elements and resolving links
///
/// The input is reserialized through the HTML5 parser first, so every element
/// has an explicit end tag before the streaming removals run. Each step is a
/// streaming rewrite; a step that fails leaves its input untouched.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_comments(&close_implied_tags(html));

    if config.remove_scripts
        || config.remove_styles
        || config.remove_forms
        || config.remove_navigation
        || config.remove_embeds
    {
        processed = remove_unwanted_tags(&processed, config);
    }

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed, config.keep_positive);
    }

    if config.convert_urls
        && let Some(base_url) = &config.base_url
    {
        processed = convert_relative_urls(&processed, base_url);
    }

    processed
}

/// Reserializes `html` with the end tags a browser would imply.
///
/// `lol_html` does not know that `<p>Soil<p>Rain` holds two sibling
/// paragraphs; removing the first would take the second with it.
fn close_implied_tags(html: &str) -> String {
    Html::parse_document(html).html()
}

/// Scheme of a URL attribute value, lowercased, after the cleanup browsers
/// apply: surrounding C0 controls and spaces trimmed, tab/LF/CR removed.
///
/// `None` for relative references.
pub(crate) fn url_scheme(value: &str) -> Option<String> {
    let cleaned: String = value
        .trim_matches(|c: char| c <= ' ')
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect();
    let (scheme, _) = cleaned.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// Runs one lol_html pass with the given handlers.
pub(crate) fn rewrite<'h>(
    html: &str, handlers: Vec<(std::borrow::Cow<'h, lol_html::Selector>, lol_html::ElementContentHandlers<'h>)>,
) -> String {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    match String::from_utf8(output) {
        Ok(rewritten) if !rewritten.is_empty() => rewritten,
        Ok(_) => html.to_string(),
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn remove_element(el: &mut Element<'_, '_>) -> lol_html::HandlerResult {
    el.remove();
    Ok(())
}

/// Remove scripts, styles, forms, navigation landmarks and embeds
fn remove_unwanted_tags(html: &str, config: &PreprocessConfig) -> String {
    let mut handlers = Vec::new();

    if config.remove_scripts {
        handlers.push(lol_html::element!("script", |el| {
            let is_json_ld = el
                .get_attribute("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
            if !is_json_ld {
                el.remove();
            }
            Ok(())
        }));
    }

    if config.remove_styles {
        handlers.push(lol_html::element!("style", remove_element));
        handlers.push(lol_html::element!("link[rel=\"stylesheet\"]", remove_element));
    }

    let mut tags: Vec<&str> = Vec::new();
    if config.remove_forms {
        tags.extend_from_slice(FORM_TAGS);
    }
    if config.remove_navigation {
        tags.extend_from_slice(NAVIGATION_TAGS);
    }
    if config.remove_embeds {
        tags.extend_from_slice(EMBED_TAGS);
    }
    for tag in tags {
        handlers.push(lol_html::element!(tag, remove_element));
    }

    if config.remove_navigation {
        handlers.push(lol_html::element!("[role]", |el| {
            let is_landmark = el.get_attribute("role").is_some_and(|role| {
                role.split_whitespace()
                    .any(|r| LANDMARK_ROLES.iter().any(|l| r.eq_ignore_ascii_case(l)))
            });
            if is_landmark && el.tag_name() != "body" {
                el.remove();
            }
            Ok(())
        }));
    }

    rewrite(html, handlers)
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    COMMENT.replace_all(html, "").into_owned()
}

/// Remove elements that match unlikely candidate patterns
fn remove_unlikely_candidates(html: &str, keep_positive: bool) -> String {
    let is_unlikely = |value: &str| UNLIKELY.is_match(value) && (!keep_positive || !POSITIVE.is_match(value));

    rewrite(
        html,
        vec![lol_html::element!("*", |el| {
            let tag = el.tag_name();
            if UNLIKELY_EXEMPT.contains(&tag.as_str()) {
                return Ok(());
            }

            if let Some(id) = el.get_attribute("id")
                && is_unlikely(&id)
            {
                el.remove();
                return Ok(());
            }

            if let Some(class) = el.get_attribute("class")
                && class.split_whitespace().any(is_unlikely)
            {
                el.remove();
            }

            Ok(())
        })],
    )
}

/// Remove elements hidden by inline style, the hidden attribute, or aria-hidden
fn remove_hidden_elements(html: &str) -> String {
    rewrite(
        html,
        vec![
            lol_html::element!("[style]", |el| {
                if let Some(style) = el.get_attribute("style")
                    && HIDDEN_STYLE.is_match(&style)
                {
                    el.remove();
                }
                Ok(())
            }),
            lol_html::element!("[hidden]", |el| {
                if el.tag_name() != "body" {
                    el.remove();
                }
                Ok(())
            }),
            lol_html::element!("[aria-hidden=\"true\"]", remove_element),
        ],
    )
}

/// Convert relative URLs to absolute URLs
///
/// Covers link targets, media sources, posters and every `srcset` candidate.
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let absolutize = move |el: &mut Element<'_, '_>, attr: &str| {
        if let Some(value) = el.get_attribute(attr)
            && let Some(absolute) = resolve(base_url, &value)
        {
            el.set_attribute(attr, &absolute).ok();
        }
    };

    let mut handlers = Vec::new();
    for (selector, attr) in RESOLVED_ATTRIBUTES.iter().copied() {
        handlers.push(lol_html::element!(selector, move |el| {
            absolutize(el, attr);
            Ok(())
        }));
    }
    for selector in ["img[srcset]", "source[srcset]"] {
        handlers.push(lol_html::element!(selector, move |el| {
            if let Some(srcset) = el.get_attribute("srcset") {
                let resolved = resolve_srcset(base_url, &srcset);
                el.set_attribute("srcset", &resolved).ok();
            }
            Ok(())
        }));
    }

    rewrite(html, handlers)
}

/// Resolves one attribute value, leaving fragments and script links alone.
fn resolve(base_url: &Url, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || url_scheme(trimmed).is_some_and(|s| s == "javascript") {
        return None;
    }
    base_url.join(trimmed).ok().map(String::from)
}

fn resolve_srcset(base_url: &Url, srcset: &str) -> String {
    srcset
        .split(',')
        .filter_map(|candidate| {
            let mut parts = candidate.split_whitespace();
            let src = parts.next()?;
            let descriptor = parts.collect::<Vec<_>>().join(" ");
            let absolute = resolve(base_url, src).unwrap_or_else(|| src.to_string());
            Some(if descriptor.is_empty() { absolute } else { format!("{absolute} {descriptor}") })
        })
        .collect::<Vec<_>>()
        .join(", ")
}
