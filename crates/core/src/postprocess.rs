use std::sync::LazyLock;

use lol_html::html_content::Element;
use regex::Regex;

use crate::preprocess::{rewrite, url_scheme};

/// Configuration for HTML post-processing cleanup
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Whether to remove empty nodes
    pub remove_empty_nodes: bool,
    /// Maximum passes for removing empty nodes
    pub max_empty_node_passes: usize,
    /// Whether to strip all images
    pub strip_images: bool,
    /// Whether to keep class attributes (default: false)
    pub keep_classes: bool,
    /// Whether to unwrap span/font/center wrappers
    pub unwrap_presentational: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            strip_images: false,
            keep_classes: false,
            unwrap_presentational: true,
        }
    }
}

/// Attributes that only carry presentation.
const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "style", "align", "background", "bgcolor", "border", "cellpadding", "cellspacing", "frame", "hspace", "rules",
    "valign", "vspace",
];

/// Elements on which `width`/`height` are layout hints rather than media size.
const SIZED_LAYOUT_TAGS: &[&str] = &["table", "th", "td", "hr", "pre"];

/// Schemes a kept link may use; relative links are always kept.
const LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];

const PRESENTATIONAL_TAGS: &[&str] = &["span", "font", "center"];

const EMPTY_CANDIDATE_TAGS: &[&str] = &[
    "div", "p", "span", "section", "article", "aside", "header", "footer", "blockquote", "figure", "li", "ul", "ol",
    "h1", "h2", "h3", "h4", "h5", "h6", "strong", "em", "b", "i",
];

static EMPTY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    EMPTY_CANDIDATE_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"<{tag}(?:\s[^>]*)?>\s*(?:<br\s*/?>\s*)*</{tag}>")).unwrap())
        .collect()
});

/// Post-process extracted HTML by cleaning up remaining unwanted content
///
/// Event handlers, inline styles, script links and (unless configured
/// otherwise) classes are removed; presentational wrappers are unwrapped and
/// empty blocks dropped.
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let mut processed = sanitize_attributes(html, config.keep_classes);

    if config.unwrap_presentational {
        processed = unwrap_presentational(&processed);
    }

    if config.strip_images {
        processed = strip_images(&processed);
    }

    if config.remove_empty_nodes {
        processed = remove_empty_nodes(&processed, config.max_empty_node_passes);
    }

    processed.trim().to_string()
}

fn sanitize_attributes(html: &str, keep_classes: bool) -> String {
    rewrite(
        html,
        vec![
            lol_html::element!("*", move |el| {
                strip_attributes(el, keep_classes);
                Ok(())
            }),
            lol_html::element!("a[href]", |el| {
                let unsafe_scheme = el
                    .get_attribute("href")
                    .and_then(|href| url_scheme(&href))
                    .is_some_and(|scheme| !LINK_SCHEMES.contains(&scheme.as_str()));
                if unsafe_scheme {
                    el.remove_and_keep_content();
                }
                Ok(())
            }),
        ],
    )
}

fn strip_attributes(el: &mut Element<'_, '_>, keep_classes: bool) {
    let tag = el.tag_name();
    let sized_layout = SIZED_LAYOUT_TAGS.contains(&tag.as_str());
    let names: Vec<String> = el.attributes().iter().map(|attr| attr.name()).collect();

    for name in names {
        let drop = name.starts_with("on")
            || PRESENTATIONAL_ATTRIBUTES.contains(&name.as_str())
            || (!keep_classes && name == "class")
            || (sized_layout && (name == "width" || name == "height"));
        if drop {
            el.remove_attribute(&name);
        }
    }
}

/// Unwrap presentational wrappers, keeping their content
fn unwrap_presentational(html: &str) -> String {
    let handlers = PRESENTATIONAL_TAGS
        .iter()
        .copied()
        .map(|tag| {
            lol_html::element!(tag, |el| {
                el.remove_and_keep_content();
                Ok(())
            })
        })
        .collect();

    rewrite(html, handlers)
}

/// Strip all images from HTML
fn strip_images(html: &str) -> String {
    let handlers = ["img", "picture"]
        .into_iter()
        .map(|tag| {
            lol_html::element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite(html, handlers)
}

/// Remove empty nodes from HTML
///
/// A node is considered empty if it holds nothing but whitespace or `<br>`.
/// Removal repeats until nothing changes, since dropping a child can empty
/// its parent.
fn remove_empty_nodes(html: &str, max_passes: usize) -> String {
    let mut result = html.to_string();

    for _ in 0..max_passes {
        let before = result.len();
        for re in EMPTY_NODES.iter() {
            result = re.replace_all(&result, "").into_owned();
        }
        if result.len() == before {
            break;
        }
    }

    result
}
