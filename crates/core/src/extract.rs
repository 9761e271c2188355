use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::dom_tree::{DomTree, RenderPlan};
use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::scoring::{
    ScoreConfig, apply_link_penalty, class_id_weight, initial_score, is_negative_name, link_density, paragraph_score,
};
use crate::text::html_to_text;
use crate::{QuireError, Result};

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score threshold for top candidate
    pub min_score_threshold: f64,
    /// Maximum number of top candidates to track
    pub max_top_candidates: usize,
    /// Minimum character count of the extracted text
    pub char_threshold: usize,
    /// Maximum elements to consider (0 = unlimited)
    pub max_elements: usize,
    /// Sibling score threshold (multiplier of top score)
    pub sibling_threshold: f64,
    /// Whether class/ID names contribute to scores
    pub weight_classes: bool,
    /// Whether link-heavy, negatively named and empty containers are pruned
    pub clean_conditionally: bool,
    /// Post-processing configuration
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 10.0,
            max_top_candidates: 5,
            char_threshold: 140,
            max_elements: 0,
            sibling_threshold: 0.2,
            weight_classes: true,
            clean_conditionally: true,
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned HTML of the article body
    pub content: String,
    /// Plain-text rendering of `content`
    pub text: String,
    /// The top candidate score
    pub top_score: f64,
    /// Number of top-level elements extracted
    pub element_count: usize,
}

/// A scored container
#[derive(Debug, Clone, Copy)]
struct Candidate {
    node_id: usize,
    score: f64,
}

/// Blocks that contribute their score to ancestors
const SCORABLE_TAGS: &[&str] = &["p", "pre", "td", "blockquote"];

/// Containers that score like paragraphs when they hold only inline content
const INLINE_CONTAINER_TAGS: &[&str] = &["div", "section", "article"];

/// Elements that make a container non-inline
const BLOCK_CHILD_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Containers pruned from the chosen content when they look like boilerplate
const CLEANABLE_TAGS: &[&str] = &["div", "section", "ul", "ol", "dl", "table", "aside", "form", "fieldset"];

/// Content that keeps an otherwise text-free container alive
const EMBEDDED_CONTENT: &str = "img, picture, video, audio, pre, table, figure, iframe, math";

/// Text shorter than this does not count as a paragraph
const MIN_PARAGRAPH_CHARS: usize = 25;

/// How far up the tree a paragraph's score travels
const PROPAGATION_DEPTH: usize = 3;

/// Extract the main content from a document
///
/// This is the main entry point for content extraction. It:
/// 1. Scores paragraph-like blocks and propagates their points to ancestors
/// 2. Applies the link density penalty and picks the top candidate
/// 3. Includes qualifying siblings of the top candidate
/// 4. Prunes boilerplate inside the selection and post-processes the HTML
/// 5. Fails when the resulting text is shorter than `char_threshold`
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let tree = DomTree::build(doc);
    if config.max_elements > 0 && tree.len() > config.max_elements {
        return Err(QuireError::extraction(format!(
            "document has {} elements, more than the limit of {}",
            tree.len(),
            config.max_elements
        )));
    }

    let score_config = ScoreConfig { weight_classes: config.weight_classes, ..Default::default() };
    let scores = score_candidates(&tree, &score_config);
    let (top, body_fallback) = match select_top_candidate(&tree, &scores, config) {
        Ok(top) => (top, false),
        Err(err) => (body_candidate(&tree, &scores, &score_config).ok_or(err)?, true),
    };
    debug!(tag = %tag_of(&tree, top.node_id), score = top.score, body_fallback, "selected top candidate");

    let roots = if body_fallback { vec![top.node_id] } else { select_content_roots(&tree, top, &scores, config) };
    let mut plan =
        if config.clean_conditionally { prune(&tree, &roots, &score_config) } else { RenderPlan::default() };
    if body_fallback {
        plan.unwrap.insert(top.node_id);
    }

    let mut html = String::from("<div>");
    for root in &roots {
        html.push_str(&tree.render(*root, &plan));
    }
    html.push_str("</div>");

    let content = postprocess_html(&html, &config.postprocess);
    let text = html_to_text(&content);
    let length = text.chars().count();
    if length < config.char_threshold {
        return Err(QuireError::extraction(format!(
            "only {length} characters of article text, need at least {}",
            config.char_threshold
        )));
    }

    Ok(ExtractedContent { content, text, top_score: top.score, element_count: roots.len() })
}

fn tag_of<'t>(tree: &'t DomTree<'_>, node_id: usize) -> &'t str {
    tree.get_node(node_id).map(|n| n.tag_name.as_str()).unwrap_or_default()
}

/// Whether a node contributes points as a paragraph
fn is_scorable(tree: &DomTree<'_>, node_id: usize) -> bool {
    let Some(node) = tree.get_node(node_id) else { return false };
    let tag = node.tag_name.as_str();

    if SCORABLE_TAGS.contains(&tag) {
        return true;
    }

    INLINE_CONTAINER_TAGS.contains(&tag)
        && node
            .child_ids
            .iter()
            .filter_map(|id| tree.get_node(*id))
            .all(|child| !BLOCK_CHILD_TAGS.contains(&child.tag_name.as_str()))
}

/// Score every container that holds paragraph-like content
///
/// Each scorable block adds its paragraph score to its parent in full, to its
/// grandparent halved and to its great-grandparent divided by three. A
/// container's accumulated score then takes the link density penalty.
fn score_candidates(tree: &DomTree<'_>, config: &ScoreConfig) -> HashMap<usize, f64> {
    let mut accumulated: HashMap<usize, f64> = HashMap::new();

    for node_id in tree.ids() {
        if !is_scorable(tree, node_id) {
            continue;
        }
        let Some(node) = tree.get_node(node_id) else { continue };
        if node.element.text().trim().chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let points = paragraph_score(&node.element, config);
        for (level, ancestor_id) in tree.ancestor_ids(node_id).take(PROPAGATION_DEPTH).enumerate() {
            let Some(ancestor) = tree.get_node(ancestor_id) else { continue };
            let entry = accumulated.entry(ancestor_id).or_insert_with(|| initial_score(&ancestor.element, config));
            *entry += points / (level + 1) as f64;
        }
    }

    accumulated
        .into_iter()
        .filter_map(|(node_id, score)| {
            let node = tree.get_node(node_id)?;
            let (final_score, _) = apply_link_penalty(score, &node.element, config);
            Some((node_id, final_score))
        })
        .collect()
}

/// Select the top candidate from the scored containers
///
/// Fails when nothing was scored or the best score is below the threshold.
fn select_top_candidate(
    tree: &DomTree<'_>, scores: &HashMap<usize, f64>, config: &ExtractConfig,
) -> Result<Candidate> {
    let mut candidates: Vec<Candidate> =
        scores.iter().map(|(node_id, score)| Candidate { node_id: *node_id, score: *score }).collect();

    if candidates.is_empty() {
        return Err(QuireError::extraction("no paragraph-like content found"));
    }

    candidates.sort_by(|a, b| compare_candidates(tree, b, a));
    candidates.truncate(config.max_top_candidates.max(1));

    let top = candidates[0];
    if top.score < config.min_score_threshold {
        return Err(QuireError::extraction(format!(
            "best content candidate scored {:.1}, below the threshold of {:.1}",
            top.score, config.min_score_threshold
        )));
    }

    Ok(top)
}

/// The body itself, for pages whose prose sits directly in `<body>`
///
/// Only considered when no block scored at all and the body has text of its
/// own; the score threshold does not apply, the character threshold still does.
fn body_candidate(tree: &DomTree<'_>, scores: &HashMap<usize, f64>, config: &ScoreConfig) -> Option<Candidate> {
    if !scores.is_empty() {
        return None;
    }
    let node_id = tree.ids().find(|id| tree.get_node(*id).is_some_and(|node| node.tag_name == "body"))?;
    let node = tree.get_node(node_id)?;
    if node.element.own_text_is_blank() {
        return None;
    }
    Some(Candidate { node_id, score: paragraph_score(&node.element, config) })
}

fn compare_candidates(tree: &DomTree<'_>, a: &Candidate, b: &Candidate) -> Ordering {
    let score_order = a.score.total_cmp(&b.score);
    if score_order != Ordering::Equal {
        return score_order;
    }

    let tag_order = candidate_priority(tag_of(tree, a.node_id)).cmp(&candidate_priority(tag_of(tree, b.node_id)));
    if tag_order != Ordering::Equal {
        return tag_order;
    }

    let text_len = |id: usize| tree.get_node(id).map(|n| n.element.text().chars().count()).unwrap_or_default();
    text_len(a.node_id).cmp(&text_len(b.node_id)).then(b.node_id.cmp(&a.node_id))
}

fn candidate_priority(tag_name: &str) -> u8 {
    match tag_name {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}

/// The top candidate plus the siblings that belong with it, in document order
///
/// A sibling is included if:
/// - Its score (with a bonus when it shares the top candidate's class) is at
///   least `max(10, top_score * sibling_threshold)`
/// - It is a `p` with more than 80 chars of text and link density below 0.25
/// - It is a short `p` without links that ends a sentence
/// - It is a `header` with at least 10 chars of text
fn select_content_roots(
    tree: &DomTree<'_>, top: Candidate, scores: &HashMap<usize, f64>, config: &ExtractConfig,
) -> Vec<usize> {
    let Some(top_node) = tree.get_node(top.node_id) else { return vec![top.node_id] };

    if matches!(top_node.tag_name.as_str(), "body" | "html") {
        return top_node.child_ids.clone();
    }

    let Some(parent) = tree.get_parent(top.node_id) else { return vec![top.node_id] };

    let threshold = (top.score * config.sibling_threshold).max(10.0);
    let top_class = top_node.element.attr("class").filter(|c| !c.trim().is_empty());

    parent
        .child_ids
        .iter()
        .copied()
        .filter(|sibling_id| {
            if *sibling_id == top.node_id {
                return true;
            }
            let Some(sibling) = tree.get_node(*sibling_id) else { return false };

            let bonus = match (top_class, sibling.element.attr("class")) {
                (Some(top_class), Some(class)) if top_class == class => top.score * 0.2,
                _ => 0.0,
            };
            if let Some(score) = scores.get(sibling_id)
                && score + bonus >= threshold
            {
                return true;
            }

            match sibling.tag_name.as_str() {
                "p" => is_standalone_paragraph(&sibling.element),
                "header" => sibling.element.text().trim().chars().count() >= 10,
                _ => false,
            }
        })
        .collect()
}

fn is_standalone_paragraph(element: &Element<'_>) -> bool {
    let text = element.text();
    let text = text.trim();
    let text_len = text.chars().count();
    let density = link_density(element);

    if text_len > 80 {
        density < 0.25
    } else {
        text_len > 0 && density == 0.0 && (text.ends_with('.') || text.contains(". "))
    }
}

/// Decide which descendants of the selected roots are dropped or unwrapped
///
/// Containers are dropped when they carry a boilerplate class or id, when
/// their link density is high, or when they hold neither text nor embedded
/// content. Divs whose only child is another block container are unwrapped.
fn prune(tree: &DomTree<'_>, roots: &[usize], config: &ScoreConfig) -> RenderPlan {
    let mut plan = RenderPlan::default();

    for root in roots {
        for node_id in tree.descendant_ids(*root) {
            if tree.ancestor_ids(node_id).any(|id| plan.skip.contains(&id)) {
                continue;
            }
            let Some(node) = tree.get_node(node_id) else { continue };
            let tag = node.tag_name.as_str();

            if matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                if class_id_weight(&node.element, config) < 0.0 {
                    plan.skip.insert(node_id);
                }
                continue;
            }

            if !CLEANABLE_TAGS.contains(&tag) {
                continue;
            }

            if should_drop(&node.element, config) {
                plan.skip.insert(node_id);
                continue;
            }

            if tag == "div"
                && node.child_ids.len() == 1
                && node.element.own_text_is_blank()
                && node
                    .child_ids
                    .first()
                    .and_then(|id| tree.get_node(*id))
                    .is_some_and(|child| matches!(child.tag_name.as_str(), "div" | "section" | "article"))
            {
                plan.unwrap.insert(node_id);
            }
        }
    }

    plan
}

fn should_drop(element: &Element<'_>, config: &ScoreConfig) -> bool {
    let names_negative = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace))
        .any(is_negative_name);
    let weight = class_id_weight(element, config);
    if names_negative && weight < 0.0 {
        return true;
    }

    let text = element.text();
    let text_len = text.trim().chars().count();
    let has_embedded = !element.select(EMBEDDED_CONTENT).unwrap_or_default().is_empty();
    if text_len == 0 {
        return !has_embedded;
    }

    let density = link_density(element);
    if weight >= 25.0 { density > 0.5 } else { density > 0.2 && (text_len < 1000 || density > 0.5) }
}
