use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Configuration for content scoring algorithm
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum content density score from character count
    pub max_char_density_score: f64,
    /// Maximum content density score from comma count
    pub max_comma_density_score: f64,
    /// Characters per point for content density scoring
    pub chars_per_point: usize,
    /// Whether class/ID names contribute to scores at all
    pub weight_classes: bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
            weight_classes: true,
        }
    }
}

/// Class/id fragments that suggest an element contains main content
pub(crate) const POSITIVE_PATTERNS: &str =
    r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)";

/// Class/id fragments that suggest an element does NOT contain main content
pub(crate) const NEGATIVE_PATTERNS: &str = r"(?i)(-ad-|^ad-|-ad$|^ads?$|advert|banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|share|shoutbox|sidebar|skyscraper|social|sponsor|ad-break|agegate|pagination|pager|popup|promo|widget)";

/// Class/id fragments removed outright before scoring
pub(crate) const UNLIKELY_PATTERNS: &str = r"(?i)(-ad-|^ad-|-ad$|^ads?$|banner|breadcrumbs?|combx|comment|community|cover-wrap|disqus|extra|foot|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote|newsletter|subscribe|cookie)";

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(POSITIVE_PATTERNS).unwrap());
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(NEGATIVE_PATTERNS).unwrap());

/// Calculate the base score for an element based on its tag name
///
/// Scores are assigned based on how likely a tag is to contain main content:
/// - ARTICLE: +10 (primary content container)
/// - SECTION: +8 (content section)
/// - DIV: +5 (generic container)
/// - TD, BLOCKQUOTE: +3 (content elements)
/// - PRE: 0 (kept neutral)
/// - FORM: -3 (unlikely to contain main content)
/// - ADDRESS, OL, UL, DL, DD, DT, LI: -3 (list/metadata elements)
/// - H1-H6, TH, HEADER, FOOTER, NAV: -5 (header/navigation elements)
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    tag_score(&element.tag_name())
}

fn tag_score(tag_name: &str) -> f64 {
    match tag_name {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" => 0.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Calculate the class/ID weight adjustment for an element
///
/// The id is checked first, then each class name; the first name matching a
/// positive pattern wins over a negative one.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    if !config.weight_classes {
        return 0.0;
    }

    let names = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace));

    for name in names {
        if POSITIVE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Whether a class or id fragment marks boilerplate.
pub(crate) fn is_negative_name(name: &str) -> bool {
    NEGATIVE.is_match(name)
}

/// Calculate content density score based on text length and comma count
///
/// This gives higher scores to elements with:
/// - More text content (up to max_char_density_score)
/// - More commas (indicates prose, up to max_comma_density_score)
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.text();
    let char_score = ((text.trim().chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_count = text.matches([',', '，']).count();
    let comma_score = (comma_count as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Ratio of visible text to serialized markup, from 0.0 to 1.0.
///
/// Navigation blocks and widget shells carry much more markup per visible
/// character than prose does.
pub fn markup_density(element: &Element<'_>) -> f64 {
    let markup_length = element.inner_html().chars().count();
    if markup_length == 0 {
        return 0.0;
    }

    let text_length = element.text().trim().chars().count();
    (text_length as f64 / markup_length as f64).min(1.0)
}

/// Calculate the link density of an element
///
/// Link density is the ratio of link text characters to total text characters.
/// Returns a value from 0.0 (no links) to 1.0 (all text is in links).
/// In-page anchors (`href="#..."`) count at a fifth of their length.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text = element.text();
    let text_length = text.trim().chars().count();

    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| {
            let weight = if link.attr("href").is_some_and(|h| h.starts_with('#')) { 0.2 } else { 1.0 };
            link.text().trim().chars().count() as f64 * weight
        })
        .sum::<f64>();

    (link_text_length / text_length as f64).min(1.0)
}

/// Score a container gets when it first receives propagated points
pub fn initial_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    base_tag_score(element) + class_id_weight(element, config)
}

/// Points a scorable block contributes to its ancestors
///
/// One point for being a paragraph, plus content density, plus up to one
/// point for text-heavy (rather than markup-heavy) content.
pub fn paragraph_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    1.0 + content_density_score(element, config) + markup_density(element)
}

/// Apply the link density penalty to an accumulated score
///
/// The penalty is halved for elements with a positive class/ID pattern or
/// more than 500 characters of text.
pub fn apply_link_penalty(score: f64, element: &Element<'_>, config: &ScoreConfig) -> (f64, f64) {
    let ld = link_density(element);
    let has_positive_pattern = class_id_weight(element, config) > 0.0;
    let is_content_rich = element.text().trim().chars().count() > 500;

    let link_penalty = if has_positive_pattern || is_content_rich { 1.0 - (ld * 0.5) } else { 1.0 - ld };
    (score * link_penalty, ld)
}
