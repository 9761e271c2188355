use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::Document;

/// Separators between an article title and the site name in `<title>`.
static TITLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[|\-–—/»·:]{1,2}\s+").unwrap());

/// Leading "By" in author strings.
static BY_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*by[\s:]+").unwrap());

/// Represents all metadata read from a document's head and markup
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub published: Option<OffsetDateTime>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
}

impl Document {
    /// Extract title with priority fallback:
    /// 1. Open Graph `og:title`
    /// 2. Twitter `twitter:title`
    /// 3. JSON-LD `headline`
    /// 4. Meta `title` / `DC.title`
    /// 5. `<title>` element, without a trailing site name
    pub fn extract_title(&self) -> Option<String> {
        self.get_meta_content("og:title")
            .or_else(|| self.get_meta_content("twitter:title"))
            .or_else(|| self.json_ld_string("headline"))
            .or_else(|| self.get_meta_content("title"))
            .or_else(|| self.get_meta_content("DC.title"))
            .or_else(|| self.title().map(|raw| self.clean_title(&raw)))
    }

    /// Drop a " | Site" style suffix from a `<title>` value.
    ///
    /// The remainder is used when it still has at least three words or when
    /// it matches a top-level heading exactly.
    fn clean_title(&self, raw: &str) -> String {
        let Some(separator) = TITLE_SEPARATOR.find_iter(raw).last() else {
            return raw.to_string();
        };

        let remainder = raw[..separator.start()].trim();
        if remainder.is_empty() {
            return raw.to_string();
        }

        let matches_heading = self
            .select_source("h1, h2")
            .unwrap_or_default()
            .iter()
            .any(|heading| heading.text().trim() == remainder);

        if remainder.split_whitespace().count() >= 3 || matches_heading {
            remainder.to_string()
        } else {
            raw.to_string()
        }
    }

    /// Extract byline with priority fallback:
    /// 1. JSON-LD `author` (string, object or array)
    /// 2. Meta `author` / `article:author` / `DC.creator`
    /// 3. `[rel="author"]` / `[itemprop="author"]` text
    /// 4. Class/ID containing "byline" or "author" (short text only)
    ///
    /// Leading "By " is stripped.
    pub fn extract_byline(&self) -> Option<String> {
        let found = self
            .json_ld_objects()
            .iter()
            .find_map(|object| object.get("author").and_then(author_from_json_ld))
            .or_else(|| self.get_meta_content("author"))
            .or_else(|| self.get_meta_content("article:author").filter(|value| !looks_like_url(value)))
            .or_else(|| self.get_meta_content("DC.creator"))
            .or_else(|| self.first_short_text("[rel=\"author\"], [itemprop=\"author\"]"))
            .or_else(|| {
                self.first_short_text(
                    "[class*=\"byline\"], [id*=\"byline\"], [class*=\"author\"], [id*=\"author\"]",
                )
            })?;

        clean_byline(&found)
    }

    /// Extract the publication time with priority fallback:
    /// 1. JSON-LD `datePublished`
    /// 2. Meta `article:published_time`
    /// 3. `<time datetime="">` element
    /// 4. Meta `date` / `DC.date`
    ///
    /// A source whose value cannot be parsed counts as absent.
    pub fn extract_published(&self) -> Option<OffsetDateTime> {
        let time_element = || {
            self.select_source("time[datetime]")
                .unwrap_or_default()
                .first()
                .and_then(|el| el.attr("datetime"))
                .map(str::to_string)
        };

        [
            self.json_ld_string("datePublished"),
            self.get_meta_content("article:published_time"),
            time_element(),
            self.get_meta_content("date"),
            self.get_meta_content("DC.date"),
        ]
        .into_iter()
        .flatten()
        .find_map(|value| parse_date(&value))
    }

    /// Extract excerpt with priority fallback:
    /// 1. JSON-LD `description`
    /// 2. Open Graph `og:description`
    /// 3. Meta `description`
    pub fn extract_excerpt(&self) -> Option<String> {
        self.json_ld_string("description")
            .or_else(|| self.get_meta_content("og:description"))
            .or_else(|| self.get_meta_content("description"))
    }

    /// Extract site name with priority fallback:
    /// 1. JSON-LD `publisher.name`
    /// 2. Open Graph `og:site_name`
    pub fn extract_site_name(&self) -> Option<String> {
        self.json_ld_objects()
            .iter()
            .find_map(|object| {
                object
                    .get("publisher")
                    .and_then(|publisher| publisher.get("name"))
                    .and_then(Value::as_str)
                    .map(|name| name.trim().to_string())
            })
            .filter(|name| !name.is_empty())
            .or_else(|| self.get_meta_content("og:site_name"))
    }

    /// Extract all metadata at once
    pub fn extract_metadata(&self) -> Metadata {
        Metadata {
            title: self.extract_title(),
            byline: self.extract_byline(),
            published: self.extract_published(),
            excerpt: self.extract_excerpt(),
            site_name: self.extract_site_name(),
        }
    }

    /// Get meta tag content by name or property attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        ["name", "property"].into_iter().find_map(|key| {
            self.select_source(&format!("meta[{key}=\"{attr}\"]"))
                .unwrap_or_default()
                .iter()
                .filter_map(|el| el.attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .map(str::to_string)
        })
    }

    fn first_short_text(&self, selector: &str) -> Option<String> {
        self.select_source(selector)
            .unwrap_or_default()
            .iter()
            .take(5)
            .map(|el| collapse(&el.text()))
            .find(|text| !text.is_empty() && text.chars().count() < 100)
    }

    /// Every JSON-LD object on the page, with arrays and `@graph` flattened
    fn json_ld_objects(&self) -> Vec<Value> {
        let mut objects = Vec::new();

        for el in self.select_source("script[type=\"application/ld+json\"]").unwrap_or_default() {
            let Ok(value) = serde_json::from_str::<Value>(el.text().trim()) else { continue };
            let mut pending = vec![value];
            while let Some(value) = pending.pop() {
                match value {
                    Value::Array(items) => pending.extend(items.into_iter().rev()),
                    Value::Object(mut map) => {
                        if let Some(graph) = map.remove("@graph") {
                            pending.push(graph);
                        }
                        objects.push(Value::Object(map));
                    }
                    _ => {}
                }
            }
        }

        objects
    }

    fn json_ld_string(&self, key: &str) -> Option<String> {
        self.json_ld_objects().iter().find_map(|object| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
    }
}

/// Extract author name from a JSON-LD author field
/// Handles string, object and array formats
fn author_from_json_ld(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(name.clone()),
        Value::Object(object) => object.get("name").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.iter().find_map(author_from_json_ld),
        _ => None,
    }
}

/// Strip a leading "By" and surrounding whitespace from a byline
pub(crate) fn clean_byline(raw: &str) -> Option<String> {
    let collapsed = collapse(raw);
    let stripped = BY_PREFIX.replace(&collapsed, "");
    let byline = stripped.trim();
    (!byline.is_empty()).then(|| byline.to_string())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_like_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Parse an RFC 3339 timestamp, a timestamp without offset (taken as UTC),
/// or a bare `YYYY-MM-DD` date (midnight UTC)
pub(crate) fn parse_date(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();

    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }

    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Some(prefix) = value.get(..19)
        && let Ok(parsed) = PrimitiveDateTime::parse(prefix, naive)
    {
        return Some(parsed.assume_utc());
    }

    let date_only = format_description!("[year]-[month]-[day]");
    value
        .get(..10)
        .and_then(|prefix| Date::parse(prefix, date_only).ok())
        .map(|date| date.midnight().assume_utc())
}
