//! Weekly block: star scores from the rating images and the per-category
//! paragraphs from the flattened text.

use std::collections::BTreeMap;
use std::num::IntErrorKind;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Node};

use crate::model::sign::{Category, WeeklyRecord};
use crate::parsers::section::Section;
use crate::parsers::text::{collapse_ws, element_text, to_plain_text};

const SCORE_LABEL_CLASS: &str = "zvijezda-text";

fn star_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)zvijezde-([0-9]+)-5\.png").expect("valid star image pattern"))
}

fn text_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(LJUBAV|KARIJERA|ZDRAVLJE(?:&SAVJET)?):").expect("valid label pattern")
    })
}

/// Map a label such as `Karijera & posao:` onto its category.
pub fn normalize_category(label: &str) -> Option<Category> {
    let normalized: String = to_plain_text(label)
        .to_uppercase()
        .chars()
        .filter(|c| *c != '&' && !c.is_whitespace())
        .collect();

    if normalized.contains("LJUBAV") {
        Some(Category::Love)
    } else if normalized.contains("KARIJERA") || normalized.contains("POSAO") {
        Some(Category::Career)
    } else if normalized.contains("ZDRAVLJE") {
        Some(Category::Health)
    } else {
        None
    }
}

/// The element right after `el`, skipping whitespace-only text. Any other
/// content in between breaks the pairing.
fn next_element<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    for sibling in el.next_siblings() {
        match sibling.value() {
            Node::Text(text) if text.trim().is_empty() => continue,
            Node::Comment(_) => continue,
            Node::Element(_) => return ElementRef::wrap(sibling),
            _ => return None,
        }
    }
    None
}

/// Star count from the rating image name, clamped to 1..=5. Digit runs too
/// long for `u64` clamp to 5.
fn parse_star_rating(src: &str) -> Option<u8> {
    let caps = star_image_re().captures(src)?;
    match caps.get(1)?.as_str().parse::<u64>() {
        Ok(value) => Some(value.clamp(1, 5) as u8),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(5),
        Err(_) => None,
    }
}

/// Scores keyed by category. A label div must be followed directly by the
/// rating image. The first score seen for a category is kept.
pub fn extract_scores(section: &Section<'_>) -> BTreeMap<Category, u8> {
    let mut scores = BTreeMap::new();

    for el in &section.body {
        let is_label = el
            .value()
            .attr("class")
            .is_some_and(|class| class.contains(SCORE_LABEL_CLASS));
        if !is_label {
            continue;
        }

        let Some(img) = next_element(*el).filter(|e| e.value().name() == "img") else {
            continue;
        };
        let Some(src) = img.value().attr("src") else {
            continue;
        };

        let label = element_text(*el);
        let Some(category) = normalize_category(label.trim_end_matches(':')) else {
            continue;
        };

        match parse_star_rating(src) {
            Some(score) => {
                scores.entry(category).or_insert(score);
            }
            None => tracing::debug!(src, "unreadable star rating, skipping"),
        }
    }

    scores
}

/// Split weekly text on `LABEL:` markers. Text before the first marker is
/// dropped; a repeated label keeps its last span.
pub fn split_texts(text: &str) -> BTreeMap<Category, String> {
    let mut sections = BTreeMap::new();
    let labels: Vec<_> = text_label_re().captures_iter(text).collect();

    for (i, caps) in labels.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = labels
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());

        if let Some(category) = normalize_category(label.as_str()) {
            sections.insert(category, collapse_ws(&text[whole.end()..end]));
        }
    }

    sections
}

/// Weekly record from the located section; absent parts stay empty.
pub fn build_weekly(date_range: Option<String>, body_text: &str, section: Option<&Section<'_>>) -> WeeklyRecord {
    let scores = section.map(extract_scores).unwrap_or_default();
    let mut texts = split_texts(body_text);

    let mut record = WeeklyRecord {
        date_range,
        ..Default::default()
    };
    for category in Category::ALL {
        let entry = record.entry_mut(category);
        entry.score = scores.get(&category).copied();
        entry.text = texts.remove(&category).unwrap_or_default();
    }
    record
}
