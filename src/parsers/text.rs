use scraper::{ElementRef, Html, Node};

use crate::services::encoding::is_c1_control;
use crate::services::mojibake;

/// Line terminators recognised when splitting flattened markup.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Text nodes in document order, `<br>` turned into a newline. Entities are
/// already decoded by the parser.
fn collect_raw(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
                    .unwrap_or(false);
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical body text: collapsed lines without blanks, mojibake repaired,
/// no C1 controls.
pub fn clean_text(raw: &str) -> String {
    let lines: Vec<String> = raw
        .split(is_line_break)
        .map(collapse_ws)
        .filter(|line| !line.is_empty())
        .collect();

    let joined = lines.join("\n");
    mojibake::repair(joined.trim())
        .chars()
        .filter(|c| !is_c1_control(*c))
        .collect()
}

pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&collect_raw(el))
}

pub fn to_plain_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    element_text(parsed.root_element())
}

fn fold_char(c: char) -> char {
    match c {
        'č' | 'ć' => 'c',
        'ž' => 'z',
        'š' => 's',
        'đ' => 'd',
        _ => c,
    }
}

/// Comparison key for headings; never shown to a user.
pub fn match_key(plain: &str) -> String {
    let lowered = mojibake::repair(plain).to_lowercase();
    let folded: String = lowered.chars().map(fold_char).collect();
    collapse_ws(&folded)
}

pub fn element_key(el: ElementRef<'_>) -> String {
    match_key(&element_text(el))
}

pub fn fragment_key(fragment: &str) -> String {
    match_key(&to_plain_text(fragment))
}
