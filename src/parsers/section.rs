//! Finds a period block on a sign page: the `<h3>` heading that names it and
//! everything up to the next `<h3>`.

use scraper::{ElementRef, Html};

use crate::model::sign::{Period, SectionRecord};
use crate::parsers::text::{element_key, element_text, fragment_key};

const KEYWORD: &str = "horoskop";
const DAY_TOKEN: &str = "dnevn";
const WEEK_TOKEN: &str = "tjedn";
const MONTH_TOKENS: [&str; 3] = ["mjesec", "mjesecn", "mjese"];
const DATE_CLASS_TOKEN: &str = "datum";

fn has_month_token(key: &str) -> bool {
    MONTH_TOKENS.iter().any(|t| key.contains(t))
}

/// Period headings must carry the `horoskop` keyword plus a period token;
/// anything else falls back to plain containment of the wanted key.
fn title_matches(wanted: &str, title: &str) -> bool {
    if has_month_token(wanted) {
        title.contains(KEYWORD) && has_month_token(title)
    } else if wanted.contains(WEEK_TOKEN) {
        title.contains(KEYWORD) && title.contains(WEEK_TOKEN)
    } else if wanted.contains(DAY_TOKEN) {
        title.contains(KEYWORD) && title.contains(DAY_TOKEN)
    } else {
        title.contains(wanted)
    }
}

fn is_h3(el: &ElementRef<'_>) -> bool {
    el.value().name() == "h3"
}

#[derive(Debug, Clone)]
pub struct Section<'a> {
    /// Elements after the heading and before the next `<h3>`, document order.
    pub body: Vec<ElementRef<'a>>,
}

impl<'a> Section<'a> {
    /// Text of the first element whose class mentions `datum`.
    pub fn date_label(&self) -> Option<String> {
        self.body
            .iter()
            .find(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| class.contains(DATE_CLASS_TOKEN))
            })
            .map(|el| element_text(*el))
    }

    /// Text of the first paragraph, empty when there is none.
    pub fn body_text(&self) -> String {
        self.body
            .iter()
            .find(|el| el.value().name() == "p")
            .map(|el| element_text(*el))
            .unwrap_or_default()
    }

    pub fn record(&self) -> SectionRecord {
        SectionRecord {
            date_label: self.date_label(),
            body_text: self.body_text(),
        }
    }
}

/// First `<h3>` in document order whose text matches `keyword`.
pub fn locate<'a>(doc: &'a Html, keyword: &str) -> Option<Section<'a>> {
    let wanted = fragment_key(keyword);
    let mut elements = doc.root_element().descendants().filter_map(ElementRef::wrap);

    let heading = elements
        .by_ref()
        .find(|el| is_h3(el) && title_matches(&wanted, &element_key(*el)))?;

    let body = elements
        .filter(|el| !el.ancestors().any(|a| a == *heading))
        .take_while(|el| !is_h3(el))
        .collect();

    Some(Section { body })
}

/// Section for `period`, trying each keyword spelling until one yields body
/// text. A missing section is not an error.
pub fn extract<'a>(doc: &'a Html, period: Period) -> (SectionRecord, Option<Section<'a>>) {
    let mut result = (SectionRecord::default(), None);

    for keyword in period.keywords() {
        if let Some(section) = locate(doc, keyword) {
            let record = section.record();
            let found_text = !record.body_text.is_empty();
            result = (record, Some(section));
            if found_text {
                break;
            }
        }
    }

    result
}
