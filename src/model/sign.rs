use serde::{Deserialize, Serialize};

pub const BASE_URL: &str = "https://ehoroskop.net";
pub const ATTRIBUTION: &str = "Data by ehoroskop.net";

/// Slug and display name of every sign, in publication order.
pub const SIGNS: [(&str, &str); 12] = [
    ("ovan", "Ovan"),
    ("bik", "Bik"),
    ("blizanci", "Blizanci"),
    ("rak", "Rak"),
    ("lav", "Lav"),
    ("djevica", "Djevica"),
    ("vaga", "Vaga"),
    ("skorpion", "Skorpion"),
    ("strijelac", "Strijelac"),
    ("jarac", "Jarac"),
    ("vodenjak", "Vodenjak"),
    ("ribe", "Ribe"),
];

pub fn sign_url(base_url: &str, slug: &str) -> String {
    format!("{}/{}/", base_url.trim_end_matches('/'), slug)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    #[serde(rename = "dnevni")]
    Daily,
    #[serde(rename = "tjedni")]
    Weekly,
    #[serde(rename = "mjesecni")]
    Monthly,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Monthly];

    pub fn key(self) -> &'static str {
        match self {
            Period::Daily => "dnevni",
            Period::Weekly => "tjedni",
            Period::Monthly => "mjesecni",
        }
    }

    /// Heading keywords tried in order. Monthly pages are inconsistent about
    /// the accent, so the unaccented spelling is a second attempt.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Period::Daily => &["Dnevni horoskop"],
            Period::Weekly => &["Tjedni horoskop"],
            Period::Monthly => &["Mjesečni horoskop", "Mjesecni horoskop"],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "ljubav")]
    Love,
    #[serde(rename = "posao")]
    Career,
    #[serde(rename = "zdravlje")]
    Health,
}

impl Category {
    /// Display order of the weekly block.
    pub const ALL: [Category; 3] = [Category::Love, Category::Career, Category::Health];

    pub fn key(self) -> &'static str {
        match self {
            Category::Love => "ljubav",
            Category::Career => "posao",
            Category::Health => "zdravlje",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Love => "LJUBAV",
            Category::Career => "POSAO",
            Category::Health => "ZDRAVLJE",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SectionRecord {
    #[serde(default)]
    pub date_label: Option<String>,

    #[serde(default)]
    pub body_text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CategoryEntry {
    /// Star rating, always within 1..=5 when present.
    #[serde(default)]
    pub score: Option<u8>,

    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct WeeklyRecord {
    #[serde(default)]
    pub date_range: Option<String>,

    #[serde(default)]
    pub love: CategoryEntry,

    #[serde(default)]
    pub career: CategoryEntry,

    #[serde(default)]
    pub health: CategoryEntry,
}

impl WeeklyRecord {
    pub fn entry(&self, category: Category) -> &CategoryEntry {
        match category {
            Category::Love => &self.love,
            Category::Career => &self.career,
            Category::Health => &self.health,
        }
    }

    pub fn entry_mut(&mut self, category: Category) -> &mut CategoryEntry {
        match category {
            Category::Love => &mut self.love,
            Category::Career => &mut self.career,
            Category::Health => &mut self.health,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SignRecord {
    pub slug: String,
    pub name: String,
    pub url: String,

    #[serde(default)]
    pub daily: SectionRecord,

    #[serde(default)]
    pub weekly: WeeklyRecord,

    #[serde(default)]
    pub monthly: SectionRecord,
}
