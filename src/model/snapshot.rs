use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::model::sign::{Category, Period, SignRecord, ATTRIBUTION};

/// One mapping per period, keyed by sign slug.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PeriodMap<T> {
    #[serde(default, rename = "dnevni")]
    pub daily: BTreeMap<String, T>,

    #[serde(default, rename = "tjedni")]
    pub weekly: BTreeMap<String, T>,

    #[serde(default, rename = "mjesecni")]
    pub monthly: BTreeMap<String, T>,
}

impl<T> Default for PeriodMap<T> {
    fn default() -> Self {
        Self {
            daily: BTreeMap::new(),
            weekly: BTreeMap::new(),
            monthly: BTreeMap::new(),
        }
    }
}

impl<T> PeriodMap<T> {
    pub fn get(&self, period: Period) -> &BTreeMap<String, T> {
        match period {
            Period::Daily => &self.daily,
            Period::Weekly => &self.weekly,
            Period::Monthly => &self.monthly,
        }
    }

    pub fn get_mut(&mut self, period: Period) -> &mut BTreeMap<String, T> {
        match period {
            Period::Daily => &mut self.daily,
            Period::Weekly => &mut self.weekly,
            Period::Monthly => &mut self.monthly,
        }
    }
}

pub type FormattedTexts = PeriodMap<String>;

/// Translated values are kept as the service returned them.
pub type TranslatedTexts = PeriodMap<Value>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    pub generated_at: DateTime<Local>,
    pub attribution: String,
    pub source_urls: BTreeMap<String, String>,
    pub signs: BTreeMap<String, SignRecord>,
    pub formatted: FormattedTexts,

    #[serde(default)]
    pub translated: Option<TranslatedTexts>,

    pub fingerprint: String,
}

impl Snapshot {
    pub fn new(
        generated_at: DateTime<Local>,
        records: Vec<SignRecord>,
        formatted: FormattedTexts,
    ) -> Self {
        let source_urls = records
            .iter()
            .map(|r| (r.slug.clone(), r.url.clone()))
            .collect();
        let signs = records.into_iter().map(|r| (r.slug.clone(), r)).collect();
        let fingerprint = fingerprint(&formatted);

        Self {
            generated_at,
            attribution: ATTRIBUTION.to_string(),
            source_urls,
            signs,
            formatted,
            translated: None,
            fingerprint,
        }
    }

    /// Copy of this snapshot carrying `translated`; `self` is left as is.
    pub fn with_translations(&self, translated: TranslatedTexts) -> Self {
        let mut merged = self.clone();
        merged.translated = Some(translated);
        merged
    }

    /// True when `other` was produced by the same refresh cycle.
    pub fn same_cycle(&self, other: &Snapshot) -> bool {
        self.generated_at == other.generated_at && self.fingerprint == other.fingerprint
    }

    pub fn raw(&self, period: Period) -> Value {
        let mut out = Map::new();
        for (slug, sign) in &self.signs {
            let value = match period {
                Period::Daily => json!({
                    "znak": sign.name,
                    "url": sign.url,
                    "datum": sign.daily.date_label,
                    "tekst": sign.daily.body_text,
                }),
                Period::Weekly => {
                    let mut kategorija = Map::new();
                    for category in Category::ALL {
                        let entry = sign.weekly.entry(category);
                        kategorija.insert(
                            category.key().to_string(),
                            json!({ "score": entry.score, "tekst": entry.text }),
                        );
                    }
                    json!({
                        "znak": sign.name,
                        "url": sign.url,
                        "datum_od_do": sign.weekly.date_range,
                        "kategorija": kategorija,
                    })
                }
                Period::Monthly => json!({
                    "znak": sign.name,
                    "url": sign.url,
                    "mjesec": sign.monthly.date_label,
                    "tekst": sign.monthly.body_text,
                }),
            };
            out.insert(slug.clone(), value);
        }
        Value::Object(out)
    }

    pub fn formatted(&self, period: Period) -> Value {
        json!(self.formatted.get(period))
    }

    /// `null` until a translation cycle has completed for this snapshot.
    pub fn translated(&self, period: Period) -> Value {
        match &self.translated {
            Some(t) => json!(t.get(period)),
            None => Value::Null,
        }
    }

    pub fn view_data(&self, kind: ViewKind, period: Period) -> Value {
        match kind {
            ViewKind::Raw => self.raw(period),
            ViewKind::Formatted => self.formatted(period),
            ViewKind::Translated => self.translated(period),
        }
    }

    /// One display view: short state plus the payload as attributes.
    pub fn view(&self, kind: ViewKind, period: Period) -> Value {
        json!({
            "state": self.generated_at.to_rfc3339(),
            "data": self.view_data(kind, period),
            "source_urls": self.source_urls,
            "attribution": self.attribution,
        })
    }

    /// Full consumer payload with all nine period views.
    pub fn payload(&self) -> Value {
        let mut out = Map::new();
        out.insert("generated_at".into(), json!(self.generated_at.to_rfc3339()));
        out.insert("attribution".into(), json!(self.attribution));
        out.insert("source_urls".into(), json!(self.source_urls));
        out.insert("fingerprint".into(), json!(self.fingerprint));
        for kind in ViewKind::ALL {
            for period in Period::ALL {
                out.insert(view_name(kind, period), self.view_data(kind, period));
            }
        }
        Value::Object(out)
    }
}

fn fingerprint(formatted: &FormattedTexts) -> String {
    let canonical = serde_json::to_string(formatted).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Raw,
    Formatted,
    Translated,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Raw, ViewKind::Formatted, ViewKind::Translated];

    fn suffix(self) -> &'static str {
        match self {
            ViewKind::Raw => "raw",
            ViewKind::Formatted => "formatted",
            ViewKind::Translated => "translated",
        }
    }
}

pub fn view_name(kind: ViewKind, period: Period) -> String {
    format!("{}_{}", period.key(), kind.suffix())
}

/// Display views exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Payload(ViewKind, Period),
    TranslationStatus,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "translation_status" {
            return Ok(View::TranslationStatus);
        }
        for kind in ViewKind::ALL {
            for period in Period::ALL {
                if s == view_name(kind, period) {
                    return Ok(View::Payload(kind, period));
                }
            }
        }
        Err(format!("unknown view `{s}`"))
    }
}
