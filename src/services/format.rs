use crate::model::sign::{Category, Period, SectionRecord, SignRecord, WeeklyRecord};
use crate::model::snapshot::FormattedTexts;

const PLACEHOLDER: &str = "-";

pub fn format_daily(sign_name: &str, daily: &SectionRecord) -> String {
    format_section(sign_name, daily)
}

pub fn format_monthly(sign_name: &str, monthly: &SectionRecord) -> String {
    format_section(sign_name, monthly)
}

fn format_section(sign_name: &str, section: &SectionRecord) -> String {
    let date = section.date_label.as_deref().unwrap_or(PLACEHOLDER);
    format!("{sign_name} ({date})\n{}", section.body_text)
        .trim()
        .to_string()
}

/// Header line, then one `LABEL [score / 5]: text` line per category.
pub fn format_weekly(sign_name: &str, weekly: &WeeklyRecord) -> String {
    let mut out: Vec<String> = Vec::with_capacity(Category::ALL.len() + 1);
    out.push(format!(
        "{sign_name} ({})",
        weekly.date_range.as_deref().unwrap_or(PLACEHOLDER)
    ));

    for category in Category::ALL {
        let entry = weekly.entry(category);
        let score = entry
            .score
            .map_or_else(|| PLACEHOLDER.to_string(), |s| s.to_string());
        out.push(format!("{} [{score} / 5]: {}", category.label(), entry.text));
    }

    out.join("\n").trim().to_string()
}

pub fn format_period(record: &SignRecord, period: Period) -> String {
    match period {
        Period::Daily => format_daily(&record.name, &record.daily),
        Period::Weekly => format_weekly(&record.name, &record.weekly),
        Period::Monthly => format_monthly(&record.name, &record.monthly),
    }
}

pub fn format_all(records: &[SignRecord]) -> FormattedTexts {
    let mut formatted = FormattedTexts::default();
    for record in records {
        for period in Period::ALL {
            formatted
                .get_mut(period)
                .insert(record.slug.clone(), format_period(record, period));
        }
    }
    formatted
}
