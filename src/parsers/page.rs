use scraper::Html;

use crate::model::sign::{Period, SignRecord};
use crate::parsers::{section, weekly};

/// Everything the pipeline extracts from one decoded sign page.
pub fn parse_sign_page(slug: &str, name: &str, url: &str, html: &str) -> SignRecord {
    let doc = Html::parse_document(html);

    let (daily, _) = section::extract(&doc, Period::Daily);
    let (weekly_section, weekly_block) = section::extract(&doc, Period::Weekly);
    let (monthly, _) = section::extract(&doc, Period::Monthly);

    let weekly = weekly::build_weekly(
        weekly_section.date_label,
        &weekly_section.body_text,
        weekly_block.as_ref(),
    );

    SignRecord {
        slug: slug.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        daily,
        weekly,
        monthly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_gives_placeholder_record() {
        let record = parse_sign_page("bik", "Bik", "https://x.test/bik/", "<html></html>");
        assert_eq!(record.slug, "bik");
        assert_eq!(record.daily.body_text, "");
        assert_eq!(record.weekly.love.score, None);
        assert_eq!(record.monthly.date_label, None);
    }

    #[test]
    fn full_page_populates_all_periods() {
        let html = r#"
            <h3>Bik - Dnevni horoskop</h3><div class="datum">Utorak</div><p>Dan.</p>
            <h3>Bik - Tjedni horoskop</h3><div class="datum">1. - 7.</div>
            <div class="zvijezda-text">Ljubav:</div><img src="zvijezde-4-5.png">
            <p>LJUBAV: Da. KARIJERA: Ne. ZDRAVLJE: Možda.</p>
            <h3>Bik - Mjesecni horoskop</h3><div class="datum">Veljača</div><p>Mjesec.</p>
        "#;
        let record = parse_sign_page("bik", "Bik", "u", html);
        assert_eq!(record.daily.date_label.as_deref(), Some("Utorak"));
        assert_eq!(record.weekly.date_range.as_deref(), Some("1. - 7."));
        assert_eq!(record.weekly.love.score, Some(4));
        assert_eq!(record.weekly.love.text, "Da.");
        assert_eq!(record.weekly.career.text, "Ne.");
        assert_eq!(record.weekly.health.text, "Možda.");
        assert_eq!(record.monthly.body_text, "Mjesec.");
    }
}
