use chrono::Local;
use futures::future::try_join_all;

use crate::error::RefreshError;
use crate::model::sign::{sign_url, SignRecord, SIGNS};
use crate::model::snapshot::Snapshot;
use crate::parsers::page::parse_sign_page;
use crate::services::http::PageFetcher;
use crate::services::{encoding, format};

/// Fetch, decode and parse one sign page.
pub async fn fetch_sign(
    fetcher: &dyn PageFetcher,
    base_url: &str,
    slug: &str,
    name: &str,
) -> Result<SignRecord, RefreshError> {
    let url = sign_url(base_url, slug);

    let page = fetcher
        .fetch(&url)
        .await
        .map_err(|source| RefreshError::Fetch {
            slug: slug.to_string(),
            source,
        })?;

    let html = encoding::resolve(&page.bytes, page.charset.as_deref());
    tracing::debug!(slug, bytes = page.bytes.len(), charset = ?page.charset, "decoded sign page");

    Ok(parse_sign_page(slug, name, &url, &html))
}

/// One refresh cycle over all signs, concurrently. Any failing sign fails
/// the whole cycle; there is no partial snapshot.
pub async fn run(fetcher: &dyn PageFetcher, base_url: &str) -> Result<Snapshot, RefreshError> {
    let tasks = SIGNS
        .iter()
        .map(|(slug, name)| fetch_sign(fetcher, base_url, slug, name));

    let records = try_join_all(tasks).await?;
    let formatted = format::format_all(&records);

    Ok(Snapshot::new(Local::now(), records, formatted))
}
