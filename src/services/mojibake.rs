//! Recovery of text that was UTF-8 on the wire but got decoded with a
//! legacy single-byte codepage somewhere upstream.

use crate::services::encoding::{pick_best, Codec};

const REPAIR_CODECS: [Codec; 3] = [Codec::Latin1, Codec::WINDOWS_1252, Codec::WINDOWS_1250];

/// Re-encode with each legacy codepage, re-read as UTF-8, keep the best
/// scoring variant. The input itself is the first candidate, so text that is
/// already correct comes back unchanged.
pub fn repair(text: &str) -> String {
    let repaired = REPAIR_CODECS.iter().filter_map(|codec| {
        let bytes = codec.encode(text)?;
        String::from_utf8(bytes).ok()
    });

    pick_best(std::iter::once(text.to_string()).chain(repaired))
        .unwrap_or_else(|| text.to_string())
}
