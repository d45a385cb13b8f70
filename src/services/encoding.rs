use std::borrow::Cow;
use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, ISO_8859_2, UTF_8, WINDOWS_1250, WINDOWS_1252};
use serde::Serialize;

/// Letters that only decode correctly under the right codepage.
const DIACRITICS: &str = "čćžšđČĆŽŠĐ";

/// What UTF-8 encoded diacritics turn into when read as a Western codepage.
const MOJIBAKE_MARKERS: [char; 5] = ['Ã', 'Ä', 'Å', 'Ĺ', '\u{FFFD}'];

pub fn is_c1_control(ch: char) -> bool {
    ('\u{80}'..='\u{9f}').contains(&ch)
}

/// `+3` per expected diacritic, `-4` per mojibake marker or C1 control.
///
/// This is a preference heuristic over a fixed candidate list, not encoding
/// detection: a text with very few diacritics can score the same under
/// several codepages.
pub fn score(text: &str) -> i64 {
    text.chars().fold(0, |acc, ch| {
        if DIACRITICS.contains(ch) {
            acc + 3
        } else if MOJIBAKE_MARKERS.contains(&ch) || is_c1_control(ch) {
            acc - 4
        } else {
            acc
        }
    })
}

/// Highest scoring candidate; on a tie the earliest one wins.
pub fn pick_best<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut best: Option<(i64, String)> = None;
    for candidate in candidates {
        let s = score(&candidate);
        match &best {
            Some((top, _)) if *top >= s => {}
            _ => best = Some((s, candidate)),
        }
    }
    best.map(|(_, text)| text)
}

/// Single-byte and UTF-8 codecs used by the resolver and the repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Whatwg(&'static Encoding),
    /// Every byte maps to the code point of the same value. WHATWG folds
    /// `latin1` into windows-1252, so this one is handled separately.
    Latin1,
}

impl Codec {
    pub const WINDOWS_1252: Codec = Codec::Whatwg(WINDOWS_1252);
    pub const WINDOWS_1250: Codec = Codec::Whatwg(WINDOWS_1250);

    pub fn name(self) -> &'static str {
        match self {
            Codec::Whatwg(enc) => enc.name(),
            Codec::Latin1 => "latin-1",
        }
    }

    /// Strict decode; `None` on any malformed sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Codec::Whatwg(enc) => enc
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
            Codec::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }

    /// Strict encode; `None` if any character is unmappable.
    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            Codec::Whatwg(enc) => {
                let (bytes, used, had_errors) = enc.encode(text);
                if had_errors || used != enc {
                    None
                } else {
                    Some(bytes.into_owned())
                }
            }
            Codec::Latin1 => {
                if encoding_rs::mem::is_str_latin1(text) {
                    Some(encoding_rs::mem::encode_latin1_lossy(text).into_owned())
                } else {
                    None
                }
            }
        }
    }
}

/// UTF-8 first, then the declared charset, then the Central-European
/// fallbacks and finally latin-1.
pub fn candidate_codecs(declared: Option<&str>) -> Vec<Codec> {
    let mut codecs = vec![Codec::Whatwg(UTF_8)];

    if let Some(label) = declared.map(str::trim).filter(|l| !l.is_empty()) {
        match Encoding::for_label(label.as_bytes()) {
            Some(enc) if enc != UTF_8 => codecs.push(Codec::Whatwg(enc)),
            Some(_) => {}
            None => tracing::debug!(charset = label, "unknown declared charset, skipping"),
        }
    }

    codecs.extend([
        Codec::Whatwg(WINDOWS_1250),
        Codec::Whatwg(ISO_8859_2),
        Codec::Latin1,
    ]);
    codecs
}

/// Decode a page body into the best scoring string.
///
/// Never fails: when no candidate decodes, the bytes are read as UTF-8 with
/// replacement characters.
pub fn resolve(bytes: &[u8], declared: Option<&str>) -> String {
    let decoded = candidate_codecs(declared)
        .into_iter()
        .filter_map(|codec| codec.decode(bytes));

    match pick_best(decoded) {
        Some(text) => text,
        None => UTF_8.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

#[derive(Debug, Serialize)]
pub struct EncodingCandidate {
    pub name: String,
    /// `None` when the bytes are not valid under this codec.
    pub score: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EncodingDetectionResult {
    pub best: String,
    pub candidates: Vec<EncodingCandidate>,
    /// Independent statistical guess, reported for comparison only.
    pub detector_guess: String,
}

pub fn inspect(bytes: &[u8], declared: Option<&str>) -> EncodingDetectionResult {
    let mut candidates = Vec::new();
    let mut best: Option<(i64, &'static str)> = None;

    for codec in candidate_codecs(declared) {
        let score = codec.decode(bytes).map(|text| score(&text));
        if let Some(s) = score {
            match best {
                Some((top, _)) if top >= s => {}
                _ => best = Some((s, codec.name())),
            }
        }
        candidates.push(EncodingCandidate {
            name: codec.name().to_string(),
            score,
        });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);

    EncodingDetectionResult {
        best: best
            .map(|(_, name)| name)
            .unwrap_or_else(|| UTF_8.name())
            .to_string(),
        candidates,
        detector_guess: guess.name().to_string(),
    }
}

pub fn detect_from_file(path: &Path, declared: Option<&str>) -> std::io::Result<EncodingDetectionResult> {
    let bytes = fs::read(path)?;
    Ok(inspect(&bytes, declared))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Čeka vas ćud, žar, šarm i đir. LJUBAV: čuvajte se.";

    fn encode(enc: &'static Encoding, text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = enc.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn recovers_text_from_every_legacy_encoding() {
        for enc in [WINDOWS_1250, ISO_8859_2] {
            let bytes = encode(enc, SAMPLE);
            assert_eq!(resolve(&bytes, None), SAMPLE, "encoding {}", enc.name());
        }
    }

    #[test]
    fn prefers_utf8_when_valid() {
        assert_eq!(resolve(SAMPLE.as_bytes(), Some("windows-1250")), SAMPLE);
    }

    #[test]
    fn misleading_declared_charset_does_not_win() {
        let bytes = encode(WINDOWS_1250, SAMPLE);
        assert_eq!(resolve(&bytes, Some("iso-8859-1")), SAMPLE);
    }

    #[test]
    fn unknown_charset_is_skipped() {
        let bytes = encode(ISO_8859_2, SAMPLE);
        assert_eq!(resolve(&bytes, Some("no-such-charset")), SAMPLE);
        assert_eq!(candidate_codecs(Some("no-such-charset")).len(), 4);
    }

    #[test]
    fn ascii_ties_resolve_to_utf8() {
        let report = inspect(b"plain ascii page", None);
        assert_eq!(report.best, "UTF-8");
        assert!(report.candidates.iter().all(|c| c.score == Some(0)));
    }

    #[test]
    fn score_penalizes_markers_and_c1() {
        assert_eq!(score("čć"), 6);
        assert_eq!(score("Ã\u{85}"), -8);
        assert_eq!(score("abc"), 0);
    }

    #[test]
    fn pick_best_keeps_first_of_equal_scores() {
        let best = pick_best(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(best.as_deref(), Some("first"));
        assert_eq!(pick_best(Vec::<String>::new()), None);
    }

    #[test]
    fn inspect_reports_invalid_utf8_as_unscored() {
        let bytes = encode(WINDOWS_1250, SAMPLE);
        let report = inspect(&bytes, None);
        assert_eq!(report.candidates[0].name, "UTF-8");
        assert_eq!(report.candidates[0].score, None);
        assert_eq!(report.best, "windows-1250");
    }

    #[test]
    fn latin1_codec_round_trips_bytes() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = Codec::Latin1.decode(&bytes).unwrap();
        assert_eq!(Codec::Latin1.encode(&text).unwrap(), bytes);
        assert_eq!(Codec::Latin1.encode("č"), None);
    }
}
