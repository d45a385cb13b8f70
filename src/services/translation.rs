//! Translation cycle: prompt the text generator with the formatted snapshot,
//! coerce whatever comes back into the three period mappings, and merge them
//! into a copy of the snapshot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Local;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::error::TranslationError;
use crate::model::sign::Period;
use crate::model::snapshot::{Snapshot, TranslatedTexts};
use crate::model::translation::{TranslationState, TranslationStatus};
use crate::services::ai::TextGenerator;
use crate::services::ai_types::GenerationRequest;

pub const TASK_NAME: &str = "horoskop_translate";

const TEXT_FIELDS: [&str; 7] = [
    "text",
    "response",
    "result",
    "content",
    "output",
    "generated_text",
    "answer",
];

fn first_text_field(map: &Map<String, Value>) -> Option<String> {
    TEXT_FIELDS.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// Pull the generated text out of an arbitrary response value. Empty when
/// nothing usable is found.
pub fn extract_text(resp: &Value) -> String {
    match resp {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => {
            if let Some(text) = first_text_field(map) {
                return text;
            }
            match map.get("data") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Object(data)) => first_text_field(data).unwrap_or_default(),
                _ => String::new(),
            }
        }
        _ => String::new(),
    }
}

/// Strict parse, then one retry on the span from the first `{` to the last
/// `}`. Nothing beyond that.
pub fn parse_json(text: &str) -> Result<Value, TranslationError> {
    let stripped = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Ok(value);
    }

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&stripped[start..=end]).map_err(|_| TranslationError::NotJson)
        }
        _ => Err(TranslationError::NotJson),
    }
}

/// The three period mappings; a missing or null period is empty, extra keys
/// are ignored.
pub fn coerce_translations(parsed: &Value) -> Result<TranslatedTexts, TranslationError> {
    let Value::Object(root) = parsed else {
        return Err(TranslationError::Shape("expected a JSON object".into()));
    };

    let mut out = TranslatedTexts::default();
    for period in Period::ALL {
        let entries: BTreeMap<String, Value> = match root.get(period.key()) {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(_) => {
                return Err(TranslationError::Shape(format!(
                    "`{}` is not an object",
                    period.key()
                )))
            }
        };
        *out.get_mut(period) = entries;
    }
    Ok(out)
}

pub fn build_prompt(source: &Snapshot, language: &str) -> String {
    let compact = json!({
        "dnevni": source.formatted.daily,
        "tjedni": source.formatted.weekly,
        "mjesecni": source.formatted.monthly,
    });

    let mut p = String::new();
    p.push_str(&format!(
        "Translate the following horoscope texts to language code '{language}'.\n"
    ));
    p.push_str("Return strictly valid JSON only. Keep original keys and structure exactly:\n");
    p.push_str("{'dnevni': {'slug': 'text'}, 'tjedni': {'slug': 'text'}, 'mjesecni': {'slug': 'text'}}.\n");
    p.push_str("Do not add markdown, comments, or extra keys.\n\n");
    p.push_str("INPUT_JSON:\n");
    p.push_str(&compact.to_string());
    p
}

fn snippet(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

#[derive(Debug)]
pub enum TranslationOutcome {
    /// Merged copy of the source snapshot.
    Translated(Snapshot),
    /// A newer attempt started while this one was running; its result was
    /// dropped without touching the state.
    Superseded,
}

/// Owns [`TranslationState`]. Attempts are numbered; only the latest one may
/// record its outcome.
pub struct TranslationCoordinator {
    generator: Option<Arc<dyn TextGenerator>>,
    language: String,
    target: Option<String>,
    state: RwLock<TranslationState>,
    attempts: AtomicU64,
}

impl TranslationCoordinator {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        language: impl Into<String>,
        target: Option<String>,
    ) -> Self {
        Self {
            generator,
            language: language.into(),
            target,
            state: RwLock::new(TranslationState::default()),
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> TranslationState {
        self.state.read().await.clone()
    }

    pub async fn translate(
        &self,
        source: Option<Arc<Snapshot>>,
    ) -> Result<TranslationOutcome, TranslationError> {
        let attempt = self.begin().await;
        self.complete(attempt, source).await
    }

    /// Take the next attempt number and enter `translating`. The number is
    /// drawn under the state lock, so attempts enter in number order.
    pub async fn begin(&self) -> u64 {
        let mut state = self.state.write().await;
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        state.status = TranslationStatus::Translating;
        state.last_attempt = Some(Local::now());
        state.error_message = None;
        state.language = Some(self.language.clone());
        tracing::info!(attempt, language = %self.language, "translation started");

        attempt
    }

    /// Run a begun attempt to completion. The outcome is recorded only if no
    /// newer attempt has begun meanwhile.
    pub async fn complete(
        &self,
        attempt: u64,
        source: Option<Arc<Snapshot>>,
    ) -> Result<TranslationOutcome, TranslationError> {
        let result = self.run(source.as_deref()).await;

        let mut state = self.state.write().await;
        if self.attempts.load(Ordering::SeqCst) != attempt {
            tracing::warn!(attempt, "translation superseded by a newer attempt, discarding result");
            return Ok(TranslationOutcome::Superseded);
        }

        match result {
            Ok(merged) => {
                state.status = TranslationStatus::Done;
                state.last_success = Some(Local::now());
                state.error_message = None;
                tracing::info!(attempt, fingerprint = %merged.fingerprint, "translation done");
                Ok(TranslationOutcome::Translated(merged))
            }
            Err(err) => {
                state.status = TranslationStatus::Error;
                state.error_message = Some(err.to_string());
                tracing::error!(attempt, error = %err, "Horoskop translation failed");
                Err(err)
            }
        }
    }

    async fn run(&self, source: Option<&Snapshot>) -> Result<Snapshot, TranslationError> {
        let source = source.ok_or(TranslationError::NoSource)?;
        let generator = self.generator.as_ref().ok_or(TranslationError::NoService)?;

        let request = GenerationRequest {
            task_name: TASK_NAME.to_string(),
            instructions: build_prompt(source, &self.language),
            target: self.target.clone(),
        };

        let resp = generator.generate(&request).await?;
        let raw = extract_text(&resp);
        if raw.is_empty() {
            return Err(TranslationError::EmptyResponse(snippet(&resp)));
        }

        let parsed = parse_json(&raw)?;
        let translated = coerce_translations(&parsed)?;
        Ok(source.with_translations(translated))
    }
}
