use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::{RefreshError, TranslationError};
use crate::model::config::InstanceSettings;
use crate::model::snapshot::{Snapshot, View};
use crate::model::translation::TranslationState;
use crate::services::ai::TextGenerator;
use crate::services::http::PageFetcher;
use crate::services::pipeline;
use crate::services::schedule::{self, Schedule};
use crate::services::translation::{TranslationCoordinator, TranslationOutcome};

/// One managed pipeline: the latest good snapshot plus its translation
/// coordinator. Refresh failures leave the previous snapshot in place.
pub struct Instance {
    name: String,
    base_url: String,
    schedule: Schedule,
    translation_enabled: bool,
    fetcher: Arc<dyn PageFetcher>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    translator: TranslationCoordinator,
}

impl Instance {
    pub fn new(
        settings: &InstanceSettings,
        base_url: impl Into<String>,
        fetcher: Arc<dyn PageFetcher>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self {
            name: settings.name.clone(),
            base_url: base_url.into(),
            schedule: Schedule::from_settings(settings),
            translation_enabled: settings.translation_enabled,
            fetcher,
            snapshot: RwLock::new(None),
            translator: TranslationCoordinator::new(
                generator,
                settings.translation_language.clone(),
                settings.translation_target.clone(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().await.clone()
    }

    pub async fn translation_state(&self) -> TranslationState {
        self.translator.state().await
    }

    /// Run one refresh cycle and publish its snapshot. Starts a background
    /// translation afterwards when enabled.
    pub async fn refresh(self: &Arc<Self>) -> Result<Arc<Snapshot>, RefreshError> {
        let snapshot = match pipeline::run(self.fetcher.as_ref(), &self.base_url).await {
            Ok(s) => Arc::new(s),
            Err(err) => {
                tracing::error!(instance = %self.name, error = %err, "refresh failed, keeping last snapshot");
                return Err(err);
            }
        };

        *self.snapshot.write().await = Some(snapshot.clone());
        tracing::info!(
            instance = %self.name,
            signs = snapshot.signs.len(),
            fingerprint = %snapshot.fingerprint,
            "refresh done"
        );

        if self.translation_enabled {
            self.start_translation().await;
        }

        Ok(snapshot)
    }

    /// Translate the current snapshot and wait for the outcome.
    pub async fn translate(&self) -> Result<TranslationOutcome, TranslationError> {
        let attempt = self.translator.begin().await;
        self.finish_translation(attempt).await
    }

    /// Begin a translation attempt and run it in the background. Returns the
    /// attempt number; the outcome lands in the translation state.
    pub async fn start_translation(self: &Arc<Self>) -> u64 {
        let attempt = self.translator.begin().await;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are already recorded in the translation state.
            let _ = this.finish_translation(attempt).await;
        });
        attempt
    }

    async fn finish_translation(&self, attempt: u64) -> Result<TranslationOutcome, TranslationError> {
        let source = self.snapshot().await;
        let outcome = self.translator.complete(attempt, source).await?;
        if let TranslationOutcome::Translated(merged) = &outcome {
            self.publish_translation(merged).await;
        }
        Ok(outcome)
    }

    /// Swap in the merged copy, unless a refresh replaced the snapshot it was
    /// built from.
    async fn publish_translation(&self, merged: &Snapshot) {
        let mut current = self.snapshot.write().await;
        match current.as_ref() {
            Some(snapshot) if snapshot.same_cycle(merged) => {
                *current = Some(Arc::new(merged.clone()));
            }
            _ => {
                tracing::warn!(instance = %self.name, "snapshot changed during translation, dropping result");
            }
        }
    }

    pub async fn view(&self, view: View) -> Value {
        match view {
            View::TranslationStatus => self.translation_state().await.view(),
            View::Payload(kind, period) => match self.snapshot().await {
                Some(snapshot) => snapshot.view(kind, period),
                None => json!({
                    "state": Value::Null,
                    "data": Value::Null,
                    "source_urls": {},
                    "attribution": crate::model::sign::ATTRIBUTION,
                }),
            },
        }
    }

    /// Scheduled refreshes in a background task. Abort the handle to stop.
    pub fn spawn_schedule(self: &Arc<Self>) -> JoinHandle<()> {
        tracing::info!(instance = %self.name, schedule = %self.schedule.describe(), "refresh schedule enabled");
        let this = Arc::clone(self);
        let schedule = self.schedule.clone();
        tokio::spawn(schedule::run(schedule, move || {
            let this = Arc::clone(&this);
            async move {
                let _ = this.refresh().await;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, GenerationError};
    use crate::model::sign::Period;
    use crate::model::snapshot::ViewKind;
    use crate::model::translation::TranslationStatus;
    use crate::services::ai_types::GenerationRequest;
    use crate::services::http::FetchedPage;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PAGE: &str = "<h3>Ovan - Dnevni horoskop</h3><p>Dobar dan.</p>";

    struct Switchable {
        failing: AtomicBool,
    }

    #[async_trait]
    impl PageFetcher for Switchable {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
            Ok(FetchedPage {
                bytes: PAGE.as_bytes().to_vec(),
                charset: Some("utf-8".into()),
            })
        }
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, _request: &GenerationRequest) -> Result<Value, GenerationError> {
            Ok(json!({ "text": "{\"dnevni\": {\"ovan\": \"Good day.\"}}" }))
        }
    }

    fn instance(generator: Option<Arc<dyn TextGenerator>>) -> (Arc<Instance>, Arc<Switchable>) {
        let fetcher = Arc::new(Switchable {
            failing: AtomicBool::new(false),
        });
        let settings = InstanceSettings::default();
        let inst = Instance::new(&settings, "https://x.test", fetcher.clone(), generator);
        (Arc::new(inst), fetcher)
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_snapshot() {
        let (inst, fetcher) = instance(None);
        let first = inst.refresh().await.unwrap();

        fetcher.failing.store(true, Ordering::SeqCst);
        assert_matches!(inst.refresh().await, Err(RefreshError::Fetch { .. }));

        let current = inst.snapshot().await.unwrap();
        assert!(current.same_cycle(&first));
    }

    #[tokio::test]
    async fn views_before_first_refresh_are_empty() {
        let (inst, _) = instance(None);
        let view = inst.view(View::Payload(ViewKind::Formatted, Period::Daily)).await;
        assert_eq!(view["data"], Value::Null);
        assert_eq!(inst.view(View::TranslationStatus).await["state"], "idle");
    }

    #[tokio::test]
    async fn translation_publishes_into_current_snapshot() {
        let (inst, _) = instance(Some(Arc::new(Echo)));
        inst.refresh().await.unwrap();
        assert_eq!(
            inst.view(View::Payload(ViewKind::Translated, Period::Daily)).await["data"],
            Value::Null
        );

        assert_matches!(inst.translate().await, Ok(TranslationOutcome::Translated(_)));
        let view = inst.view(View::Payload(ViewKind::Translated, Period::Daily)).await;
        assert_eq!(view["data"]["ovan"], "Good day.");
        assert_eq!(view["attribution"], "Data by ehoroskop.net");
    }

    #[tokio::test]
    async fn translation_without_service_records_error() {
        let (inst, _) = instance(None);
        inst.refresh().await.unwrap();

        assert_matches!(inst.translate().await, Err(TranslationError::NoService));
        let state = inst.translation_state().await;
        assert_eq!(state.status, TranslationStatus::Error);
        assert!(inst.snapshot().await.unwrap().translated.is_none());
    }
}
