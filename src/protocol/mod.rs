use std::path::PathBuf;
use std::str::FromStr;

use horoskop_core::model::snapshot::View;
use horoskop_core::services::encoding;
use serde_json::{json, Value};

mod command;
mod registry;
use command::Command;
pub use registry::Registry;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> &Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn get_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

pub fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

pub async fn handle(registry: &Registry, input: &str) -> String {
    let req: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => {
            return json!({
                "status": "error",
                "message": "invalid json"
            })
            .to_string();
        }
    };

    let id = get_id(&req);
    let payload = get_payload(&req);

    match Command::from(get_cmd(&req)) {
        Command::Ping => ok(id, json!({ "message": "horoskop-core alive" })),

        Command::Instances => {
            let instances: Vec<Value> = registry
                .instances()
                .iter()
                .map(|i| json!({ "name": i.name(), "schedule": i.schedule().describe() }))
                .collect();
            ok(id, json!({ "instances": instances }))
        }

        Command::Refresh => {
            let instance = match registry.resolve(get_str(payload, "instance")) {
                Ok(i) => i,
                Err(e) => return err(id, e),
            };
            match instance.refresh().await {
                Ok(snapshot) => ok(
                    id,
                    json!({
                        "instance": instance.name(),
                        "generated_at": snapshot.generated_at.to_rfc3339(),
                        "signs": snapshot.signs.len(),
                        "fingerprint": snapshot.fingerprint,
                    }),
                ),
                Err(e) => err(id, e.to_string()),
            }
        }

        Command::Translate => {
            let instance = match registry.resolve(get_str(payload, "instance")) {
                Ok(i) => i,
                Err(e) => return err(id, e),
            };
            let attempt = instance.start_translation().await;
            ok(id, json!({ "instance": instance.name(), "attempt": attempt }))
        }

        Command::View => {
            let instance = match registry.resolve(get_str(payload, "instance")) {
                Ok(i) => i,
                Err(e) => return err(id, e),
            };
            let Some(name) = get_str(payload, "view") else {
                return err(id, "payload.view is required");
            };
            match View::from_str(name) {
                Ok(view) => ok(id, instance.view(view).await),
                Err(e) => err(id, e),
            }
        }

        Command::Snapshot => {
            let instance = match registry.resolve(get_str(payload, "instance")) {
                Ok(i) => i,
                Err(e) => return err(id, e),
            };
            match instance.snapshot().await {
                Some(snapshot) => ok(id, snapshot.payload()),
                None => err(id, "no snapshot yet"),
            }
        }

        Command::DetectEncoding => {
            let Some(path) = get_str(payload, "path") else {
                return err(id, "payload.path is required");
            };
            let path = PathBuf::from(path);
            match encoding::detect_from_file(&path, get_str(payload, "charset")) {
                Ok(result) => ok(id, serde_json::to_value(result).unwrap_or(json!({}))),
                Err(e) => err(id, e.to_string()),
            }
        }

        Command::Unknown => err(id, "unknown command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use horoskop_core::error::FetchError;
    use horoskop_core::model::config::InstanceSettings;
    use horoskop_core::services::http::{FetchedPage, PageFetcher};
    use horoskop_core::services::instance::Instance;
    use std::sync::Arc;

    struct StaticPage;

    #[async_trait]
    impl PageFetcher for StaticPage {
        async fn fetch(&self, _url: &str) -> Result<FetchedPage, FetchError> {
            Ok(FetchedPage {
                bytes: b"<h3>Dnevni horoskop</h3><p>Dan.</p>".to_vec(),
                charset: None,
            })
        }
    }

    fn registry(names: &[&str]) -> Registry {
        let fetcher = Arc::new(StaticPage);
        let instances = names
            .iter()
            .map(|name| {
                let settings = InstanceSettings {
                    name: name.to_string(),
                    ..Default::default()
                };
                Arc::new(Instance::new(&settings, "https://x.test", fetcher.clone(), None))
            })
            .collect();
        Registry::new(instances)
    }

    async fn call(reg: &Registry, req: Value) -> Value {
        serde_json::from_str(&handle(reg, &req.to_string()).await).unwrap()
    }

    #[tokio::test]
    async fn ping_and_invalid_json() {
        let reg = registry(&["default"]);
        let resp = call(&reg, json!({ "id": 1, "cmd": "ping" })).await;
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["id"], 1);

        let resp: Value = serde_json::from_str(&handle(&reg, "{nope").await).unwrap();
        assert_eq!(resp["message"], "invalid json");

        let resp = call(&reg, json!({ "id": 2, "cmd": "dance" })).await;
        assert_eq!(resp["message"], "unknown command");
    }

    #[tokio::test]
    async fn refresh_then_views() {
        let reg = registry(&["default"]);
        let resp = call(&reg, json!({ "id": 1, "cmd": "refresh" })).await;
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["payload"]["signs"], 12);

        let resp = call(
            &reg,
            json!({ "id": 2, "cmd": "view", "payload": { "view": "dnevni_formatted" } }),
        )
        .await;
        assert_eq!(resp["payload"]["data"].as_object().unwrap().len(), 12);

        let resp = call(
            &reg,
            json!({ "id": 3, "cmd": "view", "payload": { "view": "tjedni_translated" } }),
        )
        .await;
        assert_eq!(resp["payload"]["data"], Value::Null);

        let resp = call(&reg, json!({ "id": 4, "cmd": "snapshot" })).await;
        assert_eq!(resp["payload"]["attribution"], "Data by ehoroskop.net");
    }

    #[tokio::test]
    async fn translate_reports_attempt_and_records_error() {
        let reg = registry(&["default"]);
        call(&reg, json!({ "cmd": "refresh" })).await;

        let resp = call(&reg, json!({ "cmd": "translate" })).await;
        assert_eq!(resp["payload"]["attempt"], 1);

        let instance = reg.resolve(None).unwrap().clone();
        for _ in 0..50 {
            if instance.translation_state().await.status.as_str() == "error" {
                break;
            }
            tokio::task::yield_now().await;
        }
        let resp = call(
            &reg,
            json!({ "cmd": "view", "payload": { "view": "translation_status" } }),
        )
        .await;
        assert_eq!(resp["payload"]["state"], "error");
        assert_eq!(resp["payload"]["error_message"], "No text-generation service available.");
    }

    #[tokio::test]
    async fn several_instances_need_a_name() {
        let reg = registry(&["home", "office"]);
        let resp = call(&reg, json!({ "cmd": "refresh" })).await;
        assert_eq!(resp["status"], "error");

        let resp = call(&reg, json!({ "cmd": "refresh", "payload": { "instance": "office" } })).await;
        assert_eq!(resp["payload"]["instance"], "office");

        let resp = call(&reg, json!({ "cmd": "snapshot", "payload": { "instance": "home" } })).await;
        assert_eq!(resp["message"], "no snapshot yet");

        let resp = call(&reg, json!({ "cmd": "view", "payload": { "instance": "x", "view": "dnevni_raw" } })).await;
        assert_eq!(resp["message"], "unknown instance `x`");
    }

    #[tokio::test]
    async fn view_validation() {
        let reg = registry(&["default"]);
        let resp = call(&reg, json!({ "cmd": "view" })).await;
        assert_eq!(resp["message"], "payload.view is required");
        let resp = call(&reg, json!({ "cmd": "view", "payload": { "view": "weekly" } })).await;
        assert_eq!(resp["message"], "unknown view `weekly`");
    }

    #[tokio::test]
    async fn detect_encoding_requires_path() {
        let reg = registry(&["default"]);
        let resp = call(&reg, json!({ "cmd": "detect_encoding" })).await;
        assert_eq!(resp["message"], "payload.path is required");
    }
}
