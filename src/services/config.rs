use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ConfigError, GenerationError};
use crate::model::config::{
    InstanceSettings, Settings, MAX_RETRIES, MAX_TIMEOUT_SECS, MAX_UPDATE_INTERVAL, MIN_UPDATE_INTERVAL,
};
use crate::services::ai::{endpoint_for, ChatCompletionsGenerator, TextGenerator};

pub const CONFIG_ENV: &str = "HOROSKOP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "horoskop.toml";

/// Config file to read: the explicit path (flag or env var, resolved by the
/// CLI), else `./horoskop.toml` when it exists.
pub fn resolve_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

/// Load and validate settings. `None` means built-in defaults.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), "loaded config file");
            parse(&text, path)?
        }
        None => Settings::default(),
    };
    finalize(settings)
}

pub fn parse(text: &str, path: &Path) -> Result<Settings, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Fill in the default instance and check the invariants.
pub fn finalize(mut settings: Settings) -> Result<Settings, ConfigError> {
    if settings.instances.is_empty() {
        settings.instances.push(InstanceSettings::default());
    }

    if !(1..=MAX_TIMEOUT_SECS).contains(&settings.http.timeout_secs) {
        return Err(ConfigError::Invalid(format!(
            "http.timeout_secs must be within 1..={MAX_TIMEOUT_SECS}, got {}",
            settings.http.timeout_secs
        )));
    }
    if settings.http.max_retries > MAX_RETRIES {
        return Err(ConfigError::Invalid(format!(
            "http.max_retries must be at most {MAX_RETRIES}, got {}",
            settings.http.max_retries
        )));
    }

    let mut names = BTreeSet::new();
    for instance in &settings.instances {
        let name = instance.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("instance name must not be empty".into()));
        }
        if !names.insert(name.to_string()) {
            return Err(ConfigError::Invalid(format!("duplicate instance name `{name}`")));
        }
        if !(MIN_UPDATE_INTERVAL..=MAX_UPDATE_INTERVAL).contains(&instance.update_interval) {
            return Err(ConfigError::Invalid(format!(
                "instance `{name}`: update_interval must be within {MIN_UPDATE_INTERVAL}..={MAX_UPDATE_INTERVAL} seconds, got {}",
                instance.update_interval
            )));
        }
    }

    if let Some(generator) = &settings.generator {
        if generator.endpoint.is_none() {
            endpoint_for(&generator.provider).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
    }

    Ok(settings)
}

/// The text-generation service, if one is configured and has a key.
pub fn build_generator(settings: &Settings) -> Result<Option<Arc<dyn TextGenerator>>, ConfigError> {
    let Some(generator) = &settings.generator else {
        tracing::info!("no generator configured, translation disabled");
        return Ok(None);
    };

    match ChatCompletionsGenerator::from_env(generator) {
        Ok(Some(client)) => Ok(Some(Arc::new(client))),
        Ok(None) => {
            tracing::warn!(env = %generator.api_key_env, "generator API key not set, translation disabled");
            Ok(None)
        }
        Err(GenerationError::UnsupportedProvider(p)) => {
            Err(ConfigError::Invalid(format!("unsupported provider `{p}`")))
        }
        Err(e) => Err(ConfigError::Invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse_str(text: &str) -> Result<Settings, ConfigError> {
        parse(text, Path::new("test.toml")).and_then(finalize)
    }

    #[test]
    fn empty_file_gives_one_default_instance() {
        let settings = parse_str("").unwrap();
        assert_eq!(settings.instances.len(), 1);
        assert_eq!(settings.instances[0].name, "default");
        assert_eq!(settings.instances[0].scheduled_times, "00:00,08:00");
        assert_eq!(settings.http.base_url, "https://ehoroskop.net");
        assert_eq!(settings.http.timeout_secs, 30);
        assert!(settings.generator.is_none());
    }

    #[test]
    fn reads_instances_and_generator() {
        let settings = parse_str(
            r#"
            [http]
            timeout_secs = 10

            [generator]
            provider = "deepseek"
            model = "deepseek-chat"

            [[instance]]
            name = "home"
            use_scheduled_refresh = false
            update_interval = 600
            translation_enabled = true
            translation_language = "de"

            [[instance]]
            name = "office"
            "#,
        )
        .unwrap();

        assert_eq!(settings.http.timeout_secs, 10);
        assert_eq!(settings.http.max_retries, 2);
        let gen = settings.generator.unwrap();
        assert_eq!(gen.provider, "deepseek");
        assert_eq!(gen.api_key_env, "OPENAI_API_KEY");
        assert_eq!(settings.instances.len(), 2);
        assert_eq!(settings.instances[0].translation_language, "de");
        assert!(!settings.instances[1].translation_enabled);
    }

    #[test]
    fn rejects_out_of_range_interval() {
        let err = parse_str("[[instance]]\nupdate_interval = 60\n").unwrap_err();
        assert_matches!(err, ConfigError::Invalid(msg) if msg.contains("update_interval"));
        assert!(parse_str("[[instance]]\nupdate_interval = 86400\n").is_ok());
    }

    #[test]
    fn rejects_out_of_range_http_settings() {
        let err = parse_str("[http]\ntimeout_secs = 0\n").unwrap_err();
        assert_matches!(err, ConfigError::Invalid(msg) if msg.contains("timeout_secs"));
        let err = parse_str("[http]\nmax_retries = 1000\n").unwrap_err();
        assert_matches!(err, ConfigError::Invalid(msg) if msg.contains("max_retries"));
        assert!(parse_str("[http]\ntimeout_secs = 300\nmax_retries = 10\n").is_ok());
        assert!(parse_str("[http]\nmax_retries = 0\n").is_ok());
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = parse_str("[[instance]]\nname = \"a\"\n[[instance]]\nname = \"a\"\n").unwrap_err();
        assert_matches!(err, ConfigError::Invalid(_));
    }

    #[test]
    fn rejects_unknown_provider_without_endpoint() {
        assert_matches!(
            parse_str("[generator]\nprovider = \"acme\"\n"),
            Err(ConfigError::Invalid(_))
        );
        assert!(parse_str("[generator]\nprovider = \"acme\"\nendpoint = \"http://localhost:1/v1\"\n").is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert_matches!(parse_str("[[instance]\n"), Err(ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/nonexistent/custom.toml");
        assert_eq!(resolve_path(Some(path.clone())), Some(path.clone()));
        assert_matches!(load(Some(&path)), Err(ConfigError::Io { .. }));
    }
}
