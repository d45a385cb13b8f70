use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Failed to fetch horoskop data for `{slug}`: {source}")]
    Fetch {
        slug: String,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid AI response: missing choices[0].message.content")]
    MissingContent,

    #[error("Unsupported provider `{0}`")]
    UnsupportedProvider(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("No text-generation service available.")]
    NoService,

    #[error("No source data available for translation.")]
    NoSource,

    #[error("Empty translation response: {0}")]
    EmptyResponse(String),

    #[error("Translation output is not JSON.")]
    NotJson,

    #[error("Translation output does not match the expected shape: {0}")]
    Shape(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
