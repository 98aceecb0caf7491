use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("LLM response contained no choices")]
    EmptyResponse,

    #[error("LLM response contained no JSON object")]
    NoJson,

    #[error("AI editing is not configured")]
    NotConfigured,

    #[error("{0}")]
    Rejected(String),
}
