use thiserror::Error;

/// Errors that can occur while classifying, compressing or enveloping raw events.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no raw events supplied")]
    NoEvents,

    #[error("MIME type is not set")]
    MissingMime,

    #[error("unknown MIME type '{0}'")]
    UnknownMime(String),

    #[error("all events are already enveloped")]
    AlreadyEnveloped,

    #[error("XML input contains no convertible <Event> fragments")]
    NoXmlEvents,

    #[error("cannot parse raw JSON event: {0}")]
    RawEventParse(String),

    #[error("test code parse error: {0}")]
    TestCode(String),

    #[error("test code is empty")]
    EmptyTestCode,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
