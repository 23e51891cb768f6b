use thiserror::Error;

/// Data errors raised while turning a snapshot into a report.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("metric {label} is a percentage of {reference}, which was never recorded")]
    MissingReference { label: String, reference: String },

    #[error("metric {label} was recorded with conflicting combinators")]
    CombinatorMismatch { label: String },

    #[error("failed to decode {kind} object")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot must be a list object with items or a JSON array")]
    MalformedSnapshot,
}
