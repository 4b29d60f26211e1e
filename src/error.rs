//! Error taxonomy for the parse/normalize/emit pipeline.
//!
//! Per-item failures (`ParseError`, `FetchError`) are recoverable: callers
//! skip the offending item and continue. `TemplateError` aborts the whole
//! emission. `CapabilityMismatch` is deliberately not part of this enum —
//! it is not an error, just a silently-skipped node (see `Diagnostic`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized link scheme: {0}")]
    UnknownScheme(String),
    #[error("malformed base64 payload")]
    InvalidBase64,
    #[error("malformed JSON payload: {0}")]
    InvalidJson(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("link has fewer than {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("base template is not valid YAML: {0}")]
    InvalidYaml(String),
    #[error("base template is not valid INI: {0}")]
    InvalidIni(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unrecognized subscription container shape")]
    UnrecognizedShape,
    #[error("local file not authorized: {0}")]
    NotAuthorized(String),
}

/// One recoverable event collected during an emission: a skipped node, a
/// skipped ruleset, or a dropped local source. Never fatal by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    NodeParseFailed { source: String, reason: ParseError },
    RulesetFetchFailed { url: String, reason: FetchError },
    CapabilityMismatch { remark: String, target: String, reason: String },
    SourceRejected { source: String, reason: ConfigError },
}
