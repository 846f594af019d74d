use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors reported by a host document.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum HostError {
    #[error("`{0}` is not a valid attribute name")]
    #[diagnostic(code(host::attribute_name))]
    InvalidAttributeName(SmolStr),
}

/// Errors loading a converter configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid converter configuration")]
    #[diagnostic(code(config::json))]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern `{pattern}` in `{field}`")]
    #[diagnostic(
        code(config::pattern),
        help("name patterns wrapped in `/` must be valid regular expressions")
    )]
    Pattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
