use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed failure surfaced by every public operation (spec §7).
///
/// Corruption is fatal to the current index and recommends `REINDEX`.
/// Resource exhaustion carries a hint about which threshold to raise.
/// No variant here is recovered silently inside the core; the only
/// recoverable situation (memtable OOM before spill) is handled by the
/// caller retrying after a spill, not by this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("corrupt index: {what}{}", hint_suffix(.hint))]
    Corruption { what: String, hint: Option<String> },

    #[error("resource exhausted: {what}{}", hint_suffix(.hint))]
    ResourceExhaustion { what: String, hint: Option<String> },

    #[error("operation cancelled")]
    Cancelled,

    #[error("misuse: {what}")]
    Misuse { what: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" (hint: {h})"),
        None => String::new(),
    }
}

impl Error {
    pub fn corruption(what: impl Into<String>) -> Self {
        Error::Corruption {
            what: what.into(),
            hint: Some("REINDEX the index".to_string()),
        }
    }

    pub fn corruption_with_hint(what: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::Corruption {
            what: what.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn exhausted(what: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::ResourceExhaustion {
            what: what.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn misuse(what: impl Into<String>) -> Self {
        Error::Misuse { what: what.into() }
    }
}

/// Distinguishes the five error kinds from spec §7 without matching on
/// the enum directly, useful for callers that only care about the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Corruption,
    ResourceExhaustion,
    Cancelled,
    Misuse,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Corruption { .. } => ErrorKind::Corruption,
            Error::ResourceExhaustion { .. } => ErrorKind::ResourceExhaustion,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Misuse { .. } => ErrorKind::Misuse,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Corruption => "corruption",
            ErrorKind::ResourceExhaustion => "resource_exhaustion",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Misuse => "misuse",
            ErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}
