use thiserror::Error;

use crate::return_code::{self, ReturnCode};

pub type EbicsResult<T> = Result<T, EbicsError>;

#[derive(Debug, Error)]
pub enum EbicsError {
    /// The counterpart answered with a non-OK return code.
    #[error("EBICS protocol error {code}{}", fmt_message(.message))]
    Protocol {
        code: ReturnCode,
        message: Option<String>,
    },

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn fmt_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(" ({m})"),
        None => String::new(),
    }
}

impl EbicsError {
    pub fn protocol(code: ReturnCode, message: impl Into<String>) -> Self {
        EbicsError::Protocol {
            code,
            message: Some(message.into()),
        }
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        EbicsError::Crypto(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        EbicsError::MalformedResponse(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        EbicsError::Io {
            context: context.into(),
            source,
        }
    }

    /// The return code this failure maps to. I/O, transport and config
    /// failures originate locally and carry none.
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            EbicsError::Protocol { code, .. } => Some(code.clone()),
            EbicsError::Crypto(_) => Some(return_code::EBICS_INTERNAL_ERROR),
            EbicsError::MalformedResponse(_) => Some(return_code::EBICS_INVALID_REQUEST_CONTENT),
            EbicsError::Io { .. }
            | EbicsError::Transport(_)
            | EbicsError::Config(_)
            | EbicsError::Other(_) => None,
        }
    }

    /// True for failures originating in local segment storage.
    pub fn is_io(&self) -> bool {
        matches!(self, EbicsError::Io { .. })
    }
}
