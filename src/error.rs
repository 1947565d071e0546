//! Centralised error hierarchy for the **Blu interpreter**.
//!
//! Every stage (scanner, parser, resolver, runtime) converts its failure modes
//! into one of the variants defined here, so the whole crate shares a single
//! `Result<T>` alias and the CLI can render any failure as one line.
//!
//! The module **does not** print diagnostics itself.
//!
//! Early `return` from a function body is *not* an error; it travels through
//! [`crate::interpreter::Flow`] instead.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BluError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error. `location` is either `end` or the quoted lexeme.
    #[error("[line {line}] Error at {location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure (scope, `this`/`super`/`return` misuse).
    #[error("[line {line}] Error at {location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Raised when `print`
    /// cannot write to its sink.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Render the `at ...` part of parse/resolve diagnostics.
fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        "end".to_string()
    } else {
        format!("'{}'", token.lexeme)
    }
}

impl BluError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        BluError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        BluError::Parse {
            message,
            location: location(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        BluError::Resolve {
            message,
            location: location(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter** and runtime object model.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        BluError::Runtime { message, line }
    }

    /// Is this a failure of one of the static stages (lex, parse, resolve)?
    ///
    /// The CLI maps static failures and runtime failures to different exit codes.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            BluError::Lex { .. } | BluError::Parse { .. } | BluError::Resolve { .. }
        )
    }

    /// Bare message without the line prefix.
    pub fn message(&self) -> String {
        match self {
            BluError::Lex { message, .. }
            | BluError::Parse { message, .. }
            | BluError::Resolve { message, .. }
            | BluError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, BluError>;
