//! Compilation errors
//!
//! Every failure aborts the enclosing compilation and carries enough
//! context (function names, parameter names, spans, surrounding code) to
//! locate the offending catalog entry. Inner failures are re-raised with
//! additional context through [`CompileError::Context`] instead of being
//! silently recovered.

use thiserror::Error;

use crate::argument::ArgumentError;
use crate::position::{ExpressionPosition, PositionError};

/// Failure while compiling expressions or resolving function calls
#[derive(Debug, Error)]
pub enum CompileError {
    // =========================================================================
    // Position validation
    // =========================================================================
    #[error(
        "expressions out of code bounds (code length {code_length}): {}",
        join_positions(.positions)
    )]
    ExpressionsOutOfRange {
        code_length: usize,
        positions: Vec<ExpressionPosition>,
    },

    #[error("expressions at same position: {}", join_positions(.positions))]
    ExpressionsAtSamePosition { positions: Vec<ExpressionPosition> },

    #[error("expressions intersecting unexpectedly: {}", join_positions(.positions))]
    ExpressionsIntersecting { positions: Vec<ExpressionPosition> },

    #[error(transparent)]
    InvalidPosition(#[from] PositionError),

    // =========================================================================
    // Template syntax
    // =========================================================================
    #[error("{message}\n{context}")]
    TemplateSyntax { message: String, context: String },

    #[error(
        "parser error in {parser}: {message}\nRegex pattern used: {pattern}\nCode: {code}"
    )]
    ParserInternal {
        parser: &'static str,
        pattern: String,
        code: String,
        message: String,
    },

    // =========================================================================
    // Argument binding
    // =========================================================================
    #[error(
        "no argument values are provided for required parameters: {}",
        quote_list(.parameters)
    )]
    MissingRequiredArguments { parameters: Vec<String> },

    #[error(
        "function \"{function}\" has unexpected parameter(s) provided: {}. \
         Expected parameter(s): {}",
        quote_list(.unexpected),
        quote_list_or_none(.expected)
    )]
    UnexpectedArguments {
        function: String,
        unexpected: Vec<String>,
        expected: Vec<String>,
    },

    #[error(
        "function \"{function}\" is missing value(s) for required parameter(s): {}",
        quote_list(.missing)
    )]
    MissingCallArguments {
        function: String,
        missing: Vec<String>,
    },

    #[error("compilation resulted in empty value for required parameter: \"{parameter}\"")]
    EmptyRequiredArgument { parameter: String },

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    // =========================================================================
    // Call resolution
    // =========================================================================
    #[error("called function is not defined: \"{0}\"")]
    UnknownFunction(String),

    #[error("cannot resolve an empty call sequence")]
    EmptyCallSequence,

    #[error("cannot apply pipeline \"{pipeline}\": {message}")]
    Pipeline { pipeline: String, message: String },

    // =========================================================================
    // Contextual wrapping
    // =========================================================================
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Re-raise an inner error with additional human-readable context,
    /// preserving the original cause for diagnostics.
    pub fn context(message: impl Into<String>, source: CompileError) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// The innermost wrapped cause, unwinding any context layers.
    pub fn root_cause(&self) -> &CompileError {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub(crate) fn quote_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("\"{}\"", item.as_ref()))
        .collect();
    quoted.join(", ")
}

pub(crate) fn quote_list_or_none<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        quote_list(items)
    }
}

fn join_positions(positions: &[ExpressionPosition]) -> String {
    let rendered: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
    rendered.join(", ")
}
