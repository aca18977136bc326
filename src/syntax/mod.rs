//! Expression syntax parsers
//!
//! Each parser recognizes one fixed syntax form inside template text and
//! produces [`Expression`] instances for every match. The grammar set is
//! closed: parameter substitution (`{{ $name | pipes }}`) and the scoped
//! conditional block (`{{ with $name }} ... {{ end }}`). A composite
//! dispatcher runs the configured parsers in turn and merges their results.

pub mod substitution;
pub mod with_block;

use crate::error::CompileError;
use crate::expression::Expression;

pub use substitution::ParameterSubstitutionParser;
pub use with_block::WithBlockParser;

/// One syntax form's pattern matcher: a pure function of the input text.
pub trait ExpressionParser {
    fn find_expressions(&self, code: &str) -> Result<Vec<Expression>, CompileError>;
}

/// Runs every configured parser over the text and merges the matches.
pub struct CompositeExpressionParser {
    parsers: Vec<Box<dyn ExpressionParser + Send + Sync>>,
}

impl CompositeExpressionParser {
    pub fn new(parsers: Vec<Box<dyn ExpressionParser + Send + Sync>>) -> Self {
        Self { parsers }
    }
}

impl Default for CompositeExpressionParser {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ParameterSubstitutionParser::default()),
            Box::new(WithBlockParser::default()),
        ])
    }
}

impl ExpressionParser for CompositeExpressionParser {
    fn find_expressions(&self, code: &str) -> Result<Vec<Expression>, CompileError> {
        let mut expressions = Vec::new();
        for parser in &self.parsers {
            expressions.extend(parser.find_expressions(code)?);
        }
        Ok(expressions)
    }
}
