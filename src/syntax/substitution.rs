//! Parameter substitution syntax
//!
//! Recognizes `{{ $name }}` and `{{ $name | pipeA | pipeB }}`. Whitespace
//! around the braces is tolerated; a space between `$` and the name is not
//! a match. Each match declares one required parameter; evaluation returns
//! the bound value verbatim, or hands it to the pipeline compiler when a
//! pipe suffix is present.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CompileError;
use crate::expression::{Evaluator, Expression};
use crate::parameter::{FunctionParameter, FunctionParameterCollection};
use crate::position::ExpressionPosition;
use crate::syntax::ExpressionParser;

const SUBSTITUTION_PATTERN: &str =
    r"\{\{\s*\$([^\s|{}]+)\s*((?:\|\s*[a-zA-Z]+\s*)+)?\}\}";

static SUBSTITUTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(SUBSTITUTION_PATTERN).expect("hardcoded pattern compiles"));

#[derive(Default)]
pub struct ParameterSubstitutionParser;

impl ExpressionParser for ParameterSubstitutionParser {
    fn find_expressions(&self, code: &str) -> Result<Vec<Expression>, CompileError> {
        let mut expressions = Vec::new();
        for captures in SUBSTITUTION_REGEX.captures_iter(code) {
            let full_match = captures
                .get(0)
                .ok_or_else(|| internal_error(code, "regex match without full capture"))?;
            let parameter_name = captures
                .get(1)
                .ok_or_else(|| internal_error(code, "regex match without parameter capture"))?
                .as_str()
                .to_string();
            let pipeline = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|p| !p.is_empty());
            let position = ExpressionPosition::new(full_match.start(), full_match.end())
                .map_err(|e| {
                    CompileError::context(
                        format!("failed to create position in code: {code}"),
                        e.into(),
                    )
                })?;
            let parameters = declare_parameter(&parameter_name, code)?;
            let evaluator = build_evaluator(parameter_name, pipeline);
            expressions.push(Expression::new(position, parameters, evaluator));
        }
        Ok(expressions)
    }
}

fn build_evaluator(parameter_name: String, pipeline: Option<String>) -> Evaluator {
    Box::new(move |context| {
        let argument = context.args().get_argument(&parameter_name)?;
        match &pipeline {
            None => Ok(argument.value().to_string()),
            Some(pipeline) => context
                .pipeline_compiler()
                .compile(argument.value(), pipeline),
        }
    })
}

fn declare_parameter(
    parameter_name: &str,
    code: &str,
) -> Result<FunctionParameterCollection, CompileError> {
    let mut parameters = FunctionParameterCollection::new();
    let parameter = FunctionParameter::new(parameter_name, false).map_err(|e| {
        CompileError::ParserInternal {
            parser: "ParameterSubstitutionParser",
            pattern: SUBSTITUTION_PATTERN.to_string(),
            code: code.to_string(),
            message: format!("failed to create parameter: {e}"),
        }
    })?;
    parameters
        .add_parameter(parameter)
        .map_err(|e| CompileError::ParserInternal {
            parser: "ParameterSubstitutionParser",
            pattern: SUBSTITUTION_PATTERN.to_string(),
            code: code.to_string(),
            message: format!("failed to collect parameter: {e}"),
        })?;
    Ok(parameters)
}

fn internal_error(code: &str, message: &str) -> CompileError {
    CompileError::ParserInternal {
        parser: "ParameterSubstitutionParser",
        pattern: SUBSTITUTION_PATTERN.to_string(),
        code: code.to_string(),
        message: message.to_string(),
    }
}
