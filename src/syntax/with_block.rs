//! Scoped conditional block syntax
//!
//! Recognizes `{{ with $name }} ... {{ end }}` pairs and, only between a
//! matched pair, context-variable tokens `{{ . | pipes }}`. The block
//! declares one optional parameter: when its value is absent the whole
//! block renders as the empty string; otherwise the scope text is emitted
//! with the (optionally pipe-transformed) value spliced in at each
//! context-variable site. Nested expression text inside the scope is left
//! verbatim for a later compilation pass.
//!
//! The start token absorbs the whitespace that follows it and the end
//! token absorbs the whitespace that precedes it, so block markers on
//! their own lines leave no stray blank lines behind.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CompileError;
use crate::expression::{Evaluator, Expression};
use crate::parameter::{FunctionParameter, FunctionParameterCollection};
use crate::position::ExpressionPosition;
use crate::syntax::ExpressionParser;

const START_PATTERN: &str = r"\{\{\s*with\s+\$([^\s|{}]+)\s*\}\}\s*";
const END_PATTERN: &str = r"\s*\{\{\s*end\s*\}\}";
const CONTEXT_VARIABLE_PATTERN: &str = r"\{\{\s*\.\s*((?:\|\s*[a-zA-Z]+\s*)+)?\}\}";

static START_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(START_PATTERN).expect("hardcoded pattern compiles"));
static END_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(END_PATTERN).expect("hardcoded pattern compiles"));
static CONTEXT_VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(CONTEXT_VARIABLE_PATTERN).expect("hardcoded pattern compiles"));

#[derive(Default)]
pub struct WithBlockParser;

impl ExpressionParser for WithBlockParser {
    fn find_expressions(&self, code: &str) -> Result<Vec<Expression>, CompileError> {
        let tokens = scan_tokens(code)?;
        build_expressions(code, tokens)
    }
}

#[derive(Debug, Clone)]
enum Token {
    Start {
        position: ExpressionPosition,
        parameter_name: String,
    },
    End {
        position: ExpressionPosition,
    },
    ContextVariable {
        position: ExpressionPosition,
        pipeline: Option<String>,
    },
}

impl Token {
    fn position(&self) -> &ExpressionPosition {
        match self {
            Token::Start { position, .. }
            | Token::End { position }
            | Token::ContextVariable { position, .. } => position,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Token::Start { .. } => "with",
            Token::End { .. } => "end",
            Token::ContextVariable { .. } => "context variable",
        }
    }
}

/// Independently scans the whole text for the three token kinds and
/// returns the merged matches sorted by ascending start position.
fn scan_tokens(code: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    for captures in START_REGEX.captures_iter(code) {
        let full_match = captures
            .get(0)
            .ok_or_else(|| internal_error(code, START_PATTERN, "match without full capture"))?;
        let parameter_name = captures
            .get(1)
            .ok_or_else(|| internal_error(code, START_PATTERN, "match without name capture"))?
            .as_str()
            .to_string();
        tokens.push(Token::Start {
            position: ExpressionPosition::new(full_match.start(), full_match.end())?,
            parameter_name,
        });
    }
    for found in END_REGEX.find_iter(code) {
        tokens.push(Token::End {
            position: ExpressionPosition::new(found.start(), found.end())?,
        });
    }
    for captures in CONTEXT_VARIABLE_REGEX.captures_iter(code) {
        let full_match = captures.get(0).ok_or_else(|| {
            internal_error(code, CONTEXT_VARIABLE_PATTERN, "match without full capture")
        })?;
        let pipeline = captures
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| !p.is_empty());
        tokens.push(Token::ContextVariable {
            position: ExpressionPosition::new(full_match.start(), full_match.end())?,
            pipeline,
        });
    }
    tokens.sort_by_key(|token| token.position().start());
    Ok(tokens)
}

/// A context-variable site within a scope, positioned relative to the
/// scope's first byte.
struct ContextVariableSite {
    position_in_scope: ExpressionPosition,
    pipeline: Option<String>,
}

struct ScopeBuilder {
    start_position: ExpressionPosition,
    parameter_name: String,
    context_variables: Vec<ContextVariableSite>,
}

impl ScopeBuilder {
    fn new(start_position: ExpressionPosition, parameter_name: String) -> Self {
        Self {
            start_position,
            parameter_name,
            context_variables: Vec::new(),
        }
    }

    fn add_context_variable(
        &mut self,
        absolute_position: &ExpressionPosition,
        pipeline: Option<String>,
    ) -> Result<(), CompileError> {
        let position_in_scope = ExpressionPosition::new(
            absolute_position.start() - self.start_position.end(),
            absolute_position.end() - self.start_position.end(),
        )?;
        self.context_variables.push(ContextVariableSite {
            position_in_scope,
            pipeline,
        });
        Ok(())
    }

    fn build_expression(
        self,
        end_position: &ExpressionPosition,
        code: &str,
    ) -> Result<Expression, CompileError> {
        let position = ExpressionPosition::new(self.start_position.start(), end_position.end())?;
        // a whitespace-only scope gets fully absorbed by the start and end
        // token patterns, leaving the end match beginning before the start
        // match finished
        let scope = if self.start_position.end() >= end_position.start() {
            String::new()
        } else {
            code[self.start_position.end()..end_position.start()].to_string()
        };
        let mut parameters = FunctionParameterCollection::new();
        let parameter =
            FunctionParameter::new(&self.parameter_name, true).map_err(|e| {
                internal_error(
                    code,
                    START_PATTERN,
                    &format!("failed to create parameter: {e}"),
                )
            })?;
        parameters.add_parameter(parameter).map_err(|e| {
            internal_error(
                code,
                START_PATTERN,
                &format!("failed to collect parameter: {e}"),
            )
        })?;
        let evaluator = build_evaluator(self.parameter_name, scope, self.context_variables);
        Ok(Expression::new(position, parameters, evaluator))
    }
}

fn build_evaluator(
    parameter_name: String,
    scope: String,
    context_variables: Vec<ContextVariableSite>,
) -> Evaluator {
    Box::new(move |context| {
        if !context.args().has_argument(&parameter_name) {
            // absent optional value suppresses the whole block
            return Ok(String::new());
        }
        let value = context.args().get_argument(&parameter_name)?.value();
        let mut rendered = String::new();
        let mut scope_index = 0;
        for site in &context_variables {
            rendered.push_str(&scope[scope_index..site.position_in_scope.start()]);
            match &site.pipeline {
                None => rendered.push_str(value),
                Some(pipeline) => {
                    rendered.push_str(&context.pipeline_compiler().compile(value, pipeline)?);
                }
            }
            scope_index = site.position_in_scope.end();
        }
        rendered.push_str(&scope[scope_index..]);
        Ok(rendered)
    })
}

fn build_expressions(code: &str, tokens: Vec<Token>) -> Result<Vec<Expression>, CompileError> {
    let mut expressions = Vec::new();
    let mut builders: Vec<ScopeBuilder> = Vec::new();
    for token in &tokens {
        match token {
            Token::Start {
                position,
                parameter_name,
            } => {
                builders.push(ScopeBuilder::new(*position, parameter_name.clone()));
            }
            Token::ContextVariable { position, pipeline } => match builders.last_mut() {
                Some(builder) => builder.add_context_variable(position, pipeline.clone())?,
                None => {
                    return Err(syntax_error(
                        "context variable before `with` statement",
                        code,
                        &tokens,
                    ));
                }
            },
            Token::End { position } => match builders.pop() {
                Some(builder) => expressions.push(builder.build_expression(position, code)?),
                None => {
                    return Err(syntax_error(
                        "redundant `end` statement, missing `with`?",
                        code,
                        &tokens,
                    ));
                }
            },
        }
    }
    if !builders.is_empty() {
        return Err(syntax_error(
            "missing `end` statement, forgot `{{ end }}`?",
            code,
            &tokens,
        ));
    }
    Ok(expressions)
}

fn syntax_error(message: &str, code: &str, tokens: &[Token]) -> CompileError {
    let formatted_tokens: Vec<String> = tokens
        .iter()
        .map(|t| format!("- {} {}", t.position(), t.kind()))
        .collect();
    CompileError::TemplateSyntax {
        message: message.to_string(),
        context: format!(
            "Code:\n---\n{code}\n---\nStatements:\n---\n{}\n---",
            formatted_tokens.join("\n")
        ),
    }
}

fn internal_error(code: &str, pattern: &str, message: &str) -> CompileError {
    CompileError::ParserInternal {
        parser: "WithBlockParser",
        pattern: pattern.to_string(),
        code: code.to_string(),
        message: message.to_string(),
    }
}
