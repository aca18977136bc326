//! Expressions compiler
//!
//! Runs the configured syntax parsers over template text, validates the
//! discovered expression set for positional legality, evaluates the
//! outermost expressions, and splices their results back in place. The
//! spliced text is then re-scanned, so an expression's output may itself
//! contain expression syntax; recursion stops at the first pass that
//! discovers nothing. Eventual termination is the catalog author's
//! responsibility (see the crate docs); no depth guard is imposed.

use tracing::debug;

use crate::argument::FunctionCallArgumentCollection;
use crate::error::CompileError;
use crate::expression::{EvaluationContext, Expression, PipelineCompiler};
use crate::syntax::{CompositeExpressionParser, ExpressionParser};

/// Compiles every expression in a text against bound argument values.
pub struct ExpressionsCompiler {
    parser: Box<dyn ExpressionParser + Send + Sync>,
}

impl ExpressionsCompiler {
    pub fn new(parser: Box<dyn ExpressionParser + Send + Sync>) -> Self {
        Self { parser }
    }

    /// Compiles `code` until no expression syntax remains. Empty input is
    /// a no-op returning empty text.
    pub fn compile_expressions(
        &self,
        code: &str,
        args: &FunctionCallArgumentCollection,
        pipeline_compiler: &dyn PipelineCompiler,
    ) -> Result<String, CompileError> {
        if code.is_empty() {
            return Ok(String::new());
        }
        let context = EvaluationContext::new(args, pipeline_compiler);
        self.compile_recursively(code.to_string(), &context)
    }

    fn compile_recursively(
        &self,
        code: String,
        context: &EvaluationContext<'_>,
    ) -> Result<String, CompileError> {
        let expressions = self.parser.find_expressions(&code)?;
        if expressions.is_empty() {
            return Ok(code);
        }
        debug!(
            expressions = expressions.len(),
            code_length = code.len(),
            "compiling expression pass"
        );
        let compiled = compile_pass(expressions, &code, context)?;
        // the output of a pass may contain new uncompiled expressions,
        // both from evaluator output and from nested expressions whose
        // parents were just evaluated
        self.compile_recursively(compiled, context)
    }
}

impl Default for ExpressionsCompiler {
    fn default() -> Self {
        Self::new(Box::new(CompositeExpressionParser::default()))
    }
}

fn compile_pass(
    expressions: Vec<Expression>,
    code: &str,
    context: &EvaluationContext<'_>,
) -> Result<String, CompileError> {
    ensure_valid_expressions(&expressions, code)?;
    let mut outermost = select_outermost(expressions);
    outermost.sort_by_key(|e| e.position().start());

    let mut compiled = String::new();
    let mut index = 0;
    for expression in &outermost {
        compiled.push_str(&code[index..expression.position().start()]);
        compiled.push_str(&expression.evaluate(context)?);
        index = expression.position().end();
    }
    compiled.push_str(&code[index..]);
    Ok(compiled)
}

/// Keeps only expressions not strictly contained by any other; a contained
/// expression's text is reprocessed after its parent is evaluated.
fn select_outermost(expressions: Vec<Expression>) -> Vec<Expression> {
    let positions: Vec<_> = expressions.iter().map(|e| *e.position()).collect();
    expressions
        .into_iter()
        .filter(|expression| {
            !positions
                .iter()
                .any(|other| expression.position().is_inside_of(other))
        })
        .collect()
}

fn ensure_valid_expressions(
    expressions: &[Expression],
    code: &str,
) -> Result<(), CompileError> {
    ensure_expressions_within_code(expressions, code)?;
    ensure_no_expressions_at_same_position(expressions)?;
    ensure_no_invalid_intersections(expressions)?;
    Ok(())
}

fn ensure_expressions_within_code(
    expressions: &[Expression],
    code: &str,
) -> Result<(), CompileError> {
    let out_of_range: Vec<_> = expressions
        .iter()
        .filter(|e| e.position().end() > code.len())
        .map(|e| *e.position())
        .collect();
    if out_of_range.is_empty() {
        return Ok(());
    }
    Err(CompileError::ExpressionsOutOfRange {
        code_length: code.len(),
        positions: out_of_range,
    })
}

fn ensure_no_expressions_at_same_position(
    expressions: &[Expression],
) -> Result<(), CompileError> {
    let duplicated: Vec<_> = expressions
        .iter()
        .filter(|expression| {
            expressions
                .iter()
                .filter(|other| expression.position().is_same(other.position()))
                .count()
                > 1
        })
        .map(|e| *e.position())
        .collect();
    if duplicated.is_empty() {
        return Ok(());
    }
    Err(CompileError::ExpressionsAtSamePosition {
        positions: duplicated,
    })
}

fn ensure_no_invalid_intersections(expressions: &[Expression]) -> Result<(), CompileError> {
    let intersecting: Vec<_> = expressions
        .iter()
        .filter(|expression| {
            expressions.iter().any(|other| {
                expression.position().is_intersecting(other.position())
                    && !expression.position().is_same(other.position())
                    && !expression.position().is_inside_of(other.position())
                    && !other.position().is_inside_of(expression.position())
            })
        })
        .map(|e| *e.position())
        .collect();
    if intersecting.is_empty() {
        return Ok(());
    }
    Err(CompileError::ExpressionsIntersecting {
        positions: intersecting,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::FunctionCallArgument;
    use crate::parameter::FunctionParameterCollection;
    use crate::position::ExpressionPosition;
    use pretty_assertions::assert_eq;

    struct NoopPipelineCompiler;

    impl PipelineCompiler for NoopPipelineCompiler {
        fn compile(&self, value: &str, _pipeline: &str) -> Result<String, CompileError> {
            Ok(value.to_string())
        }
    }

    fn args(bindings: &[(&str, &str)]) -> FunctionCallArgumentCollection {
        let mut collection = FunctionCallArgumentCollection::new();
        for (name, value) in bindings {
            collection
                .add_argument(FunctionCallArgument::new(*name, *value).unwrap())
                .unwrap();
        }
        collection
    }

    fn compile(code: &str, bindings: &[(&str, &str)]) -> Result<String, CompileError> {
        ExpressionsCompiler::default().compile_expressions(
            code,
            &args(bindings),
            &NoopPipelineCompiler,
        )
    }

    /// Parser producing fixed-span expressions that each render a constant;
    /// lets tests force positional layouts the real grammars cannot emit.
    struct StubParser {
        spans: Vec<(usize, usize, &'static str)>,
    }

    impl ExpressionParser for StubParser {
        fn find_expressions(&self, _code: &str) -> Result<Vec<Expression>, CompileError> {
            self.spans
                .iter()
                .map(|(start, end, replacement)| {
                    let replacement = *replacement;
                    Ok(Expression::new(
                        ExpressionPosition::new(*start, *end)?,
                        FunctionParameterCollection::new(),
                        Box::new(move |_| Ok(replacement.to_string())),
                    ))
                })
                .collect()
        }
    }

    #[test]
    fn test_empty_input_is_noop() {
        assert_eq!(compile("", &[]).unwrap(), "");
    }

    #[test]
    fn test_text_without_expressions_is_unchanged() {
        assert_eq!(
            compile("echo 'no syntax here'", &[]).unwrap(),
            "echo 'no syntax here'"
        );
    }

    #[test]
    fn test_substitutes_single_parameter() {
        assert_eq!(
            compile("hello {{ $name }}!", &[("name", "world")]).unwrap(),
            "hello world!"
        );
    }

    #[test]
    fn test_recursion_rescans_compiler_output() {
        // the substituted value itself contains expression syntax
        let result = compile(
            "hello {{ $first }}!",
            &[("first", "{{ $second }}"), ("second", "world")],
        )
        .unwrap();
        assert_eq!(result, "hello world!");
    }

    #[test]
    fn test_with_block_inner_substitution_compiles_on_next_pass() {
        let result = compile(
            "{{ with $condition }}echo '{{ $text }}'{{ end }}",
            &[("condition", "on"), ("text", "hello")],
        )
        .unwrap();
        assert_eq!(result, "echo 'hello'");
    }

    #[test]
    fn test_suppressed_with_block_discards_inner_expressions() {
        let result = compile(
            "{{ with $condition }}echo '{{ $text }}'{{ end }}always",
            &[("text", "hello")],
        )
        .unwrap();
        assert_eq!(result, "always");
    }

    #[test]
    fn test_missing_required_parameter_fails() {
        assert!(matches!(
            compile("{{ $missing }}", &[]).unwrap_err(),
            CompileError::MissingRequiredArguments { .. }
        ));
    }

    #[test]
    fn test_result_independent_of_discovery_order() {
        let forward = StubParser {
            spans: vec![(0, 2, "A"), (3, 5, "B")],
        };
        let backward = StubParser {
            spans: vec![(3, 5, "B"), (0, 2, "A")],
        };
        let bound = args(&[]);
        for parser in [forward, backward] {
            let context = EvaluationContext::new(&bound, &NoopPipelineCompiler);
            let expressions = parser.find_expressions("xx-yy").unwrap();
            let compiled = compile_pass(expressions, "xx-yy", &context).unwrap();
            assert_eq!(compiled, "A-B");
        }
    }

    #[test]
    fn test_partial_overlap_is_rejected() {
        let parser = StubParser {
            spans: vec![(0, 4, "A"), (2, 6, "B")],
        };
        let bound = args(&[]);
        let context = EvaluationContext::new(&bound, &NoopPipelineCompiler);
        let expressions = parser.find_expressions("123456").unwrap();
        assert!(matches!(
            compile_pass(expressions, "123456", &context).unwrap_err(),
            CompileError::ExpressionsIntersecting { .. }
        ));
    }

    #[test]
    fn test_duplicate_span_is_rejected() {
        let parser = StubParser {
            spans: vec![(0, 4, "A"), (0, 4, "B")],
        };
        let bound = args(&[]);
        let context = EvaluationContext::new(&bound, &NoopPipelineCompiler);
        let expressions = parser.find_expressions("1234").unwrap();
        assert!(matches!(
            compile_pass(expressions, "1234", &context).unwrap_err(),
            CompileError::ExpressionsAtSamePosition { .. }
        ));
    }

    #[test]
    fn test_out_of_range_expression_is_rejected() {
        let parser = StubParser {
            spans: vec![(0, 40, "A")],
        };
        let bound = args(&[]);
        let context = EvaluationContext::new(&bound, &NoopPipelineCompiler);
        let expressions = parser.find_expressions("short").unwrap();
        assert!(matches!(
            compile_pass(expressions, "short", &context).unwrap_err(),
            CompileError::ExpressionsOutOfRange { .. }
        ));
    }

    #[test]
    fn test_containment_evaluates_only_outermost() {
        let parser = StubParser {
            spans: vec![(0, 6, "outer"), (1, 3, "inner")],
        };
        let bound = args(&[]);
        let context = EvaluationContext::new(&bound, &NoopPipelineCompiler);
        let expressions = parser.find_expressions("123456").unwrap();
        assert_eq!(compile_pass(expressions, "123456", &context).unwrap(), "outer");
    }
}
