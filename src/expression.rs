//! Compiled expressions
//!
//! An [`Expression`] is one recognized unit of template syntax: its span in
//! the source text, the parameters it declares, and an evaluator that
//! renders it against bound argument values. Evaluation validates required
//! parameters first, then exposes only the arguments matching the declared
//! parameters to the evaluator.

use std::fmt;

use crate::argument::FunctionCallArgumentCollection;
use crate::error::CompileError;
use crate::parameter::FunctionParameterCollection;
use crate::position::ExpressionPosition;

/// External capability that applies a named text-transform chain (a pipe
/// suffix such as `| escapeDoubleQuotes | trim`) to a substituted value.
///
/// The core never interprets pipe names; it hands the captured pipeline
/// syntax over verbatim. Failures propagate as evaluation failures.
pub trait PipelineCompiler {
    fn compile(&self, value: &str, pipeline: &str) -> Result<String, CompileError>;
}

/// Bundles the argument bindings and the pipeline capability for one
/// evaluation.
pub struct EvaluationContext<'a> {
    args: &'a FunctionCallArgumentCollection,
    pipeline_compiler: &'a dyn PipelineCompiler,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        args: &'a FunctionCallArgumentCollection,
        pipeline_compiler: &'a dyn PipelineCompiler,
    ) -> Self {
        Self {
            args,
            pipeline_compiler,
        }
    }

    pub fn args(&self) -> &FunctionCallArgumentCollection {
        self.args
    }

    pub fn pipeline_compiler(&self) -> &dyn PipelineCompiler {
        self.pipeline_compiler
    }
}

pub type Evaluator =
    Box<dyn Fn(&EvaluationContext<'_>) -> Result<String, CompileError> + Send + Sync>;

/// A compiled, evaluatable unit recognized from one syntax form
pub struct Expression {
    position: ExpressionPosition,
    parameters: FunctionParameterCollection,
    evaluator: Evaluator,
}

impl Expression {
    pub fn new(
        position: ExpressionPosition,
        parameters: FunctionParameterCollection,
        evaluator: Evaluator,
    ) -> Self {
        Self {
            position,
            parameters,
            evaluator,
        }
    }

    pub fn position(&self) -> &ExpressionPosition {
        &self.position
    }

    pub fn parameters(&self) -> &FunctionParameterCollection {
        &self.parameters
    }

    /// Validates that every required parameter has a bound argument, then
    /// runs the evaluator against only the arguments this expression
    /// declares; unrelated caller arguments stay invisible.
    pub fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<String, CompileError> {
        self.ensure_required_arguments_are_satisfied(context.args())?;
        let scoped_args = self.filter_unused_arguments(context.args())?;
        let scoped_context = EvaluationContext::new(&scoped_args, context.pipeline_compiler());
        (self.evaluator)(&scoped_context)
    }

    fn ensure_required_arguments_are_satisfied(
        &self,
        args: &FunctionCallArgumentCollection,
    ) -> Result<(), CompileError> {
        let mut missing: Vec<String> = self
            .parameters
            .required_names()
            .into_iter()
            .filter(|name| !args.has_argument(name))
            .map(str::to_string)
            .collect();
        missing.dedup();
        if missing.is_empty() {
            return Ok(());
        }
        Err(CompileError::MissingRequiredArguments { parameters: missing })
    }

    fn filter_unused_arguments(
        &self,
        args: &FunctionCallArgumentCollection,
    ) -> Result<FunctionCallArgumentCollection, CompileError> {
        let mut scoped = FunctionCallArgumentCollection::new();
        for parameter in self.parameters.iter() {
            if !args.has_argument(parameter.name()) {
                continue;
            }
            let argument = args.get_argument(parameter.name())?;
            scoped.add_argument(argument.clone())?;
        }
        Ok(scoped)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("position", &self.position)
            .field("parameters", &self.parameters.names())
            .finish_non_exhaustive()
    }
}
