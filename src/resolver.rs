//! Function-call resolution
//!
//! Resolves sequences of function calls against a shared-function catalog
//! into concrete `{execute, revert}` script code. Inline-code bodies are
//! compiled directly; call bodies are flattened by compiling each nested
//! call's raw argument text against the parent call's resolved arguments,
//! then recursing. Non-empty segments of each stream are merged with
//! single newlines, execute and revert independently.

use tracing::debug;

use crate::argument::{FunctionCallArgument, FunctionCallArgumentCollection};
use crate::compiler::ExpressionsCompiler;
use crate::error::CompileError;
use crate::expression::PipelineCompiler;
use crate::function::{FunctionBody, FunctionCall, SharedFunction, SharedFunctionCollection};

/// Final output of resolution; revert is empty when no called function
/// defines revert code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedCode {
    pub execute: String,
    pub revert: String,
}

/// Resolves call sequences to script code using an expressions compiler
/// for every piece of templated text.
pub struct CallResolver {
    expressions_compiler: ExpressionsCompiler,
}

impl CallResolver {
    pub fn new(expressions_compiler: ExpressionsCompiler) -> Self {
        Self {
            expressions_compiler,
        }
    }

    /// Resolves each call in order and merges the results into one
    /// execute stream and one revert stream.
    pub fn resolve_sequence(
        &self,
        calls: &[FunctionCall],
        functions: &SharedFunctionCollection,
        pipeline_compiler: &dyn PipelineCompiler,
    ) -> Result<ResolvedCode, CompileError> {
        if calls.is_empty() {
            return Err(CompileError::EmptyCallSequence);
        }
        let mut segments = Vec::new();
        for call in calls {
            segments.extend(self.resolve_call(call, functions, pipeline_compiler)?);
        }
        debug!(calls = calls.len(), segments = segments.len(), "resolved call sequence");
        Ok(merge_segments(&segments))
    }

    fn resolve_call(
        &self,
        call: &FunctionCall,
        functions: &SharedFunctionCollection,
        pipeline_compiler: &dyn PipelineCompiler,
    ) -> Result<Vec<ResolvedCode>, CompileError> {
        let function = functions.get_function(call.function_name())?;
        ensure_expected_arguments(function, call)?;
        match function.body() {
            FunctionBody::Code { execute, revert } => {
                let execute =
                    self.expressions_compiler
                        .compile_expressions(execute, call.args(), pipeline_compiler)?;
                let revert = match revert {
                    Some(revert) => self.expressions_compiler.compile_expressions(
                        revert,
                        call.args(),
                        pipeline_compiler,
                    )?,
                    None => String::new(),
                };
                Ok(vec![ResolvedCode { execute, revert }])
            }
            FunctionBody::Calls(nested_calls) => {
                let mut segments = Vec::new();
                for nested_call in nested_calls {
                    let compiled = self.compile_nested_call(
                        nested_call,
                        call.args(),
                        functions,
                        pipeline_compiler,
                    )?;
                    segments.extend(self.resolve_call(&compiled, functions, pipeline_compiler)?);
                }
                Ok(segments)
            }
        }
    }

    /// Compiles a nested call's raw argument text against the parent
    /// call's arguments. An argument that compiles to empty text is
    /// omitted when its target parameter is optional and rejected when it
    /// is required.
    fn compile_nested_call(
        &self,
        nested_call: &FunctionCall,
        parent_args: &FunctionCallArgumentCollection,
        functions: &SharedFunctionCollection,
        pipeline_compiler: &dyn PipelineCompiler,
    ) -> Result<FunctionCall, CompileError> {
        let required = functions.required_parameter_names(nested_call.function_name())?;
        let mut compiled_args = FunctionCallArgumentCollection::new();
        for argument in nested_call.args().iter() {
            let value = self
                .expressions_compiler
                .compile_expressions(argument.value(), parent_args, pipeline_compiler)
                .map_err(|error| {
                    CompileError::context(
                        format!(
                            "failed to compile argument \"{}\" for function \"{}\"",
                            argument.parameter_name(),
                            nested_call.function_name(),
                        ),
                        error,
                    )
                })?;
            if value.is_empty() {
                if required.iter().any(|name| name == argument.parameter_name()) {
                    return Err(CompileError::EmptyRequiredArgument {
                        parameter: argument.parameter_name().to_string(),
                    });
                }
                continue;
            }
            compiled_args.add_argument(FunctionCallArgument::new(
                argument.parameter_name(),
                value,
            )?)?;
        }
        Ok(FunctionCall::new(nested_call.function_name(), compiled_args))
    }
}

impl Default for CallResolver {
    fn default() -> Self {
        Self::new(ExpressionsCompiler::default())
    }
}

/// Rejects arguments the function does not declare. Required-argument
/// presence is also checked here so the failure names the call target
/// instead of a template position.
fn ensure_expected_arguments(
    function: &SharedFunction,
    call: &FunctionCall,
) -> Result<(), CompileError> {
    let expected = function.parameters().names();
    let unexpected: Vec<String> = call
        .args()
        .parameter_names()
        .into_iter()
        .filter(|provided| !expected.contains(provided))
        .map(str::to_string)
        .collect();
    if !unexpected.is_empty() {
        return Err(CompileError::UnexpectedArguments {
            function: function.name().to_string(),
            unexpected,
            expected: expected.iter().map(|name| name.to_string()).collect(),
        });
    }
    let missing: Vec<String> = function
        .parameters()
        .required_names()
        .into_iter()
        .filter(|required| !call.args().has_argument(required))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(CompileError::MissingCallArguments {
            function: function.name().to_string(),
            missing,
        });
    }
    Ok(())
}

/// Joins non-empty segments of each stream with newlines; each stream is
/// filtered independently.
fn merge_segments(segments: &[ResolvedCode]) -> ResolvedCode {
    let join = |select: fn(&ResolvedCode) -> &str| -> String {
        segments
            .iter()
            .map(select)
            .filter(|code| !code.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    };
    ResolvedCode {
        execute: join(|segment| &segment.execute),
        revert: join(|segment| &segment.revert),
    }
}
