//! Script templating compiler core.
//!
//! Compiles templated script code by parsing template expressions
//! (`{{ $name | pipes }}` substitutions and `{{ with $name }}...{{ end }}`
//! scoped blocks), binding function-call arguments to declared parameters,
//! and resolving shared-function call sequences into final
//! `{execute, revert}` script pairs.
//!
//! Typical flow:
//!
//! 1. [`parse_functions`] turns raw catalog definitions into a validated
//!    [`SharedFunctionCollection`].
//! 2. [`CallResolver::resolve_sequence`] resolves calls against that
//!    collection, compiling every templated string through
//!    [`ExpressionsCompiler`] with a caller-supplied [`PipelineCompiler`]
//!    for pipe transforms.

pub mod argument;
pub mod catalog;
pub mod compiler;
pub mod error;
pub mod expression;
pub mod function;
pub mod parameter;
pub mod position;
pub mod resolver;
pub mod syntax;

pub use argument::{ArgumentError, FunctionCallArgument, FunctionCallArgumentCollection};
pub use catalog::{
    parse_functions, CatalogError, CodeValidationError, CodeValidationRule, CodeValidator,
    RawCallData, RawFunctionCallData, RawFunctionData,
};
pub use compiler::ExpressionsCompiler;
pub use error::CompileError;
pub use expression::{EvaluationContext, Expression, PipelineCompiler};
pub use function::{
    FunctionBody, FunctionCall, FunctionCollectionError, SharedFunction, SharedFunctionCollection,
};
pub use parameter::{FunctionParameter, FunctionParameterCollection, ParameterError};
pub use position::{ExpressionPosition, PositionError};
pub use resolver::{CallResolver, ResolvedCode};
pub use syntax::{CompositeExpressionParser, ExpressionParser};
