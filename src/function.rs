//! Shared-function model
//!
//! A shared function is a reusable named unit with declared parameters and
//! exactly one body: inline code (execute plus optional revert text) or a
//! sequence of calls to other shared functions. The catalog-wide
//! collection is built once per catalog load and read-only thereafter.

use thiserror::Error;

use crate::argument::FunctionCallArgumentCollection;
use crate::error::CompileError;
use crate::parameter::FunctionParameterCollection;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FunctionCollectionError {
    #[error("function with name \"{0}\" already exists")]
    FunctionAlreadyExists(String),

    #[error("missing function name")]
    MissingFunctionName,
}

/// The single body of a shared function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionBody {
    /// Inline script text; revert is optional
    Code {
        execute: String,
        revert: Option<String>,
    },
    /// A sequence of calls to other shared functions
    Calls(Vec<FunctionCall>),
}

/// A call to a shared function by name; argument values stay raw,
/// uncompiled source text until resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    function_name: String,
    args: FunctionCallArgumentCollection,
}

impl FunctionCall {
    pub fn new(function_name: impl Into<String>, args: FunctionCallArgumentCollection) -> Self {
        Self {
            function_name: function_name.into(),
            args,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn args(&self) -> &FunctionCallArgumentCollection {
        &self.args
    }
}

/// A reusable named unit with declared parameters and one body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFunction {
    name: String,
    parameters: FunctionParameterCollection,
    body: FunctionBody,
}

impl SharedFunction {
    pub fn with_inline_code(
        name: impl Into<String>,
        parameters: FunctionParameterCollection,
        execute: impl Into<String>,
        revert: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: FunctionBody::Code {
                execute: execute.into(),
                revert,
            },
        }
    }

    pub fn with_calls(
        name: impl Into<String>,
        parameters: FunctionParameterCollection,
        calls: Vec<FunctionCall>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: FunctionBody::Calls(calls),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &FunctionParameterCollection {
        &self.parameters
    }

    pub fn body(&self) -> &FunctionBody {
        &self.body
    }
}

/// Catalog-wide function lookup: names unique case-insensitively at add
/// time, queried by exact declared name
#[derive(Debug, Clone, Default)]
pub struct SharedFunctionCollection {
    functions: Vec<SharedFunction>,
}

impl SharedFunctionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(
        &mut self,
        function: SharedFunction,
    ) -> Result<(), FunctionCollectionError> {
        if function.name().is_empty() {
            return Err(FunctionCollectionError::MissingFunctionName);
        }
        // "X" and "x" collide even though lookup stays exact-name
        if self
            .functions
            .iter()
            .any(|f| f.name().eq_ignore_ascii_case(function.name()))
        {
            return Err(FunctionCollectionError::FunctionAlreadyExists(
                function.name().to_string(),
            ));
        }
        self.functions.push(function);
        Ok(())
    }

    /// Looks up a function by its exact declared name; absence is a loud,
    /// descriptively-named failure.
    pub fn get_function(&self, name: &str) -> Result<&SharedFunction, CompileError> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))
    }

    /// Required parameter names of the named function.
    pub fn required_parameter_names(&self, name: &str) -> Result<Vec<String>, CompileError> {
        let function = self.get_function(name)?;
        Ok(function
            .parameters()
            .required_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
