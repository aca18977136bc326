//! Function-call arguments
//!
//! Name-to-value bindings supplied to a function call or expression
//! evaluation. Values are always text and must be non-empty; lookups for
//! unbound names fail loudly.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("missing parameter name for argument")]
    MissingParameterName,

    #[error("missing value for parameter \"{0}\"")]
    MissingValue(String),

    #[error("argument value already exists for parameter \"{0}\"")]
    DuplicateArgument(String),

    #[error("no argument value exists for parameter \"{0}\"")]
    UnknownArgument(String),
}

/// A bound argument value for a named parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallArgument {
    parameter_name: String,
    value: String,
}

impl FunctionCallArgument {
    pub fn new(
        parameter_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ArgumentError> {
        let parameter_name = parameter_name.into();
        if parameter_name.is_empty() {
            return Err(ArgumentError::MissingParameterName);
        }
        let value = value.into();
        if value.is_empty() {
            return Err(ArgumentError::MissingValue(parameter_name));
        }
        Ok(Self {
            parameter_name,
            value,
        })
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Argument bindings keyed by parameter name, at most one per name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionCallArgumentCollection {
    arguments: Vec<FunctionCallArgument>,
}

impl FunctionCallArgumentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_argument(&mut self, argument: FunctionCallArgument) -> Result<(), ArgumentError> {
        if self.has_argument(argument.parameter_name()) {
            return Err(ArgumentError::DuplicateArgument(
                argument.parameter_name().to_string(),
            ));
        }
        self.arguments.push(argument);
        Ok(())
    }

    pub fn has_argument(&self, parameter_name: &str) -> bool {
        self.arguments
            .iter()
            .any(|a| a.parameter_name() == parameter_name)
    }

    pub fn get_argument(&self, parameter_name: &str) -> Result<&FunctionCallArgument, ArgumentError> {
        self.arguments
            .iter()
            .find(|a| a.parameter_name() == parameter_name)
            .ok_or_else(|| ArgumentError::UnknownArgument(parameter_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionCallArgument> {
        self.arguments.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.parameter_name()).collect()
    }
}
