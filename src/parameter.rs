//! Function parameters
//!
//! Declared parameters of a shared function or expression, owned by an
//! insertion-ordered collection that rejects duplicate names.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("missing parameter name")]
    MissingName,

    #[error("parameter name must contain only alphanumeric characters or underscores: \"{0}\"")]
    InvalidName(String),

    #[error("duplicate parameter name: \"{0}\"")]
    DuplicateName(String),
}

/// A declared parameter: a name and whether a value may be omitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParameter {
    name: String,
    is_optional: bool,
}

impl FunctionParameter {
    pub fn new(name: impl Into<String>, is_optional: bool) -> Result<Self, ParameterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ParameterError::MissingName);
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ParameterError::InvalidName(name));
        }
        Ok(Self { name, is_optional })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }
}

/// Insertion-ordered parameter declarations, unique by name (case-sensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionParameterCollection {
    parameters: Vec<FunctionParameter>,
}

impl FunctionParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parameter(&mut self, parameter: FunctionParameter) -> Result<(), ParameterError> {
        if self.parameters.iter().any(|p| p.name() == parameter.name()) {
            return Err(ParameterError::DuplicateName(parameter.name().to_string()));
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionParameter> {
        self.parameters.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name()).collect()
    }

    /// Names of parameters that must be bound before evaluation
    pub fn required_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| !p.is_optional())
            .map(|p| p.name())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_name() {
        assert_eq!(
            FunctionParameter::new("", false),
            Err(ParameterError::MissingName)
        );
    }

    #[test]
    fn test_rejects_invalid_characters() {
        for bad in ["has space", "dash-ed", "pipe|d", "curly}"] {
            assert_eq!(
                FunctionParameter::new(bad, false),
                Err(ParameterError::InvalidName(bad.to_string())),
            );
        }
    }

    #[test]
    fn test_accepts_alphanumeric_and_underscore() {
        for good in ["simple", "camelCase", "snake_case", "p2"] {
            assert!(FunctionParameter::new(good, false).is_ok());
        }
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut collection = FunctionParameterCollection::new();
        collection
            .add_parameter(FunctionParameter::new("p", false).unwrap())
            .unwrap();
        assert_eq!(
            collection.add_parameter(FunctionParameter::new("p", true).unwrap()),
            Err(ParameterError::DuplicateName("p".to_string())),
        );
    }

    #[test]
    fn test_duplicate_detection_is_case_sensitive() {
        let mut collection = FunctionParameterCollection::new();
        collection
            .add_parameter(FunctionParameter::new("param", false).unwrap())
            .unwrap();
        assert!(collection
            .add_parameter(FunctionParameter::new("Param", false).unwrap())
            .is_ok());
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut collection = FunctionParameterCollection::new();
        for name in ["c", "a", "b"] {
            collection
                .add_parameter(FunctionParameter::new(name, false).unwrap())
                .unwrap();
        }
        assert_eq!(collection.names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_required_names_skips_optional() {
        let mut collection = FunctionParameterCollection::new();
        collection
            .add_parameter(FunctionParameter::new("required", false).unwrap())
            .unwrap();
        collection
            .add_parameter(FunctionParameter::new("optional", true).unwrap())
            .unwrap();
        assert_eq!(collection.required_names(), vec!["required"]);
    }
}
