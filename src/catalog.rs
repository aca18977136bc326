//! Shared-function catalog parsing
//!
//! Turns raw function definitions (already-loaded structured data, shaped
//! like the YAML catalog entries) into a validated
//! [`SharedFunctionCollection`]. All structural validation happens here and
//! fails fast: unnamed functions, case-insensitive duplicate names,
//! duplicate parameter names, both-or-neither code/call bodies, verbatim
//! code reuse across functions, and malformed parameter definitions.
//!
//! Inline code is additionally checked by an external [`CodeValidator`]
//! with a fixed rule set; validator failures propagate with the owning
//! function's name attached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::argument::{ArgumentError, FunctionCallArgument, FunctionCallArgumentCollection};
use crate::error::quote_list;
use crate::function::{
    FunctionCall, FunctionCollectionError, SharedFunction, SharedFunctionCollection,
};
use crate::parameter::{FunctionParameter, FunctionParameterCollection, ParameterError};

// =============================================================================
// Raw definition shapes
// =============================================================================

/// One raw function definition as loaded from the catalog.
///
/// Exactly one of `code` and `call` must be present; `parameters` is kept
/// as a raw YAML value so its shape can be validated with a catalog-level
/// diagnostic instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFunctionData {
    pub name: String,
    #[serde(default)]
    pub parameters: Option<serde_yaml::Value>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "revertCode")]
    pub revert_code: Option<String>,
    #[serde(default)]
    pub call: Option<RawCallData>,
}

/// A call body: either a single call or a sequence of calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCallData {
    Single(RawFunctionCallData),
    Sequence(Vec<RawFunctionCallData>),
}

/// One raw call: target function name plus raw argument text per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFunctionCallData {
    pub function: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

// =============================================================================
// Code validator capability
// =============================================================================

/// The fixed rule set requested for inline code during catalog parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeValidationRule {
    NoEmptyLines,
    NoDuplicatedLines,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CodeValidationError {
    pub message: String,
}

/// External capability enforcing script-code rules; consumed during
/// function-definition parsing only, never implemented by this crate.
pub trait CodeValidator {
    fn validate(&self, code: &str, rules: &[CodeValidationRule])
        -> Result<(), CodeValidationError>;
}

// =============================================================================
// Errors
// =============================================================================

/// Structural failure while parsing the function catalog; always fatal to
/// loading that catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("some function(s) have no names (definition indices: {0:?})")]
    UnnamedFunctions(Vec<usize>),

    #[error("duplicate function name: {}", quote_list(.0))]
    DuplicateFunctionNames(Vec<String>),

    #[error("both \"code\" and \"call\" are defined in {}", quote_list(.0))]
    BothCodeAndCall(Vec<String>),

    #[error("neither \"code\" nor \"call\" is defined in {}", quote_list(.0))]
    NeitherCodeNorCall(Vec<String>),

    #[error("duplicate \"code\" across functions: {}", quote_list(.0))]
    DuplicateCode(Vec<String>),

    #[error("duplicate \"revertCode\" across functions: {}", quote_list(.0))]
    DuplicateRevertCode(Vec<String>),

    #[error("parameters must be an array of objects in function(s) {}", quote_list(.0))]
    InvalidParametersType(Vec<String>),

    #[error("invalid parameter definition in function \"{function}\": {message}")]
    InvalidParameterDefinition { function: String, message: String },

    #[error("failed to create parameter \"{parameter}\" for function \"{function}\"")]
    InvalidParameter {
        function: String,
        parameter: String,
        #[source]
        source: ParameterError,
    },

    #[error("invalid \"{stream}\" in function \"{function}\"")]
    InvalidCode {
        function: String,
        stream: &'static str,
        #[source]
        source: CodeValidationError,
    },

    #[error("invalid call in function \"{function}\": {message}")]
    InvalidCall { function: String, message: String },

    #[error(
        "invalid argument value for parameter \"{parameter}\" in function \"{function}\""
    )]
    InvalidCallArgument {
        function: String,
        parameter: String,
        #[source]
        source: ArgumentError,
    },

    #[error(transparent)]
    Collection(#[from] FunctionCollectionError),
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses and validates raw function definitions into a read-only,
/// queryable collection.
pub fn parse_functions(
    definitions: &[RawFunctionData],
    code_validator: &dyn CodeValidator,
) -> Result<SharedFunctionCollection, CatalogError> {
    let mut collection = SharedFunctionCollection::new();
    if definitions.is_empty() {
        return Ok(collection);
    }
    ensure_valid_definitions(definitions)?;
    for definition in definitions {
        let function = parse_function(definition, code_validator)?;
        collection.add_function(function)?;
    }
    debug!(functions = collection.len(), "parsed shared function catalog");
    Ok(collection)
}

fn parse_function(
    definition: &RawFunctionData,
    code_validator: &dyn CodeValidator,
) -> Result<SharedFunction, CatalogError> {
    let parameters = parse_parameters(definition)?;
    if let Some(code) = &definition.code {
        validate_code(definition, code_validator)?;
        return Ok(SharedFunction::with_inline_code(
            &definition.name,
            parameters,
            code,
            definition.revert_code.clone(),
        ));
    }
    let calls = parse_calls(definition)?;
    Ok(SharedFunction::with_calls(
        &definition.name,
        parameters,
        calls,
    ))
}

fn validate_code(
    definition: &RawFunctionData,
    code_validator: &dyn CodeValidator,
) -> Result<(), CatalogError> {
    let rules = [
        CodeValidationRule::NoEmptyLines,
        CodeValidationRule::NoDuplicatedLines,
    ];
    let streams = [
        ("code", definition.code.as_deref()),
        ("revertCode", definition.revert_code.as_deref()),
    ];
    for (stream, code) in streams {
        let Some(code) = code else { continue };
        code_validator
            .validate(code, &rules)
            .map_err(|source| CatalogError::InvalidCode {
                function: definition.name.clone(),
                stream,
                source,
            })?;
    }
    Ok(())
}

fn parse_parameters(
    definition: &RawFunctionData,
) -> Result<FunctionParameterCollection, CatalogError> {
    let mut collection = FunctionParameterCollection::new();
    let Some(parameters) = &definition.parameters else {
        return Ok(collection);
    };
    let serde_yaml::Value::Sequence(items) = parameters else {
        return Err(CatalogError::InvalidParametersType(vec![definition
            .name
            .clone()]));
    };
    for item in items {
        let serde_yaml::Value::Mapping(mapping) = item else {
            return Err(CatalogError::InvalidParametersType(vec![definition
                .name
                .clone()]));
        };
        let name = mapping
            .get("name")
            .and_then(serde_yaml::Value::as_str)
            .ok_or_else(|| CatalogError::InvalidParameterDefinition {
                function: definition.name.clone(),
                message: "parameter definition is missing a \"name\" string".to_string(),
            })?;
        let optional = mapping
            .get("optional")
            .and_then(serde_yaml::Value::as_bool)
            .unwrap_or(false);
        let parameter =
            FunctionParameter::new(name, optional).map_err(|source| {
                CatalogError::InvalidParameter {
                    function: definition.name.clone(),
                    parameter: name.to_string(),
                    source,
                }
            })?;
        collection
            .add_parameter(parameter)
            .map_err(|source| CatalogError::InvalidParameter {
                function: definition.name.clone(),
                parameter: name.to_string(),
                source,
            })?;
    }
    Ok(collection)
}

fn parse_calls(definition: &RawFunctionData) -> Result<Vec<FunctionCall>, CatalogError> {
    let raw_calls: Vec<&RawFunctionCallData> = match &definition.call {
        Some(RawCallData::Single(call)) => vec![call],
        Some(RawCallData::Sequence(calls)) => calls.iter().collect(),
        None => Vec::new(), // unreachable after ensure_valid_definitions
    };
    if raw_calls.is_empty() {
        return Err(CatalogError::InvalidCall {
            function: definition.name.clone(),
            message: "empty call sequence".to_string(),
        });
    }
    let mut calls = Vec::with_capacity(raw_calls.len());
    for raw_call in raw_calls {
        if raw_call.function.trim().is_empty() {
            return Err(CatalogError::InvalidCall {
                function: definition.name.clone(),
                message: "empty function name called".to_string(),
            });
        }
        let mut args = FunctionCallArgumentCollection::new();
        for (parameter, value) in &raw_call.parameters {
            let argument = FunctionCallArgument::new(parameter, value).map_err(|source| {
                CatalogError::InvalidCallArgument {
                    function: definition.name.clone(),
                    parameter: parameter.clone(),
                    source,
                }
            })?;
            args.add_argument(argument)
                .map_err(|source| CatalogError::InvalidCallArgument {
                    function: definition.name.clone(),
                    parameter: parameter.clone(),
                    source,
                })?;
        }
        calls.push(FunctionCall::new(&raw_call.function, args));
    }
    Ok(calls)
}

// =============================================================================
// Batch validation
// =============================================================================

fn ensure_valid_definitions(definitions: &[RawFunctionData]) -> Result<(), CatalogError> {
    ensure_no_unnamed_functions(definitions)?;
    ensure_no_duplicate_names(definitions)?;
    ensure_either_code_or_call(definitions)?;
    ensure_no_duplicate_code(definitions)?;
    ensure_expected_parameters_type(definitions)?;
    Ok(())
}

fn ensure_no_unnamed_functions(definitions: &[RawFunctionData]) -> Result<(), CatalogError> {
    let unnamed: Vec<usize> = definitions
        .iter()
        .enumerate()
        .filter(|(_, d)| d.name.trim().is_empty())
        .map(|(index, _)| index)
        .collect();
    if unnamed.is_empty() {
        return Ok(());
    }
    Err(CatalogError::UnnamedFunctions(unnamed))
}

fn ensure_no_duplicate_names(definitions: &[RawFunctionData]) -> Result<(), CatalogError> {
    let lowercased: Vec<String> = definitions.iter().map(|d| d.name.to_lowercase()).collect();
    let duplicates = find_duplicates(&lowercased);
    if duplicates.is_empty() {
        return Ok(());
    }
    Err(CatalogError::DuplicateFunctionNames(duplicates))
}

fn ensure_either_code_or_call(definitions: &[RawFunctionData]) -> Result<(), CatalogError> {
    let both: Vec<String> = definitions
        .iter()
        .filter(|d| d.code.is_some() && d.call.is_some())
        .map(|d| d.name.clone())
        .collect();
    if !both.is_empty() {
        return Err(CatalogError::BothCodeAndCall(both));
    }
    let neither: Vec<String> = definitions
        .iter()
        .filter(|d| d.code.is_none() && d.call.is_none())
        .map(|d| d.name.clone())
        .collect();
    if !neither.is_empty() {
        return Err(CatalogError::NeitherCodeNorCall(neither));
    }
    Ok(())
}

fn ensure_no_duplicate_code(definitions: &[RawFunctionData]) -> Result<(), CatalogError> {
    let owners_of_duplicated = |stream: fn(&RawFunctionData) -> Option<&str>| -> Vec<String> {
        let texts: Vec<&str> = definitions.iter().filter_map(stream).collect();
        let duplicated = find_duplicates(&texts);
        definitions
            .iter()
            .filter(|d| stream(d).is_some_and(|text| duplicated.iter().any(|dup| dup == text)))
            .map(|d| d.name.clone())
            .collect()
    };
    let duplicate_code = owners_of_duplicated(|d| d.code.as_deref());
    if !duplicate_code.is_empty() {
        return Err(CatalogError::DuplicateCode(duplicate_code));
    }
    let duplicate_revert = owners_of_duplicated(|d| d.revert_code.as_deref());
    if !duplicate_revert.is_empty() {
        return Err(CatalogError::DuplicateRevertCode(duplicate_revert));
    }
    Ok(())
}

fn ensure_expected_parameters_type(definitions: &[RawFunctionData]) -> Result<(), CatalogError> {
    let is_array_of_objects = |value: &serde_yaml::Value| match value {
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .all(|item| matches!(item, serde_yaml::Value::Mapping(_))),
        _ => false,
    };
    let unexpected: Vec<String> = definitions
        .iter()
        .filter(|d| d.parameters.as_ref().is_some_and(|p| !is_array_of_objects(p)))
        .map(|d| d.name.clone())
        .collect();
    if unexpected.is_empty() {
        return Ok(());
    }
    Err(CatalogError::InvalidParametersType(unexpected))
}

fn find_duplicates<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    let mut duplicates = Vec::new();
    for (index, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        let seen_before = texts[..index].iter().any(|other| other.as_ref() == text);
        if seen_before && !duplicates.iter().any(|d: &String| d == text) {
            duplicates.push(text.to_string());
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionBody;
    use pretty_assertions::assert_eq;

    struct AcceptAllValidator;

    impl CodeValidator for AcceptAllValidator {
        fn validate(
            &self,
            _code: &str,
            _rules: &[CodeValidationRule],
        ) -> Result<(), CodeValidationError> {
            Ok(())
        }
    }

    struct RejectAllValidator;

    impl CodeValidator for RejectAllValidator {
        fn validate(
            &self,
            _code: &str,
            rules: &[CodeValidationRule],
        ) -> Result<(), CodeValidationError> {
            assert_eq!(
                rules,
                &[
                    CodeValidationRule::NoEmptyLines,
                    CodeValidationRule::NoDuplicatedLines
                ]
            );
            Err(CodeValidationError {
                message: "rejected by stub".to_string(),
            })
        }
    }

    fn code_function(name: &str, code: &str) -> RawFunctionData {
        RawFunctionData {
            name: name.to_string(),
            parameters: None,
            code: Some(code.to_string()),
            revert_code: None,
            call: None,
        }
    }

    fn parse(definitions: &[RawFunctionData]) -> Result<SharedFunctionCollection, CatalogError> {
        parse_functions(definitions, &AcceptAllValidator)
    }

    #[test]
    fn test_empty_definitions_yield_empty_collection() {
        assert!(parse(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parses_inline_code_function() {
        let collection = parse(&[code_function("Func", "echo hi")]).unwrap();
        let function = collection.get_function("Func").unwrap();
        assert_eq!(
            *function.body(),
            FunctionBody::Code {
                execute: "echo hi".to_string(),
                revert: None,
            }
        );
    }

    #[test]
    fn test_parses_call_sequence_from_yaml() {
        let yaml = r#"
- name: Leaf
  code: echo leaf
- name: Caller
  parameters:
    - name: text
  call:
    - function: Leaf
"#;
        let definitions: Vec<RawFunctionData> = serde_yaml::from_str(yaml).unwrap();
        let collection = parse(&definitions).unwrap();
        let caller = collection.get_function("Caller").unwrap();
        match caller.body() {
            FunctionBody::Calls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].function_name(), "Leaf");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_single_call_object_is_accepted() {
        let yaml = r#"
- name: Leaf
  code: echo leaf
- name: Caller
  call:
    function: Leaf
    parameters:
      text: value
"#;
        let definitions: Vec<RawFunctionData> = serde_yaml::from_str(yaml).unwrap();
        let collection = parse(&definitions).unwrap();
        match collection.get_function("Caller").unwrap().body() {
            FunctionBody::Calls(calls) => {
                assert_eq!(calls[0].args().get_argument("text").unwrap().value(), "value");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unnamed_functions() {
        let result = parse(&[code_function("  ", "echo hi")]);
        assert!(matches!(
            result.unwrap_err(),
            CatalogError::UnnamedFunctions(indices) if indices == vec![0]
        ));
    }

    #[test]
    fn test_rejects_case_insensitive_duplicate_names() {
        let result = parse(&[code_function("X", "echo a"), code_function("x", "echo b")]);
        assert!(matches!(
            result.unwrap_err(),
            CatalogError::DuplicateFunctionNames(names) if names == vec!["x"]
        ));
    }

    #[test]
    fn test_rejects_both_code_and_call() {
        let mut definition = code_function("Func", "echo hi");
        definition.call = Some(RawCallData::Sequence(vec![RawFunctionCallData {
            function: "Other".to_string(),
            parameters: BTreeMap::new(),
        }]));
        assert!(matches!(
            parse(&[definition]).unwrap_err(),
            CatalogError::BothCodeAndCall(names) if names == vec!["Func"]
        ));
    }

    #[test]
    fn test_rejects_neither_code_nor_call() {
        let definition = RawFunctionData {
            name: "Func".to_string(),
            parameters: None,
            code: None,
            revert_code: None,
            call: None,
        };
        assert!(matches!(
            parse(&[definition]).unwrap_err(),
            CatalogError::NeitherCodeNorCall(names) if names == vec!["Func"]
        ));
    }

    #[test]
    fn test_rejects_verbatim_code_reuse() {
        let result = parse(&[
            code_function("First", "same code"),
            code_function("Second", "same code"),
        ]);
        assert!(matches!(
            result.unwrap_err(),
            CatalogError::DuplicateCode(names) if names == vec!["First", "Second"]
        ));
    }

    #[test]
    fn test_rejects_verbatim_revert_code_reuse() {
        let mut first = code_function("First", "code a");
        first.revert_code = Some("same revert".to_string());
        let mut second = code_function("Second", "code b");
        second.revert_code = Some("same revert".to_string());
        assert!(matches!(
            parse(&[first, second]).unwrap_err(),
            CatalogError::DuplicateRevertCode(names) if names == vec!["First", "Second"]
        ));
    }

    #[test]
    fn test_rejects_non_array_parameters() {
        let mut definition = code_function("Func", "echo hi");
        definition.parameters = Some(serde_yaml::Value::String("not an array".to_string()));
        assert!(matches!(
            parse(&[definition]).unwrap_err(),
            CatalogError::InvalidParametersType(names) if names == vec!["Func"]
        ));
    }

    #[test]
    fn test_rejects_array_of_non_objects() {
        let mut definition = code_function("Func", "echo hi");
        definition.parameters =
            Some(serde_yaml::from_str("[\"just a string\"]").unwrap());
        assert!(matches!(
            parse(&[definition]).unwrap_err(),
            CatalogError::InvalidParametersType(names) if names == vec!["Func"]
        ));
    }

    #[test]
    fn test_rejects_duplicate_parameter_names_with_function_context() {
        let mut definition = code_function("Func", "echo hi");
        definition.parameters =
            Some(serde_yaml::from_str("[{name: p}, {name: p}]").unwrap());
        match parse(&[definition]).unwrap_err() {
            CatalogError::InvalidParameter {
                function,
                parameter,
                source,
            } => {
                assert_eq!(function, "Func");
                assert_eq!(parameter, "p");
                assert_eq!(source, ParameterError::DuplicateName("p".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parses_optional_flag() {
        let yaml = r#"
- name: Func
  parameters:
    - name: required_one
    - name: optional_one
      optional: true
  code: echo hi
"#;
        let definitions: Vec<RawFunctionData> = serde_yaml::from_str(yaml).unwrap();
        let collection = parse(&definitions).unwrap();
        let function = collection.get_function("Func").unwrap();
        assert_eq!(
            function.parameters().required_names(),
            vec!["required_one"]
        );
    }

    #[test]
    fn test_code_validator_failure_carries_function_name() {
        let result = parse_functions(&[code_function("Func", "echo hi")], &RejectAllValidator);
        match result.unwrap_err() {
            CatalogError::InvalidCode {
                function, stream, ..
            } => {
                assert_eq!(function, "Func");
                assert_eq!(stream, "code");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_empty_call_sequence() {
        let definition = RawFunctionData {
            name: "Caller".to_string(),
            parameters: None,
            code: None,
            revert_code: None,
            call: Some(RawCallData::Sequence(Vec::new())),
        };
        assert!(matches!(
            parse(&[definition]).unwrap_err(),
            CatalogError::InvalidCall { function, .. } if function == "Caller"
        ));
    }

    #[test]
    fn test_rejects_empty_call_argument_value() {
        let mut parameters = BTreeMap::new();
        parameters.insert("p".to_string(), String::new());
        let definition = RawFunctionData {
            name: "Caller".to_string(),
            parameters: None,
            code: None,
            revert_code: None,
            call: Some(RawCallData::Sequence(vec![RawFunctionCallData {
                function: "Leaf".to_string(),
                parameters,
            }])),
        };
        assert!(matches!(
            parse(&[definition]).unwrap_err(),
            CatalogError::InvalidCallArgument { function, parameter, .. }
                if function == "Caller" && parameter == "p"
        ));
    }
}
