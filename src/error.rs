use std::fmt::{self, Display, Formatter, Write};

use itertools::Itertools;

use crate::definitions::{OperationKind, TypeKind};

/// Returns "1st", "2nd", "3rd", "4th", ... with the usual teens exception.
pub(crate) fn number_to_ordinal(number: usize) -> String {
    match number % 100 {
        11..=13 => format!("{number}th"),
        _ => match number % 10 {
            1 => format!("{number}st"),
            2 => format!("{number}nd"),
            3 => format!("{number}rd"),
            _ => format!("{number}th"),
        },
    }
}

pub(crate) fn quote_join(names: &[String]) -> String {
    names.iter().map(|name| format!("\"{name}\"")).join(", ")
}

/// A single composition error. Errors are plain values: they are accumulated
/// into ordered lists and never used for control flow.
///
/// Each variant corresponds to one error family; the `Display` text is stable
/// and is the message surfaced to users, so tests may pin it.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("{}", render_invalid_subgraph_names(.duplicate_names, .unnamed_ordinals))]
    InvalidSubgraphNames {
        duplicate_names: Vec<String>,
        /// 1-based positions of subgraphs that did not define a name.
        unnamed_ordinals: Vec<usize>,
    },

    #[error("The subgraph has syntax errors and could not be parsed:\n{message}")]
    UnparsableSubgraph { message: String },

    #[error("The {kind} \"{type_name}\" must only be defined once.")]
    DuplicateTypeDefinition { kind: TypeKind, type_name: String },

    #[error("The directive \"{directive_name}\" must only be defined once.")]
    DuplicateDirectiveDefinition { directive_name: String },

    #[error("The {kind} \"{type_name}\" must only define the field definition \"{field_name}\" once.")]
    DuplicateFieldDefinition {
        kind: TypeKind,
        type_name: String,
        field_name: String,
    },

    #[error("The Input Object \"{type_name}\" must only define the input field definition \"{field_name}\" once.")]
    DuplicateInputFieldDefinition { type_name: String, field_name: String },

    #[error("The Enum \"{type_name}\" must only define the value \"{value_name}\" once.")]
    DuplicateEnumValueDefinition { type_name: String, value_name: String },

    #[error("The Union \"{type_name}\" must only define the member \"{member_name}\" once.")]
    DuplicateUnionMemberDefinition { type_name: String, member_name: String },

    #[error("The {kind} \"{type_name}\" must only implement the interface \"{interface_name}\" once.")]
    DuplicateImplementedInterface {
        kind: TypeKind,
        type_name: String,
        interface_name: String,
    },

    #[error(
        "The operation type \"{operation_type}\" cannot be defined as \"{new_type_name}\" \
         because it has already been defined as \"{old_type_name}\"."
    )]
    DuplicateOperationTypeDefinition {
        operation_type: OperationKind,
        new_type_name: String,
        old_type_name: String,
    },

    #[error(
        "The {kind} \"{type_name}\" is an extension, but no base {kind} definition \
         of \"{type_name}\" is defined in the subgraph."
    )]
    NoBaseTypeExtension { kind: TypeKind, type_name: String },

    #[error(
        "The Scalar extension \"{type_name}\" is invalid because no base Scalar definition \
         of \"{type_name}\" is defined in the subgraph."
    )]
    NoBaseScalarDefinition { type_name: String },

    #[error("The {kind} \"{type_name}\" must define at least one field.")]
    NoFieldDefinitions { kind: TypeKind, type_name: String },

    #[error("The Input Object \"{type_name}\" must define at least one input field.")]
    NoInputValueDefinitions { type_name: String },

    #[error("The Enum \"{type_name}\" must define at least one value.")]
    NoDefinedEnumValues { type_name: String },

    #[error("The Union \"{type_name}\" must define at least one member.")]
    NoDefinedUnionMembers { type_name: String },

    #[error("The type \"{type_name}\" was referenced in the schema, but it was never defined.")]
    UndefinedType { type_name: String },

    #[error(
        "The directive \"@{directive_name}\" declared on \"{host_path}\" was never defined."
    )]
    UndefinedDirective {
        directive_name: String,
        host_path: String,
    },

    #[error("{}", render_invalid_directive(.directive_name, .host_path, .ordinal, .errors))]
    InvalidDirective {
        directive_name: String,
        host_path: String,
        /// Which repeated application failed, when the directive is repeatable
        /// and declared more than once on the host.
        ordinal: Option<usize>,
        errors: Vec<String>,
    },

    #[error("{}", render_invalid_field_shareability(.type_name, .field_errors))]
    InvalidFieldShareability {
        type_name: String,
        /// One entry per non-shareable field: (field name, defining subgraphs,
        /// subgraphs in which the field is not shareable).
        field_errors: Vec<ShareabilityFieldError>,
    },

    #[error(
        "The subgraph \"{target_subgraph_name}\" is named as an @override target on \
         \"{host_path}\", but no subgraph of that name is part of the composition."
    )]
    InvalidOverrideTargetSubgraphName {
        target_subgraph_name: String,
        host_path: String,
    },

    #[error("{}", render_duplicate_overridden_fields(.field_errors))]
    DuplicateOverriddenFields {
        /// (field path, subgraphs that each declare @override on the field)
        field_errors: Vec<(String, Vec<String>)>,
    },

    #[error(
        "The type \"{type_name}\" is defined as the kind \"{actual_kind}\" in the subgraph \
         \"{subgraph_name}\", but it was already defined as the kind \"{expected_kind}\"."
    )]
    IncompatibleParentKind {
        type_name: String,
        expected_kind: TypeKind,
        actual_kind: TypeKind,
        subgraph_name: String,
    },

    #[error(
        "The field \"{field_path}\" is defined with the incompatible types \
         \"{expected_type}\" and \"{actual_type}\" across subgraphs."
    )]
    IncompatibleFieldTypes {
        field_path: String,
        expected_type: String,
        actual_type: String,
    },

    #[error(
        "The argument \"{argument_name}\" of \"{host_path}\" is defined with the incompatible \
         types \"{expected_type}\" and \"{actual_type}\" across subgraphs."
    )]
    IncompatibleArgumentTypes {
        argument_name: String,
        host_path: String,
        expected_type: String,
        actual_type: String,
    },

    #[error(
        "Expected the {prefix} defined on path \"{path}\" to define the default value \
         \"{expected_default}\". However, the default value \"{actual_default}\" is defined in \
         the following subgraph{}: {}. If an instance defines a default value, that default \
         value must be consistently defined across all subgraphs.",
        if .subgraph_names.len() > 1 { "s" } else { "" },
        quote_join(.subgraph_names)
    )]
    IncompatibleInputValueDefaultValues {
        prefix: String,
        path: String,
        subgraph_names: Vec<String>,
        expected_default: String,
        actual_default: String,
    },

    #[error("{}", render_invalid_required_input_value(.kind, .path, .missing))]
    InvalidRequiredInputValue {
        kind: RequiredInputValueKind,
        path: String,
        missing: Vec<MissingRequiredInputValue>,
    },

    #[error(
        "Enum \"{parent_name}\" was used as both an input and output but was inconsistently \
         defined across inclusive subgraphs."
    )]
    IncompatibleSharedEnum { parent_name: String },

    #[error("{}", render_unimplemented_interface_fields(.type_name, .kind, .by_interface))]
    UnimplementedInterfaceFields {
        type_name: String,
        kind: TypeKind,
        by_interface: Vec<InterfaceImplementationErrors>,
    },

    #[error("{}", render_undefined_entity_interface_implementations(.interface_name, .missing_by_subgraph))]
    UndefinedEntityInterfaceImplementations {
        interface_name: String,
        /// Per subgraph, the concrete type names missing relative to the
        /// union of implementers declared across all subgraphs.
        missing_by_subgraph: Vec<(String, Vec<String>)>,
    },

    #[error("{}", render_unresolvable_field(.root_field_path, .field_name, .parent_type_name, .path_segments, .defining_subgraph_names))]
    UnresolvableField {
        root_field_path: String,
        field_name: String,
        parent_type_name: String,
        /// The field path from the root field down to the unresolvable field.
        path_segments: Vec<String>,
        /// Subgraphs in which the field is defined but cannot be reached.
        defining_subgraph_names: Vec<String>,
    },

    #[error(
        "All field definitions of the {kind} \"{type_name}\" are declared @inaccessible, \
         so the type defines no client-facing fields."
    )]
    AllFieldDefinitionsAreInaccessible { kind: TypeKind, type_name: String },

    #[error(
        "The description of \"{path}\" is configured to propagate from more than one subgraph \
         with conflicting content. Conflicting subgraphs: {}.",
        quote_join(.subgraph_names)
    )]
    DescriptionPropagationConflict {
        path: String,
        subgraph_names: Vec<String>,
    },

    #[error("{}", render_subgraph_validation_failure(.subgraph_name, .errors))]
    SubgraphValidationFailure {
        subgraph_name: String,
        errors: Vec<CompositionError>,
    },
}

#[derive(Clone, Debug)]
pub struct ShareabilityFieldError {
    pub field_name: String,
    pub defining_subgraph_names: Vec<String>,
    pub non_shareable_subgraph_names: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct MissingRequiredInputValue {
    pub name: String,
    pub required_subgraph_names: Vec<String>,
    pub omitted_subgraph_names: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum RequiredInputValueKind {
    #[display(fmt = "argument")]
    Argument,
    #[display(fmt = "input field")]
    InputField,
}

/// Per-interface breakdown used by `UnimplementedInterfaceFields`.
#[derive(Clone, Debug)]
pub struct InterfaceImplementationErrors {
    pub interface_name: String,
    pub unimplemented_fields: Vec<String>,
    pub invalid_field_implementations: Vec<String>,
}

fn render_invalid_subgraph_names(duplicate_names: &[String], unnamed_ordinals: &[usize]) -> String {
    let mut message = String::from("Subgraphs to be federated must each have a unique, non-empty name.");
    if !duplicate_names.is_empty() {
        write!(
            message,
            "\n The following subgraph names are not unique: {}.",
            quote_join(duplicate_names)
        )
        .ok();
    }
    for ordinal in unnamed_ordinals {
        write!(
            message,
            "\n The {} subgraph in the batch did not define a name. Consequently, any further \
             errors will temporarily identify this subgraph as \"subgraph-{ordinal}\".",
            number_to_ordinal(*ordinal)
        )
        .ok();
    }
    message
}

fn render_invalid_directive(
    directive_name: &str,
    host_path: &str,
    ordinal: &Option<usize>,
    errors: &[String],
) -> String {
    let mut message = match ordinal {
        Some(ordinal) => format!(
            "The {} application of the directive \"@{directive_name}\" on \"{host_path}\" is invalid for the following reason(s):",
            number_to_ordinal(*ordinal)
        ),
        None => format!(
            "The directive \"@{directive_name}\" declared on \"{host_path}\" is invalid for the following reason(s):"
        ),
    };
    for error in errors {
        write!(message, "\n - {error}").ok();
    }
    message
}

fn render_invalid_field_shareability(type_name: &str, field_errors: &[ShareabilityFieldError]) -> String {
    let mut message = format!(
        "The object \"{type_name}\" defines the same field in multiple subgraphs without a \
         resolution through @shareable or @override:"
    );
    for field_error in field_errors {
        write!(
            message,
            "\n The field \"{}\" is defined in the following subgraphs: {}.",
            field_error.field_name,
            quote_join(&field_error.defining_subgraph_names)
        )
        .ok();
        write!(
            message,
            "\n  However, it is not declared @shareable in the following subgraph{}: {}.",
            if field_error.non_shareable_subgraph_names.len() > 1 { "s" } else { "" },
            quote_join(&field_error.non_shareable_subgraph_names)
        )
        .ok();
    }
    message
}

fn render_duplicate_overridden_fields(field_errors: &[(String, Vec<String>)]) -> String {
    let mut message = String::from("A field may only be overridden by a single subgraph:");
    for (field_path, subgraph_names) in field_errors {
        write!(
            message,
            "\n The field \"{field_path}\" declares @override in the following subgraphs: {}.",
            quote_join(subgraph_names)
        )
        .ok();
    }
    message
}

fn render_invalid_required_input_value(
    kind: &RequiredInputValueKind,
    path: &str,
    missing: &[MissingRequiredInputValue],
) -> String {
    let mut message = format!(
        "The following required {kind}{} of \"{path}\" must be defined in all subgraphs that \
         define \"{path}\":",
        if missing.len() > 1 { "s" } else { "" },
    );
    for entry in missing {
        write!(
            message,
            "\n The {kind} \"{}\" is required in the following subgraph{}: {}.",
            entry.name,
            if entry.required_subgraph_names.len() > 1 { "s" } else { "" },
            quote_join(&entry.required_subgraph_names)
        )
        .ok();
        write!(
            message,
            "\n  However, it is not defined in the following subgraph{}: {}.",
            if entry.omitted_subgraph_names.len() > 1 { "s" } else { "" },
            quote_join(&entry.omitted_subgraph_names)
        )
        .ok();
    }
    message
}

fn render_unimplemented_interface_fields(
    type_name: &str,
    kind: &TypeKind,
    by_interface: &[InterfaceImplementationErrors],
) -> String {
    let mut message = format!("The {kind} \"{type_name}\" has the following interface implementation errors:");
    for interface_errors in by_interface {
        if !interface_errors.unimplemented_fields.is_empty() {
            write!(
                message,
                "\n The following field{} of the interface \"{}\" {} not implemented: {}.",
                if interface_errors.unimplemented_fields.len() > 1 { "s" } else { "" },
                interface_errors.interface_name,
                if interface_errors.unimplemented_fields.len() > 1 { "are" } else { "is" },
                quote_join(&interface_errors.unimplemented_fields)
            )
            .ok();
        }
        for invalid in &interface_errors.invalid_field_implementations {
            write!(
                message,
                "\n Invalid implementation of the interface \"{}\": {invalid}",
                interface_errors.interface_name
            )
            .ok();
        }
    }
    message
}

fn render_undefined_entity_interface_implementations(
    interface_name: &str,
    missing_by_subgraph: &[(String, Vec<String>)],
) -> String {
    let mut message = format!(
        "The entity interface \"{interface_name}\" must be implemented by the same concrete \
         types in every subgraph that defines it:"
    );
    for (subgraph_name, missing) in missing_by_subgraph {
        write!(
            message,
            "\n The subgraph \"{subgraph_name}\" does not declare the following implementation{}: {}.",
            if missing.len() > 1 { "s" } else { "" },
            quote_join(missing)
        )
        .ok();
    }
    message
}

fn render_unresolvable_field(
    root_field_path: &str,
    field_name: &str,
    parent_type_name: &str,
    path_segments: &[String],
    defining_subgraph_names: &[String],
) -> String {
    let mut message = format!(
        "The field \"{parent_type_name}.{field_name}\" is unresolvable from the root field \
         \"{root_field_path}\" at path \"{}\".",
        path_segments.join(".")
    );
    if !defining_subgraph_names.is_empty() {
        write!(
            message,
            "\n The field is defined in the following subgraph{}: {}. However, no sequence of \
             subgraph calls from the root field can reach a subgraph in which it is resolvable.",
            if defining_subgraph_names.len() > 1 { "s" } else { "" },
            quote_join(defining_subgraph_names)
        )
        .ok();
    }
    message
}

fn render_subgraph_validation_failure(subgraph_name: &str, errors: &[CompositionError]) -> String {
    let mut message = format!(
        "The subgraph \"{subgraph_name}\" could not be federated for the following reason(s):"
    );
    for error in errors {
        write!(message, "\n - ").ok();
        for c in error.to_string().chars() {
            if c == '\n' {
                message.push_str("\n   ");
            } else {
                message.push(c);
            }
        }
    }
    message
}

/// An ordered, non-empty collection of composition errors, as returned by a
/// failed composition run.
#[derive(Clone, Debug, Default)]
pub struct CompositionErrors {
    errors: Vec<CompositionError>,
}

impl CompositionErrors {
    pub(crate) fn new(errors: Vec<CompositionError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[CompositionError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl IntoIterator for CompositionErrors {
    type Item = CompositionError;
    type IntoIter = std::vec::IntoIter<CompositionError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl Display for CompositionErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "The following errors occurred during composition:")?;
        for error in &self.errors {
            write!(f, "\n\n  - ")?;
            for c in error.to_string().chars() {
                if c == '\n' {
                    write!(f, "\n    ")?;
                } else {
                    f.write_char(c)?;
                }
            }
        }
        Ok(())
    }
}

/// A non-fatal observation surfaced alongside a successful (or failed)
/// composition run. Warnings never block composition.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CompositionWarning {
    #[error(
        "The subgraph \"{subgraph_name}\" declares the routing URL \"{url}\", which is not a \
         valid URL."
    )]
    InvalidRoutingUrl { subgraph_name: String, url: String },

    #[error(
        "The field \"{field_path}\" in the subgraph \"{subgraph_name}\" declares an @override \
         targeting its own subgraph; the directive has no effect and was discarded."
    )]
    EquivalentSourceAndTargetOverride {
        subgraph_name: String,
        field_path: String,
    },

    #[error(
        "The description of \"{path}\" was dropped from the federated schema because no \
         defining subgraph propagates one."
    )]
    DescriptionDropped { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals() {
        assert_eq!(number_to_ordinal(1), "1st");
        assert_eq!(number_to_ordinal(2), "2nd");
        assert_eq!(number_to_ordinal(3), "3rd");
        assert_eq!(number_to_ordinal(4), "4th");
        assert_eq!(number_to_ordinal(11), "11th");
        assert_eq!(number_to_ordinal(12), "12th");
        assert_eq!(number_to_ordinal(13), "13th");
        assert_eq!(number_to_ordinal(21), "21st");
        assert_eq!(number_to_ordinal(112), "112th");
    }

    #[test]
    fn unnamed_subgraphs_are_cited_by_ordinal() {
        let error = CompositionError::InvalidSubgraphNames {
            duplicate_names: vec![],
            unnamed_ordinals: vec![1, 2],
        };
        let message = error.to_string();
        assert!(message.contains("The 1st subgraph"), "{message}");
        assert!(message.contains("The 2nd subgraph"), "{message}");
        assert!(message.contains("subgraph-1"), "{message}");
        assert!(message.contains("subgraph-2"), "{message}");
    }

    #[test]
    fn nested_subgraph_errors_are_indented() {
        let inner = CompositionError::UndefinedType {
            type_name: "Missing".to_owned(),
        };
        let outer = CompositionError::SubgraphValidationFailure {
            subgraph_name: "reviews".to_owned(),
            errors: vec![inner],
        };
        let message = outer.to_string();
        assert!(message.starts_with("The subgraph \"reviews\""), "{message}");
        assert!(message.contains("\n - The type \"Missing\""), "{message}");
    }
}
