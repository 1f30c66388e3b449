//! The dedicated sub-parser for the selection-set strings embedded in
//! `@key(fields:)`, `@provides(fields:)` and `@requires(fields:)`.
//!
//! The grammar is a strict subset of GraphQL selection sets: bare field names
//! and nested `{ ... }` groups, no arguments, aliases or fragments. Keeping
//! it as its own recursive-descent parser avoids dragging the full document
//! parser into what is a handful of tokens per directive.

use std::fmt::{self, Display, Formatter};

use indexmap::{IndexMap, IndexSet};
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, verify},
    multi::many1,
    sequence::{delimited, preceded, terminated},
    IResult,
};

use crate::definitions::{SubgraphDefinition, TypeKind};

/// One selected field, optionally carrying a nested sub-selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Selection {
    pub(crate) field_name: String,
    pub(crate) selection_set: Option<SelectionSet>,
}

/// An ordered list of selections. `Display` renders the canonical
/// single-space form used for key equality and de-duplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SelectionSet(pub(crate) Vec<Selection>);

impl Display for SelectionSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, selection) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", selection.field_name)?;
            if let Some(nested) = &selection.selection_set {
                write!(f, " {{ {nested} }}")?;
            }
        }
        Ok(())
    }
}

fn field_name(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        |name: &str| !name.starts_with(|c: char| c.is_ascii_digit()),
    )(input)
}

fn selection(input: &str) -> IResult<&str, Selection> {
    let (input, name) = preceded(multispace0, field_name)(input)?;
    let (input, nested) = opt(preceded(
        multispace0,
        delimited(char('{'), selection_set, preceded(multispace0, char('}'))),
    ))(input)?;
    Ok((
        input,
        Selection {
            field_name: name.to_owned(),
            selection_set: nested,
        },
    ))
}

fn selection_set(input: &str) -> IResult<&str, SelectionSet> {
    map(many1(selection), SelectionSet)(input)
}

/// Parses a raw field-set string. The input is the bare selection list,
/// without enclosing braces. Syntax failures echo the offending input.
pub(crate) fn parse_field_set(input: &str) -> Result<SelectionSet, String> {
    match all_consuming(terminated(selection_set, multispace0))(input) {
        Ok((_, set)) => Ok(set),
        Err(_) => Err(format!(
            "The field set \"{input}\" is not a valid selection set: expected field names and \
             balanced nested selections."
        )),
    }
}

/// Which directive a field set is being validated for; the rules differ
/// slightly per host directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldSetContext {
    Key,
    Provides,
    Requires,
}

/// The outcome of validating one field set against the (possibly still
/// partially built) subgraph registry.
#[derive(Debug, Default)]
pub(crate) struct FieldSetValidation {
    pub(crate) errors: Vec<String>,
    /// `@external` fields referenced by a `@key`; these become first-class
    /// for router addressing and are promoted into the type's field-name set.
    pub(crate) external_key_field_names_by_type: IndexMap<String, IndexSet<String>>,
    /// Every field referenced by a `@key`, per parent type. Key fields are
    /// implicitly shareable across subgraphs.
    pub(crate) key_field_names_by_type: IndexMap<String, IndexSet<String>>,
}

/// Validates every path of `selection_set` against the registry, starting at
/// `root_type_name`. Errors accumulate across the whole set; the caller
/// batches them under one parent error per directive application.
pub(crate) fn validate_field_set(
    definitions: &IndexMap<String, SubgraphDefinition>,
    root_type_name: &str,
    selection_set: &SelectionSet,
    context: FieldSetContext,
) -> FieldSetValidation {
    let mut validation = FieldSetValidation::default();
    walk_selection_set(definitions, root_type_name, selection_set, context, &mut validation);
    validation
}

fn walk_selection_set(
    definitions: &IndexMap<String, SubgraphDefinition>,
    parent_type_name: &str,
    selection_set: &SelectionSet,
    context: FieldSetContext,
    validation: &mut FieldSetValidation,
) {
    let fields = match definitions.get(parent_type_name) {
        Some(SubgraphDefinition::Object(data)) | Some(SubgraphDefinition::Interface(data)) => &data.fields,
        Some(other) => {
            validation.errors.push(format!(
                "The type \"{parent_type_name}\" is a {}, so it cannot host a field selection.",
                other.kind()
            ));
            return;
        }
        None => {
            validation.errors.push(format!(
                "The type \"{parent_type_name}\" referenced by the field set is not defined in the subgraph."
            ));
            return;
        }
    };
    let mut seen = IndexSet::new();
    for selection in &selection_set.0 {
        if !seen.insert(selection.field_name.as_str()) {
            validation.errors.push(format!(
                "The field \"{parent_type_name}.{}\" is selected more than once at the same level.",
                selection.field_name
            ));
            continue;
        }
        let Some(field) = fields.get(&selection.field_name) else {
            validation.errors.push(format!(
                "The field \"{}\" does not exist on the type \"{parent_type_name}\".",
                selection.field_name
            ));
            continue;
        };
        if context == FieldSetContext::Key {
            validation
                .key_field_names_by_type
                .entry(parent_type_name.to_owned())
                .or_default()
                .insert(selection.field_name.clone());
            if !field.arguments.is_empty() {
                validation.errors.push(format!(
                    "The field \"{parent_type_name}.{}\" cannot be part of a key because it defines arguments.",
                    selection.field_name
                ));
            }
            if field.is_external {
                // External key fields stay router-addressable even though the
                // subgraph cannot resolve them independently.
                validation
                    .external_key_field_names_by_type
                    .entry(parent_type_name.to_owned())
                    .or_default()
                    .insert(selection.field_name.clone());
            }
        }
        let named_type = field.ty.inner_named_type().as_str();
        let named_definition = definitions.get(named_type);
        let is_composite = matches!(
            named_definition,
            Some(SubgraphDefinition::Object(_)) | Some(SubgraphDefinition::Interface(_))
        );
        match &selection.selection_set {
            Some(nested) => {
                if is_composite {
                    walk_selection_set(definitions, named_type, nested, context, validation);
                } else {
                    let kind = named_definition
                        .map(SubgraphDefinition::kind)
                        .unwrap_or(TypeKind::Scalar);
                    validation.errors.push(format!(
                        "The field \"{parent_type_name}.{}\" returns \"{named_type}\", which is a \
                         {kind}, so it cannot define a nested selection set.",
                        selection.field_name
                    ));
                }
            }
            None => {
                if is_composite {
                    validation.errors.push(format!(
                        "The field \"{parent_type_name}.{}\" returns the composite type \
                         \"{named_type}\", so it must define a nested selection set.",
                        selection.field_name
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_selection() {
        let set = parse_field_set("id  name").unwrap();
        assert_eq!(set.to_string(), "id name");
    }

    #[test]
    fn parses_nested_selection() {
        let set = parse_field_set("id organization { id details { id } }").unwrap();
        assert_eq!(set.to_string(), "id organization { id details { id } }");
    }

    #[test]
    fn canonical_form_collapses_whitespace() {
        let set = parse_field_set("  id\n  organization   {\n    id\n  }\n").unwrap();
        assert_eq!(set.to_string(), "id organization { id }");
    }

    #[test]
    fn rejects_unbalanced_braces() {
        let error = parse_field_set("id organization {").unwrap_err();
        assert!(error.contains("id organization {"), "{error}");
    }

    #[test]
    fn rejects_empty_selection() {
        assert!(parse_field_set("").is_err());
        assert!(parse_field_set("   ").is_err());
        assert!(parse_field_set("id child { }").is_err());
    }

    #[test]
    fn rejects_leading_digit_names() {
        assert!(parse_field_set("1d").is_err());
    }
}
