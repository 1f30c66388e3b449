//! The fixed federation directive-definition table and the per-application
//! directive validator.
//!
//! Every directive usage in a subgraph is checked against this table (or the
//! subgraph's own directive definitions): declared location, repeatability,
//! required/optional arguments and argument value kinds. All sub-errors for
//! one application on one host element are batched into a single
//! `InvalidDirective` error.

use apollo_compiler::ast;
use apollo_compiler::schema::Name;
use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::error::CompositionError;

pub(crate) const KEY: &str = "key";
pub(crate) const EXTERNAL: &str = "external";
pub(crate) const SHAREABLE: &str = "shareable";
pub(crate) const OVERRIDE: &str = "override";
pub(crate) const PROVIDES: &str = "provides";
pub(crate) const REQUIRES: &str = "requires";
pub(crate) const INTERFACE_OBJECT: &str = "interfaceObject";
pub(crate) const TAG: &str = "tag";
pub(crate) const INACCESSIBLE: &str = "inaccessible";
pub(crate) const AUTHENTICATED: &str = "authenticated";
pub(crate) const REQUIRES_SCOPES: &str = "requiresScopes";
pub(crate) const CONFIGURE_DESCRIPTION: &str = "configureDescription";
pub(crate) const DEPRECATED: &str = "deprecated";
pub(crate) const SPECIFIED_BY: &str = "specifiedBy";
pub(crate) const EXTENDS: &str = "extends";

pub(crate) const FIELD_SET_SCALAR: &str = "openfed__FieldSet";
pub(crate) const SCOPE_SCALAR: &str = "openfed__Scope";

pub(crate) const BUILT_IN_SCALARS: [&str; 5] = ["ID", "String", "Boolean", "Int", "Float"];

/// Constructs an AST name from a string already known to be a valid GraphQL
/// name (registry keys all originate from parsed documents).
pub(crate) fn ast_name(value: &str) -> Name {
    Name::new_unchecked(value.into())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub(crate) enum DirectiveLocationKind {
    #[strum(to_string = "SCHEMA")]
    Schema,
    #[strum(to_string = "SCALAR")]
    Scalar,
    #[strum(to_string = "OBJECT")]
    Object,
    #[strum(to_string = "FIELD_DEFINITION")]
    FieldDefinition,
    #[strum(to_string = "ARGUMENT_DEFINITION")]
    ArgumentDefinition,
    #[strum(to_string = "INTERFACE")]
    Interface,
    #[strum(to_string = "UNION")]
    Union,
    #[strum(to_string = "ENUM")]
    Enum,
    #[strum(to_string = "ENUM_VALUE")]
    EnumValue,
    #[strum(to_string = "INPUT_OBJECT")]
    InputObject,
    #[strum(to_string = "INPUT_FIELD_DEFINITION")]
    InputFieldDefinition,
}

/// The value shape a directive argument accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectiveArgumentKind {
    Boolean,
    String,
    /// `openfed__FieldSet`: a string holding a selection set.
    FieldSet,
    /// `[[openfed__Scope!]!]!`: OR of AND scope sets.
    ScopeList,
    /// User-defined argument whose value kind is not checked.
    Any,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DirectiveArgumentSpec {
    pub(crate) name: &'static str,
    pub(crate) kind: DirectiveArgumentKind,
    pub(crate) required: bool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DirectiveSpec {
    pub(crate) name: &'static str,
    pub(crate) locations: &'static [DirectiveLocationKind],
    pub(crate) repeatable: bool,
    pub(crate) arguments: &'static [DirectiveArgumentSpec],
}

use DirectiveArgumentKind as Arg;
use DirectiveLocationKind as Loc;

const ALL_TYPE_SYSTEM_LOCATIONS: &[Loc] = &[
    Loc::Schema,
    Loc::Scalar,
    Loc::Object,
    Loc::FieldDefinition,
    Loc::ArgumentDefinition,
    Loc::Interface,
    Loc::Union,
    Loc::Enum,
    Loc::EnumValue,
    Loc::InputObject,
    Loc::InputFieldDefinition,
];

const INACCESSIBLE_LOCATIONS: &[Loc] = &[
    Loc::Scalar,
    Loc::Object,
    Loc::FieldDefinition,
    Loc::ArgumentDefinition,
    Loc::Interface,
    Loc::Union,
    Loc::Enum,
    Loc::EnumValue,
    Loc::InputObject,
    Loc::InputFieldDefinition,
];

const AUTHORIZATION_LOCATIONS: &[Loc] = &[
    Loc::Enum,
    Loc::FieldDefinition,
    Loc::Interface,
    Loc::Object,
    Loc::Scalar,
];

const DIRECTIVE_SPECS: &[DirectiveSpec] = &[
    DirectiveSpec {
        name: KEY,
        locations: &[Loc::Object, Loc::Interface],
        repeatable: true,
        arguments: &[
            DirectiveArgumentSpec { name: "fields", kind: Arg::FieldSet, required: true },
            DirectiveArgumentSpec { name: "resolvable", kind: Arg::Boolean, required: false },
        ],
    },
    DirectiveSpec {
        name: EXTERNAL,
        locations: &[Loc::Object, Loc::FieldDefinition],
        repeatable: false,
        arguments: &[],
    },
    DirectiveSpec {
        name: SHAREABLE,
        locations: &[Loc::Object, Loc::FieldDefinition],
        repeatable: true,
        arguments: &[],
    },
    DirectiveSpec {
        name: OVERRIDE,
        locations: &[Loc::FieldDefinition],
        repeatable: false,
        arguments: &[DirectiveArgumentSpec { name: "from", kind: Arg::String, required: true }],
    },
    DirectiveSpec {
        name: PROVIDES,
        locations: &[Loc::FieldDefinition],
        repeatable: false,
        arguments: &[DirectiveArgumentSpec { name: "fields", kind: Arg::FieldSet, required: true }],
    },
    DirectiveSpec {
        name: REQUIRES,
        locations: &[Loc::FieldDefinition],
        repeatable: false,
        arguments: &[DirectiveArgumentSpec { name: "fields", kind: Arg::FieldSet, required: true }],
    },
    DirectiveSpec {
        name: INTERFACE_OBJECT,
        locations: &[Loc::Object],
        repeatable: false,
        arguments: &[],
    },
    DirectiveSpec {
        name: INACCESSIBLE,
        locations: INACCESSIBLE_LOCATIONS,
        repeatable: false,
        arguments: &[],
    },
    DirectiveSpec {
        name: TAG,
        locations: INACCESSIBLE_LOCATIONS,
        repeatable: true,
        arguments: &[DirectiveArgumentSpec { name: "name", kind: Arg::String, required: true }],
    },
    DirectiveSpec {
        name: AUTHENTICATED,
        locations: AUTHORIZATION_LOCATIONS,
        repeatable: false,
        arguments: &[],
    },
    DirectiveSpec {
        name: REQUIRES_SCOPES,
        locations: AUTHORIZATION_LOCATIONS,
        repeatable: false,
        arguments: &[DirectiveArgumentSpec { name: "scopes", kind: Arg::ScopeList, required: true }],
    },
    DirectiveSpec {
        name: CONFIGURE_DESCRIPTION,
        locations: ALL_TYPE_SYSTEM_LOCATIONS,
        repeatable: false,
        arguments: &[
            DirectiveArgumentSpec { name: "propagateToFederatedGraph", kind: Arg::Boolean, required: false },
            DirectiveArgumentSpec { name: "description", kind: Arg::String, required: false },
        ],
    },
    DirectiveSpec {
        name: DEPRECATED,
        locations: &[
            Loc::FieldDefinition,
            Loc::EnumValue,
            Loc::ArgumentDefinition,
            Loc::InputFieldDefinition,
        ],
        repeatable: false,
        arguments: &[DirectiveArgumentSpec { name: "reason", kind: Arg::String, required: false }],
    },
    DirectiveSpec {
        name: SPECIFIED_BY,
        locations: &[Loc::Scalar],
        repeatable: false,
        arguments: &[DirectiveArgumentSpec { name: "url", kind: Arg::String, required: true }],
    },
    DirectiveSpec {
        name: EXTENDS,
        locations: &[Loc::Object, Loc::Interface],
        repeatable: false,
        arguments: &[],
    },
];

lazy_static! {
    pub(crate) static ref DIRECTIVE_SPECS_BY_NAME: IndexMap<&'static str, &'static DirectiveSpec> =
        DIRECTIVE_SPECS.iter().map(|spec| (spec.name, spec)).collect();
}

/// A directive definition declared by the subgraph itself, extending the
/// known-directive table for that subgraph only.
#[derive(Clone, Debug)]
pub(crate) struct UserDirectiveDefinition {
    pub(crate) name: String,
    pub(crate) locations: Vec<String>,
    pub(crate) repeatable: bool,
    pub(crate) arguments: Vec<UserDirectiveArgument>,
}

#[derive(Clone, Debug)]
pub(crate) struct UserDirectiveArgument {
    pub(crate) name: String,
    pub(crate) kind: DirectiveArgumentKind,
    pub(crate) required: bool,
}

pub(crate) fn directive_location_name(location: &ast::DirectiveLocation) -> &'static str {
    use ast::DirectiveLocation::*;
    match location {
        Query => "QUERY",
        Mutation => "MUTATION",
        Subscription => "SUBSCRIPTION",
        Field => "FIELD",
        FragmentDefinition => "FRAGMENT_DEFINITION",
        FragmentSpread => "FRAGMENT_SPREAD",
        InlineFragment => "INLINE_FRAGMENT",
        VariableDefinition => "VARIABLE_DEFINITION",
        Schema => "SCHEMA",
        Scalar => "SCALAR",
        Object => "OBJECT",
        FieldDefinition => "FIELD_DEFINITION",
        ArgumentDefinition => "ARGUMENT_DEFINITION",
        Interface => "INTERFACE",
        Union => "UNION",
        Enum => "ENUM",
        EnumValue => "ENUM_VALUE",
        InputObject => "INPUT_OBJECT",
        InputFieldDefinition => "INPUT_FIELD_DEFINITION",
    }
}

pub(crate) fn user_directive_definition(node: &ast::DirectiveDefinition) -> UserDirectiveDefinition {
    let arguments = node
        .arguments
        .iter()
        .map(|argument| {
            let named_type = argument.ty.inner_named_type().as_str();
            let kind = match named_type {
                "Boolean" => DirectiveArgumentKind::Boolean,
                "String" => DirectiveArgumentKind::String,
                name if name.ends_with("FieldSet") => DirectiveArgumentKind::FieldSet,
                _ => DirectiveArgumentKind::Any,
            };
            UserDirectiveArgument {
                name: argument.name.to_string(),
                kind,
                required: argument.ty.is_non_null() && argument.default_value.is_none(),
            }
        })
        .collect();
    UserDirectiveDefinition {
        name: node.name.to_string(),
        locations: node
            .locations
            .iter()
            .map(|location| directive_location_name(location).to_owned())
            .collect(),
        repeatable: node.repeatable,
        arguments,
    }
}

enum ResolvedSpec<'a> {
    Builtin(&'a DirectiveSpec),
    User(&'a UserDirectiveDefinition),
}

impl ResolvedSpec<'_> {
    fn repeatable(&self) -> bool {
        match self {
            ResolvedSpec::Builtin(spec) => spec.repeatable,
            ResolvedSpec::User(spec) => spec.repeatable,
        }
    }

    fn allows_location(&self, location: DirectiveLocationKind) -> bool {
        let location_name = location.to_string();
        match self {
            ResolvedSpec::Builtin(spec) => spec.locations.contains(&location),
            ResolvedSpec::User(spec) => spec.locations.iter().any(|name| *name == location_name),
        }
    }

    fn arguments(&self) -> Vec<(&str, DirectiveArgumentKind, bool)> {
        match self {
            ResolvedSpec::Builtin(spec) => spec
                .arguments
                .iter()
                .map(|argument| (argument.name, argument.kind, argument.required))
                .collect(),
            ResolvedSpec::User(spec) => spec
                .arguments
                .iter()
                .map(|argument| (argument.name.as_str(), argument.kind, argument.required))
                .collect(),
        }
    }
}

pub(crate) fn value_kind_name(value: &ast::Value) -> &'static str {
    match value {
        ast::Value::Null => "null",
        ast::Value::Enum(_) => "enum",
        ast::Value::Variable(_) => "variable",
        ast::Value::String(_) => "string",
        ast::Value::Float(_) => "float",
        ast::Value::Int(_) => "int",
        ast::Value::Boolean(_) => "boolean",
        ast::Value::List(_) => "list",
        ast::Value::Object(_) => "object",
    }
}

pub(crate) fn value_to_string(value: &ast::Value) -> String {
    match value {
        ast::Value::Null => "null".to_owned(),
        ast::Value::Boolean(true) => "true".to_owned(),
        ast::Value::Boolean(false) => "false".to_owned(),
        ast::Value::Int(num) => format!("{num}"),
        ast::Value::Float(num) => format!("{num}"),
        ast::Value::String(text) => format!("\"{text}\""),
        ast::Value::Enum(name) => format!("{name}"),
        ast::Value::Variable(name) => format!("${name}"),
        ast::Value::List(items) => {
            let item_strings: Vec<_> = items.iter().map(|item| value_to_string(item)).collect();
            format!("[{}]", item_strings.join(", "))
        }
        ast::Value::Object(fields) => {
            let field_strings: Vec<_> = fields
                .iter()
                .map(|(name, value)| format!("{name}: {}", value_to_string(value)))
                .collect();
            format!("{{{}}}", field_strings.join(", "))
        }
    }
}

fn check_argument_value(kind: DirectiveArgumentKind, value: &ast::Value) -> Result<(), String> {
    let ok = match kind {
        DirectiveArgumentKind::Boolean => matches!(value, ast::Value::Boolean(_)),
        DirectiveArgumentKind::String | DirectiveArgumentKind::FieldSet => {
            matches!(value, ast::Value::String(_))
        }
        DirectiveArgumentKind::ScopeList => match value {
            ast::Value::List(or_scopes) => or_scopes.iter().all(|and_scopes| match &**and_scopes {
                ast::Value::List(scopes) => {
                    scopes.iter().all(|scope| matches!(&**scope, ast::Value::String(_)))
                }
                _ => false,
            }),
            _ => false,
        },
        DirectiveArgumentKind::Any => true,
    };
    if ok {
        Ok(())
    } else {
        let expected = match kind {
            DirectiveArgumentKind::Boolean => "a Boolean",
            DirectiveArgumentKind::String => "a String",
            DirectiveArgumentKind::FieldSet => "a String holding a selection set",
            DirectiveArgumentKind::ScopeList => "a list of lists of String scopes",
            DirectiveArgumentKind::Any => unreachable!(),
        };
        Err(format!(
            "expected {expected} but received the {} value {}",
            value_kind_name(value),
            value_to_string(value)
        ))
    }
}

/// Validates every directive application on one host element. One
/// `InvalidDirective` error is pushed per invalid application; an ordinal
/// distinguishes which repeated application failed.
pub(crate) fn validate_directives(
    host_path: &str,
    location: DirectiveLocationKind,
    directives: &ast::DirectiveList,
    user_definitions: &IndexMap<String, UserDirectiveDefinition>,
    errors: &mut Vec<CompositionError>,
) {
    let mut applications_by_name: IndexMap<&str, Vec<&ast::Directive>> = IndexMap::new();
    for directive in directives.iter() {
        applications_by_name
            .entry(directive.name.as_str())
            .or_default()
            .push(directive);
    }

    for (directive_name, applications) in applications_by_name {
        let spec = match DIRECTIVE_SPECS_BY_NAME.get(directive_name) {
            Some(spec) => ResolvedSpec::Builtin(spec),
            None => match user_definitions.get(directive_name) {
                Some(definition) => ResolvedSpec::User(definition),
                None => {
                    errors.push(CompositionError::UndefinedDirective {
                        directive_name: directive_name.to_owned(),
                        host_path: host_path.to_owned(),
                    });
                    continue;
                }
            },
        };

        if !spec.repeatable() && applications.len() > 1 {
            errors.push(CompositionError::InvalidDirective {
                directive_name: directive_name.to_owned(),
                host_path: host_path.to_owned(),
                ordinal: None,
                errors: vec![format!(
                    "The directive is not repeatable, but it is declared {} times.",
                    applications.len()
                )],
            });
        }

        let spec_arguments = spec.arguments();
        for (index, application) in applications.iter().enumerate() {
            let mut sub_errors = Vec::new();

            if !spec.allows_location(location) {
                sub_errors.push(format!(
                    "The directive is not declared on the location \"{location}\"."
                ));
            }

            let mut seen_arguments: IndexMap<&str, &ast::Value> = IndexMap::new();
            for argument in &application.arguments {
                let argument_name = argument.name.as_str();
                if seen_arguments.insert(argument_name, &argument.value).is_some() {
                    sub_errors.push(format!(
                        "The argument \"{argument_name}\" is declared more than once."
                    ));
                    continue;
                }
                match spec_arguments.iter().find(|(name, _, _)| *name == argument_name) {
                    Some((_, kind, _)) => {
                        if let Err(reason) = check_argument_value(*kind, &argument.value) {
                            sub_errors.push(format!(
                                "The value of the argument \"{argument_name}\" is invalid: {reason}."
                            ));
                        }
                    }
                    None if spec_arguments.is_empty() => {
                        sub_errors.push(format!(
                            "The directive declares no arguments, but the argument \
                             \"{argument_name}\" was provided."
                        ));
                    }
                    None => {
                        sub_errors.push(format!(
                            "The argument \"{argument_name}\" is not declared by the directive."
                        ));
                    }
                }
            }

            let missing_required: Vec<&str> = spec_arguments
                .iter()
                .filter(|(name, _, required)| *required && !seen_arguments.contains_key(name))
                .map(|(name, _, _)| *name)
                .collect();
            if !missing_required.is_empty() {
                sub_errors.push(format!(
                    "The following required argument{} not provided: {}.",
                    if missing_required.len() > 1 { "s are" } else { " is" },
                    missing_required
                        .iter()
                        .map(|name| format!("\"{name}\""))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }

            if !sub_errors.is_empty() {
                let ordinal = if spec.repeatable() && applications.len() > 1 {
                    Some(index + 1)
                } else {
                    None
                };
                errors.push(CompositionError::InvalidDirective {
                    directive_name: directive_name.to_owned(),
                    host_path: host_path.to_owned(),
                    ordinal,
                    errors: sub_errors,
                });
            }
        }
    }
}

/// Looks up the single string value of `argument_name` on a directive, if
/// present and a string.
pub(crate) fn directive_string_argument<'a>(
    directive: &'a ast::Directive,
    argument_name: &str,
) -> Option<&'a str> {
    directive_argument(directive, argument_name).and_then(|value| match value {
        ast::Value::String(text) => Some(text.as_str()),
        _ => None,
    })
}

pub(crate) fn directive_bool_argument(directive: &ast::Directive, argument_name: &str) -> Option<bool> {
    directive_argument(directive, argument_name).and_then(|value| match value {
        ast::Value::Boolean(flag) => Some(*flag),
        _ => None,
    })
}

pub(crate) fn directive_argument<'a>(
    directive: &'a ast::Directive,
    argument_name: &str,
) -> Option<&'a ast::Value> {
    directive
        .arguments
        .iter()
        .find(|argument| argument.name.as_str() == argument_name)
        .map(|argument| &*argument.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_directives(sdl: &str) -> ast::DirectiveList {
        let document = ast::Document::parse(format!("type Host {sdl} {{ id: ID }}"), "test.graphql")
            .expect("test schema should parse");
        for definition in &document.definitions {
            if let ast::Definition::ObjectTypeDefinition(object) = definition {
                return object.directives.clone();
            }
        }
        panic!("no object definition parsed");
    }

    #[test]
    fn key_with_missing_fields_argument_is_invalid() {
        let directives = parse_directives("@key(resolvable: true)");
        let mut errors = Vec::new();
        validate_directives(
            "Host",
            DirectiveLocationKind::Object,
            &directives,
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.contains("@key"), "{message}");
        assert!(message.contains("\"fields\""), "{message}");
    }

    #[test]
    fn wrong_value_kind_is_reported() {
        let directives = parse_directives("@key(fields: 1)");
        let mut errors = Vec::new();
        validate_directives(
            "Host",
            DirectiveLocationKind::Object,
            &directives,
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.contains("received the int value 1"), "{message}");
    }

    #[test]
    fn repeated_non_repeatable_directive_is_invalid() {
        let directives = parse_directives("@shareable @external @external");
        let mut errors = Vec::new();
        validate_directives(
            "Host",
            DirectiveLocationKind::Object,
            &directives,
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("not repeatable"), "{}", errors[0]);
    }

    #[test]
    fn ordinal_identifies_the_failing_repeated_application() {
        let directives = parse_directives("@key(fields: \"id\") @key(fields: 2)");
        let mut errors = Vec::new();
        validate_directives(
            "Host",
            DirectiveLocationKind::Object,
            &directives,
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.contains("The 2nd application"), "{message}");
    }

    #[test]
    fn undefined_directive_is_reported() {
        let directives = parse_directives("@doesNotExist");
        let mut errors = Vec::new();
        validate_directives(
            "Host",
            DirectiveLocationKind::Object,
            &directives,
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            CompositionError::UndefinedDirective { directive_name, .. } if directive_name == "doesNotExist"
        ));
    }
}
