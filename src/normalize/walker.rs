//! First normalization pass: walks the parsed document and flattens every
//! type definition and extension into uniform per-block data. Extension
//! merging happens afterwards, so blocks may arrive in any order.

use apollo_compiler::ast;
use apollo_compiler::Node;
use indexmap::IndexMap;

use crate::definitions::{OperationKind, TypeKind};
use crate::directives::{self, UserDirectiveDefinition};
use crate::error::CompositionError;

/// One type definition or extension block, uniform across kinds. Only the
/// vectors relevant to `kind` are populated.
#[derive(Clone, Debug)]
pub(super) struct Block {
    pub(super) kind: TypeKind,
    pub(super) type_name: String,
    pub(super) is_extension: bool,
    pub(super) description: Option<String>,
    pub(super) directives: ast::DirectiveList,
    pub(super) implements: Vec<String>,
    pub(super) fields: Vec<Node<ast::FieldDefinition>>,
    pub(super) input_fields: Vec<Node<ast::InputValueDefinition>>,
    pub(super) enum_values: Vec<Node<ast::EnumValueDefinition>>,
    pub(super) union_members: Vec<String>,
}

impl Block {
    fn new(kind: TypeKind, type_name: String, is_extension: bool) -> Self {
        Self {
            kind,
            type_name,
            is_extension,
            description: None,
            directives: ast::DirectiveList::default(),
            implements: Vec::new(),
            fields: Vec::new(),
            input_fields: Vec::new(),
            enum_values: Vec::new(),
            union_members: Vec::new(),
        }
    }

    /// `type T @extends` is the directive spelling of `extend type T`.
    pub(super) fn treat_as_extension(&self) -> bool {
        self.is_extension
            || self
                .directives
                .iter()
                .any(|directive| directive.name.as_str() == directives::EXTENDS)
    }
}

#[derive(Debug, Default)]
pub(super) struct DocumentIngest {
    pub(super) blocks: Vec<Block>,
    pub(super) user_directives: IndexMap<String, UserDirectiveDefinition>,
    /// Root operation bindings from `schema { ... }` blocks and extensions,
    /// in document order.
    pub(super) schema_root_operations: Vec<(OperationKind, String)>,
    pub(super) errors: Vec<CompositionError>,
}

fn operation_kind(operation_type: ast::OperationType) -> OperationKind {
    match operation_type {
        ast::OperationType::Query => OperationKind::Query,
        ast::OperationType::Mutation => OperationKind::Mutation,
        ast::OperationType::Subscription => OperationKind::Subscription,
    }
}

fn node_str_text(value: &Option<apollo_compiler::NodeStr>) -> Option<String> {
    value.as_ref().map(|text| text.as_str().to_owned())
}

pub(super) fn ingest_document(document: &ast::Document, ingest: &mut DocumentIngest) {
    for definition in &document.definitions {
        match definition {
            ast::Definition::SchemaDefinition(schema) => {
                for root in &schema.root_operations {
                    let (operation_type, type_name) = &**root;
                    ingest
                        .schema_root_operations
                        .push((operation_kind(*operation_type), type_name.to_string()));
                }
            }
            ast::Definition::SchemaExtension(schema) => {
                for root in &schema.root_operations {
                    let (operation_type, type_name) = &**root;
                    ingest
                        .schema_root_operations
                        .push((operation_kind(*operation_type), type_name.to_string()));
                }
            }
            ast::Definition::DirectiveDefinition(directive) => {
                let directive_name = directive.name.to_string();
                if ingest.user_directives.contains_key(&directive_name) {
                    ingest.errors.push(CompositionError::DuplicateDirectiveDefinition {
                        directive_name,
                    });
                    continue;
                }
                ingest
                    .user_directives
                    .insert(directive_name, directives::user_directive_definition(directive));
            }
            ast::Definition::ObjectTypeDefinition(object) => {
                let mut block = Block::new(TypeKind::Object, object.name.to_string(), false);
                block.description = node_str_text(&object.description);
                block.directives = object.directives.clone();
                block.implements = object
                    .implements_interfaces
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                block.fields = object.fields.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::ObjectTypeExtension(object) => {
                let mut block = Block::new(TypeKind::Object, object.name.to_string(), true);
                block.directives = object.directives.clone();
                block.implements = object
                    .implements_interfaces
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                block.fields = object.fields.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::InterfaceTypeDefinition(interface) => {
                let mut block = Block::new(TypeKind::Interface, interface.name.to_string(), false);
                block.description = node_str_text(&interface.description);
                block.directives = interface.directives.clone();
                block.implements = interface
                    .implements_interfaces
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                block.fields = interface.fields.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::InterfaceTypeExtension(interface) => {
                let mut block = Block::new(TypeKind::Interface, interface.name.to_string(), true);
                block.directives = interface.directives.clone();
                block.implements = interface
                    .implements_interfaces
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                block.fields = interface.fields.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::UnionTypeDefinition(union_) => {
                let mut block = Block::new(TypeKind::Union, union_.name.to_string(), false);
                block.description = node_str_text(&union_.description);
                block.directives = union_.directives.clone();
                block.union_members = union_.members.iter().map(|name| name.to_string()).collect();
                ingest.blocks.push(block);
            }
            ast::Definition::UnionTypeExtension(union_) => {
                let mut block = Block::new(TypeKind::Union, union_.name.to_string(), true);
                block.directives = union_.directives.clone();
                block.union_members = union_.members.iter().map(|name| name.to_string()).collect();
                ingest.blocks.push(block);
            }
            ast::Definition::EnumTypeDefinition(enum_) => {
                let mut block = Block::new(TypeKind::Enum, enum_.name.to_string(), false);
                block.description = node_str_text(&enum_.description);
                block.directives = enum_.directives.clone();
                block.enum_values = enum_.values.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::EnumTypeExtension(enum_) => {
                let mut block = Block::new(TypeKind::Enum, enum_.name.to_string(), true);
                block.directives = enum_.directives.clone();
                block.enum_values = enum_.values.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::InputObjectTypeDefinition(input_object) => {
                let mut block = Block::new(TypeKind::InputObject, input_object.name.to_string(), false);
                block.description = node_str_text(&input_object.description);
                block.directives = input_object.directives.clone();
                block.input_fields = input_object.fields.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::InputObjectTypeExtension(input_object) => {
                let mut block = Block::new(TypeKind::InputObject, input_object.name.to_string(), true);
                block.directives = input_object.directives.clone();
                block.input_fields = input_object.fields.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::ScalarTypeDefinition(scalar) => {
                let mut block = Block::new(TypeKind::Scalar, scalar.name.to_string(), false);
                block.description = node_str_text(&scalar.description);
                block.directives = scalar.directives.clone();
                ingest.blocks.push(block);
            }
            ast::Definition::ScalarTypeExtension(scalar) => {
                let mut block = Block::new(TypeKind::Scalar, scalar.name.to_string(), true);
                block.directives = scalar.directives.clone();
                ingest.blocks.push(block);
            }
            // Executable definitions have no meaning in a subgraph schema
            // document; the full document validator rejects them elsewhere.
            ast::Definition::OperationDefinition(_) | ast::Definition::FragmentDefinition(_) => {}
        }
    }
}

/// Resolves the effective root operation type names: explicit `schema` block
/// bindings first, then the conventional default names for kinds that remain
/// unbound. Duplicate bindings for one operation kind are fatal.
pub(super) fn resolve_root_operation_types(
    ingest: &DocumentIngest,
    defined_type_names: &[&str],
) -> (IndexMap<OperationKind, String>, Vec<CompositionError>) {
    let mut errors = Vec::new();
    let mut roots: IndexMap<OperationKind, String> = IndexMap::new();
    for (kind, type_name) in &ingest.schema_root_operations {
        match roots.get(kind) {
            Some(existing) if existing != type_name => {
                errors.push(CompositionError::DuplicateOperationTypeDefinition {
                    operation_type: *kind,
                    new_type_name: type_name.clone(),
                    old_type_name: existing.clone(),
                });
            }
            Some(_) => {}
            None => {
                roots.insert(*kind, type_name.clone());
            }
        }
    }
    for kind in [OperationKind::Query, OperationKind::Mutation, OperationKind::Subscription] {
        if !roots.contains_key(&kind) && defined_type_names.contains(&kind.default_type_name()) {
            roots.insert(kind, kind.default_type_name().to_owned());
        }
    }
    (roots, errors)
}
