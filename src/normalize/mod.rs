//! Per-subgraph normalization: a pure function from one schema document to
//! the canonical type registry plus the subgraph's router configuration.
//!
//! The pass parses the document, folds `extend` blocks into base definitions
//! (order-independent), expands type-level directive sugar, validates every
//! directive application and embedded field set, and computes one
//! [`ConfigurationData`] per type. Any error aborts composition of the whole
//! batch; the caller wraps the error list with the subgraph name.

use apollo_compiler::ast;
use indexmap::{IndexMap, IndexSet};

use crate::definitions::{
    ConfigurationData, Deprecation, DescriptionData, EntityInterfaceData, FieldSetData,
    NormalizedSubgraph, OperationKind, RequiredFieldConfiguration, SubgraphCompositeData,
    SubgraphDefinition, SubgraphEnumData, SubgraphEnumValueData, SubgraphFieldData,
    SubgraphInputObjectData, SubgraphInputValueData, SubgraphScalarData, SubgraphUnionData,
    TypeKind, ENTITIES_FIELD, SERVICE_FIELD,
};
use crate::directives::{
    self, directive_bool_argument, directive_string_argument, validate_directives,
    DirectiveLocationKind, UserDirectiveDefinition, BUILT_IN_SCALARS, FIELD_SET_SCALAR,
    SCOPE_SCALAR,
};
use crate::error::CompositionError;
use crate::field_set::{self, FieldSetContext};

mod walker;

use walker::Block;

pub(crate) fn normalize_subgraph(
    subgraph_name: &str,
    url: &str,
    schema_text: &str,
) -> Result<NormalizedSubgraph, Vec<CompositionError>> {
    tracing::debug!(subgraph = subgraph_name, "normalizing subgraph");

    let document = match ast::Document::parse(schema_text.to_owned(), format!("{subgraph_name}.graphqls")) {
        Ok(document) => document,
        Err(with_errors) => {
            // Syntax errors short-circuit every later step for this subgraph.
            return Err(vec![CompositionError::UnparsableSubgraph {
                message: with_errors.errors.to_string(),
            }]);
        }
    };

    let mut ingest = walker::DocumentIngest::default();
    walker::ingest_document(&document, &mut ingest);

    let mut normalizer = Normalizer {
        subgraph_name: subgraph_name.to_owned(),
        errors: std::mem::take(&mut ingest.errors),
        user_directives: std::mem::take(&mut ingest.user_directives),
    };

    // Group blocks by type name, preserving first-seen order. Extensions may
    // precede their base definition.
    let mut blocks_by_type_name: IndexMap<String, Vec<Block>> = IndexMap::new();
    for block in std::mem::take(&mut ingest.blocks) {
        blocks_by_type_name.entry(block.type_name.clone()).or_default().push(block);
    }

    let defined_type_names: Vec<&str> = blocks_by_type_name.keys().map(String::as_str).collect();
    let (operation_root_types, root_errors) =
        walker::resolve_root_operation_types(&ingest, &defined_type_names);
    normalizer.errors.extend(root_errors);

    let mut definitions: IndexMap<String, SubgraphDefinition> = IndexMap::new();
    for (type_name, blocks) in blocks_by_type_name {
        if let Some(definition) = normalizer.merge_type_blocks(&type_name, blocks) {
            definitions.insert(type_name, definition);
        }
    }

    // Mark root operation types and strip the subgraph-protocol plumbing
    // fields, which are not composition data.
    for root_type_name in operation_root_types.values() {
        if let Some(SubgraphDefinition::Object(data)) = definitions.get_mut(root_type_name) {
            data.is_root_type = true;
            data.fields.shift_remove(SERVICE_FIELD);
            data.fields.shift_remove(ENTITIES_FIELD);
        }
    }

    normalizer.check_extension_orphans(&definitions, &operation_root_types);
    normalizer.check_empty_types(&definitions, &operation_root_types);
    normalizer.check_undefined_references(&definitions, &operation_root_types);
    normalizer.check_interface_implementations(&definitions);
    normalizer.check_configure_description_usages(&definitions);
    let (promotions, key_field_names_by_type_name) = normalizer.validate_field_sets(&definitions);

    if !normalizer.errors.is_empty() {
        return Err(normalizer.errors);
    }

    let (configuration_data_by_type_name, entity_interfaces) =
        build_configuration(&definitions, &promotions);

    Ok(NormalizedSubgraph {
        name: subgraph_name.to_owned(),
        url: url.to_owned(),
        definitions,
        configuration_data_by_type_name,
        operation_root_types,
        entity_interfaces,
        key_field_names_by_type_name,
    })
}

struct Normalizer {
    subgraph_name: String,
    errors: Vec<CompositionError>,
    user_directives: IndexMap<String, UserDirectiveDefinition>,
}

impl Normalizer {
    /// Folds all definition and extension blocks of one type name into a
    /// single registry entry.
    fn merge_type_blocks(&mut self, type_name: &str, blocks: Vec<Block>) -> Option<SubgraphDefinition> {
        let kind = blocks[0].kind;
        let mut base_seen = false;
        for block in &blocks {
            if block.kind != kind {
                self.errors.push(CompositionError::IncompatibleParentKind {
                    type_name: type_name.to_owned(),
                    expected_kind: kind,
                    actual_kind: block.kind,
                    subgraph_name: self.subgraph_name.clone(),
                });
                return None;
            }
            if !block.treat_as_extension() {
                if base_seen {
                    self.errors.push(CompositionError::DuplicateTypeDefinition {
                        kind,
                        type_name: type_name.to_owned(),
                    });
                }
                base_seen = true;
            }
        }
        let extension_only = !base_seen;

        Some(match kind {
            TypeKind::Object | TypeKind::Interface => {
                let data = self.merge_composite_blocks(type_name, kind, blocks, extension_only);
                if kind == TypeKind::Object {
                    SubgraphDefinition::Object(data)
                } else {
                    SubgraphDefinition::Interface(data)
                }
            }
            TypeKind::Union => SubgraphDefinition::Union(self.merge_union_blocks(type_name, blocks, extension_only)),
            TypeKind::Enum => SubgraphDefinition::Enum(self.merge_enum_blocks(type_name, blocks, extension_only)),
            TypeKind::InputObject => {
                SubgraphDefinition::InputObject(self.merge_input_object_blocks(type_name, blocks, extension_only))
            }
            TypeKind::Scalar => SubgraphDefinition::Scalar(self.merge_scalar_blocks(type_name, blocks, extension_only)),
        })
    }

    fn merge_composite_blocks(
        &mut self,
        type_name: &str,
        kind: TypeKind,
        blocks: Vec<Block>,
        extension_only: bool,
    ) -> SubgraphCompositeData {
        let location = if kind == TypeKind::Object {
            DirectiveLocationKind::Object
        } else {
            DirectiveLocationKind::Interface
        };
        let mut data = SubgraphCompositeData {
            type_name: type_name.to_owned(),
            description: DescriptionData::default(),
            implements: IndexSet::new(),
            fields: IndexMap::new(),
            keys: Vec::new(),
            is_root_type: false,
            is_entity: false,
            is_interface_object: false,
            is_inaccessible: false,
            is_shareable: false,
            tags: IndexSet::new(),
            requires_authentication: false,
            required_scopes: Vec::new(),
            extension_only,
        };

        for block in blocks {
            validate_directives(type_name, location, &block.directives, &self.user_directives, &mut self.errors);

            // Type-level @shareable/@external are sugar for the fields
            // declared directly on this block; a separate extend block must
            // repeat the directive to cover its own fields.
            let block_shareable = has_directive(&block.directives, directives::SHAREABLE);
            let block_external = has_directive(&block.directives, directives::EXTERNAL);

            if block.description.is_some() {
                data.description.text = block.description.clone();
            }
            apply_configure_description(&mut data.description, &block.directives);
            data.is_inaccessible |= has_directive(&block.directives, directives::INACCESSIBLE);
            data.is_shareable |= block_shareable;
            data.is_interface_object |= has_directive(&block.directives, directives::INTERFACE_OBJECT);
            data.requires_authentication |= has_directive(&block.directives, directives::AUTHENTICATED);
            merge_scopes(&mut data.required_scopes, extract_scopes(&block.directives));
            extend_tags(&mut data.tags, &block.directives);

            for key in self.parse_keys(type_name, &block.directives) {
                if !data.keys.iter().any(|existing| existing.canonical == key.canonical) {
                    data.keys.push(key);
                }
            }

            for interface_name in block.implements {
                if !data.implements.insert(interface_name.clone()) {
                    self.errors.push(CompositionError::DuplicateImplementedInterface {
                        kind,
                        type_name: type_name.to_owned(),
                        interface_name,
                    });
                }
            }

            for field_node in &block.fields {
                let field = self.build_field(type_name, field_node, block_shareable, block_external);
                if data.fields.contains_key(&field.field_name) {
                    self.errors.push(CompositionError::DuplicateFieldDefinition {
                        kind,
                        type_name: type_name.to_owned(),
                        field_name: field.field_name,
                    });
                    continue;
                }
                data.fields.insert(field.field_name.clone(), field);
            }
        }

        data.is_entity = !data.keys.is_empty();
        data
    }

    fn build_field(
        &mut self,
        parent_type_name: &str,
        node: &ast::FieldDefinition,
        block_shareable: bool,
        block_external: bool,
    ) -> SubgraphFieldData {
        let field_name = node.name.to_string();
        let path = format!("{parent_type_name}.{field_name}");
        validate_directives(
            &path,
            DirectiveLocationKind::FieldDefinition,
            &node.directives,
            &self.user_directives,
            &mut self.errors,
        );

        let mut arguments = IndexMap::new();
        for argument_node in &node.arguments {
            let argument = self.build_input_value(
                &format!("{path}({}:)", argument_node.name),
                argument_node,
                DirectiveLocationKind::ArgumentDefinition,
            );
            arguments.insert(argument.name.clone(), argument);
        }

        let mut description = DescriptionData {
            text: node.description.as_ref().map(|text| text.as_str().to_owned()),
            ..DescriptionData::default()
        };
        apply_configure_description(&mut description, &node.directives);

        let provides = self.parse_field_set_argument(&path, directives::PROVIDES, &node.directives);
        let requires = self.parse_field_set_argument(&path, directives::REQUIRES, &node.directives);

        SubgraphFieldData {
            field_name,
            parent_type_name: parent_type_name.to_owned(),
            ty: node.ty.clone(),
            arguments,
            description,
            is_shareable: block_shareable || has_directive(&node.directives, directives::SHAREABLE),
            is_external: block_external || has_directive(&node.directives, directives::EXTERNAL),
            override_from: node
                .directives
                .iter()
                .find(|directive| directive.name.as_str() == directives::OVERRIDE)
                .and_then(|directive| directive_string_argument(directive, "from"))
                .map(str::to_owned),
            provides,
            requires,
            is_inaccessible: has_directive(&node.directives, directives::INACCESSIBLE),
            tags: collect_tags(&node.directives),
            requires_authentication: has_directive(&node.directives, directives::AUTHENTICATED),
            required_scopes: extract_scopes(&node.directives),
            deprecation: extract_deprecation(&node.directives),
        }
    }

    fn build_input_value(
        &mut self,
        host_path: &str,
        node: &ast::InputValueDefinition,
        location: DirectiveLocationKind,
    ) -> SubgraphInputValueData {
        validate_directives(host_path, location, &node.directives, &self.user_directives, &mut self.errors);
        let mut description = DescriptionData {
            text: node.description.as_ref().map(|text| text.as_str().to_owned()),
            ..DescriptionData::default()
        };
        apply_configure_description(&mut description, &node.directives);
        SubgraphInputValueData {
            name: node.name.to_string(),
            ty: (*node.ty).clone(),
            default_value: node.default_value.as_deref().cloned(),
            description,
            is_inaccessible: has_directive(&node.directives, directives::INACCESSIBLE),
            tags: collect_tags(&node.directives),
            deprecation: extract_deprecation(&node.directives),
        }
    }

    fn merge_union_blocks(&mut self, type_name: &str, blocks: Vec<Block>, extension_only: bool) -> SubgraphUnionData {
        let mut data = SubgraphUnionData {
            type_name: type_name.to_owned(),
            description: DescriptionData::default(),
            members: IndexSet::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            extension_only,
        };
        for block in blocks {
            validate_directives(
                type_name,
                DirectiveLocationKind::Union,
                &block.directives,
                &self.user_directives,
                &mut self.errors,
            );
            if block.description.is_some() {
                data.description.text = block.description.clone();
            }
            apply_configure_description(&mut data.description, &block.directives);
            data.is_inaccessible |= has_directive(&block.directives, directives::INACCESSIBLE);
            extend_tags(&mut data.tags, &block.directives);
            for member_name in block.union_members {
                if !data.members.insert(member_name.clone()) {
                    self.errors.push(CompositionError::DuplicateUnionMemberDefinition {
                        type_name: type_name.to_owned(),
                        member_name,
                    });
                }
            }
        }
        data
    }

    fn merge_enum_blocks(&mut self, type_name: &str, blocks: Vec<Block>, extension_only: bool) -> SubgraphEnumData {
        let mut data = SubgraphEnumData {
            type_name: type_name.to_owned(),
            description: DescriptionData::default(),
            values: IndexMap::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            extension_only,
        };
        for block in blocks {
            validate_directives(
                type_name,
                DirectiveLocationKind::Enum,
                &block.directives,
                &self.user_directives,
                &mut self.errors,
            );
            if block.description.is_some() {
                data.description.text = block.description.clone();
            }
            apply_configure_description(&mut data.description, &block.directives);
            data.is_inaccessible |= has_directive(&block.directives, directives::INACCESSIBLE);
            extend_tags(&mut data.tags, &block.directives);
            for value_node in &block.enum_values {
                let value_name = value_node.value.to_string();
                if data.values.contains_key(&value_name) {
                    self.errors.push(CompositionError::DuplicateEnumValueDefinition {
                        type_name: type_name.to_owned(),
                        value_name,
                    });
                    continue;
                }
                let host_path = format!("{type_name}.{value_name}");
                validate_directives(
                    &host_path,
                    DirectiveLocationKind::EnumValue,
                    &value_node.directives,
                    &self.user_directives,
                    &mut self.errors,
                );
                let mut description = DescriptionData {
                    text: value_node.description.as_ref().map(|text| text.as_str().to_owned()),
                    ..DescriptionData::default()
                };
                apply_configure_description(&mut description, &value_node.directives);
                data.values.insert(
                    value_name.clone(),
                    SubgraphEnumValueData {
                        value_name,
                        description,
                        is_inaccessible: has_directive(&value_node.directives, directives::INACCESSIBLE),
                        tags: collect_tags(&value_node.directives),
                        deprecation: extract_deprecation(&value_node.directives),
                    },
                );
            }
        }
        data
    }

    fn merge_input_object_blocks(
        &mut self,
        type_name: &str,
        blocks: Vec<Block>,
        extension_only: bool,
    ) -> SubgraphInputObjectData {
        let mut data = SubgraphInputObjectData {
            type_name: type_name.to_owned(),
            description: DescriptionData::default(),
            fields: IndexMap::new(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            extension_only,
        };
        for block in blocks {
            validate_directives(
                type_name,
                DirectiveLocationKind::InputObject,
                &block.directives,
                &self.user_directives,
                &mut self.errors,
            );
            if block.description.is_some() {
                data.description.text = block.description.clone();
            }
            apply_configure_description(&mut data.description, &block.directives);
            data.is_inaccessible |= has_directive(&block.directives, directives::INACCESSIBLE);
            extend_tags(&mut data.tags, &block.directives);
            for field_node in &block.input_fields {
                let field_name = field_node.name.to_string();
                if data.fields.contains_key(&field_name) {
                    self.errors.push(CompositionError::DuplicateInputFieldDefinition {
                        type_name: type_name.to_owned(),
                        field_name,
                    });
                    continue;
                }
                let field = self.build_input_value(
                    &format!("{type_name}.{field_name}"),
                    field_node,
                    DirectiveLocationKind::InputFieldDefinition,
                );
                data.fields.insert(field_name, field);
            }
        }
        data
    }

    fn merge_scalar_blocks(&mut self, type_name: &str, blocks: Vec<Block>, extension_only: bool) -> SubgraphScalarData {
        let mut data = SubgraphScalarData {
            type_name: type_name.to_owned(),
            description: DescriptionData::default(),
            is_inaccessible: false,
            tags: IndexSet::new(),
            specified_by_url: None,
            extension_only,
        };
        for block in blocks {
            validate_directives(
                type_name,
                DirectiveLocationKind::Scalar,
                &block.directives,
                &self.user_directives,
                &mut self.errors,
            );
            if block.description.is_some() {
                data.description.text = block.description.clone();
            }
            apply_configure_description(&mut data.description, &block.directives);
            data.is_inaccessible |= has_directive(&block.directives, directives::INACCESSIBLE);
            extend_tags(&mut data.tags, &block.directives);
            if let Some(url) = block
                .directives
                .iter()
                .find(|directive| directive.name.as_str() == directives::SPECIFIED_BY)
                .and_then(|directive| directive_string_argument(directive, "url"))
            {
                data.specified_by_url = Some(url.to_owned());
            }
        }
        data
    }

    fn parse_keys(&mut self, type_name: &str, directive_list: &ast::DirectiveList) -> Vec<FieldSetData> {
        let mut keys = Vec::new();
        for directive in directive_list.iter().filter(|d| d.name.as_str() == directives::KEY) {
            let Some(raw) = directive_string_argument(directive, "fields") else {
                // Missing/mistyped arguments were already reported by the
                // directive validator.
                continue;
            };
            let resolvable = directive_bool_argument(directive, "resolvable").unwrap_or(true);
            match field_set::parse_field_set(raw) {
                Ok(selection_set) => {
                    let canonical = selection_set.to_string();
                    keys.push(FieldSetData { selection_set, canonical, resolvable });
                }
                Err(message) => {
                    self.errors.push(CompositionError::InvalidDirective {
                        directive_name: directives::KEY.to_owned(),
                        host_path: type_name.to_owned(),
                        ordinal: None,
                        errors: vec![message],
                    });
                }
            }
        }
        keys
    }

    fn parse_field_set_argument(
        &mut self,
        host_path: &str,
        directive_name: &str,
        directive_list: &ast::DirectiveList,
    ) -> Option<FieldSetData> {
        let directive = directive_list.iter().find(|d| d.name.as_str() == directive_name)?;
        let raw = directive_string_argument(directive, "fields")?;
        match field_set::parse_field_set(raw) {
            Ok(selection_set) => {
                let canonical = selection_set.to_string();
                Some(FieldSetData { selection_set, canonical, resolvable: true })
            }
            Err(message) => {
                self.errors.push(CompositionError::InvalidDirective {
                    directive_name: directive_name.to_owned(),
                    host_path: host_path.to_owned(),
                    ordinal: None,
                    errors: vec![message],
                });
                None
            }
        }
    }

    /// A type that only ever appears as an extension is fatal, except for
    /// operation root types, which are implicitly valid as extension-only.
    fn check_extension_orphans(
        &mut self,
        definitions: &IndexMap<String, SubgraphDefinition>,
        operation_root_types: &IndexMap<OperationKind, String>,
    ) {
        for (type_name, definition) in definitions {
            let extension_only = match definition {
                SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => data.extension_only,
                SubgraphDefinition::Union(data) => data.extension_only,
                SubgraphDefinition::Enum(data) => data.extension_only,
                SubgraphDefinition::InputObject(data) => data.extension_only,
                SubgraphDefinition::Scalar(data) => data.extension_only,
            };
            if !extension_only {
                continue;
            }
            if operation_root_types.values().any(|root| root == type_name) {
                continue;
            }
            self.errors.push(match definition {
                SubgraphDefinition::Scalar(_) => CompositionError::NoBaseScalarDefinition {
                    type_name: type_name.clone(),
                },
                other => CompositionError::NoBaseTypeExtension {
                    kind: other.kind(),
                    type_name: type_name.clone(),
                },
            });
        }
    }

    /// Rejects types with no members after extension merging. A root Query
    /// type may be legitimately empty in a single subgraph.
    fn check_empty_types(
        &mut self,
        definitions: &IndexMap<String, SubgraphDefinition>,
        operation_root_types: &IndexMap<OperationKind, String>,
    ) {
        let query_root = operation_root_types.get(&OperationKind::Query);
        for (type_name, definition) in definitions {
            match definition {
                SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => {
                    if data.fields.is_empty() && query_root.map(String::as_str) != Some(type_name.as_str()) {
                        self.errors.push(CompositionError::NoFieldDefinitions {
                            kind: definition.kind(),
                            type_name: type_name.clone(),
                        });
                    }
                }
                SubgraphDefinition::InputObject(data) => {
                    if data.fields.is_empty() {
                        self.errors.push(CompositionError::NoInputValueDefinitions {
                            type_name: type_name.clone(),
                        });
                    }
                }
                SubgraphDefinition::Enum(data) => {
                    if data.values.is_empty() {
                        self.errors.push(CompositionError::NoDefinedEnumValues {
                            type_name: type_name.clone(),
                        });
                    }
                }
                SubgraphDefinition::Union(data) => {
                    if data.members.is_empty() {
                        self.errors.push(CompositionError::NoDefinedUnionMembers {
                            type_name: type_name.clone(),
                        });
                    }
                }
                SubgraphDefinition::Scalar(_) => {}
            }
        }
    }

    /// Every named type referenced anywhere must be defined in the subgraph
    /// or be a built-in scalar (including the federation field-set/scope
    /// scalars, which are part of the injected baseline).
    fn check_undefined_references(
        &mut self,
        definitions: &IndexMap<String, SubgraphDefinition>,
        operation_root_types: &IndexMap<OperationKind, String>,
    ) {
        let mut referenced: IndexSet<&str> = IndexSet::new();
        for definition in definitions.values() {
            match definition {
                SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => {
                    referenced.extend(data.implements.iter().map(String::as_str));
                    for field in data.fields.values() {
                        referenced.insert(field.ty.inner_named_type().as_str());
                        for argument in field.arguments.values() {
                            referenced.insert(argument.ty.inner_named_type().as_str());
                        }
                    }
                }
                SubgraphDefinition::Union(data) => {
                    referenced.extend(data.members.iter().map(String::as_str));
                }
                SubgraphDefinition::InputObject(data) => {
                    for field in data.fields.values() {
                        referenced.insert(field.ty.inner_named_type().as_str());
                    }
                }
                SubgraphDefinition::Enum(_) | SubgraphDefinition::Scalar(_) => {}
            }
        }
        referenced.extend(operation_root_types.values().map(String::as_str));

        for type_name in referenced {
            let is_defined = definitions.contains_key(type_name)
                || BUILT_IN_SCALARS.contains(&type_name)
                || type_name == FIELD_SET_SCALAR
                || type_name == SCOPE_SCALAR;
            if !is_defined {
                self.errors.push(CompositionError::UndefinedType {
                    type_name: type_name.to_owned(),
                });
            }
        }
    }

    /// Every subgraph must be a coherent schema on its own: a type
    /// implementing an interface defined in this subgraph must declare all
    /// of its fields here, except fields marked `@inaccessible`, whose
    /// implementation may live in another subgraph.
    fn check_interface_implementations(&mut self, definitions: &IndexMap<String, SubgraphDefinition>) {
        use crate::error::InterfaceImplementationErrors;
        for definition in definitions.values() {
            let data = match definition {
                SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => data,
                _ => continue,
            };
            let mut by_interface = Vec::new();
            for interface_name in &data.implements {
                let Some(SubgraphDefinition::Interface(interface_data)) = definitions.get(interface_name)
                else {
                    continue;
                };
                let unimplemented_fields: Vec<String> = interface_data
                    .fields
                    .values()
                    .filter(|field| !field.is_inaccessible)
                    .filter(|field| !data.fields.contains_key(&field.field_name))
                    .map(|field| field.field_name.clone())
                    .collect();
                if !unimplemented_fields.is_empty() {
                    by_interface.push(InterfaceImplementationErrors {
                        interface_name: interface_name.clone(),
                        unimplemented_fields,
                        invalid_field_implementations: Vec::new(),
                    });
                }
            }
            if !by_interface.is_empty() {
                self.errors.push(CompositionError::UnimplementedInterfaceFields {
                    type_name: data.type_name.clone(),
                    kind: definition.kind(),
                    by_interface,
                });
            }
        }
    }

    /// `@configureDescription` requires something to configure: either an
    /// element description or an explicit replacement text.
    fn check_configure_description_usages(&mut self, definitions: &IndexMap<String, SubgraphDefinition>) {
        let check = |host_path: &str, description: &DescriptionData, errors: &mut Vec<CompositionError>| {
            if description.has_configure_directive
                && description.text.is_none()
                && description.override_text.is_none()
            {
                errors.push(CompositionError::InvalidDirective {
                    directive_name: directives::CONFIGURE_DESCRIPTION.to_owned(),
                    host_path: host_path.to_owned(),
                    ordinal: None,
                    errors: vec![
                        "Neither a description nor the \"description\" argument is defined.".to_owned(),
                    ],
                });
            }
        };
        for (type_name, definition) in definitions {
            match definition {
                SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => {
                    check(type_name, &data.description, &mut self.errors);
                    for field in data.fields.values() {
                        check(&field.path(), &field.description, &mut self.errors);
                        for argument in field.arguments.values() {
                            check(
                                &format!("{}({}:)", field.path(), argument.name),
                                &argument.description,
                                &mut self.errors,
                            );
                        }
                    }
                }
                SubgraphDefinition::Union(data) => check(type_name, &data.description, &mut self.errors),
                SubgraphDefinition::Enum(data) => {
                    check(type_name, &data.description, &mut self.errors);
                    for value in data.values.values() {
                        check(&format!("{type_name}.{}", value.value_name), &value.description, &mut self.errors);
                    }
                }
                SubgraphDefinition::InputObject(data) => {
                    check(type_name, &data.description, &mut self.errors);
                    for field in data.fields.values() {
                        check(&format!("{type_name}.{}", field.name), &field.description, &mut self.errors);
                    }
                }
                SubgraphDefinition::Scalar(data) => check(type_name, &data.description, &mut self.errors),
            }
        }
    }

    /// Validates every `@key`, `@provides` and `@requires` field set against
    /// the finished registry. Returns the external key fields promoted into
    /// root-addressable field-name sets and the full key-field-name sets,
    /// both per type.
    fn validate_field_sets(
        &mut self,
        definitions: &IndexMap<String, SubgraphDefinition>,
    ) -> (IndexMap<String, IndexSet<String>>, IndexMap<String, IndexSet<String>>) {
        let mut promotions: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut key_field_names: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (type_name, definition) in definitions {
            let data = match definition {
                SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => data,
                _ => continue,
            };
            for (index, key) in data.keys.iter().enumerate() {
                let validation =
                    field_set::validate_field_set(definitions, type_name, &key.selection_set, FieldSetContext::Key);
                if !validation.errors.is_empty() {
                    self.errors.push(CompositionError::InvalidDirective {
                        directive_name: directives::KEY.to_owned(),
                        host_path: type_name.clone(),
                        ordinal: if data.keys.len() > 1 { Some(index + 1) } else { None },
                        errors: validation.errors,
                    });
                }
                for (promoted_type, field_names) in validation.external_key_field_names_by_type {
                    promotions.entry(promoted_type).or_default().extend(field_names);
                }
                for (key_type, field_names) in validation.key_field_names_by_type {
                    key_field_names.entry(key_type).or_default().extend(field_names);
                }
            }
            for field in data.fields.values() {
                if let Some(provides) = &field.provides {
                    let provided_type_name = field.ty.inner_named_type().as_str();
                    let validation = field_set::validate_field_set(
                        definitions,
                        provided_type_name,
                        &provides.selection_set,
                        FieldSetContext::Provides,
                    );
                    if !validation.errors.is_empty() {
                        self.errors.push(CompositionError::InvalidDirective {
                            directive_name: directives::PROVIDES.to_owned(),
                            host_path: field.path(),
                            ordinal: None,
                            errors: validation.errors,
                        });
                    }
                }
                if let Some(requires) = &field.requires {
                    let validation = field_set::validate_field_set(
                        definitions,
                        type_name,
                        &requires.selection_set,
                        FieldSetContext::Requires,
                    );
                    if !validation.errors.is_empty() {
                        self.errors.push(CompositionError::InvalidDirective {
                            directive_name: directives::REQUIRES.to_owned(),
                            host_path: field.path(),
                            ordinal: None,
                            errors: validation.errors,
                        });
                    }
                }
            }
        }
        (promotions, key_field_names)
    }
}

/// Assembles the per-type router configuration and the entity-interface
/// bookkeeping for the subgraph.
fn build_configuration(
    definitions: &IndexMap<String, SubgraphDefinition>,
    promotions: &IndexMap<String, IndexSet<String>>,
) -> (IndexMap<String, ConfigurationData>, IndexMap<String, EntityInterfaceData>) {
    let mut configuration: IndexMap<String, ConfigurationData> = IndexMap::new();
    let mut entity_interfaces: IndexMap<String, EntityInterfaceData> = IndexMap::new();

    for (type_name, definition) in definitions {
        match definition {
            SubgraphDefinition::Object(data) => {
                let mut config = composite_configuration(data, promotions);
                if data.is_interface_object {
                    config.is_interface_object = true;
                    entity_interfaces.insert(
                        type_name.clone(),
                        EntityInterfaceData {
                            is_interface_object: true,
                            concrete_type_names: IndexSet::new(),
                        },
                    );
                }
                configuration.insert(type_name.clone(), config);
            }
            SubgraphDefinition::Interface(data) => {
                if !data.is_entity {
                    continue;
                }
                let concrete_type_names = implementers_of(definitions, type_name);
                let mut config = composite_configuration(data, promotions);
                config.is_root_node = true;
                config.entity_interface_concrete_type_names = concrete_type_names.clone();
                configuration.insert(type_name.clone(), config);
                entity_interfaces.insert(
                    type_name.clone(),
                    EntityInterfaceData {
                        is_interface_object: false,
                        concrete_type_names,
                    },
                );
            }
            _ => {}
        }
    }

    (configuration, entity_interfaces)
}

fn composite_configuration(
    data: &SubgraphCompositeData,
    promotions: &IndexMap<String, IndexSet<String>>,
) -> ConfigurationData {
    let promoted = promotions.get(&data.type_name);
    let mut field_names: IndexSet<String> = IndexSet::new();
    let mut external_field_names: IndexSet<String> = IndexSet::new();
    for (field_name, field) in &data.fields {
        if field.is_external {
            external_field_names.insert(field_name.clone());
            // External key fields remain router-addressable.
            if promoted.is_some_and(|set| set.contains(field_name)) {
                field_names.insert(field_name.clone());
            }
        } else {
            field_names.insert(field_name.clone());
        }
    }

    let keys = data
        .keys
        .iter()
        .map(|key| RequiredFieldConfiguration {
            field_name: String::new(),
            selection_set: key.canonical.clone(),
            disable_entity_resolver: !key.resolvable,
        })
        .collect();
    let mut provides = Vec::new();
    let mut requires = Vec::new();
    for (field_name, field) in &data.fields {
        if let Some(field_set) = &field.provides {
            provides.push(RequiredFieldConfiguration {
                field_name: field_name.clone(),
                selection_set: field_set.canonical.clone(),
                disable_entity_resolver: false,
            });
        }
        if let Some(field_set) = &field.requires {
            requires.push(RequiredFieldConfiguration {
                field_name: field_name.clone(),
                selection_set: field_set.canonical.clone(),
                disable_entity_resolver: false,
            });
        }
    }

    ConfigurationData {
        type_name: data.type_name.clone(),
        is_root_node: data.is_entity || data.is_root_type,
        field_names,
        keys,
        provides,
        requires,
        external_field_names,
        is_interface_object: false,
        entity_interface_concrete_type_names: IndexSet::new(),
    }
}

fn implementers_of(definitions: &IndexMap<String, SubgraphDefinition>, interface_name: &str) -> IndexSet<String> {
    definitions
        .values()
        .filter_map(|definition| match definition {
            SubgraphDefinition::Object(data) if data.implements.contains(interface_name) => {
                Some(data.type_name.clone())
            }
            _ => None,
        })
        .collect()
}

fn has_directive(directive_list: &ast::DirectiveList, name: &str) -> bool {
    directive_list.iter().any(|directive| directive.name.as_str() == name)
}

fn collect_tags(directive_list: &ast::DirectiveList) -> IndexSet<String> {
    directive_list
        .iter()
        .filter(|directive| directive.name.as_str() == directives::TAG)
        .filter_map(|directive| directive_string_argument(directive, "name"))
        .map(str::to_owned)
        .collect()
}

fn extend_tags(tags: &mut IndexSet<String>, directive_list: &ast::DirectiveList) {
    tags.extend(collect_tags(directive_list));
}

fn extract_scopes(directive_list: &ast::DirectiveList) -> Vec<Vec<String>> {
    let Some(directive) = directive_list
        .iter()
        .find(|directive| directive.name.as_str() == directives::REQUIRES_SCOPES)
    else {
        return Vec::new();
    };
    let Some(ast::Value::List(or_scopes)) = directives::directive_argument(directive, "scopes") else {
        return Vec::new();
    };
    or_scopes
        .iter()
        .filter_map(|and_scopes| match &**and_scopes {
            ast::Value::List(scopes) => Some(
                scopes
                    .iter()
                    .filter_map(|scope| match &**scope {
                        ast::Value::String(text) => Some(text.as_str().to_owned()),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })
        .collect()
}

/// OR-of-AND scope sets merge as a union of the OR branches.
pub(crate) fn merge_scopes(target: &mut Vec<Vec<String>>, source: Vec<Vec<String>>) {
    for and_scopes in source {
        if !target.contains(&and_scopes) {
            target.push(and_scopes);
        }
    }
}

fn extract_deprecation(directive_list: &ast::DirectiveList) -> Option<Deprecation> {
    directive_list
        .iter()
        .find(|directive| directive.name.as_str() == directives::DEPRECATED)
        .map(|directive| Deprecation {
            reason: directive_string_argument(directive, "reason")
                .map(str::to_owned)
                .or_else(|| Some("No longer supported".to_owned())),
        })
}

fn apply_configure_description(description: &mut DescriptionData, directive_list: &ast::DirectiveList) {
    let Some(directive) = directive_list
        .iter()
        .find(|directive| directive.name.as_str() == directives::CONFIGURE_DESCRIPTION)
    else {
        return;
    };
    description.has_configure_directive = true;
    description.propagate = directive_bool_argument(directive, "propagateToFederatedGraph").unwrap_or(true);
    if let Some(text) = directive_string_argument(directive, "description") {
        description.override_text = Some(text.to_owned());
    }
}
