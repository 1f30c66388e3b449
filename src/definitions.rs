//! The canonical type/field registry shared by the normalization and
//! federation passes, plus the public router-configuration structures.
//!
//! The registry is string-keyed: all cross-references (field return types,
//! implemented interfaces, union members) are stored as type names and
//! resolved lazily, so self-referential and mutually-referential types need
//! no cyclic ownership.

use apollo_compiler::ast;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::field_set::SelectionSet;

pub(crate) const QUERY: &str = "Query";
pub(crate) const MUTATION: &str = "Mutation";
pub(crate) const SUBSCRIPTION: &str = "Subscription";
pub(crate) const SERVICE_FIELD: &str = "_service";
pub(crate) const ENTITIES_FIELD: &str = "_entities";

/// The kind of a type-system definition. Exactly one kind is recorded per
/// composed type name; a cross-subgraph kind mismatch is fatal for the type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TypeKind {
    #[strum(to_string = "Object")]
    Object,
    #[strum(to_string = "Interface")]
    Interface,
    #[strum(to_string = "Union")]
    Union,
    #[strum(to_string = "Enum")]
    Enum,
    #[strum(to_string = "Input Object")]
    InputObject,
    #[strum(to_string = "Scalar")]
    Scalar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum OperationKind {
    #[strum(to_string = "query")]
    Query,
    #[strum(to_string = "mutation")]
    Mutation,
    #[strum(to_string = "subscription")]
    Subscription,
}

impl OperationKind {
    pub(crate) fn default_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => QUERY,
            OperationKind::Mutation => MUTATION,
            OperationKind::Subscription => SUBSCRIPTION,
        }
    }
}

/// Description state of one element in one subgraph, including the effect of
/// `@configureDescription`.
#[derive(Clone, Debug)]
pub(crate) struct DescriptionData {
    pub(crate) text: Option<String>,
    /// `@configureDescription(propagateToFederatedGraph:)`; defaults to true.
    pub(crate) propagate: bool,
    /// `@configureDescription(description:)` replacement text.
    pub(crate) override_text: Option<String>,
    pub(crate) has_configure_directive: bool,
}

impl Default for DescriptionData {
    fn default() -> Self {
        Self {
            text: None,
            propagate: true,
            override_text: None,
            has_configure_directive: false,
        }
    }
}

impl DescriptionData {
    /// The description this subgraph would contribute to the federated
    /// schema, if any.
    pub(crate) fn contributed_text(&self) -> Option<&str> {
        if !self.propagate {
            return None;
        }
        self.override_text.as_deref().or(self.text.as_deref())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_none() && self.override_text.is_none() && !self.has_configure_directive
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Deprecation {
    pub(crate) reason: Option<String>,
}

/// A validated `@key` (or `@provides`/`@requires`) selection, in parsed and
/// canonical string form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FieldSetData {
    pub(crate) selection_set: SelectionSet,
    /// Canonical single-space rendering; equality of two keys is equality of
    /// this string.
    pub(crate) canonical: String,
    pub(crate) resolvable: bool,
}

// ---------------------------------------------------------------------------
// Subgraph-level registry (output of normalization, input to federation)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub(crate) enum SubgraphDefinition {
    Object(SubgraphCompositeData),
    Interface(SubgraphCompositeData),
    Union(SubgraphUnionData),
    Enum(SubgraphEnumData),
    InputObject(SubgraphInputObjectData),
    Scalar(SubgraphScalarData),
}

impl SubgraphDefinition {
    pub(crate) fn kind(&self) -> TypeKind {
        match self {
            SubgraphDefinition::Object(_) => TypeKind::Object,
            SubgraphDefinition::Interface(_) => TypeKind::Interface,
            SubgraphDefinition::Union(_) => TypeKind::Union,
            SubgraphDefinition::Enum(_) => TypeKind::Enum,
            SubgraphDefinition::InputObject(_) => TypeKind::InputObject,
            SubgraphDefinition::Scalar(_) => TypeKind::Scalar,
        }
    }

    pub(crate) fn type_name(&self) -> &str {
        match self {
            SubgraphDefinition::Object(data) | SubgraphDefinition::Interface(data) => &data.type_name,
            SubgraphDefinition::Union(data) => &data.type_name,
            SubgraphDefinition::Enum(data) => &data.type_name,
            SubgraphDefinition::InputObject(data) => &data.type_name,
            SubgraphDefinition::Scalar(data) => &data.type_name,
        }
    }

}

/// Object and interface definitions share this payload; the enum variant
/// carries the kind.
#[derive(Clone, Debug)]
pub(crate) struct SubgraphCompositeData {
    pub(crate) type_name: String,
    pub(crate) description: DescriptionData,
    pub(crate) implements: IndexSet<String>,
    pub(crate) fields: IndexMap<String, SubgraphFieldData>,
    pub(crate) keys: Vec<FieldSetData>,
    pub(crate) is_root_type: bool,
    pub(crate) is_entity: bool,
    pub(crate) is_interface_object: bool,
    pub(crate) is_inaccessible: bool,
    pub(crate) is_shareable: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) requires_authentication: bool,
    pub(crate) required_scopes: Vec<Vec<String>>,
    /// True while the type has only been seen as an `extend` block.
    pub(crate) extension_only: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphFieldData {
    pub(crate) field_name: String,
    pub(crate) parent_type_name: String,
    pub(crate) ty: ast::Type,
    pub(crate) arguments: IndexMap<String, SubgraphInputValueData>,
    pub(crate) description: DescriptionData,
    pub(crate) is_shareable: bool,
    pub(crate) is_external: bool,
    pub(crate) override_from: Option<String>,
    pub(crate) provides: Option<FieldSetData>,
    pub(crate) requires: Option<FieldSetData>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) requires_authentication: bool,
    pub(crate) required_scopes: Vec<Vec<String>>,
    pub(crate) deprecation: Option<Deprecation>,
}

impl SubgraphFieldData {
    pub(crate) fn path(&self) -> String {
        format!("{}.{}", self.parent_type_name, self.field_name)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphInputValueData {
    pub(crate) name: String,
    pub(crate) ty: ast::Type,
    pub(crate) default_value: Option<ast::Value>,
    pub(crate) description: DescriptionData,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) deprecation: Option<Deprecation>,
}

impl SubgraphInputValueData {
    /// Required means non-null with no default; omitting such a value in a
    /// sibling subgraph is a composition error.
    pub(crate) fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphUnionData {
    pub(crate) type_name: String,
    pub(crate) description: DescriptionData,
    pub(crate) members: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) extension_only: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphEnumData {
    pub(crate) type_name: String,
    pub(crate) description: DescriptionData,
    pub(crate) values: IndexMap<String, SubgraphEnumValueData>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) extension_only: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphEnumValueData {
    pub(crate) value_name: String,
    pub(crate) description: DescriptionData,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) deprecation: Option<Deprecation>,
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphInputObjectData {
    pub(crate) type_name: String,
    pub(crate) description: DescriptionData,
    pub(crate) fields: IndexMap<String, SubgraphInputValueData>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) extension_only: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct SubgraphScalarData {
    pub(crate) type_name: String,
    pub(crate) description: DescriptionData,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) specified_by_url: Option<String>,
    pub(crate) extension_only: bool,
}

/// Entity-interface bookkeeping for one subgraph: an interface carrying a
/// `@key`, or an object declared `@interfaceObject` standing in for one.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityInterfaceData {
    pub(crate) is_interface_object: bool,
    pub(crate) concrete_type_names: IndexSet<String>,
}

/// The successful output of normalizing one subgraph. Read-only once
/// federation begins.
#[derive(Clone, Debug)]
pub(crate) struct NormalizedSubgraph {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) definitions: IndexMap<String, SubgraphDefinition>,
    pub(crate) configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
    pub(crate) operation_root_types: IndexMap<OperationKind, String>,
    pub(crate) entity_interfaces: IndexMap<String, EntityInterfaceData>,
    /// Fields referenced by `@key` field sets, per parent type name. Such
    /// fields are implicitly shareable.
    pub(crate) key_field_names_by_type_name: IndexMap<String, IndexSet<String>>,
}

// ---------------------------------------------------------------------------
// Federation-level registry (built by the merger from all subgraph registries)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub(crate) enum ParentDefinitionData {
    Object(CompositeTypeData),
    Interface(CompositeTypeData),
    Union(UnionTypeData),
    Enum(EnumTypeData),
    InputObject(InputObjectTypeData),
    Scalar(ScalarTypeData),
}

impl ParentDefinitionData {
    pub(crate) fn kind(&self) -> TypeKind {
        match self {
            ParentDefinitionData::Object(_) => TypeKind::Object,
            ParentDefinitionData::Interface(_) => TypeKind::Interface,
            ParentDefinitionData::Union(_) => TypeKind::Union,
            ParentDefinitionData::Enum(_) => TypeKind::Enum,
            ParentDefinitionData::InputObject(_) => TypeKind::InputObject,
            ParentDefinitionData::Scalar(_) => TypeKind::Scalar,
        }
    }

    pub(crate) fn type_name(&self) -> &str {
        match self {
            ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data) => &data.type_name,
            ParentDefinitionData::Union(data) => &data.type_name,
            ParentDefinitionData::Enum(data) => &data.type_name,
            ParentDefinitionData::InputObject(data) => &data.type_name,
            ParentDefinitionData::Scalar(data) => &data.type_name,
        }
    }

    pub(crate) fn is_inaccessible(&self) -> bool {
        match self {
            ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data) => data.is_inaccessible,
            ParentDefinitionData::Union(data) => data.is_inaccessible,
            ParentDefinitionData::Enum(data) => data.is_inaccessible,
            ParentDefinitionData::InputObject(data) => data.is_inaccessible,
            ParentDefinitionData::Scalar(data) => data.is_inaccessible,
        }
    }

}

/// Merged object or interface data; the wrapping variant carries the kind.
#[derive(Clone, Debug)]
pub(crate) struct CompositeTypeData {
    pub(crate) type_name: String,
    pub(crate) kind: TypeKind,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) fields: IndexMap<String, FieldData>,
    pub(crate) implements: IndexSet<String>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_root_type: bool,
    pub(crate) is_entity: bool,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) keys_by_subgraph_name: IndexMap<String, Vec<FieldSetData>>,
    /// Subgraphs in which this type is declared `@interfaceObject`.
    pub(crate) interface_object_subgraph_names: IndexSet<String>,
    pub(crate) requires_authentication: bool,
    pub(crate) required_scopes: Vec<Vec<String>>,
}

#[derive(Clone, Debug)]
pub(crate) struct FieldData {
    pub(crate) field_name: String,
    pub(crate) parent_type_name: String,
    /// Most restrictive compatible merged type.
    pub(crate) ty: ast::Type,
    pub(crate) type_by_subgraph_name: IndexMap<String, ast::Type>,
    pub(crate) arguments: IndexMap<String, ArgumentData>,
    pub(crate) is_shareable_by_subgraph_name: IndexMap<String, bool>,
    pub(crate) is_external_by_subgraph_name: IndexMap<String, bool>,
    pub(crate) override_from_by_subgraph_name: IndexMap<String, String>,
    pub(crate) provides_by_subgraph_name: IndexMap<String, FieldSetData>,
    pub(crate) requires_by_subgraph_name: IndexMap<String, FieldSetData>,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) requires_authentication: bool,
    pub(crate) required_scopes: Vec<Vec<String>>,
    pub(crate) deprecation: Option<Deprecation>,
}

impl FieldData {
    pub(crate) fn path(&self) -> String {
        format!("{}.{}", self.parent_type_name, self.field_name)
    }

    pub(crate) fn is_external_in(&self, subgraph_name: &str) -> bool {
        self.is_external_by_subgraph_name
            .get(subgraph_name)
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ArgumentData {
    pub(crate) argument_name: String,
    pub(crate) ty: ast::Type,
    pub(crate) type_by_subgraph_name: IndexMap<String, ast::Type>,
    pub(crate) default_value: Option<ast::Value>,
    pub(crate) default_value_by_subgraph_name: IndexMap<String, Option<ast::Value>>,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) deprecation: Option<Deprecation>,
}

impl ArgumentData {
    pub(crate) fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct UnionTypeData {
    pub(crate) type_name: String,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) members: IndexSet<String>,
    pub(crate) members_by_subgraph_name: IndexMap<String, IndexSet<String>>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct EnumTypeData {
    pub(crate) type_name: String,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) values: IndexMap<String, EnumValueData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct EnumValueData {
    pub(crate) value_name: String,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) deprecation: Option<Deprecation>,
}

#[derive(Clone, Debug)]
pub(crate) struct InputObjectTypeData {
    pub(crate) type_name: String,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) fields: IndexMap<String, InputFieldData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct InputFieldData {
    pub(crate) field_name: String,
    pub(crate) parent_type_name: String,
    pub(crate) ty: ast::Type,
    pub(crate) type_by_subgraph_name: IndexMap<String, ast::Type>,
    pub(crate) default_value: Option<ast::Value>,
    pub(crate) default_value_by_subgraph_name: IndexMap<String, Option<ast::Value>>,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) subgraph_names: IndexSet<String>,
    /// Subgraphs in which this input field is non-null with no default.
    pub(crate) required_in_subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) deprecation: Option<Deprecation>,
}

#[derive(Clone, Debug)]
pub(crate) struct ScalarTypeData {
    pub(crate) type_name: String,
    pub(crate) description_by_subgraph_name: IndexMap<String, DescriptionData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
    pub(crate) tags: IndexSet<String>,
    pub(crate) specified_by_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Router-facing configuration (public output, consumed unchanged)
// ---------------------------------------------------------------------------

fn is_false(value: &bool) -> bool {
    !*value
}

/// One `@key`/`@provides`/`@requires` entry in the router configuration. For
/// keys, `field_name` is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredFieldConfiguration {
    pub field_name: String,
    pub selection_set: String,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_entity_resolver: bool,
}

/// Runtime routing data for one (subgraph, type) pair. Produced by the
/// normalizer, never mutated after federation begins.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationData {
    pub type_name: String,
    pub is_root_node: bool,
    pub field_names: IndexSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<RequiredFieldConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<RequiredFieldConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiredFieldConfiguration>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub external_field_names: IndexSet<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_interface_object: bool,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub entity_interface_concrete_type_names: IndexSet<String>,
}

/// Per-field runtime configuration: argument names plus authorization data
/// derived from `@authenticated`/`@requiresScopes`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfiguration {
    pub type_name: String,
    pub field_name: String,
    pub argument_names: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub requires_authentication: bool,
    /// OR of AND scope sets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_scopes: Vec<Vec<String>>,
}

/// Input-coercion hint: one entry per composed field with arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentConfiguration {
    pub type_name: String,
    pub field_name: String,
    pub argument_names: Vec<String>,
}

/// A subgraph's slice of the composed result: its identity plus one
/// [`ConfigurationData`] per type it contributes.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphConfiguration {
    pub subgraph_name: String,
    pub routing_url: String,
    pub configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
}
