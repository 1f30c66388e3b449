//! The shared state of the federation pass: the merged registry, the
//! diagnostic sinks, and the bookkeeping the post-merge validations need.

use indexmap::{IndexMap, IndexSet};

use crate::definitions::{EntityInterfaceData, OperationKind, ParentDefinitionData};
use crate::error::{CompositionError, CompositionWarning};

/// A field removed from a subgraph's router configuration because another
/// subgraph took ownership through `@override`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OverrideRemoval {
    pub(crate) subgraph_name: String,
    pub(crate) type_name: String,
    pub(crate) field_name: String,
}

#[derive(Clone)]
pub(crate) struct FederationContext {
    pub(crate) subgraph_names: IndexSet<String>,
    /// The merged registry, keyed by composed type name in first-seen order.
    pub(crate) parents: IndexMap<String, ParentDefinitionData>,
    /// Canonical federated root type name per operation kind.
    pub(crate) root_type_names: IndexMap<OperationKind, String>,
    /// interface name -> subgraph name -> entity-interface data.
    pub(crate) entity_interfaces: IndexMap<String, IndexMap<String, EntityInterfaceData>>,
    /// Resolved federated description per element path.
    pub(crate) descriptions_by_path: IndexMap<String, String>,
    pub(crate) override_removals: Vec<OverrideRemoval>,
    pub(crate) errors: Vec<CompositionError>,
    pub(crate) warnings: Vec<CompositionWarning>,
}

impl FederationContext {
    pub(crate) fn new() -> Self {
        Self {
            subgraph_names: IndexSet::new(),
            parents: IndexMap::new(),
            root_type_names: IndexMap::new(),
            entity_interfaces: IndexMap::new(),
            descriptions_by_path: IndexMap::new(),
            override_removals: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn is_root_type(&self, type_name: &str) -> bool {
        self.root_type_names.values().any(|root| root == type_name)
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
