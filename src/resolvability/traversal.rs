//! The reachability walk proper: a multi-source BFS/DFS from each root
//! operation field over the merged registry, where the state at a composite
//! type is the set of subgraphs that can currently hold an instance of it.
//! Visited states are keyed by `(type, origin-set)`, so recursive and
//! mutually-recursive types terminate on revisit.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};

use crate::definitions::{CompositeTypeData, FieldData, ParentDefinitionData};
use crate::error::CompositionError;
use crate::field_set::SelectionSet;
use crate::merge::FederationContext;

use super::graph::EntityJumpGraph;

pub(super) struct ResolvabilityWalker<'a> {
    ctx: &'a FederationContext,
    jump_graph: EntityJumpGraph,
    /// (subgraph, type) -> fields obtainable there through some `@provides`.
    provided_field_names: IndexMap<(String, String), IndexSet<String>>,
    /// (subgraph, type) -> fields referenced by that subgraph's keys.
    key_field_names: IndexMap<(String, String), IndexSet<String>>,
    /// interface name -> concrete implementer names.
    implementers: IndexMap<String, IndexSet<String>>,
    visited: IndexSet<(String, BTreeSet<String>)>,
    reported: IndexSet<(String, String)>,
    errors: Vec<CompositionError>,
}

impl<'a> ResolvabilityWalker<'a> {
    pub(super) fn new(ctx: &'a FederationContext) -> Self {
        let jump_graph = EntityJumpGraph::build(ctx);

        let mut provided_field_names: IndexMap<(String, String), IndexSet<String>> = IndexMap::new();
        let mut key_field_names: IndexMap<(String, String), IndexSet<String>> = IndexMap::new();
        let mut implementers: IndexMap<String, IndexSet<String>> = IndexMap::new();

        for parent in ctx.parents.values() {
            let (ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) = parent else {
                continue;
            };
            if matches!(parent, ParentDefinitionData::Object(_)) {
                for interface_name in &data.implements {
                    implementers
                        .entry(interface_name.clone())
                        .or_default()
                        .insert(data.type_name.clone());
                }
            }
            for (subgraph_name, keys) in &data.keys_by_subgraph_name {
                for key in keys {
                    for (parent_type_name, field_name) in
                        selection_field_paths(ctx, &data.type_name, &key.selection_set)
                    {
                        key_field_names
                            .entry((subgraph_name.clone(), parent_type_name))
                            .or_default()
                            .insert(field_name);
                    }
                }
            }
            for field in data.fields.values() {
                for (subgraph_name, provides) in &field.provides_by_subgraph_name {
                    let provided_type = field.ty.inner_named_type().as_str();
                    for (parent_type_name, field_name) in
                        selection_field_paths(ctx, provided_type, &provides.selection_set)
                    {
                        provided_field_names
                            .entry((subgraph_name.clone(), parent_type_name))
                            .or_default()
                            .insert(field_name);
                    }
                }
            }
        }

        Self {
            ctx,
            jump_graph,
            provided_field_names,
            key_field_names,
            implementers,
            visited: IndexSet::new(),
            reported: IndexSet::new(),
            errors: Vec::new(),
        }
    }

    pub(super) fn walk(mut self) -> Vec<CompositionError> {
        for root_type_name in self.ctx.root_type_names.values() {
            let Some(ParentDefinitionData::Object(root)) = self.ctx.parents.get(root_type_name) else {
                continue;
            };
            let root = root.clone();
            for field in root.fields.values() {
                let root_field_path = format!("{root_type_name}.{}", field.field_name);
                let origins = self.field_resolvers(&root, field, &root.subgraph_names);
                if origins.is_empty() {
                    self.report_unresolvable(&root_field_path, field, &[]);
                    continue;
                }
                self.visit_named_type(
                    field.ty.inner_named_type().as_str(),
                    &origins,
                    &[field.field_name.clone()],
                    &root_field_path,
                );
            }
        }
        self.errors
    }

    fn visit_named_type(
        &mut self,
        type_name: &str,
        origins: &IndexSet<String>,
        path: &[String],
        root_field_path: &str,
    ) {
        match self.ctx.parents.get(type_name) {
            Some(ParentDefinitionData::Object(data)) => {
                let data = data.clone();
                self.visit_composite(&data, origins, path, root_field_path);
            }
            Some(ParentDefinitionData::Interface(data)) => {
                let data = data.clone();
                self.visit_composite(&data, origins, path, root_field_path);
                // Concrete implementers are visited with the same origins;
                // branches no subgraph can produce are pruned silently.
                let concrete: Vec<String> = self
                    .implementers
                    .get(type_name)
                    .map(|names| names.iter().cloned().collect())
                    .unwrap_or_default();
                for concrete_type_name in concrete {
                    self.visit_possible_runtime_type(&concrete_type_name, origins, path, root_field_path);
                }
            }
            Some(ParentDefinitionData::Union(data)) => {
                let members: Vec<String> = data.members.iter().cloned().collect();
                for member_type_name in members {
                    self.visit_possible_runtime_type(&member_type_name, origins, path, root_field_path);
                }
            }
            _ => {}
        }
    }

    /// Visits a concrete runtime type of an abstract position. A member that
    /// no origin subgraph can reach is a dead branch, not a failure.
    fn visit_possible_runtime_type(
        &mut self,
        type_name: &str,
        origins: &IndexSet<String>,
        path: &[String],
        root_field_path: &str,
    ) {
        let Some(ParentDefinitionData::Object(data)) = self.ctx.parents.get(type_name) else {
            return;
        };
        let seed: IndexSet<String> = origins
            .iter()
            .filter(|origin| data.subgraph_names.contains(*origin))
            .cloned()
            .collect();
        if seed.is_empty() {
            return;
        }
        let data = data.clone();
        self.visit_composite(&data, &seed, path, root_field_path);
    }

    fn visit_composite(
        &mut self,
        data: &CompositeTypeData,
        origins: &IndexSet<String>,
        path: &[String],
        root_field_path: &str,
    ) {
        let seed: IndexSet<String> = origins
            .iter()
            .filter(|origin| data.subgraph_names.contains(*origin))
            .cloned()
            .collect();
        let expanded = self.jump_graph.key_closure(&data.type_name, &seed);

        let state = (data.type_name.clone(), expanded.iter().cloned().collect::<BTreeSet<_>>());
        if !self.visited.insert(state) {
            return;
        }

        for field in data.fields.values() {
            let resolvers = self.field_resolvers(data, field, &expanded);
            if resolvers.is_empty() {
                self.report_unresolvable(root_field_path, field, path);
                continue;
            }
            let mut child_path = path.to_vec();
            child_path.push(field.field_name.clone());
            self.visit_named_type(
                field.ty.inner_named_type().as_str(),
                &resolvers,
                &child_path,
                root_field_path,
            );
        }
    }

    /// The subgraphs, out of `candidates`, in which this field can actually
    /// be fetched: defined and not purely external (key fields and provided
    /// fields count), and not overridden away.
    fn field_resolvers(
        &self,
        parent: &CompositeTypeData,
        field: &FieldData,
        candidates: &IndexSet<String>,
    ) -> IndexSet<String> {
        let overridden: IndexSet<&String> = field.override_from_by_subgraph_name.values().collect();
        candidates
            .iter()
            .filter(|subgraph_name| field.subgraph_names.contains(*subgraph_name))
            .filter(|subgraph_name| !overridden.contains(*subgraph_name))
            .filter(|subgraph_name| {
                if !field.is_external_in(subgraph_name) {
                    return true;
                }
                let key = ((*subgraph_name).clone(), parent.type_name.clone());
                self.key_field_names
                    .get(&key)
                    .is_some_and(|names| names.contains(&field.field_name))
                    || self
                        .provided_field_names
                        .get(&key)
                        .is_some_and(|names| names.contains(&field.field_name))
            })
            .cloned()
            .collect()
    }

    fn report_unresolvable(&mut self, root_field_path: &str, field: &FieldData, path: &[String]) {
        let dedup_key = (root_field_path.to_owned(), field.path());
        if !self.reported.insert(dedup_key) {
            return;
        }
        self.errors.push(CompositionError::UnresolvableField {
            root_field_path: root_field_path.to_owned(),
            field_name: field.field_name.clone(),
            parent_type_name: field.parent_type_name.clone(),
            path_segments: path.to_vec(),
            defining_subgraph_names: field.subgraph_names.iter().cloned().collect(),
        });
    }
}

/// Flattens a field-set tree into `(parent type, field name)` pairs,
/// descending through the merged registry for nested selections.
fn selection_field_paths(
    ctx: &FederationContext,
    root_type_name: &str,
    selection_set: &SelectionSet,
) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut stack = vec![(root_type_name.to_owned(), selection_set)];
    while let Some((type_name, set)) = stack.pop() {
        let Some(ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) =
            ctx.parents.get(&type_name)
        else {
            continue;
        };
        for selection in &set.0 {
            out.push((type_name.clone(), selection.field_name.clone()));
            if let Some(nested) = &selection.selection_set {
                if let Some(field) = data.fields.get(&selection.field_name) {
                    stack.push((field.ty.inner_named_type().to_string(), nested));
                }
            }
        }
    }
    out
}
