//! Final step of merging each element: resolving which subgraph's
//! description propagates to the federated schema.
//!
//! Subgraphs opting in through `@configureDescription(propagateToFederatedGraph: true)`
//! take precedence and must agree; without explicit opt-ins the first
//! contributing subgraph in input order wins. Descriptions that exist but
//! are suppressed everywhere are dropped with a warning, never an error.

use indexmap::IndexMap;

use crate::definitions::{DescriptionData, ParentDefinitionData};
use crate::error::{CompositionError, CompositionWarning};

use super::context::FederationContext;

pub(super) fn resolve_descriptions(ctx: &mut FederationContext) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut descriptions: IndexMap<String, String> = IndexMap::new();

    {
        let mut resolve = |path: String, by_subgraph: &IndexMap<String, DescriptionData>| {
            if let Some(text) = resolve_description(&path, by_subgraph, &mut errors, &mut warnings) {
                descriptions.insert(path, text);
            }
        };

        for (type_name, parent) in &ctx.parents {
            match parent {
                ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data) => {
                    resolve(type_name.clone(), &data.description_by_subgraph_name);
                    for field in data.fields.values() {
                        resolve(field.path(), &field.description_by_subgraph_name);
                        for argument in field.arguments.values() {
                            resolve(
                                format!("{}({}:)", field.path(), argument.argument_name),
                                &argument.description_by_subgraph_name,
                            );
                        }
                    }
                }
                ParentDefinitionData::Union(data) => {
                    resolve(type_name.clone(), &data.description_by_subgraph_name);
                }
                ParentDefinitionData::Enum(data) => {
                    resolve(type_name.clone(), &data.description_by_subgraph_name);
                    for value in data.values.values() {
                        resolve(
                            format!("{type_name}.{}", value.value_name),
                            &value.description_by_subgraph_name,
                        );
                    }
                }
                ParentDefinitionData::InputObject(data) => {
                    resolve(type_name.clone(), &data.description_by_subgraph_name);
                    for field in data.fields.values() {
                        resolve(
                            format!("{type_name}.{}", field.field_name),
                            &field.description_by_subgraph_name,
                        );
                    }
                }
                ParentDefinitionData::Scalar(data) => {
                    resolve(type_name.clone(), &data.description_by_subgraph_name);
                }
            }
        }
    }

    ctx.descriptions_by_path = descriptions;
    ctx.errors.extend(errors);
    ctx.warnings.extend(warnings);
}

fn resolve_description(
    path: &str,
    by_subgraph: &IndexMap<String, DescriptionData>,
    errors: &mut Vec<CompositionError>,
    warnings: &mut Vec<CompositionWarning>,
) -> Option<String> {
    // Explicit opt-ins win over plain descriptions.
    let opt_ins: Vec<(&String, &str)> = by_subgraph
        .iter()
        .filter(|(_, description)| description.has_configure_directive && description.propagate)
        .filter_map(|(subgraph, description)| {
            description.contributed_text().map(|text| (subgraph, text))
        })
        .collect();
    if let Some((_, first_text)) = opt_ins.first() {
        if opt_ins.iter().any(|(_, text)| text != first_text) {
            errors.push(CompositionError::DescriptionPropagationConflict {
                path: path.to_owned(),
                subgraph_names: opt_ins.iter().map(|(subgraph, _)| (*subgraph).clone()).collect(),
            });
            return None;
        }
        return Some((*first_text).to_owned());
    }

    if let Some(text) = by_subgraph
        .values()
        .find_map(DescriptionData::contributed_text)
    {
        return Some(text.to_owned());
    }

    if by_subgraph
        .values()
        .any(|description| description.text.is_some() || description.override_text.is_some())
    {
        warnings.push(CompositionWarning::DescriptionDropped { path: path.to_owned() });
    }
    None
}
