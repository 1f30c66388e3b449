//! Contract filtering: tag-based exclusion over the already-merged
//! registry. Excluded elements stay present in the router-facing schema,
//! flagged `@inaccessible`, and disappear entirely from the client-facing
//! schema. Contracts are computed independently and never interact.

use indexmap::IndexSet;

use crate::definitions::ParentDefinitionData;
use crate::error::CompositionError;
use crate::merge::FederationContext;

fn is_excluded(tags: &IndexSet<String>, exclude_tags: &IndexSet<String>) -> bool {
    tags.iter().any(|tag| exclude_tags.contains(tag))
}

/// Marks every element carrying one of the excluded tags as inaccessible,
/// then rejects types left without any client-facing field.
pub(crate) fn apply_tag_exclusions(ctx: &mut FederationContext, exclude_tags: &IndexSet<String>) {
    for parent in ctx.parents.values_mut() {
        match parent {
            ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data) => {
                data.is_inaccessible |= is_excluded(&data.tags, exclude_tags);
                for field in data.fields.values_mut() {
                    field.is_inaccessible |= is_excluded(&field.tags, exclude_tags);
                }
            }
            ParentDefinitionData::Union(data) => {
                data.is_inaccessible |= is_excluded(&data.tags, exclude_tags);
            }
            ParentDefinitionData::Enum(data) => {
                data.is_inaccessible |= is_excluded(&data.tags, exclude_tags);
                for value in data.values.values_mut() {
                    value.is_inaccessible |= is_excluded(&value.tags, exclude_tags);
                }
            }
            ParentDefinitionData::InputObject(data) => {
                data.is_inaccessible |= is_excluded(&data.tags, exclude_tags);
                for field in data.fields.values_mut() {
                    field.is_inaccessible |= is_excluded(&field.tags, exclude_tags);
                }
            }
            ParentDefinitionData::Scalar(data) => {
                data.is_inaccessible |= is_excluded(&data.tags, exclude_tags);
            }
        }
    }

    let mut errors = Vec::new();
    for parent in ctx.parents.values() {
        let (ParentDefinitionData::Object(data) | ParentDefinitionData::Interface(data)) = parent else {
            continue;
        };
        if data.is_inaccessible || data.fields.is_empty() {
            continue;
        }
        if data.fields.values().all(|field| field.is_inaccessible) {
            errors.push(CompositionError::AllFieldDefinitionsAreInaccessible {
                kind: data.kind,
                type_name: data.type_name.clone(),
            });
        }
    }
    ctx.errors.extend(errors);
}
