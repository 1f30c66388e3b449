//! The resolvability analyzer: proves that every field of the composed
//! schema reachable from a root operation field can actually be fetched by
//! some sequence of subgraph calls, jumping between subgraphs through
//! shared entity keys where necessary.

use crate::error::CompositionError;
use crate::merge::FederationContext;

mod graph;
mod traversal;

use traversal::ResolvabilityWalker;

pub(crate) fn analyze_resolvability(ctx: &FederationContext) -> Vec<CompositionError> {
    tracing::debug!("analyzing field resolvability");
    ResolvabilityWalker::new(ctx).walk()
}
