//! The public result containers of a composition run.

use indexmap::IndexMap;

use crate::definitions::{ArgumentConfiguration, FieldConfiguration, SubgraphConfiguration};
use crate::error::{CompositionError, CompositionErrors, CompositionWarning};

/// The artifacts of a successful composition: both output schemas as
/// deterministic SDL text, plus the router configuration data.
#[derive(Clone, Debug)]
pub struct FederationResult {
    /// The router-facing federated schema; retains the federation directives
    /// a runtime needs.
    pub federated_schema: String,
    /// The public-facing schema: inaccessible elements removed, federation
    /// directives stripped.
    pub client_schema: String,
    pub subgraph_configurations_by_name: IndexMap<String, SubgraphConfiguration>,
    pub field_configurations: Vec<FieldConfiguration>,
    pub argument_configurations: Vec<ArgumentConfiguration>,
}

/// The outcome of one [`compose()`](crate::compose) invocation: either a
/// [`FederationResult`] or an ordered error list, always accompanied by the
/// non-fatal warnings gathered along the way.
#[derive(Clone, Debug)]
pub struct CompositionResult {
    pub(crate) result: Result<FederationResult, CompositionErrors>,
    pub(crate) warnings: Vec<CompositionWarning>,
}

impl CompositionResult {
    pub(crate) fn failure(errors: Vec<CompositionError>, warnings: Vec<CompositionWarning>) -> Self {
        Self {
            result: Err(CompositionErrors::new(errors)),
            warnings,
        }
    }

    pub(crate) fn success(result: FederationResult, warnings: Vec<CompositionWarning>) -> Self {
        Self {
            result: Ok(result),
            warnings,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The errors of a failed run; empty on success.
    pub fn errors(&self) -> &[CompositionError] {
        match &self.result {
            Ok(_) => &[],
            Err(errors) => errors.errors(),
        }
    }

    pub fn warnings(&self) -> &[CompositionWarning] {
        &self.warnings
    }

    /// Simplifies to a yes-no answer: `Ok` carries the artifacts, `Err` all
    /// collected errors. Warnings are dropped; read them first if needed.
    pub fn into_result(self) -> Result<FederationResult, CompositionErrors> {
        self.result
    }
}
