use std::{fmt, sync::Arc};

use crate::{
    middleware::{self, Chain, Meta, Step},
    Compiler, Context, MergeError, ProcedureKind, Response, Schema,
};

/// Represents a single operation on the server that can be executed.
///
/// An [`Endpoint`] is built from a [`ProcedureBuilder`](super::ProcedureBuilder) and holds its schemas along with the middleware and resolver that run when it's called.
#[derive(Clone)]
pub struct Endpoint {
    pub(crate) kind: ProcedureKind,
    pub(crate) args: Option<Schema>,
    pub(crate) output: Schema,
    pub(crate) description: Option<String>,
    pub(crate) steps: Arc<[Step]>,
    // Reported by `Router::build`.
    pub(crate) errors: Vec<MergeError>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("output", &self.output)
            .field("description", &self.description)
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// The contract of an [`Endpoint`], as used by introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSchema {
    pub kind: ProcedureKind,
    /// `None` when the endpoint takes no arguments.
    pub args: Option<Schema>,
    pub output: Schema,
}

impl Endpoint {
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn args(&self) -> Option<&Schema> {
        self.args.as_ref()
    }

    pub fn output(&self) -> &Schema {
        &self.output
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schema(&self) -> EndpointSchema {
        EndpointSchema {
            kind: self.kind,
            args: self.args.clone(),
            output: self.output.clone(),
        }
    }

    /// Run the middleware and the resolver of this endpoint.
    ///
    /// This doesn't check `meta.kind` against the endpoint's kind, routing does that.
    pub async fn call(&self, ctx: Context, meta: Meta, compiler: &Arc<Compiler>) -> Response {
        let chain = Chain {
            steps: self.steps.clone(),
            compiler: compiler.clone(),
        };

        middleware::call(chain, 0, ctx, meta).await
    }
}
