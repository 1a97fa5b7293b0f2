use std::{fmt, future::Future, sync::Arc};

use futures::future;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    middleware::{MiddlewareHandler, ResolveFn, ResolverStep, Step},
    Context, MergeError, Middleware, ProcedureKind, PtsqError, Schema,
};

use super::Endpoint;

/// Declares a procedure step by step.
///
/// Every call returns a new builder, so a partially declared builder can be cloned and reused as a base for several procedures.
///
/// ```rust
/// use ptsq::{Ptsq, PtsqError, Schema};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Greet {
///     name: String,
/// }
///
/// let p = Ptsq::new();
/// let greet = p
///     .procedure()
///     .args(Schema::object().field("name", Schema::string()))
///     .output(Schema::string())
///     .query(|_ctx, input: Greet| async move { Ok::<_, PtsqError>(format!("Hello {}", input.name)) });
/// # let _ = greet;
/// ```
#[derive(Clone, Default)]
pub struct ProcedureBuilder {
    middlewares: Vec<(Option<Schema>, MiddlewareHandler)>,
    args: Option<Schema>,
    output: Option<Schema>,
    description: Option<String>,
    errors: Vec<MergeError>,
}

impl fmt::Debug for ProcedureBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureBuilder")
            .field("middlewares", &self.middlewares.len())
            .field("args", &self.args)
            .field("output", &self.output)
            .field("description", &self.description)
            .finish()
    }
}

impl ProcedureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a middleware.
    ///
    /// The middleware's own arguments are merged into the procedure's arguments first. It then decodes its input with every argument declared so far.
    /// Objects never reject unknown keys at a middleware, since later `.args()` calls may still declare them. The resolver enforces `strict`.
    pub fn with(mut self, mw: Middleware) -> Self {
        if let Some(schema) = mw.args_schema() {
            self = self.args(schema.clone());
        }

        let args = self.args.as_ref().map(Schema::lenient);
        self.middlewares.push((args, mw.handler));
        self
    }

    /// Merge `schema` into the arguments declared so far.
    ///
    /// See [`Schema::intersect`] for how the schemas are combined. A schema that can't be combined is reported when the router is built.
    pub fn args(mut self, schema: Schema) -> Self {
        self.args = Some(match self.args.take() {
            None => schema,
            Some(previous) => match previous.intersect(&schema) {
                Ok(merged) => merged,
                Err(err) => {
                    self.errors.push(err);
                    previous
                }
            },
        });
        self
    }

    /// Defaults to [`Schema::any`].
    pub fn output(mut self, schema: Schema) -> Self {
        self.output = Some(schema);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn query<F, Fut, I, O, E>(self, resolver: F) -> Endpoint
    where
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        I: DeserializeOwned + 'static,
        O: Serialize + Send + 'static,
        E: Into<PtsqError> + Send + 'static,
    {
        self.build(ProcedureKind::Query, resolver)
    }

    pub fn mutation<F, Fut, I, O, E>(self, resolver: F) -> Endpoint
    where
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        I: DeserializeOwned + 'static,
        O: Serialize + Send + 'static,
        E: Into<PtsqError> + Send + 'static,
    {
        self.build(ProcedureKind::Mutation, resolver)
    }

    fn build<F, Fut, I, O, E>(self, kind: ProcedureKind, resolver: F) -> Endpoint
    where
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        I: DeserializeOwned + 'static,
        O: Serialize + Send + 'static,
        E: Into<PtsqError> + Send + 'static,
    {
        let resolve: ResolveFn = Arc::new(move |ctx, input| {
            let input = match serde_json::from_value::<I>(input) {
                Ok(input) => input,
                Err(err) => {
                    return Box::pin(future::ready(Err::<Value, _>(
                        PtsqError::bad_request(format!("error deserializing arguments: {err}"))
                            .with_cause(err),
                    )))
                }
            };

            let fut = resolver(ctx, input);
            Box::pin(async move {
                match fut.await {
                    Ok(output) => serde_json::to_value(output).map_err(PtsqError::from),
                    Err(err) => Err(err.into()),
                }
            })
        });

        let output = self.output.unwrap_or_else(Schema::any);
        let steps = self
            .middlewares
            .into_iter()
            .map(|(args, handler)| Step::Middleware { args, handler })
            .chain(std::iter::once(Step::Resolver(ResolverStep {
                args: self.args.clone(),
                output: output.clone(),
                resolve,
            })))
            .collect();

        Endpoint {
            kind,
            args: self.args,
            output,
            description: self.description,
            steps,
            errors: self.errors,
        }
    }
}
