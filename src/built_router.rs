use std::{fmt, sync::Arc};

use serde_json::{json, Value};

use crate::{
    introspection,
    middleware::Meta,
    router::is_valid_name,
    CallRequest, Compiler, Config, Context, ContextKey, Endpoint, ErrorCode, ProcedureKind,
    PtsqError, Response, RouteNode, Router, WireResponse,
};

pub(crate) type ErrorFormatter = Arc<dyn Fn(PtsqError) -> PtsqError + Send + Sync>;

struct Inner {
    root: Router,
    requires: Vec<ContextKey>,
    compiler: Arc<Compiler>,
    config: Config,
    formatter: Option<ErrorFormatter>,
}

/// A validated route tree, ready to serve calls.
///
/// Cheap to clone and safe to share between any number of concurrent calls.
#[derive(Clone)]
pub struct BuiltRouter(Arc<Inner>);

impl fmt::Debug for BuiltRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltRouter")
            .field("root", &self.0.root)
            .field("requires", &self.0.requires)
            .field("config", &self.0.config)
            .finish()
    }
}

impl BuiltRouter {
    pub(crate) fn new(
        root: Router,
        requires: Vec<ContextKey>,
        config: Config,
        formatter: Option<ErrorFormatter>,
    ) -> Self {
        Self(Arc::new(Inner {
            root,
            requires,
            compiler: Compiler::new_arc(),
            config,
            formatter,
        }))
    }

    pub fn root(&self) -> &Router {
        &self.0.root
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// The validator cache shared by every endpoint of this router.
    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.0.compiler
    }

    /// The context keys required anywhere in the tree.
    pub fn requirements(&self) -> &[ContextKey] {
        &self.0.requires
    }

    /// See [`introspection::describe`].
    pub fn introspect(&self) -> Value {
        introspection::describe(self)
    }

    /// Find the endpoint a wire route points to.
    pub fn resolve(&self, route: &str, kind: ProcedureKind) -> Result<&Endpoint, PtsqError> {
        let segments = route.split('.').collect::<Vec<_>>();
        if !segments.iter().all(|segment| is_valid_name(segment)) {
            return Err(PtsqError::bad_request(format!("malformed route '{route}'"))
                .with_info(json!({ "route": route })));
        }

        let mut router = self.root();
        let mut index = 0;
        loop {
            let Some(segment) = segments.get(index) else {
                return Err(PtsqError::not_found(format!(
                    "route terminated early at '{}'",
                    segments[..index].join(".")
                )));
            };

            match router.get(segment) {
                None => {
                    return Err(PtsqError::not_found(format!(
                        "invalid route '{}'",
                        segments[..=index].join(".")
                    )))
                }
                Some(RouteNode::Router(child)) => {
                    router = child;
                    index += 1;
                }
                Some(RouteNode::Endpoint(_)) if index != segments.len() - 1 => {
                    return Err(PtsqError::not_found(format!(
                        "route continues past a terminal node at '{}'",
                        segments[..=index].join(".")
                    )))
                }
                Some(RouteNode::Endpoint(endpoint)) if endpoint.kind() != kind => {
                    return Err(PtsqError::new(ErrorCode::BadRouteType)
                        .with_message(format!(
                            "route '{route}' is a {} but was called as a {kind}",
                            endpoint.kind()
                        ))
                        .with_info(json!({ "expected": endpoint.kind(), "received": kind })))
                }
                Some(RouteNode::Endpoint(endpoint)) => return Ok(endpoint),
            }
        }
    }

    /// Route and run a call, returning the raw [`Response`].
    ///
    /// Errors are returned as produced, without redaction or the error formatter. Use [`BuiltRouter::call`] at a transport boundary.
    pub async fn execute(&self, request: CallRequest, ctx: Context) -> Response {
        if let Some(key) = self.0.requires.iter().find(|key| !ctx.contains_key(key)) {
            return Response::Err(PtsqError::internal(format!(
                "the context is missing '{}' which the router requires",
                key.name()
            )));
        }

        let endpoint = match self.resolve(&request.route, request.kind) {
            Ok(endpoint) => endpoint,
            Err(err) => return Response::Err(err),
        };

        let meta = Meta {
            input: request.input.unwrap_or(Value::Null),
            route: request.route,
            kind: request.kind,
        };
        endpoint.call(ctx, meta, &self.0.compiler).await
    }

    /// Route and run a call and turn the result into what goes over the wire.
    ///
    /// This is where internal errors are redacted, the error formatter runs and failures are logged.
    pub async fn call(&self, request: CallRequest, ctx: Context) -> WireResponse {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("ptsq.call", route = %request.route, kind = %request.kind);

        let fut = async move { WireResponse::from(self.finalize(self.execute(request, ctx).await)) };

        #[cfg(feature = "tracing")]
        let fut = tracing::Instrument::instrument(fut, span);

        fut.await
    }

    pub(crate) fn finalize(&self, response: Response) -> Response {
        response.map_err(|err| {
            #[cfg(feature = "tracing")]
            match (err.code(), err.cause()) {
                (ErrorCode::InternalServerError, Some(cause)) => {
                    tracing::error!("internal error: {}: {}", err, cause)
                }
                (ErrorCode::InternalServerError, None) => tracing::error!("internal error: {}", err),
                _ => tracing::debug!("call failed: {}", err),
            }

            let err = if err.code() == ErrorCode::InternalServerError
                && !self.0.config.expose_internal_errors
            {
                err.redacted()
            } else {
                err
            };

            match &self.0.formatter {
                Some(formatter) => formatter(err),
                None => err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Ptsq, PtsqError};

    use super::*;

    fn router() -> BuiltRouter {
        let p = Ptsq::new();
        p.router()
            .nest(
                "user",
                Router::new()
                    .route("get", p.query(|_, _: Value| async { Ok::<_, PtsqError>("user") }))
                    .route("create", p.mutation(|_, _: Value| async { Ok::<_, PtsqError>(()) })),
            )
            .build()
            .unwrap()
    }

    fn code(result: Result<&Endpoint, PtsqError>) -> ErrorCode {
        result.map(|_| ()).unwrap_err().code()
    }

    #[test]
    fn resolves_nested_routes() {
        let router = router();
        assert_eq!(
            router.resolve("user.get", ProcedureKind::Query).map(Endpoint::kind),
            Ok(ProcedureKind::Query)
        );
    }

    #[test]
    fn routing_errors() {
        let router = router();
        assert_eq!(code(router.resolve("user", ProcedureKind::Query)), ErrorCode::NotFound);
        assert_eq!(code(router.resolve("post.get", ProcedureKind::Query)), ErrorCode::NotFound);
        assert_eq!(code(router.resolve("user.get.id", ProcedureKind::Query)), ErrorCode::NotFound);
        assert_eq!(code(router.resolve("user.get", ProcedureKind::Mutation)), ErrorCode::BadRouteType);
        assert_eq!(code(router.resolve("user..get", ProcedureKind::Query)), ErrorCode::BadRequest);
        assert_eq!(code(router.resolve("", ProcedureKind::Query)), ErrorCode::BadRequest);
    }

    #[test]
    fn routing_messages() {
        let router = router();
        let message = |route: &str, kind| {
            router
                .resolve(route, kind)
                .map(|_| ())
                .unwrap_err()
                .message()
                .map(ToString::to_string)
        };

        assert_eq!(
            message("user", ProcedureKind::Query).as_deref(),
            Some("route terminated early at 'user'")
        );
        assert_eq!(
            message("user.get.id", ProcedureKind::Query).as_deref(),
            Some("route continues past a terminal node at 'user.get'")
        );
        assert_eq!(
            message("user.create", ProcedureKind::Query).as_deref(),
            Some("route 'user.create' is a mutation but was called as a query")
        );
    }

    #[tokio::test]
    async fn missing_required_context_is_internal() {
        struct Db;

        let p = Ptsq::new();
        let router = p
            .router()
            .requires::<Db>()
            .route("ping", p.query(|_, _: Value| async { Ok::<_, PtsqError>("pong") }))
            .build()
            .unwrap();

        let request = CallRequest::query("ping", Value::Null);
        let response = router.execute(request.clone(), Context::new()).await;
        assert_eq!(
            response.error().map(PtsqError::code),
            Some(ErrorCode::InternalServerError)
        );

        let response = router.execute(request, Context::new().with(Db)).await;
        assert_eq!(response, Response::Ok("pong".into()));
    }
}
