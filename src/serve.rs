//! Serving a [`BuiltRouter`] over HTTP without tying it to a server framework.
//!
//! [`Serve::handle`] takes an [`http::Request`] and returns an [`http::Response`], so an adapter for any framework built on the `http` crate is a few lines.

use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use http::{header, request::Parts, HeaderValue, Method, StatusCode};

use crate::{BuiltRouter, CallRequest, Context, ErrorCode, PtsqError, Response, WireResponse};

pub type HttpRequest = http::Request<Vec<u8>>;
pub type HttpResponse = http::Response<Vec<u8>>;

type ContextFn =
    Arc<dyn Fn(&Parts) -> BoxFuture<'static, Result<Context, PtsqError>> + Send + Sync>;

/// Handles the call and introspection paths of a [`BuiltRouter`].
///
/// ```rust
/// use ptsq::{Context, Ptsq, PtsqError, Serve};
/// use serde_json::Value;
///
/// struct Token(Option<String>);
///
/// let p = Ptsq::new();
/// let router = p
///     .router()
///     .route("ping", p.query(|_, _: Value| async { Ok::<_, PtsqError>("pong") }))
///     .build()
///     .unwrap();
///
/// let serve = Serve::new(router).context(|parts| {
///     let token = parts
///         .headers
///         .get("authorization")
///         .and_then(|v| v.to_str().ok())
///         .map(ToString::to_string);
///     async move { Ok(Context::new().with(Token(token))) }
/// });
/// # let _ = serve;
/// ```
#[derive(Clone)]
pub struct Serve {
    router: BuiltRouter,
    ctx_fn: ContextFn,
}

impl fmt::Debug for Serve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serve").field("router", &self.router).finish()
    }
}

impl Serve {
    /// Every call starts with an empty [`Context`] until [`Serve::context`] is set.
    pub fn new(router: BuiltRouter) -> Self {
        Self {
            router,
            ctx_fn: Arc::new(|_: &Parts| Box::pin(async { Ok(Context::new()) })),
        }
    }

    /// Build the initial context of every call from the request head.
    ///
    /// This is called once per call request. An error is sent back as the response of the call.
    pub fn context<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(&Parts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Context, PtsqError>> + Send + 'static,
    {
        self.ctx_fn = Arc::new(move |parts: &Parts| Box::pin(func(parts)));
        self
    }

    pub fn router(&self) -> &BuiltRouter {
        &self.router
    }

    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let (parts, body) = req.into_parts();
        let config = self.router.config();
        let path = normalize(parts.uri.path());

        let (response, allow) = if path == normalize(config.get_call_path()) {
            let response = if parts.method == Method::POST {
                self.call(&parts, &body).await
            } else {
                self.method_not_supported(&parts.method, Method::POST)
            };
            (response, Method::POST)
        } else if path == normalize(config.get_introspection_path()) {
            let response = if parts.method == Method::GET {
                WireResponse {
                    status: 200,
                    body: self.router.introspect(),
                }
            } else {
                self.method_not_supported(&parts.method, Method::GET)
            };
            (response, Method::GET)
        } else {
            let err = PtsqError::not_found(format!("no handler for '{path}'"));
            return into_http(self.router.finalize(Response::Err(err)).into(), None);
        };

        let allow = (response.status == StatusCode::METHOD_NOT_ALLOWED.as_u16()).then_some(allow);
        into_http(response, allow)
    }

    async fn call(&self, parts: &Parts, body: &[u8]) -> WireResponse {
        let request = match serde_json::from_slice::<CallRequest>(body) {
            Ok(request) => request,
            Err(err) => {
                let err = PtsqError::bad_request(format!("invalid call request: {err}")).with_cause(err);
                return self.router.finalize(Response::Err(err)).into();
            }
        };

        let ctx = match (self.ctx_fn)(parts).await {
            Ok(ctx) => ctx,
            Err(err) => return self.router.finalize(Response::Err(err)).into(),
        };

        self.router.call(request, ctx).await
    }

    fn method_not_supported(&self, method: &Method, expected: Method) -> WireResponse {
        let err = PtsqError::new(ErrorCode::MethodNotSupported)
            .with_message(format!("expected {expected} but received {method}"));
        self.router.finalize(Response::Err(err)).into()
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn into_http(response: WireResponse, allow: Option<Method>) -> HttpResponse {
    let body = serde_json::to_vec(&response.body).unwrap_or_default();

    let mut res = http::Response::new(body);
    *res.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(method) = allow {
        if let Ok(value) = HeaderValue::from_str(method.as_str()) {
            res.headers_mut().insert(header::ALLOW, value);
        }
    }
    res
}
