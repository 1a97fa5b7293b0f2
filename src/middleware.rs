//! Middleware run before a procedure's resolver.
//!
//! A middleware receives the context, the decoded input and a [`Next`]. It can return early with an error, or call [`Next::run`] and inspect or replace the response of everything after it.
//!
//! ```rust
//! use ptsq::Middleware;
//!
//! struct RequestId(u64);
//!
//! let mw = Middleware::new(|_args, next| async move {
//!     let response = next.extend(RequestId(42)).run().await;
//!     Ok(response)
//! });
//! # let _ = mw;
//! ```

mod chain;
mod next;

use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{Context, ProcedureKind, PtsqError, Response, Schema};

pub(crate) use chain::{call, Chain, ResolveFn, ResolverStep, Step};
pub use next::Next;

pub(crate) type MiddlewareHandler =
    Arc<dyn Fn(MiddlewareArgs, Next) -> BoxFuture<'static, Result<Response, PtsqError>> + Send + Sync>;

/// Per-call metadata available to every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// The raw input as it arrived on the wire.
    pub input: Value,
    pub route: String,
    pub kind: ProcedureKind,
}

#[derive(Debug)]
pub struct MiddlewareArgs {
    pub ctx: Context,
    /// The input decoded with the argument schema declared up to this middleware, or the raw input when nothing was declared yet.
    pub input: Value,
    pub meta: Meta,
}

/// An abstraction for common logic that can be applied to procedures.
///
/// Middleware are applied with [`ProcedureBuilder::with`](crate::ProcedureBuilder::with) or globally with [`Ptsq::with`](crate::Ptsq::with).
#[derive(Clone)]
pub struct Middleware {
    args: Option<Schema>,
    pub(crate) handler: MiddlewareHandler,
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").field("args", &self.args).finish()
    }
}

impl Middleware {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(MiddlewareArgs, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, PtsqError>> + Send + 'static,
    {
        Self {
            args: None,
            handler: Arc::new(move |args, next| Box::pin(func(args, next))),
        }
    }

    /// Arguments this middleware needs.
    ///
    /// They are merged into the procedure's arguments when the middleware is attached, so the resolver validates them too.
    pub fn args(mut self, schema: Schema) -> Self {
        self.args = Some(schema);
        self
    }

    pub fn args_schema(&self) -> Option<&Schema> {
        self.args.as_ref()
    }
}
