//! ptsq: A typed RPC dispatch and validation engine.
//!
//! Declare a tree of queries and mutations, each with a chain of middleware and a validated argument and output contract, then serve it over a single `(route, type, input)` endpoint.
//!
//! ```rust
//! use ptsq::{CallRequest, Context, Ptsq, PtsqError, Schema};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Input {
//!     name: String,
//! }
//!
//! # futures::executor::block_on(async {
//! let p = Ptsq::new();
//! let router = p
//!     .router()
//!     .route(
//!         "test",
//!         p.args(Schema::object().field("name", Schema::string()))
//!             .output(Schema::string())
//!             .query(|_ctx, input: Input| async move { Ok::<_, PtsqError>(input.name) }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let response = router
//!     .execute(CallRequest::query("test", json!({ "name": "John" })), Context::new())
//!     .await;
//! assert_eq!(response.data(), Some(&json!("John")));
//! # });
//! ```
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::panic_in_result_fn,
    // missing_docs
)]
#![forbid(unsafe_code)]
#![allow(clippy::module_inception)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod built_router;
mod compiler;
mod config;
mod context;
mod error;
pub mod introspection;
mod middleware;
mod procedure;
mod procedure_kind;
mod ptsq;
mod response;
mod router;
pub mod schema;
mod serve;

pub use crate::ptsq::Ptsq;
pub use built_router::BuiltRouter;
pub use compiler::{CompiledValidator, Compiler};
pub use config::Config;
pub use context::{Context, ContextKey};
pub use error::{BuildError, BuildErrors, ErrorCode, PtsqError};
pub use middleware::{Meta, Middleware, MiddlewareArgs, Next};
pub use procedure::{Endpoint, EndpointSchema, ProcedureBuilder};
pub use procedure_kind::ProcedureKind;
pub use response::{CallRequest, Response, WireResponse};
pub use router::{RouteNode, Router};
pub use schema::{
    Codec, CodecError, DateCodec, MergeError, PathSegment, Schema, SchemaKind, ValidationErrors,
    ValidationIssue,
};
pub use serve::{HttpRequest, HttpResponse, Serve};
