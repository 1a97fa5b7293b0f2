use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use futures::{future::BoxFuture, FutureExt};
use serde_json::Value;

use crate::{Compiler, Context, PtsqError, Response, Schema};

use super::{Meta, MiddlewareArgs, MiddlewareHandler, Next};

pub(crate) type ResolveFn =
    Arc<dyn Fn(Context, Value) -> BoxFuture<'static, Result<Value, PtsqError>> + Send + Sync>;

/// The step every procedure appends after its middleware.
pub(crate) struct ResolverStep {
    pub(crate) args: Option<Schema>,
    pub(crate) output: Schema,
    pub(crate) resolve: ResolveFn,
}

pub(crate) enum Step {
    Middleware {
        args: Option<Schema>,
        handler: MiddlewareHandler,
    },
    Resolver(ResolverStep),
}

impl Step {
    pub(crate) fn args(&self) -> Option<&Schema> {
        match self {
            Step::Middleware { args, .. } => args.as_ref(),
            Step::Resolver(step) => step.args.as_ref(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Chain {
    pub(crate) steps: Arc<[Step]>,
    pub(crate) compiler: Arc<Compiler>,
}

/// Run the step at `index` and, through [`Next`], every step after it.
pub(crate) fn call(chain: Chain, index: usize, ctx: Context, meta: Meta) -> BoxFuture<'static, Response> {
    Box::pin(async move {
        let Some(step) = chain.steps.get(index) else {
            return Response::Err(PtsqError::internal(format!(
                "the middleware chain of '{}' ended at step {index} without reaching a resolver",
                meta.route
            )));
        };

        let input = match step.args() {
            Some(schema) => match chain.compiler.get(schema).decode(&meta.input) {
                Ok(input) => input,
                Err(issues) => return Response::Err(PtsqError::validation(issues)),
            },
            None => meta.input.clone(),
        };

        match step {
            Step::Middleware { handler, .. } => {
                let handler = handler.clone();
                let next = Next {
                    chain: chain.clone(),
                    index: index + 1,
                    ctx: ctx.clone(),
                    patch: Context::new(),
                    meta: meta.clone(),
                };
                let args = MiddlewareArgs { ctx, input, meta };

                let fut = match catch_unwind(AssertUnwindSafe(|| handler(args, next))) {
                    Ok(fut) => fut,
                    Err(panic) => return Response::Err(PtsqError::from_panic(panic)),
                };
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(response)) => response,
                    Ok(Err(err)) => Response::Err(err),
                    Err(panic) => Response::Err(PtsqError::from_panic(panic)),
                }
            }
            Step::Resolver(step) => {
                let resolve = step.resolve.clone();
                let output = step.output.clone();

                let fut = match catch_unwind(AssertUnwindSafe(|| resolve(ctx, input))) {
                    Ok(fut) => fut,
                    Err(panic) => return Response::Err(PtsqError::from_panic(panic)),
                };
                let value = match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(value)) => value,
                    Ok(Err(err)) => return Response::Err(err),
                    Err(panic) => return Response::Err(PtsqError::from_panic(panic)),
                };

                match chain.compiler.get(&output).encode(&value) {
                    Ok(data) => Response::Ok(data),
                    Err(issues) => Response::Err(
                        PtsqError::internal(format!(
                            "the output of '{}' doesn't match its output schema",
                            meta.route
                        ))
                        .with_cause(issues),
                    ),
                }
            }
        }
    })
}
