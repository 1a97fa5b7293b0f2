#![allow(dead_code)]

use ptsq::{BuiltRouter, CallRequest, Context, ProcedureKind, Response};
use serde_json::Value;

pub async fn query(router: &BuiltRouter, route: &str, input: Value) -> Response {
    router
        .execute(CallRequest::new(route, ProcedureKind::Query, input), Context::new())
        .await
}

pub async fn mutation(router: &BuiltRouter, route: &str, input: Value) -> Response {
    router
        .execute(CallRequest::new(route, ProcedureKind::Mutation, input), Context::new())
        .await
}

/// Log to the test output. Set `RUST_LOG=ptsq=debug` to see dispatch failures.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn code(response: &Response) -> Option<&'static str> {
    response.error().map(|err| err.code().as_str())
}

// atomic_procedure makes sure the procedure is only invoked once
#[macro_export]
macro_rules! atomic_procedure {
    ($name:expr) => {
        static CALL_COUNT: std::sync::atomic::AtomicU8 = std::sync::atomic::AtomicU8::new(0);
        if CALL_COUNT.fetch_add(1, std::sync::atomic::Ordering::SeqCst) != 0 {
            panic!("procedure '{}' was invoked more than once!", $name);
        }
    };
}
