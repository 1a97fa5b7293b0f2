use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ptsq::{BuiltRouter, CallRequest, Context, Middleware, Ptsq, PtsqError, Schema};
use serde_json::{json, Value};

const I: usize = 100;

async fn benchmark_calls(r: &BuiltRouter, request: &CallRequest) {
    for _ in 0..I {
        let response = r.execute(request.clone(), Context::new()).await;
        let _result = black_box(response);
    }
}

fn user_schema() -> Schema {
    Schema::object()
        .field("name", Schema::string().min_length(1).max_length(64))
        .field("email", Schema::string().pattern("^[^@]+@[^@]+$"))
        .field("tags", Schema::array(Schema::string()).max_items(16))
        .optional_field("createdAt", Schema::date())
}

fn passthrough() -> Middleware {
    Middleware::new(|_, next| async move { Ok(next.run().await) })
}

// Run the criterion benchmarks
fn bench(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("build-routers", |b| {
        let p = Ptsq::new();
        b.iter(|| {
            for _ in 0..100 {
                black_box(
                    p.router()
                        .route("demo", p.query(|_, _: Value| async { Ok::<_, PtsqError>("Hello World!") }))
                        .build()
                        .unwrap(),
                );
            }
        })
    });

    c.bench_function("compiler-hit", |b| {
        let compiler = ptsq::Compiler::new();
        let schema = user_schema();
        compiler.get(&schema);
        b.iter(|| black_box(compiler.get(&schema)))
    });

    c.bench_function("decode", |b| {
        let compiled = ptsq::Compiler::new().get(&user_schema());
        let input = json!({
            "name": "ana",
            "email": "ana@example.com",
            "tags": ["a", "b", "c"],
            "createdAt": "2024-03-01T10:00:00+02:00",
            "extra": true,
        });
        b.iter(|| black_box(compiled.decode(&input)))
    });

    c.bench_function("call", |b| {
        let p = Ptsq::new();
        let r = black_box(
            p.router()
                .route("demo", p.query(|_, _: Value| async { Ok::<_, PtsqError>("Hello World!") }))
                .build()
                .unwrap(),
        );
        let request = CallRequest::query("demo", Value::Null);
        b.to_async(&rt).iter(|| benchmark_calls(&r, &request))
    });

    c.bench_function("call-validated", |b| {
        let p = Ptsq::new();
        let r = black_box(
            p.router()
                .route(
                    "create",
                    p.args(user_schema())
                        .output(Schema::string())
                        .mutation(|_, input: Value| async move {
                            Ok::<_, PtsqError>(input["name"].clone())
                        }),
                )
                .build()
                .unwrap(),
        );
        let request = CallRequest::mutation(
            "create",
            json!({ "name": "ana", "email": "ana@example.com", "tags": [] }),
        );
        b.to_async(&rt).iter(|| benchmark_calls(&r, &request))
    });

    c.bench_function("call-mw", |b| {
        let p = (0..20).fold(Ptsq::new(), |p, _| p.with(passthrough()));
        let r = black_box(
            p.router()
                .route("demo", p.query(|_, _: Value| async { Ok::<_, PtsqError>("Hello World!") }))
                .build()
                .unwrap(),
        );
        let request = CallRequest::query("demo", Value::Null);
        b.to_async(&rt).iter(|| benchmark_calls(&r, &request))
    });

    c.bench_function("call-nested", |b| {
        let p = Ptsq::new();
        let leaf = p
            .router()
            .route("demo", p.query(|_, _: Value| async { Ok::<_, PtsqError>("Hello World!") }));
        let r = black_box(
            ["e", "d", "c", "b", "a"]
                .into_iter()
                .fold(leaf, |router, name| p.router().nest(name, router))
                .build()
                .unwrap(),
        );
        let request = CallRequest::query("a.b.c.d.e.demo", Value::Null);
        b.to_async(&rt).iter(|| benchmark_calls(&r, &request))
    });
}

criterion_group!(benches, bench);
criterion_main!(benches);
