use http::{header, Method, Request, StatusCode};
use ptsq::{BuiltRouter, Config, Context, HttpResponse, Ptsq, PtsqError, Serve};
use serde_json::{json, Value};

mod utils;
use utils::init_tracing;

struct Token(String);

fn router(config: Config) -> BuiltRouter {
    let p = Ptsq::new().config(config);
    p.build(
        p.router()
            .route("ping", p.query(|_, _: Value| async { Ok::<_, PtsqError>("pong") }))
            .route(
                "whoami",
                p.query(|ctx, _: Value| async move {
                    match ctx.get::<Token>() {
                        Some(token) => Ok(token.0.clone()),
                        None => Err(PtsqError::unauthorized("no token")),
                    }
                }),
            ),
    )
    .unwrap()
}

fn serve() -> Serve {
    Serve::new(router(Config::new())).context(|parts| {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        async move {
            match token.as_deref() {
                Some("banned") => Err(PtsqError::forbidden("banned")),
                Some(token) => Ok(Context::new().with(Token(token.to_string()))),
                None => Ok(Context::new()),
            }
        }
    })
}

fn request(method: Method, uri: &str, body: Value) -> Request<Vec<u8>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(serde_json::to_vec(&body).unwrap())
        .unwrap()
}

fn body(res: &HttpResponse) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn calls() {
    init_tracing();
    let serve = serve();

    let res = serve
        .handle(request(Method::POST, "/", json!({ "route": "ping", "type": "query" })))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body(&res), json!("pong"));

    let res = serve
        .handle(request(Method::POST, "/", json!({ "route": "ping", "type": "mutation" })))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res)["info"]["expected"], json!("query"));
}

#[tokio::test]
async fn context_comes_from_the_request_head() {
    let serve = serve();
    let call = json!({ "route": "whoami", "type": "query", "input": null });

    let res = serve.handle(request(Method::POST, "/", call.clone())).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let mut req = request(Method::POST, "/", call.clone());
    req.headers_mut()
        .insert(header::AUTHORIZATION, "ana".parse().unwrap());
    let res = serve.handle(req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), json!("ana"));

    let mut req = request(Method::POST, "/", call);
    req.headers_mut()
        .insert(header::AUTHORIZATION, "banned".parse().unwrap());
    let res = serve.handle(req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(&res), json!({ "name": "PtsqError", "message": "banned" }));
}

#[tokio::test]
async fn malformed_call_bodies() {
    let serve = serve();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .body(b"{ not json".to_vec())
        .unwrap();
    let res = serve.handle(req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = serve
        .handle(request(Method::POST, "/", json!({ "route": "ping", "type": "subscription" })))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body(&res)["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid call request"));
}

#[tokio::test]
async fn introspection() {
    let serve = Serve::new(router(Config::new().title("Api")));

    let res = serve
        .handle(request(Method::GET, "/introspection/", Value::Null))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let doc = body(&res);
    assert_eq!(doc["title"], json!("Api"));
    assert_eq!(doc, serve.router().introspect());
}

#[tokio::test]
async fn wrong_method() {
    let serve = serve();

    let res = serve.handle(request(Method::GET, "/", Value::Null)).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers().get(header::ALLOW).unwrap(), "POST");

    let res = serve
        .handle(request(Method::POST, "/introspection", Value::Null))
        .await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers().get(header::ALLOW).unwrap(), "GET");
}

#[tokio::test]
async fn custom_paths() {
    let serve = Serve::new(router(
        Config::new()
            .call_path("/rpc")
            .introspection_path("/rpc/schema"),
    ));

    let res = serve
        .handle(request(Method::POST, "/rpc", json!({ "route": "ping", "type": "query" })))
        .await;
    assert_eq!(body(&res), json!("pong"));

    let res = serve
        .handle(request(Method::GET, "/rpc/schema", Value::Null))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = serve
        .handle(request(Method::POST, "/", json!({ "route": "ping", "type": "query" })))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&res)["message"], json!("no handler for '/'"));
}
