//! A JSON-Schema-shaped description of a route tree, for documentation and client generation.

use serde_json::{json, Map, Value};

use crate::{BuiltRouter, Endpoint, RouteNode, Router};

/// Describe every route of `router`.
///
/// The document is deterministic for a given tree: children are emitted sorted by name.
pub fn describe(router: &BuiltRouter) -> Value {
    let config = router.config();

    let mut document = Map::new();
    document.insert("$schema".into(), config.get_schema_dialect().into());
    document.insert("title".into(), config.get_title().into());
    if let Value::Object(shape) = router_shape(router.root()) {
        document.extend(shape);
    }
    Value::Object(document)
}

fn router_shape(router: &Router) -> Value {
    let mut routes = Map::new();
    let mut required = Vec::new();
    for (name, node) in router.children() {
        routes.insert(
            name.to_string(),
            match node {
                RouteNode::Router(router) => router_shape(router),
                RouteNode::Endpoint(endpoint) => route_shape(endpoint),
            },
        );
        required.push(Value::from(name));
    }

    json!({
        "type": "object",
        "properties": {
            "nodeType": { "const": "router" },
            "routes": {
                "type": "object",
                "properties": routes,
                "required": required,
                "additionalProperties": false,
            },
        },
        "required": ["nodeType", "routes"],
        "additionalProperties": false,
    })
}

fn route_shape(endpoint: &Endpoint) -> Value {
    let schema = endpoint.schema();

    let mut properties = Map::new();
    properties.insert("nodeType".into(), json!({ "const": "route" }));
    properties.insert("type".into(), json!({ "const": schema.kind }));
    properties.insert(
        "args".into(),
        match &schema.args {
            Some(args) => args.json_schema(),
            None => json!({ "not": {} }),
        },
    );
    properties.insert("output".into(), schema.output.json_schema());

    let mut required = vec!["nodeType", "type", "args", "output"];
    if let Some(description) = endpoint.description() {
        properties.insert("description".into(), json!({ "const": description }));
        required.push("description");
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Config, Ptsq, PtsqError, Schema};

    use super::*;

    #[test]
    fn describes_routes() {
        let p = Ptsq::new();
        let router = p
            .router()
            .route(
                "test",
                p.args(Schema::object().field("name", Schema::string()))
                    .output(Schema::string())
                    .query(|_, _: Value| async { Ok::<_, PtsqError>("John") }),
            )
            .build()
            .unwrap();

        let document = describe(&router);
        assert_eq!(document["$schema"], "https://json-schema.org/draft/2019-09/schema#");
        assert_eq!(document["title"], "BaseRouter");
        assert_eq!(document["properties"]["nodeType"], json!({ "const": "router" }));
        assert_eq!(
            document["properties"]["routes"]["properties"]["test"],
            json!({
                "type": "object",
                "properties": {
                    "nodeType": { "const": "route" },
                    "type": { "const": "query" },
                    "args": {
                        "type": "object",
                        "properties": { "name": { "type": "string" } },
                        "required": ["name"],
                    },
                    "output": { "type": "string" },
                },
                "required": ["nodeType", "type", "args", "output"],
                "additionalProperties": false,
            })
        );
    }

    #[test]
    fn nested_routers_and_descriptions() {
        let p = Ptsq::new().config(Config::new().title("Api"));
        let router = p
            .build(
                p.router().nest(
                    "user",
                    p.router().route(
                        "remove",
                        p.procedure()
                            .description("Removes a user")
                            .mutation(|_, _: Value| async { Ok::<_, PtsqError>(()) }),
                    ),
                ),
            )
            .unwrap();

        let document = describe(&router);
        assert_eq!(document["title"], "Api");
        assert_eq!(document["properties"]["routes"]["required"], json!(["user"]));

        let user = &document["properties"]["routes"]["properties"]["user"];
        assert_eq!(user["properties"]["nodeType"], json!({ "const": "router" }));

        let remove = &user["properties"]["routes"]["properties"]["remove"];
        assert_eq!(remove["properties"]["type"], json!({ "const": "mutation" }));
        assert_eq!(remove["properties"]["args"], json!({ "not": {} }));
        assert_eq!(remove["properties"]["output"], json!({}));
        assert_eq!(
            remove["properties"]["description"],
            json!({ "const": "Removes a user" })
        );
        assert_eq!(
            remove["required"],
            json!(["nodeType", "type", "args", "output", "description"])
        );
    }

    #[test]
    fn is_deterministic() {
        let p = Ptsq::new();
        let build = || {
            p.router()
                .route("b", p.query(|_, _: Value| async { Ok::<_, PtsqError>(()) }))
                .route("a", p.mutation(|_, _: Value| async { Ok::<_, PtsqError>(()) }))
                .build()
                .unwrap()
        };

        let document = describe(&build());
        assert_eq!(document, describe(&build()));
        assert_eq!(document["properties"]["routes"]["required"], json!(["a", "b"]));
    }
}
