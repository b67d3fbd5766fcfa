use graphql_executor::ResolverContext;
use graphql_executor::ResolverRegistry;
use graphql_executor::error::FieldError;
use pretty_assertions::assert_eq;
use serde_json_bytes::Value;
use serde_json_bytes::json;
use test_log::test;

use super::executor;
use super::run;

const SCHEMA: &str = r#"
    type Item { id: ID! name: String }
    type Profile { handle: String! bio: String }
    type User { id: ID! profile: Profile owner: Profile! }
    enum Color { RED GREEN }

    type Query {
        a: String!
        b: String
        items: [Item!]
        strictItems: [Item!]!
        user: User
        color: Color
        count: Int
        panics: String
        list: [Int]
    }
"#;

fn resolvers() -> ResolverRegistry {
    ResolverRegistry::new()
        .register_sync("Query", "a", |_ctx| Err(FieldError::new("a is broken")))
        .register_sync("Query", "b", |_ctx| Ok("x".into()))
        .register_sync("Query", "items", |_ctx| {
            Ok(json!([{ "id": "1" }, null, { "id": "3" }]))
        })
        .register_sync("Query", "strictItems", |_ctx| Ok(json!([null])))
        .register("Query", "user", |_ctx: ResolverContext| async move {
            Ok::<_, FieldError>(json!({
                "id": 7,
                "profile": { "handle": null, "bio": "hi" },
                "owner": { "handle": "root" },
            }))
        })
        .register_sync("Query", "color", |_ctx| Ok("PURPLE".into()))
        .register_sync("Query", "count", |_ctx| Ok(json!(1.5)))
        .register_sync("Query", "list", |_ctx| Ok(json!(3)))
        .register_sync("Query", "panics", |_ctx| -> Result<Value, FieldError> {
            panic!("boom")
        })
}

#[test(tokio::test)]
async fn non_null_root_field_failure_nulls_data() {
    let executor = executor(SCHEMA, resolvers());
    assert_eq!(
        run(&executor, "{ a b }", json!({})).await,
        json!({
            "data": null,
            "errors": [{
                "message": "a is broken",
                "locations": [{ "line": 1, "column": 3 }],
                "path": ["a"],
                "extensions": { "code": "RESOLVER_ERROR" }
            }]
        })
    );
    assert_eq!(
        run(&executor, "{ b }", json!({})).await,
        json!({ "data": { "b": "x" } })
    );
}

#[test(tokio::test)]
async fn null_list_element_nulls_the_list() {
    let executor = executor(SCHEMA, resolvers());
    assert_eq!(
        run(&executor, "{ items { id } }", json!({})).await,
        json!({
            "data": { "items": null },
            "errors": [{
                "message": "Cannot return null for non-nullable array element of type Item at index 1",
                "locations": [{ "line": 1, "column": 3 }],
                "path": ["items", 1]
            }]
        })
    );
}

#[test(tokio::test)]
async fn null_list_element_bubbles_to_the_root() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(&executor, "{ b strictItems { id } }", json!({})).await;
    assert_eq!(response["data"], Value::Null);
    assert_eq!(response["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(response["errors"][0]["path"], json!(["strictItems", 0]));
}

#[test(tokio::test)]
async fn nearest_nullable_ancestor_becomes_null() {
    let executor = executor(SCHEMA, resolvers());
    assert_eq!(
        run(
            &executor,
            "{ user { id profile { handle bio } owner { handle } } b }",
            json!({})
        )
        .await,
        json!({
            "data": {
                "user": { "id": "7", "profile": null, "owner": { "handle": "root" } },
                "b": "x"
            },
            "errors": [{
                "message": "Cannot return null for non-nullable field Profile.handle",
                "locations": [{ "line": 1, "column": 23 }],
                "path": ["user", "profile", "handle"]
            }]
        })
    );
}

#[test(tokio::test)]
async fn invalid_leaf_values_are_field_errors() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(&executor, "{ color count list b }", json!({})).await;

    assert_eq!(
        response["data"],
        json!({ "color": null, "count": null, "list": null, "b": "x" })
    );
    let errors = response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    for (error, (path, message)) in errors.iter().zip([
        ("color", "Enum \"Color\" cannot represent value: \"PURPLE\""),
        ("count", "Int cannot represent value: 1.5"),
        ("list", "Expected a list for field Query.list, found number"),
    ]) {
        assert_eq!(error["path"], json!([path]));
        assert_eq!(error["message"], json!(message));
        assert_eq!(error["extensions"]["code"], json!("INVALID_RESULT_VALUE"));
    }
}

#[test(tokio::test)]
async fn panics_are_isolated_to_their_field() {
    let executor = executor(SCHEMA, resolvers());
    assert_eq!(
        run(&executor, "{ panics b }", json!({})).await,
        json!({
            "data": { "panics": null, "b": "x" },
            "errors": [{
                "message": "resolver for field 'Query.panics' panicked: boom",
                "locations": [{ "line": 1, "column": 3 }],
                "path": ["panics"],
                "extensions": { "code": "RESOLVER_PANICKED" }
            }]
        })
    );
}

const NARROWED_SCHEMA: &str = r#"
    interface Named { name: String friend: Named }
    type Person implements Named { name: String! friend: Person }

    type Query {
        person: Person
        named: Named
    }
"#;

fn narrowed_resolvers() -> ResolverRegistry {
    ResolverRegistry::new()
        .register_sync("Query", "person", |_ctx| {
            Ok(json!({ "name": null, "friend": { "name": "bob" } }))
        })
        .register_sync("Query", "named", |_ctx| {
            Ok(json!({ "__typename": "Person", "name": null }))
        })
}

#[test(tokio::test)]
async fn object_types_narrow_interface_fields() {
    let executor = executor(NARROWED_SCHEMA, narrowed_resolvers());

    for query in [
        "{ person { name } }",
        "{ person { ... on Named { name } } }",
        "{ person { ...NamedFields } } fragment NamedFields on Named { name }",
    ] {
        let response = run(&executor, query, json!({})).await;
        assert_eq!(response["data"], json!({ "person": null }), "{query}");
        assert_eq!(
            response["errors"][0]["message"],
            json!("Cannot return null for non-nullable field Person.name"),
            "{query}"
        );
        assert_eq!(response["errors"][0]["path"], json!(["person", "name"]));
    }

    // Person.friend is a Person, no runtime type needed
    assert_eq!(
        run(
            &executor,
            "{ person { ... on Named { friend { name } } } }",
            json!({})
        )
        .await,
        json!({ "data": { "person": { "friend": { "name": "bob" } } } })
    );
}

#[test(tokio::test)]
async fn abstract_fields_complete_with_the_runtime_object_type() {
    let executor = executor(NARROWED_SCHEMA, narrowed_resolvers());
    let response = run(&executor, "{ named { name } }", json!({})).await;

    assert_eq!(response["data"], json!({ "named": null }));
    assert_eq!(response["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(response["errors"][0]["path"], json!(["named", "name"]));
}
