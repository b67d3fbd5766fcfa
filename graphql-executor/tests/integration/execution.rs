use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use graphql_executor::ExecutionRequest;
use graphql_executor::Query;
use graphql_executor::ResolverContext;
use graphql_executor::ResolverRegistry;
use graphql_executor::error::FieldError;
use graphql_executor::json_ext::ValueExt;
use graphql_executor::resolver::Extensions;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json_bytes::Value;
use serde_json_bytes::json;
use test_log::test;

use super::executor;
use super::run;
use super::to_json;

const SCHEMA: &str = r#"
    interface Character { name: String! }
    type Human implements Character { name: String! height: Float friends: [Character] }
    type Droid implements Character { name: String! primaryFunction: String }
    union SearchResult = Human | Droid
    enum Episode { NEWHOPE EMPIRE JEDI }

    type Query {
        hero(episode: Episode = JEDI): Character
        search(text: String!, first: Int = 10): [SearchResult]
        greet(name: String = "stranger", polite: Boolean): String
        visits: Int
    }
"#;

fn luke() -> Value {
    json!({ "__typename": "Human", "name": "Luke", "height": 1.72, "friends": [
        { "__typename": "Droid", "name": "R2-D2", "primaryFunction": "Astromech" },
        { "__typename": "Human", "name": "Leia", "height": 1.5 },
    ]})
}

fn r2d2() -> Value {
    json!({ "__typename": "Droid", "name": "R2-D2", "primaryFunction": "Astromech" })
}

fn resolvers() -> ResolverRegistry {
    ResolverRegistry::new()
        .register("Query", "hero", |ctx: ResolverContext| async move {
            Ok::<_, FieldError>(match ctx.argument("episode").and_then(|episode| episode.as_str()) {
                Some("EMPIRE") => luke(),
                _ => r2d2(),
            })
        })
        .register("Query", "search", |ctx: ResolverContext| async move {
            #[derive(Deserialize)]
            struct Search {
                text: String,
                first: usize,
            }
            let search: Search = ctx.arguments_as()?;
            Ok::<_, FieldError>(Value::Array(
                [
                    json!({ "kind": "robot", "name": "R2-D2", "primaryFunction": "Astromech" }),
                    json!({ "kind": "person", "name": "Luke", "height": 1.72 }),
                    json!({ "kind": "robot", "name": "C-3PO", "primaryFunction": "Protocol" }),
                ]
                .into_iter()
                .filter(|result| {
                    result["name"]
                        .as_str()
                        .is_some_and(|name| name.contains(&search.text))
                })
                .take(search.first)
                .collect(),
            ))
        })
        .register_type_resolver("SearchResult", |value: &Value| {
            match value.get("kind")?.as_str()? {
                "robot" => Some("Droid".to_string()),
                "person" => Some("Human".to_string()),
                _ => None,
            }
        })
        .register_sync("Query", "greet", |ctx| {
            let name = ctx
                .argument("name")
                .and_then(|name| name.as_str())
                .unwrap_or("nobody");
            Ok(match ctx.argument("polite") {
                Some(Value::Bool(true)) => format!("Good day, {name}").into(),
                Some(Value::Null) => format!("... {name}").into(),
                _ => format!("Hi {name}").into(),
            })
        })
}

#[test(tokio::test)]
async fn response_mirrors_the_selection_tree() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(
        &executor,
        "{ hero(episode: EMPIRE) { name ... on Human { height friends { name } } } greet }",
        json!({}),
    )
    .await;

    let expected = json!({
        "data": {
            "hero": {
                "name": "Luke",
                "height": 1.72,
                "friends": [{ "name": "R2-D2" }, { "name": "Leia" }],
            },
            "greet": "Hi stranger",
        }
    });
    assert_eq!(response, expected);
    assert!(response.eq_and_ordered(&expected));
}

#[test(tokio::test)]
async fn aliases_and_typename() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(
        &executor,
        r#"{
            __typename
            droid: hero { __typename name }
            human: hero(episode: EMPIRE) { kind: __typename callsign: name }
            first: greet(name: "Han")
            second: greet(name: "Chewie")
        }"#,
        json!({}),
    )
    .await;

    let expected = json!({
        "data": {
            "__typename": "Query",
            "droid": { "__typename": "Droid", "name": "R2-D2" },
            "human": { "kind": "Human", "callsign": "Luke" },
            "first": "Hi Han",
            "second": "Hi Chewie",
        }
    });
    assert_eq!(response, expected);
    assert!(response.eq_and_ordered(&expected));
}

#[test(tokio::test)]
async fn merged_selections_keep_first_occurrence_order() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(
        &executor,
        r#"{
            hero(episode: EMPIRE) { name }
            greet
            hero(episode: EMPIRE) { ... on Human { height } name }
        }"#,
        json!({}),
    )
    .await;

    let expected = json!({
        "data": {
            "hero": { "name": "Luke", "height": 1.72 },
            "greet": "Hi stranger",
        }
    });
    assert!(
        response.eq_and_ordered(&expected),
        "unexpected response: {response}"
    );
}

#[test(tokio::test)]
async fn interface_fragments_only_apply_to_matching_types() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(
        &executor,
        r#"{
            hero {
                name
                ... on Human { height }
                ...DroidFields
            }
        }
        fragment DroidFields on Droid { primaryFunction }"#,
        json!({}),
    )
    .await;

    assert_eq!(
        response,
        json!({ "data": { "hero": { "name": "R2-D2", "primaryFunction": "Astromech" } } })
    );
}

#[test(tokio::test)]
async fn union_members_resolved_by_type_resolver() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(
        &executor,
        r#"query($text: String!) {
            search(text: $text) {
                __typename
                ... on Droid { name primaryFunction }
                ... on Human { name height }
            }
        }"#,
        json!({ "text": "-" }),
    )
    .await;

    assert_eq!(
        response,
        json!({ "data": { "search": [
            { "__typename": "Droid", "name": "R2-D2", "primaryFunction": "Astromech" },
            { "__typename": "Droid", "name": "C-3PO", "primaryFunction": "Protocol" },
        ] } })
    );
}

#[test(tokio::test)]
async fn typed_arguments() {
    let executor = executor(SCHEMA, resolvers());
    let response = run(
        &executor,
        "{ search(text: \"\", first: 1) { ... on Droid { name } } }",
        json!({}),
    )
    .await;

    assert_eq!(
        response,
        json!({ "data": { "search": [{ "name": "R2-D2" }] } })
    );
}

#[test(tokio::test)]
async fn skip_and_include() {
    let executor = executor(SCHEMA, resolvers());
    let query = r#"query($skip: Boolean!, $include: Boolean = true) {
        a: greet(name: "a") @skip(if: $skip)
        b: greet(name: "b") @include(if: $include)
        c: greet(name: "c") @skip(if: true) @include(if: true)
        d: greet(name: "d") @include(if: false)
        ... on Query @skip(if: $skip) { e: greet(name: "e") }
    }"#;

    assert_eq!(
        run(&executor, query, json!({ "skip": true })).await,
        json!({ "data": { "b": "Hi b" } })
    );
    assert_eq!(
        run(&executor, query, json!({ "skip": false, "include": false })).await,
        json!({ "data": { "a": "Hi a", "e": "Hi e" } })
    );
}

#[test(tokio::test)]
async fn argument_defaults_and_variables() {
    let executor = executor(SCHEMA, resolvers());
    let query = r#"query($name: String, $polite: Boolean) {
        default: greet
        absent: greet(name: $name)
        literal: greet(name: "Leia", polite: true)
        variable: greet(name: "Leia", polite: $polite)
    }"#;

    assert_eq!(
        run(&executor, query, json!({})).await,
        json!({ "data": {
            "default": "Hi stranger",
            "absent": "Hi stranger",
            "literal": "Good day, Leia",
            "variable": "Hi Leia",
        } })
    );
    // an explicit null is passed down to the resolver
    assert_eq!(
        run(&executor, query, json!({ "name": "Han", "polite": null })).await,
        json!({ "data": {
            "default": "Hi stranger",
            "absent": "Hi Han",
            "literal": "Good day, Leia",
            "variable": "... Leia",
        } })
    );
}

#[test(tokio::test)]
async fn default_resolver_reads_the_root_value() {
    let executor = executor(SCHEMA, ResolverRegistry::new());
    let query = Query::parse("{ visits hero { name } }", executor.schema()).unwrap();
    let response = executor
        .execute(
            ExecutionRequest::builder()
                .query(query.into())
                .root_value(json!({ "visits": 3, "hero": r2d2() }))
                .build(),
        )
        .await;

    assert_eq!(
        to_json(response),
        json!({ "data": { "visits": 3, "hero": { "name": "R2-D2" } } })
    );
}

#[test(tokio::test)]
async fn execution_extensions_are_scoped_to_one_execution() {
    #[derive(Default)]
    struct Visits(AtomicUsize);

    let resolvers = ResolverRegistry::new().register_sync("Query", "visits", |ctx| {
        let visits = ctx
            .execution_extensions()
            .with_lock(|mut lock| lock.get_or_insert_with(Visits::default));
        Ok((visits.0.fetch_add(1, Ordering::SeqCst) + 1).into())
    });
    let executor = executor(SCHEMA, resolvers);

    assert_eq!(
        run(&executor, "{ a: visits b: visits c: visits }", json!({})).await["data"]
            .as_object()
            .unwrap()
            .values()
            .map(|visits| visits.as_i64().unwrap())
            .max(),
        Some(3)
    );

    // extensions given with the request are visible to resolvers
    let mut extensions = Extensions::default();
    extensions.insert(Visits(AtomicUsize::new(10)));
    let response = executor
        .execute(
            ExecutionRequest::builder()
                .query(Query::parse("{ visits }", executor.schema()).unwrap().into())
                .extensions(extensions)
                .build(),
        )
        .await;
    assert_eq!(to_json(response), json!({ "data": { "visits": 11 } }));
}

#[test(tokio::test)]
async fn resolvers_see_their_path() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let resolvers = ResolverRegistry::new()
        .register("Query", "hero", |_ctx: ResolverContext| async move {
            Ok::<_, FieldError>(luke())
        })
        .register_sync("Human", "name", {
            let seen = seen.clone();
            move |ctx| {
                seen.lock().push(ctx.path().to_string());
                Ok(ctx.parent()["name"].clone())
            }
        });
    let executor = executor(SCHEMA, resolvers);

    let response = run(
        &executor,
        "{ hero(episode: EMPIRE) { name friends { ... on Human { name } } } }",
        json!({}),
    )
    .await;
    assert_eq!(
        response,
        json!({ "data": { "hero": { "name": "Luke", "friends": [{}, { "name": "Leia" }] } } })
    );

    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec!["/hero/friends/1/name", "/hero/name"]);
}

#[test(tokio::test)]
async fn operation_selection() {
    let executor = executor(SCHEMA, resolvers());
    let query = Arc::new(
        Query::parse(
            "query First { greet(name: \"first\") } query Second { greet(name: \"second\") }",
            executor.schema(),
        )
        .unwrap(),
    );

    let response = executor
        .execute(
            ExecutionRequest::builder()
                .query(query.clone())
                .operation_name("Second")
                .build(),
        )
        .await;
    assert_eq!(to_json(response), json!({ "data": { "greet": "Hi second" } }));

    let response = executor
        .execute(ExecutionRequest::builder().query(query.clone()).build())
        .await;
    assert_eq!(
        to_json(response),
        json!({ "errors": [{
            "message": "Must provide operation name if query contains multiple operations.",
            "extensions": { "code": "GRAPHQL_UNKNOWN_OPERATION_NAME" }
        }] })
    );

    let response = executor
        .execute(
            ExecutionRequest::builder()
                .query(query)
                .operation_name("Third")
                .build(),
        )
        .await;
    assert_eq!(
        to_json(response),
        json!({ "errors": [{
            "message": "Unknown operation named \"Third\"",
            "extensions": { "code": "GRAPHQL_UNKNOWN_OPERATION_NAME" }
        }] })
    );
}

#[test(tokio::test)]
async fn resolver_errors_keep_their_extensions() {
    let resolvers = ResolverRegistry::new().register_sync("Query", "greet", |_ctx| {
        Err(FieldError::new("not allowed").with_extension("code", "FORBIDDEN"))
    });
    let executor = executor(SCHEMA, resolvers);

    assert_eq!(
        run(&executor, "{ visits\n  greet }", json!({})).await,
        json!({
            "data": { "visits": null, "greet": null },
            "errors": [{
                "message": "not allowed",
                "locations": [{ "line": 2, "column": 3 }],
                "path": ["greet"],
                "extensions": { "code": "FORBIDDEN" }
            }]
        })
    );
}
