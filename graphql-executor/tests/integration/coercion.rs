use std::sync::Arc;

use graphql_executor::CustomScalar;
use graphql_executor::Executor;
use graphql_executor::ResolverContext;
use graphql_executor::ResolverRegistry;
use graphql_executor::Schema;
use graphql_executor::error::BoxError;
use graphql_executor::error::FieldError;
use pretty_assertions::assert_eq;
use serde_json_bytes::Value;
use serde_json_bytes::json;
use test_log::test;

use super::run;

const SCHEMA: &str = r#"
    scalar Money

    input Range {
        from: Int!
        to: Int = 10
    }

    type Query {
        echo(text: String!): String
        double(n: Int!): Int
        sum(range: Range!): Int
        price(amount: Money!): Money
    }
"#;

/// Amounts written as "12.34", kept in cents.
struct Money;

impl CustomScalar for Money {
    fn parse_value(&self, value: Value) -> Result<Value, BoxError> {
        let text = value.as_str().ok_or("money is written as a string")?;
        let (units, cents) = text.split_once('.').ok_or("money needs cents")?;
        Ok((units.parse::<i64>()? * 100 + cents.parse::<i64>()?).into())
    }

    fn serialize(&self, value: Value) -> Result<Value, BoxError> {
        let cents = value.as_i64().ok_or("money is stored in cents")?;
        Ok(format!("{}.{:02}", cents / 100, cents % 100).into())
    }
}

fn executor() -> Executor {
    let schema = Schema::parse(SCHEMA)
        .and_then(|schema| schema.with_custom_scalar("Money", Money))
        .unwrap();
    let resolvers = ResolverRegistry::new()
        .register_sync("Query", "echo", |ctx| {
            Ok(ctx.argument("text").cloned().unwrap_or_default())
        })
        .register_sync("Query", "double", |ctx| {
            let n = ctx.argument("n").and_then(Value::as_i64).unwrap_or_default();
            Ok((n * 2).into())
        })
        .register("Query", "sum", |ctx: ResolverContext| async move {
            #[derive(serde::Deserialize)]
            struct Range {
                from: i64,
                to: i64,
            }
            #[derive(serde::Deserialize)]
            struct Arguments {
                range: Range,
            }

            let Arguments { range } = ctx.arguments_as()?;
            Ok::<_, FieldError>((range.from..=range.to).sum::<i64>().into())
        })
        .register_sync("Query", "price", |ctx| {
            let cents = ctx
                .argument("amount")
                .and_then(Value::as_i64)
                .ok_or_else(|| FieldError::new("amount must be coerced to cents"))?;
            Ok((cents * 3).into())
        });

    Executor::builder()
        .schema(Arc::new(schema))
        .resolvers(resolvers)
        .build()
}

#[test(tokio::test)]
async fn missing_required_variable() {
    let response = run(
        &executor(),
        "query Echo($text: String!) { echo(text: $text) }",
        json!({}),
    )
    .await;

    assert!(!response.as_object().unwrap().contains_key("data"));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Variable \"$text\" of required type \"String!\" was not provided.")
    );
    assert_eq!(
        response["errors"][0]["extensions"]["code"],
        json!("VALIDATION_INVALID_TYPE_VARIABLE")
    );
}

#[test(tokio::test)]
async fn every_invalid_variable_is_reported() {
    let response = run(
        &executor(),
        "query($text: String!, $n: Int!) { echo(text: $text) double(n: $n) }",
        json!({ "text": 4, "n": "four" }),
    )
    .await;

    assert!(!response.as_object().unwrap().contains_key("data"));
    let messages: Vec<_> = response["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        messages,
        [
            "Variable \"$text\" got invalid value: String cannot represent value: 4",
            "Variable \"$n\" got invalid value: Int cannot represent value: \"four\"",
        ]
    );
}

#[test(tokio::test)]
async fn input_objects_get_their_defaults() {
    let executor = executor();
    assert_eq!(
        run(&executor, "{ sum(range: { from: 1 }) }", json!({})).await,
        json!({ "data": { "sum": 55 } })
    );
    assert_eq!(
        run(
            &executor,
            "query($range: Range!) { sum(range: $range) }",
            json!({ "range": { "from": 3, "to": 4 } })
        )
        .await,
        json!({ "data": { "sum": 7 } })
    );
    assert_eq!(
        run(
            &executor,
            "query($to: Int) { sum(range: { from: 9, to: $to }) }",
            json!({})
        )
        .await,
        json!({ "data": { "sum": 19 } })
    );
}

#[test(tokio::test)]
async fn custom_scalars_are_coerced_both_ways() {
    let executor = executor();
    assert_eq!(
        run(&executor, r#"{ price(amount: "1.25") }"#, json!({})).await,
        json!({ "data": { "price": "3.75" } })
    );
    assert_eq!(
        run(
            &executor,
            "query($amount: Money!) { price(amount: $amount) }",
            json!({ "amount": "0.10" })
        )
        .await,
        json!({ "data": { "price": "0.30" } })
    );

    let response = run(
        &executor,
        "query($amount: Money!) { price(amount: $amount) }",
        json!({ "amount": 12 }),
    )
    .await;
    assert!(!response.as_object().unwrap().contains_key("data"));
    assert_eq!(
        response["errors"][0]["extensions"]["code"],
        json!("VALIDATION_INVALID_TYPE_VARIABLE")
    );
}

#[test(tokio::test)]
async fn invalid_argument_fails_only_its_field() {
    let response = run(
        &executor(),
        r#"{ price(amount: "free") echo(text: "hi") }"#,
        json!({}),
    )
    .await;

    assert_eq!(response["data"], json!({ "price": null, "echo": "hi" }));
    assert_eq!(response["errors"][0]["path"], json!(["price"]));
    assert_eq!(
        response["errors"][0]["extensions"]["code"],
        json!("ARGUMENT_COERCION_FAILED")
    );
}

#[test(tokio::test)]
async fn explicit_null_for_a_non_null_argument() {
    let response = run(
        &executor(),
        "query($n: Int = 1) { double(n: $n) }",
        json!({ "n": null }),
    )
    .await;

    assert_eq!(response["data"], json!({ "double": null }));
    assert_eq!(
        response["errors"][0]["extensions"]["code"],
        json!("ARGUMENT_COERCION_FAILED")
    );

    assert_eq!(
        run(&executor(), "query($n: Int = 1) { double(n: $n) }", json!({})).await,
        json!({ "data": { "double": 2 } })
    );
}
