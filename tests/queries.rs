/// End-to-end value-returning queries against the public API.
use qpath::{Error, QueryOptions, Value};
use serde_json::json;

fn query(path: &str, input: serde_json::Value) -> Vec<serde_json::Value> {
    try_query(path, input).expect("query failed")
}

fn try_query(path: &str, input: serde_json::Value) -> Result<Vec<serde_json::Value>, Error> {
    let parsed = qpath::parse(path).expect("parse failed");
    Ok(parsed
        .query(&Value::from(input), &QueryOptions::new())?
        .iter()
        .map(Value::to_json)
        .collect())
}

fn query_with(
    path: &str,
    input: serde_json::Value,
    opts: &QueryOptions,
) -> Result<Vec<serde_json::Value>, Error> {
    let parsed = qpath::parse(path).expect("parse failed");
    Ok(parsed
        .query(&Value::from(input), opts)?
        .iter()
        .map(Value::to_json)
        .collect())
}

// --- Accessors ---

#[test]
fn member_chain() {
    assert_eq!(query("$.a.b", json!({"a": {"b": 1}})), vec![json!(1)]);
}

#[test]
fn wildcard_member() {
    let mut results = query("$.*", json!({"a": 1, "b": 2}));
    results.sort_by_key(|v| v.as_i64());
    assert_eq!(results, vec![json!(1), json!(2)]);
}

#[test]
fn array_elements_in_order() {
    assert_eq!(
        query("$[*]", json!([3, 1, 2])),
        vec![json!(3), json!(1), json!(2)]
    );
}

#[test]
fn multi_subscript() {
    assert_eq!(
        query("$[0, 2 to 3]", json!([10, 11, 12, 13])),
        vec![json!(10), json!(12), json!(13)]
    );
}

#[test]
fn subscript_expression_with_size() {
    // fractional index arithmetic truncates toward zero
    assert_eq!(
        query(
            "$[2.5 - 1 to $.size() - 2]",
            json!([12, {"a": 13}, {"b": 14}, "ccc", true])
        ),
        vec![json!({"a": 13}), json!({"b": 14}), json!("ccc")]
    );
}

#[test]
fn strict_out_of_bounds_subscript_errors() {
    let path = qpath::parse("strict $[5]").unwrap();
    let err = path
        .query(&Value::from(json!([1, 2])), &QueryOptions::new())
        .unwrap_err();
    assert_eq!(err, Error::SubscriptOutOfBounds);
    assert_eq!(err.to_string(), "jsonpath array subscript is out of bounds");
}

#[test]
fn subscript_out_of_integer_range_in_both_modes() {
    let err = try_query("$[10000000000]", json!([1])).unwrap_err();
    assert_eq!(err, Error::SubscriptOutOfRange);
    let err = try_query("strict $[10000000000]", json!([1])).unwrap_err();
    assert_eq!(err, Error::SubscriptOutOfRange);
}

#[test]
fn non_numeric_subscript_errors() {
    let err = try_query(r#"$[$.k]"#, json!({"k": "x"})).unwrap_err();
    assert_eq!(err, Error::SubscriptNotNumeric);
}

#[test]
fn recursive_descent_collects_all_levels() {
    let results = query("$.**", json!({"a": {"b": [1]}}));
    assert_eq!(results.len(), 4);
    assert!(results.contains(&json!({"a": {"b": [1]}})));
    assert!(results.contains(&json!({"b": [1]})));
    assert!(results.contains(&json!([1])));
    assert!(results.contains(&json!(1)));
}

#[test]
fn recursive_descent_strict_does_not_fail_on_scalars() {
    // the pre-pass suppresses structural errors even in strict mode
    assert_eq!(
        query("strict $.** ? (@ == 1)", json!({"a": 1})),
        vec![json!(1)]
    );
}

// --- Variables ---

#[test]
fn variable_binding_in_filter() {
    let opts = QueryOptions::new().with_var("v", json!(12));
    assert_eq!(
        query_with("$[*] ? (@ < $v)", json!([10, 11, 12, 13]), &opts).unwrap(),
        vec![json!(10), json!(11)]
    );
}

#[test]
fn missing_variable_always_errors() {
    let err = try_query("$[*] ? (@ < $v)", json!([1])).unwrap_err();
    assert_eq!(err, Error::VariableNotFound("v".into()));
    // not suppressed by silent
    let opts = QueryOptions::new().silent();
    let err = query_with("$[*] ? (@ < $v)", json!([1]), &opts).unwrap_err();
    assert_eq!(
        err.to_string(),
        "could not find jsonpath variable \"v\""
    );
}

// --- Entry modes ---

#[test]
fn first_returns_first_item() {
    let path = qpath::parse("$.a ? (@ > 10)").unwrap();
    let input = Value::from(json!([{"a": 1}, {"a": 20}, {"a": 30}]));
    assert_eq!(
        path.first(&input, &QueryOptions::new()).unwrap(),
        Some(Value::Int(20))
    );
    let none = qpath::parse("$.a ? (@ > 100)").unwrap();
    assert_eq!(none.first(&input, &QueryOptions::new()).unwrap(), None);
}

#[test]
fn silent_swallows_suppressible_errors() {
    let opts = QueryOptions::new().silent();
    assert_eq!(
        query_with("strict $.x.size()", json!({"x": true}), &opts).unwrap(),
        Vec::<serde_json::Value>::new()
    );
    assert_eq!(
        query_with("strict $[5]", json!([1]), &opts).unwrap(),
        Vec::<serde_json::Value>::new()
    );
}

#[test]
fn cancellation_aborts_evaluation() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    let flag = Arc::new(AtomicBool::new(true));
    let opts = QueryOptions::new().silent().with_cancel_flag(flag);
    let path = qpath::parse("$.**").unwrap();
    let err = path
        .query(&Value::from(json!({"a": [1, 2, 3]})), &opts)
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
}

// --- keyvalue identity ---

#[test]
fn keyvalue_of_root_uses_id_zero() {
    // both entries share the root container, so both ids are 0
    assert_eq!(
        query("$.keyvalue()", json!({"a": 1, "b": [1, 2]})),
        vec![
            json!({"key": "a", "value": 1, "id": 0}),
            json!({"key": "b", "value": [1, 2], "id": 0}),
        ]
    );
}

#[test]
fn keyvalue_iterates_keys_sorted() {
    let results = query("$.keyvalue().key", json!({"b": 1, "a": 2, "c": 3}));
    assert_eq!(results, vec![json!("a"), json!("b"), json!("c")]);
}

#[test]
fn keyvalue_sibling_containers_get_distinct_ids() {
    let results = query("$[*].keyvalue().id", json!([{"a": 1}, {"b": 2}]));
    assert_eq!(results.len(), 2);
    assert_ne!(results[0], results[1]);
}

#[test]
fn keyvalue_of_variable_uses_reserved_base_id() {
    let opts = QueryOptions::new().with_var("v", json!({"a": 1}));
    let results = query_with("$v.keyvalue().id", json!(null), &opts).unwrap();
    assert_eq!(results, vec![json!(10_000_000_000_i64)]);
}

#[test]
fn chained_keyvalue_nests_under_generated_ids() {
    let results = query(
        "$.keyvalue().value.keyvalue().id",
        json!({"x": {"y": 1, "z": 2}}),
    );
    assert_eq!(results.len(), 2);
    for id in &results {
        let id = id.as_i64().unwrap();
        // generated base ids start above the reserved ids 0 and 1
        assert!(id / 10_000_000_000 >= 2, "unexpected id {id}");
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn keyvalue_empty_object_selects_nothing() {
    assert_eq!(query("$.keyvalue()", json!({})), Vec::<serde_json::Value>::new());
}

// --- Auto-wrap law ---

#[cfg(test)]
mod autowrap_law {
    use super::*;
    use proptest::prelude::*;

    fn scalar() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            Just(json!(null)),
            any::<bool>().prop_map(|b| json!(b)),
            any::<i64>().prop_map(|i| json!(i)),
            (-1e9f64..1e9f64).prop_map(|f| json!(f)),
            "[a-z]{0,8}".prop_map(|s| json!(s)),
        ]
    }

    proptest! {
        #[test]
        fn indexing_a_scalar_is_identity_in_lax_mode(v in scalar()) {
            prop_assert_eq!(query("$[0]", v.clone()), query("$", v));
        }

        #[test]
        fn wildcard_array_over_scalar_is_identity_in_lax_mode(v in scalar()) {
            prop_assert_eq!(query("$[*]", v.clone()), query("$", v));
        }
    }
}
