/// Item-method behavior through the public API, datetime semantics
/// included.
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

// --- type / size ---

#[test]
fn type_names() {
    assert_eq!(query("$.type()", json!(null)), vec![json!("null")]);
    assert_eq!(query("$.type()", json!(true)), vec![json!("boolean")]);
    assert_eq!(query("$.type()", json!(1.5)), vec![json!("number")]);
    assert_eq!(query("$.type()", json!("x")), vec![json!("string")]);
    assert_eq!(query("$.type()", json!([1])), vec![json!("array")]);
    assert_eq!(query("$.type()", json!({"a": 1})), vec![json!("object")]);
    assert_eq!(
        query(r#"$.datetime().type()"#, json!("2017-03-10")),
        vec![json!("date")]
    );
    assert_eq!(
        query(r#"$.datetime().type()"#, json!("12:00:00")),
        vec![json!("time without time zone")]
    );
    assert_eq!(
        query(r#"$.datetime().type()"#, json!("12:00:00+04")),
        vec![json!("time with time zone")]
    );
    assert_eq!(
        query(r#"$.datetime().type()"#, json!("2017-03-10T11:22:33")),
        vec![json!("timestamp without time zone")]
    );
    assert_eq!(
        query(r#"$.datetime().type()"#, json!("2017-03-10T11:22:33+04")),
        vec![json!("timestamp with time zone")]
    );
}

#[test]
fn size_of_array_and_lax_scalar() {
    assert_eq!(query("$.x.size()", json!({"x": [1, 2, 3]})), vec![json!(3)]);
    assert_eq!(query("$.x.size()", json!({"x": true})), vec![json!(1)]);
    let err = try_query("strict $.x.size()", json!({"x": true})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "jsonpath item method .size() can only be applied to an array"
    );
}

// --- numeric methods ---

#[test]
fn abs_floor_ceiling() {
    assert_eq!(query("$.abs()", json!(-3)), vec![json!(3)]);
    assert_eq!(query("$.abs()", json!(-2.25)), vec![json!(2.25)]);
    assert_eq!(query("$.floor()", json!(2.9)), vec![json!(2)]);
    assert_eq!(query("$.ceiling()", json!(2.1)), vec![json!(3)]);
    assert_eq!(query("$[*].floor()", json!([1.7, -1.7])), vec![json!(1), json!(-2)]);
    let err = try_query("$.abs()", json!("x")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "jsonpath item method .abs() can only be applied to a numeric value"
    );
}

#[test]
fn double_coerces_strings_and_rejects_nan() {
    assert_eq!(query("$.x.double()", json!({"x": "1.23"})), vec![json!(1.23)]);
    assert_eq!(query("$.x.double()", json!({"x": 5})), vec![json!(5.0)]);
    let err = try_query("$.x.double()", json!({"x": "NaN"})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "NaN or Infinity is not allowed for jsonpath item method .double()"
    );
    let err = try_query("$.x.double()", json!({"x": "pear"})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"pear\" of jsonpath item method .double() is invalid for type double precision"
    );
}

#[test]
fn bigint_and_integer_bounds() {
    assert_eq!(query("$.bigint()", json!("123")), vec![json!(123)]);
    assert_eq!(query("$.integer()", json!(1.5)), vec![json!(2)]);
    assert_eq!(query("$.integer()", json!(-1.5)), vec![json!(-2)]);
    let err = try_query("$.integer()", json!(5000000000_i64)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"5000000000\" of jsonpath item method .integer() is invalid for type integer"
    );
    let err = try_query("$.bigint()", json!("1.5")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"1.5\" of jsonpath item method .bigint() is invalid for type bigint"
    );
    let err = try_query("$.bigint()", json!(true)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "jsonpath item method .bigint() can only be applied to a string or numeric value"
    );
}

#[test]
fn number_and_decimal() {
    assert_eq!(query("$.number()", json!("42")), vec![json!(42)]);
    assert_eq!(query("$.number()", json!("1.5")), vec![json!(1.5)]);
    assert_eq!(query("$.decimal(10, 1)", json!(1.25)), vec![json!(1.3)]);
    assert_eq!(query("$.decimal(5)", json!(12.7)), vec![json!(13)]);
    // negative scale rounds to tens
    assert_eq!(query("$.decimal(10, -1)", json!(123)), vec![json!(120)]);
    let err = try_query("$.decimal(2)", json!(123)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"123\" of jsonpath item method .decimal() is invalid for type numeric"
    );
    let err = try_query("$.decimal(0)", json!(1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "NUMERIC precision 0 must be between 1 and 1000"
    );
    let err = try_query("$.decimal(5, 2000)", json!(1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "NUMERIC scale 2000 must be between -1000 and 1000"
    );
}

// --- string / boolean ---

#[test]
fn string_renders_scalars() {
    assert_eq!(query("$.string()", json!(true)), vec![json!("true")]);
    assert_eq!(query("$.string()", json!(-7)), vec![json!("-7")]);
    assert_eq!(query("$.string()", json!(1.5)), vec![json!("1.5")]);
    assert_eq!(query("$.string()", json!(2.0)), vec![json!("2")]);
    assert_eq!(query("$.string()", json!("x")), vec![json!("x")]);
    let err = try_query("$.string()", json!({"a": 1})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "jsonpath item method .string() can only be applied to a bool, string, numeric, or datetime value"
    );
}

#[test]
fn boolean_recognizes_accepted_forms() {
    for s in ["t", "true", "YES", "on", "1", "y"] {
        assert_eq!(query("$.boolean()", json!(s)), vec![json!(true)], "{s}");
    }
    for s in ["f", "False", "no", "OFF", "0", "n"] {
        assert_eq!(query("$.boolean()", json!(s)), vec![json!(false)], "{s}");
    }
    assert_eq!(query("$.boolean()", json!(2)), vec![json!(true)]);
    assert_eq!(query("$.boolean()", json!(0)), vec![json!(false)]);
    let err = try_query("$.boolean()", json!(2.5)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"2.5\" of jsonpath item method .boolean() is invalid for type boolean"
    );
    let err = try_query("$.boolean()", json!("maybe")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"maybe\" of jsonpath item method .boolean() is invalid for type boolean"
    );
}

// --- datetime methods ---

#[test]
fn date_equality() {
    assert_eq!(
        query(r#"$.x.date() == "2017-03-10".date()"#, json!({"x": "2017-03-10"})),
        vec![json!(true)]
    );
}

#[test]
fn timestamptz_to_date_requires_tz() {
    let err = try_query(
        r#"$.x.date() == "2017-03-10".date()"#,
        json!({"x": "2017-03-10T01:02:03+04"}),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot convert value from timestamptz to date without time zone usage. \
         HINT: Use WithTZ() option for time zone support"
    );
}

#[test]
fn datetime_methods_require_strings() {
    let err = try_query("$.date()", json!(1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "jsonpath item method .date() can only be applied to a string"
    );
}

#[test]
fn incompatible_datetime_casts_are_not_recognized() {
    let err = try_query("$.date()", json!("12:00:00")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "date format is not recognized: \"12:00:00\""
    );
    let err = try_query("$.time()", json!("2017-03-10")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "time format is not recognized: \"2017-03-10\""
    );
}

#[test]
fn unparseable_datetime_string() {
    let err = try_query("$.datetime()", json!("pear")).unwrap_err();
    assert_eq!(err.to_string(), "datetime format is not recognized: \"pear\"");
}

#[test]
fn timestamp_narrows_to_date_and_time() {
    assert_eq!(
        query("$.date().string()", json!("2017-03-10T11:22:33")),
        vec![json!("2017-03-10")]
    );
    assert_eq!(
        query("$.time().string()", json!("2017-03-10T11:22:33")),
        vec![json!("11:22:33")]
    );
}

#[test]
fn time_precision_truncates() {
    assert_eq!(
        query("$.time(2).string()", json!("12:00:00.789")),
        vec![json!("12:00:00.78")]
    );
    assert_eq!(
        query("$.time(0).string()", json!("12:00:00.789")),
        vec![json!("12:00:00")]
    );
    let err = try_query("$.time(10000000000).string()", json!("12:00:00")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "time precision of jsonpath item method .time() is out of integer range"
    );
}

#[test]
fn datetime_template_is_reserved() {
    let err = try_query(r#"$.datetime("HH24:MI")"#, json!("12:00")).unwrap_err();
    assert_eq!(err, Error::DatetimeTemplate);
    assert_eq!(err.to_string(), ".datetime(template) is not yet supported");
    // not suppressed by silent
    let parsed = qpath::parse(r#"$.datetime("HH24:MI")"#).unwrap();
    let opts = QueryOptions::new().silent();
    assert!(parsed.query(&Value::from(json!("12:00")), &opts).is_err());
}

#[test]
fn datetime_comparison_within_family() {
    assert_eq!(
        query(
            r#"$[*] ? (@.datetime() < "2017-03-10".datetime()).datetime().string()"#,
            json!(["2017-03-09", "2017-03-11"])
        ),
        vec![json!("2017-03-09")]
    );
    // date vs timestamp compares through promotion
    assert_eq!(
        query(
            r#"$.x.datetime() < $.y.datetime()"#,
            json!({"x": "2017-03-10", "y": "2017-03-10T00:00:01"})
        ),
        vec![json!(true)]
    );
}

#[test]
fn cross_family_datetime_comparison_is_unknown() {
    assert_eq!(
        query(
            r#"$.x.datetime() == $.y.datetime()"#,
            json!({"x": "2017-03-10", "y": "12:00:00"})
        ),
        vec![json!(null)]
    );
}

#[test]
fn timestamptz_instant_comparison() {
    assert_eq!(
        query(
            r#"$.x.datetime() == $.y.datetime()"#,
            json!({"x": "2017-03-10T12:00:00+02", "y": "2017-03-10T11:00:00+01"})
        ),
        vec![json!(true)]
    );
}

#[test]
fn lax_methods_unwrap_arrays() {
    assert_eq!(
        query("$.x.double()", json!({"x": ["1.5", 2]})),
        vec![json!(1.5), json!(2.0)]
    );
    assert_eq!(
        query("$.x.keyvalue().key", json!({"x": [{"a": 1}]})),
        vec![json!("a")]
    );
}

#[test]
fn keyvalue_requires_object() {
    let err = try_query("strict $.keyvalue()", json!(5)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "jsonpath item method .keyvalue() can only be applied to an object"
    );
}
