//! Checks applied to the responses of one step
//!
//! Every check takes the whole response set so a failure message can name
//! the environment at fault. Bodies are only decoded when an expectation
//! needs them.

use serde_json::Value;
use std::collections::HashSet;

use super::config::Expectation;
use crate::common::{Error, Result};
use crate::probe::{decode_all, ProbeResponse};

/// Whether a JSON value counts as present and non-empty
///
/// Null, false, zero, and empty strings, arrays and objects are empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn status_list(responses: &[ProbeResponse]) -> String {
    responses
        .iter()
        .map(|r| format!("{}={}", r.environment, r.status))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every environment returned `expected`
pub fn status_is(responses: &[ProbeResponse], expected: u16, context: Option<&str>) -> Result<()> {
    if responses.iter().any(|r| r.status != expected) {
        return Err(Error::assertion(
            context,
            format!(
                "expected status {} from every environment, got {}",
                expected,
                status_list(responses)
            ),
        ));
    }
    Ok(())
}

/// Every environment returned the same status, and `expected` if given
pub fn statuses_agree(
    responses: &[ProbeResponse],
    expected: Option<u16>,
    context: Option<&str>,
) -> Result<()> {
    if let Some(expected) = expected {
        status_is(responses, expected, context)?;
    }

    if let Some(first) = responses.first() {
        if responses.iter().any(|r| r.status != first.status) {
            return Err(Error::assertion(
                context,
                format!("environments disagree on status: {}", status_list(responses)),
            ));
        }
    }

    Ok(())
}

/// Numbers compare by value, so `1` and `1.0` are equal
fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_u64(), b.as_u64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
    }
}

/// Key identifying a value for uniqueness checks, with numbers by value
fn unique_key(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
            Some(f) => f.to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Describe where two JSON values first differ, or None when equal
///
/// Comparison is structural and exact except for numbers, which compare by
/// value (`1` equals `1.0`). Object key order is ignored.
pub fn first_difference(a: &Value, b: &Value) -> Option<String> {
    fn walk(a: &Value, b: &Value, path: &str) -> Option<String> {
        let here = if path.is_empty() { "$" } else { path };
        match (a, b) {
            (Value::Object(ma), Value::Object(mb)) => {
                for (key, va) in ma {
                    match mb.get(key) {
                        Some(vb) => {
                            if let Some(diff) = walk(va, vb, &format!("{}.{}", here, key)) {
                                return Some(diff);
                            }
                        }
                        None => return Some(format!("{}.{} missing on the right", here, key)),
                    }
                }
                mb.keys()
                    .find(|k| !ma.contains_key(*k))
                    .map(|k| format!("{}.{} missing on the left", here, k))
            }
            (Value::Array(la), Value::Array(lb)) => {
                if la.len() != lb.len() {
                    return Some(format!("{} length {} vs {}", here, la.len(), lb.len()));
                }
                la.iter()
                    .zip(lb)
                    .enumerate()
                    .find_map(|(i, (va, vb))| walk(va, vb, &format!("{}[{}]", here, i)))
            }
            (Value::Number(x), Value::Number(y)) if numbers_equal(x, y) => None,
            _ if a == b => None,
            _ => Some(format!("{}: {} vs {}", here, a, b)),
        }
    }
    walk(a, b, "")
}

fn env_name(responses: &[ProbeResponse], i: usize) -> &str {
    responses
        .get(i)
        .map(|r| r.environment.as_str())
        .unwrap_or("?")
}

/// Decoded bodies are deeply equal across environments
pub fn bodies_equal(
    responses: &[ProbeResponse],
    bodies: &[Value],
    context: Option<&str>,
) -> Result<()> {
    let Some(first) = bodies.first() else {
        return Ok(());
    };
    for (i, body) in bodies.iter().enumerate().skip(1) {
        if let Some(diff) = first_difference(first, body) {
            return Err(Error::assertion(
                context,
                format!(
                    "response bodies of '{}' and '{}' do not match ({})",
                    env_name(responses, 0),
                    env_name(responses, i),
                    diff
                ),
            ));
        }
    }
    Ok(())
}

/// Every decoded body is a JSON array
pub fn all_lists(responses: &[ProbeResponse], bodies: &[Value], context: Option<&str>) -> Result<()> {
    for (i, body) in bodies.iter().enumerate() {
        if !body.is_array() {
            return Err(Error::assertion(
                context,
                format!("expected a list from '{}'", env_name(responses, i)),
            ));
        }
    }
    Ok(())
}

/// Every decoded body is non-empty
pub fn all_non_empty(
    responses: &[ProbeResponse],
    bodies: &[Value],
    context: Option<&str>,
) -> Result<()> {
    for (i, body) in bodies.iter().enumerate() {
        if !is_truthy(body) {
            return Err(Error::assertion(
                context,
                format!("response body from '{}' is empty", env_name(responses, i)),
            ));
        }
    }
    Ok(())
}

/// Each field is present and non-empty in every body
pub fn fields_present(
    responses: &[ProbeResponse],
    bodies: &[Value],
    fields: &[String],
    context: Option<&str>,
) -> Result<()> {
    for field in fields {
        for (i, body) in bodies.iter().enumerate() {
            if !body.get(field).is_some_and(is_truthy) {
                return Err(Error::assertion(
                    context,
                    format!(
                        "response from '{}' has no usable '{}' field",
                        env_name(responses, i),
                        field
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Each field has the same value in every body
pub fn fields_equal(
    responses: &[ProbeResponse],
    bodies: &[Value],
    fields: &[String],
    context: Option<&str>,
) -> Result<()> {
    for field in fields {
        let Some(first) = bodies.first().map(|b| b.get(field)) else {
            continue;
        };
        for (i, body) in bodies.iter().enumerate().skip(1) {
            let value = body.get(field);
            let same = match (first, value) {
                (Some(a), Some(b)) => first_difference(a, b).is_none(),
                (None, None) => true,
                _ => false,
            };
            if !same {
                return Err(Error::assertion(
                    context,
                    format!(
                        "'{}' differs: {}={} vs {}={}",
                        field,
                        env_name(responses, 0),
                        first.map(Value::to_string).unwrap_or_else(|| "<missing>".into()),
                        env_name(responses, i),
                        value.map(Value::to_string).unwrap_or_else(|| "<missing>".into())
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Every element of a list body is an object carrying all `fields`
pub fn each_has(
    environment: &str,
    body: &Value,
    fields: &[String],
    context: Option<&str>,
) -> Result<()> {
    let items = body.as_array().ok_or_else(|| {
        Error::assertion(context, format!("expected a list from '{}'", environment))
    })?;

    for (index, item) in items.iter().enumerate() {
        let missing: Vec<&str> = fields
            .iter()
            .filter(|f| item.get(f.as_str()).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::assertion(
                context,
                format!(
                    "element {} from '{}' is missing {:?}",
                    index, environment, missing
                ),
            ));
        }
    }
    Ok(())
}

/// No two elements of a list body share a value for `field`
pub fn unique_by(
    environment: &str,
    body: &Value,
    field: &str,
    context: Option<&str>,
) -> Result<()> {
    let items = body.as_array().ok_or_else(|| {
        Error::assertion(context, format!("expected a list from '{}'", environment))
    })?;

    let mut seen = HashSet::new();
    for item in items {
        let Some(value) = item.get(field) else {
            continue;
        };
        // Value has no Hash impl; its canonical text does
        if !seen.insert(unique_key(value)) {
            return Err(Error::assertion(
                context,
                format!(
                    "duplicate {} {} in the list from '{}'",
                    field, value, environment
                ),
            ));
        }
    }
    Ok(())
}

/// Run every check of `expect` against a step's responses
///
/// Returns the decoded bodies when any check needed them, so the caller
/// can reuse them for captures.
pub fn evaluate(expect: &Expectation, responses: &[ProbeResponse]) -> Result<Option<Vec<Value>>> {
    let context = expect.message.as_deref();

    if expect.agree_status {
        statuses_agree(responses, expect.status, context)?;
    } else if let Some(expected) = expect.status {
        status_is(responses, expected, context)?;
    }

    if !expect.needs_body() {
        return Ok(None);
    }
    let bodies = decode_all(responses)?;

    if expect.is_list {
        all_lists(responses, &bodies, context)?;
    }
    if expect.non_empty {
        all_non_empty(responses, &bodies, context)?;
    }
    if expect.body_equal {
        bodies_equal(responses, &bodies, context)?;
    }
    fields_present(responses, &bodies, &expect.require_fields, context)?;
    fields_equal(responses, &bodies, &expect.fields_equal, context)?;

    for (response, body) in responses.iter().zip(&bodies) {
        if !expect.each_has.is_empty() {
            each_has(&response.environment, body, &expect.each_has, context)?;
        }
        if let Some(field) = &expect.unique_by {
            unique_by(&response.environment, body, field, context)?;
        }
    }

    Ok(Some(bodies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(status_dev: u16, status_rel: u16) -> Vec<ProbeResponse> {
        vec![
            ProbeResponse::new("dev", status_dev, Vec::new()),
            ProbeResponse::new("release", status_rel, Vec::new()),
        ]
    }

    fn json_pair(dev: Value, release: Value) -> Vec<ProbeResponse> {
        vec![
            ProbeResponse::with_json("dev", 200, &dev),
            ProbeResponse::with_json("release", 200, &release),
        ]
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!([1])));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(7)));
    }

    #[test]
    fn test_status_expected_and_agreeing() {
        assert!(statuses_agree(&pair(404, 404), Some(404), None).is_ok());
        assert!(statuses_agree(&pair(200, 200), None, None).is_ok());
    }

    #[test]
    fn test_status_mismatch_with_expected_names_both() {
        let err = statuses_agree(&pair(404, 500), Some(404), Some("Expected 404")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Expected 404"));
        assert!(msg.contains("dev=404"));
        assert!(msg.contains("release=500"));
    }

    #[test]
    fn test_status_both_wrong_but_agreeing_fails() {
        assert!(statuses_agree(&pair(200, 200), Some(404), None).is_err());
    }

    #[test]
    fn test_status_disagreement_without_expected() {
        let err = statuses_agree(&pair(201, 409), None, None).unwrap_err();
        assert!(err.to_string().contains("disagree"));
    }

    #[test]
    fn test_status_only_checked_against_expected_when_agreement_off() {
        let expect = Expectation {
            agree_status: false,
            ..Default::default()
        };
        assert!(evaluate(&expect, &pair(201, 200)).is_ok());

        let expect = Expectation {
            status: Some(201),
            agree_status: false,
            ..Default::default()
        };
        assert!(evaluate(&expect, &pair(201, 200)).is_err());

        assert!(evaluate(&Expectation::default(), &pair(201, 200)).is_err());
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert_eq!(first_difference(&json!({"n": 1}), &json!({"n": 1.0})), None);
        assert!(first_difference(&json!({"n": 1}), &json!({"n": 1.5})).is_some());

        let responses = json_pair(json!({"price": 10}), json!({"price": 10.0}));
        let bodies = decode_all(&responses).unwrap();
        assert!(fields_equal(&responses, &bodies, &["price".to_string()], None).is_ok());

        let dup = json!([{"category_id": 1}, {"category_id": 1.0}]);
        assert!(unique_by("dev", &dup, "category_id", None).is_err());
        let distinct = json!([{"category_id": 1}, {"category_id": "1"}]);
        assert!(unique_by("dev", &distinct, "category_id", None).is_ok());
    }

    #[test]
    fn test_first_difference_paths() {
        assert_eq!(first_difference(&json!({"a": 1}), &json!({"a": 1})), None);
        assert_eq!(
            first_difference(&json!({"a": [1, 2]}), &json!({"a": [1, 3]})).unwrap(),
            "$.a[1]: 2 vs 3"
        );
        assert!(first_difference(&json!([1]), &json!([1, 2]))
            .unwrap()
            .contains("length"));
        assert!(first_difference(&json!({"a": 1}), &json!({"a": 1, "b": 2}))
            .unwrap()
            .contains("$.b missing on the left"));
    }

    #[test]
    fn test_bodies_equal_is_strict() {
        let responses = json_pair(json!({"t": "10:00"}), json!({"t": "10:01"}));
        let bodies = decode_all(&responses).unwrap();
        let err = bodies_equal(&responses, &bodies, None).unwrap_err();
        assert!(err.to_string().contains("'dev' and 'release'"));
    }

    #[test]
    fn test_require_and_equal_fields() {
        let responses = json_pair(json!({"avatar_url": "u"}), json!({"avatar_url": "v"}));
        let bodies = decode_all(&responses).unwrap();
        let fields = vec!["avatar_url".to_string()];
        assert!(fields_present(&responses, &bodies, &fields, None).is_ok());
        assert!(fields_equal(&responses, &bodies, &fields, None).is_err());

        let responses = json_pair(json!({"avatar_url": "u"}), json!({"avatar_url": null}));
        let bodies = decode_all(&responses).unwrap();
        let err = fields_present(&responses, &bodies, &fields, None).unwrap_err();
        assert!(err.to_string().contains("'release'"));
    }

    #[test]
    fn test_each_has_and_unique_by() {
        let fields = vec!["category_id".to_string(), "name".to_string()];
        let good = json!([{"category_id": 1, "name": "a"}, {"category_id": 2, "name": "b"}]);
        assert!(each_has("dev", &good, &fields, None).is_ok());
        assert!(unique_by("dev", &good, "category_id", None).is_ok());

        let missing = json!([{"category_id": 1}]);
        let err = each_has("dev", &missing, &fields, None).unwrap_err();
        assert!(err.to_string().contains("name"));

        let dup = json!([{"category_id": 1, "name": "a"}, {"category_id": 1, "name": "b"}]);
        let err = unique_by("dev", &dup, "category_id", Some("Duplicate category")).unwrap_err();
        assert!(err.to_string().starts_with("Assertion failed: Duplicate category"));

        assert!(unique_by("dev", &json!({}), "category_id", None).is_err());
    }

    #[test]
    fn test_evaluate_skips_decoding_when_not_needed() {
        let responses = vec![
            ProbeResponse::new("dev", 404, "not json"),
            ProbeResponse::new("release", 404, "not json"),
        ];
        let expect = Expectation {
            status: Some(404),
            ..Default::default()
        };
        assert_eq!(evaluate(&expect, &responses).unwrap(), None);
    }

    #[test]
    fn test_evaluate_full_listing_checks() {
        let list = json!([{"category_id": "c1", "name": "A"}, {"category_id": "c2", "name": "B"}]);
        let responses = json_pair(list.clone(), list);
        let expect = Expectation {
            status: Some(200),
            body_equal: true,
            non_empty: true,
            is_list: true,
            each_has: vec!["category_id".into(), "name".into()],
            unique_by: Some("category_id".into()),
            ..Default::default()
        };
        let bodies = evaluate(&expect, &responses).unwrap().unwrap();
        assert_eq!(bodies.len(), 2);
    }

    #[test]
    fn test_evaluate_empty_list_fails_non_empty() {
        let responses = json_pair(json!([]), json!([]));
        let expect = Expectation {
            non_empty: true,
            body_equal: true,
            ..Default::default()
        };
        let err = evaluate(&expect, &responses).unwrap_err();
        assert!(err.is_assertion());
    }
}
