//! Lenient conversions from JSON values to the scalar types the getters return.
//!
//! Every function is total: anything that cannot be converted maps to the zero
//! value of the target type.

use serde_json::Value;

pub fn to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

pub fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        Value::Bool(b) => i64::from(*b),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    }
}

pub fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "t" | "T" | "TRUE" | "true" | "True"),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_render_scalars() {
        assert_eq!(to_string(&json!("db.local")), "db.local");
        assert_eq!(to_string(&json!(5432)), "5432");
        assert_eq!(to_string(&json!(true)), "true");
        assert_eq!(to_string(&json!(null)), "");
        assert_eq!(to_string(&json!({"a": 1})), "");
    }

    #[test]
    fn ints_parse_numeric_strings_and_truncate_floats() {
        assert_eq!(to_i64(&json!(5432)), 5432);
        assert_eq!(to_i64(&json!("5432")), 5432);
        assert_eq!(to_i64(&json!(" 7 ")), 7);
        assert_eq!(to_i64(&json!(3.9)), 3);
        assert_eq!(to_i64(&json!("not a number")), 0);
        assert_eq!(to_i64(&json!(true)), 1);
        assert_eq!(to_i64(&json!([1, 2])), 0);
    }

    #[test]
    fn floats_accept_ints_and_strings() {
        assert_eq!(to_f64(&json!(2)), 2.0);
        assert_eq!(to_f64(&json!("0.25")), 0.25);
        assert_eq!(to_f64(&json!("x")), 0.0);
    }

    #[test]
    fn bools_follow_the_usual_spellings() {
        assert!(to_bool(&json!(true)));
        assert!(to_bool(&json!("true")));
        assert!(to_bool(&json!("1")));
        assert!(to_bool(&json!("T")));
        assert!(to_bool(&json!(1)));
        assert!(!to_bool(&json!(0)));
        assert!(!to_bool(&json!("yes")));
        assert!(!to_bool(&json!(null)));
    }
}
