use anyhow::{Result, anyhow};
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

pub fn parse_string_field(item: &HashMap<String, AttributeValue>, field: &str) -> Result<String> {
    match item.get(field) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(AttributeValue::N(n)) => Ok(n.clone()),
        _ => Err(anyhow!("Missing or invalid '{}' field", field)),
    }
}

pub fn parse_optional_string_field(
    item: &HashMap<String, AttributeValue>,
    field: &str,
) -> Result<Option<String>> {
    match item.get(field) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(_) => parse_string_field(item, field).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_string_field_yields_value() {
        let expected = "14.21".to_string();
        let item = HashMap::from([("field".to_string(), AttributeValue::S(expected.clone()))]);
        assert_eq!(parse_string_field(&item, "field").unwrap(), expected);
    }

    #[test]
    fn parse_string_field_rejects_other_types() {
        let item = HashMap::from([("field".to_string(), AttributeValue::Bool(true))]);
        assert!(parse_string_field(&item, "field").is_err());
    }

    #[test]
    fn parse_optional_string_field_returns_none_on_missing() {
        let item: HashMap<String, AttributeValue> = HashMap::new();
        assert!(parse_optional_string_field(&item, "field").unwrap().is_none());
        let item = HashMap::from([("field".to_string(), AttributeValue::Null(true))]);
        assert!(parse_optional_string_field(&item, "field").unwrap().is_none());
    }
}
