use crate::{StateStore, parse_optional_string_field};
use anyhow::{Result, anyhow};
use aws_sdk_dynamodb::{Client, types::AttributeValue};
use chrono::Utc;
use std::collections::HashMap;

const KEY_ATTRIBUTE: &str = "station";
const READING_ATTRIBUTE: &str = "reading";
const UPDATED_AT_ATTRIBUTE: &str = "updated_at";

/// Keeps the last reading in a DynamoDB table keyed by `station` (S).
#[derive(Clone, Debug)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn table(&self) -> Result<&str> {
        if self.table_name.is_empty() {
            return Err(anyhow!("state table name is empty"));
        }
        Ok(&self.table_name)
    }
}

fn reading_item(key: &str, value: &str, updated_at: i64) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (KEY_ATTRIBUTE.to_string(), AttributeValue::S(key.to_string())),
        (
            READING_ATTRIBUTE.to_string(),
            AttributeValue::S(value.to_string()),
        ),
        (
            UPDATED_AT_ATTRIBUTE.to_string(),
            AttributeValue::N(updated_at.to_string()),
        ),
    ])
}

impl StateStore for DynamoDbStore {
    fn backend(&self) -> &'static str {
        "dynamodb"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .client
            .get_item()
            .table_name(self.table()?)
            .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await?;

        let Some(item) = result.item else {
            return Ok(None);
        };
        parse_optional_string_field(&item, READING_ATTRIBUTE)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let item = reading_item(key, value, Utc::now().timestamp_millis());
        self.client
            .put_item()
            .table_name(self.table()?)
            .set_item(Some(item))
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_string_field;

    #[test]
    fn reading_item_carries_key_value_and_timestamp() {
        let item = reading_item("อินทร์บุรี", "14.21", 1_700_000_000_000);
        assert_eq!(
            parse_string_field(&item, KEY_ATTRIBUTE).unwrap(),
            "อินทร์บุรี"
        );
        assert_eq!(
            parse_optional_string_field(&item, READING_ATTRIBUTE)
                .unwrap()
                .as_deref(),
            Some("14.21")
        );
        assert_eq!(
            item.get(UPDATED_AT_ATTRIBUTE),
            Some(&AttributeValue::N("1700000000000".to_string()))
        );
    }
}
