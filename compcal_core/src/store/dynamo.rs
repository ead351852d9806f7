//! DynamoDB implementation of the competition store.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::{config::Region, error::DisplayErrorContext, types::AttributeValue, Client};
use tracing::{debug, error};

use crate::{
    config::TableConfig,
    error::{Error, Result},
    query::FilterQuery,
    store::{CompetitionStore, RawRecord, StoreValue},
};

#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
    partition_key: String,
    sort_key: String,
}

impl DynamoStore {
    /// Connect with the default AWS credential chain.
    pub async fn connect(table: &TableConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &table.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &table.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), table)
    }

    pub fn new(client: Client, table: &TableConfig) -> Self {
        debug!(
            table = %table.table_name,
            partition_key = %table.partition_key,
            sort_key = %table.sort_key,
            "using competition table"
        );
        Self {
            client,
            table_name: table.table_name.clone(),
            partition_key: table.partition_key.clone(),
            sort_key: table.sort_key.clone(),
        }
    }

    /// `(partition key, sort key)` attribute names of the table.
    pub fn key_schema(&self) -> (&str, &str) {
        (&self.partition_key, &self.sort_key)
    }
}

#[async_trait]
impl CompetitionStore for DynamoStore {
    /// Scan the whole table, following `LastEvaluatedKey` across pages.
    async fn scan(&self, query: &FilterQuery) -> Result<Vec<RawRecord>> {
        let expression = query.expression();
        let names: HashMap<String, String> = query.names().iter().cloned().collect();
        let values: HashMap<String, AttributeValue> = query
            .values()
            .iter()
            .map(|(placeholder, value)| (placeholder.clone(), AttributeValue::S(value.clone())))
            .collect();
        let mut records = vec![];
        let mut exclusive_start_key = None;
        let mut pages = 0;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression(&expression)
                .set_expression_attribute_names(Some(names.clone()))
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .map_err(|err| {
                    let message = DisplayErrorContext(&err).to_string();
                    error!(table = %self.table_name, %message, "scan failed");
                    Error::Store(message)
                })?;
            pages += 1;
            records.extend(output.items().iter().map(decode));
            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }
        debug!(
            table = %self.table_name,
            partition_key = %self.partition_key,
            sort_key = %self.sort_key,
            pages,
            records = records.len(),
            "scan finished"
        );
        Ok(records)
    }
}

fn decode(item: &HashMap<String, AttributeValue>) -> RawRecord {
    item.iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

fn decode_value(value: &AttributeValue) -> StoreValue {
    match value {
        AttributeValue::S(text) => StoreValue::Text(text.clone()),
        AttributeValue::N(number) => StoreValue::Number(number.clone()),
        AttributeValue::Bool(value) => StoreValue::Bool(*value),
        AttributeValue::Null(_) => StoreValue::Null,
        _ => StoreValue::Unsupported,
    }
}
