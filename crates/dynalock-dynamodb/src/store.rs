//! DynamoDB lock store

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::timeout::TimeoutConfig;
use dynalock_core::{Item, LockKey, LockStore, StoreError, StoreOperation};
use tracing::debug;

use crate::classify::{backend_error, put_item_error};
use crate::item::{from_attribute_map, to_attribute_map};

/// Placeholder bound to the key attribute name in condition expressions
const KEY_PLACEHOLDER: &str = "#lock_key";

/// Condition under which the lock insert succeeds
pub fn condition_expression() -> String {
    format!("attribute_not_exists({})", KEY_PLACEHOLDER)
}

/// DynamoDB store configuration
#[derive(Debug, Clone, Default)]
pub struct DynamoDbConfig {
    /// AWS region (optional, uses SDK default if not specified)
    pub region: Option<String>,
    /// Optional endpoint override (e.g. LocalStack, DynamoDB Local)
    pub endpoint: Option<String>,
    /// Per-operation timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// `LockStore` writing lock records to DynamoDB tables
///
/// The table is taken from each `LockKey`, so one store serves any number of tables.
#[derive(Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl std::fmt::Debug for DynamoDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbStore").finish_non_exhaustive()
    }
}

impl DynamoDbStore {
    /// Create a store inheriting HTTP client, credentials and retry settings from `sdk_config`
    pub fn new(sdk_config: &aws_config::SdkConfig, config: DynamoDbConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Create a store from the default AWS credential and region chain
    pub async fn from_env(config: DynamoDbConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(&sdk_config, config)
    }

    /// Create from a pre-built client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn key_value(key: &LockKey) -> AttributeValue {
        AttributeValue::S(key.name.clone())
    }
}

#[async_trait]
impl LockStore for DynamoDbStore {
    async fn conditional_insert(&self, key: &LockKey, item: Item) -> Result<(), StoreError> {
        debug!(table = %key.table, name = %key.name, "PutItem");

        self.client
            .put_item()
            .table_name(&key.table)
            .set_item(Some(to_attribute_map(&item)))
            .condition_expression(condition_expression())
            .expression_attribute_names(KEY_PLACEHOLDER, &key.key_attribute)
            .send()
            .await
            .map_err(put_item_error)?;

        Ok(())
    }

    async fn consistent_get(&self, key: &LockKey) -> Result<Option<Item>, StoreError> {
        debug!(table = %key.table, name = %key.name, "GetItem");

        let output = self
            .client
            .get_item()
            .table_name(&key.table)
            .key(&key.key_attribute, Self::key_value(key))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| backend_error(StoreOperation::ConsistentGet, e))?;

        Ok(output
            .item()
            .filter(|attributes| !attributes.is_empty())
            .map(from_attribute_map))
    }

    async fn delete(&self, key: &LockKey) -> Result<(), StoreError> {
        debug!(table = %key.table, name = %key.name, "DeleteItem");

        self.client
            .delete_item()
            .table_name(&key.table)
            .key(&key.key_attribute, Self::key_value(key))
            .send()
            .await
            .map_err(|e| backend_error(StoreOperation::Delete, e))?;

        Ok(())
    }
}
