//! DynamoDB backend implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode as SdkBillingMode, DeleteRequest,
    GlobalSecondaryIndex, KeySchemaElement, KeyType, LocalSecondaryIndex, Projection,
    ProjectionType, ProvisionedThroughput, ReturnValue, ScalarAttributeType, WriteRequest,
};
use aws_sdk_dynamodb::Client;

use dynamesa_core::{
    AttributeType, BillingMode, Item, KeyDefinition, RenderedCondition, TableDefinition,
    TableDescription,
};

use super::conversions::{
    description_from_sdk, from_attribute_map, non_empty, to_attribute_map, to_attribute_value,
};
use super::error::{map_build_error, map_create_table_error, map_delete_table_error, map_sdk_error};
use crate::backend::{Page, QueryRequest, ScanRequest, TableBackend, UpdateRequest};
use crate::config::Config;
use crate::error::Result;

/// DynamoDB-backed storage.
#[derive(Debug, Clone)]
pub struct DynamoDbBackend {
    client: Client,
}

impl DynamoDbBackend {
    /// Creates a backend with the given DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a backend from configuration.
    ///
    /// Endpoint, region and static credentials are passed to the SDK loader;
    /// anything unset comes from the default provider chain.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                credentials.session_token.clone(),
                None,
                "dynamesa",
            ));
        }

        tracing::debug!(endpoint = %config.target_display(), "Creating DynamoDB client");
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

type AttributeMap = HashMap<String, AttributeValue>;

fn page_from_output(
    items: Option<Vec<AttributeMap>>,
    last_evaluated_key: Option<AttributeMap>,
) -> Result<Page> {
    Ok(Page {
        items: items
            .unwrap_or_default()
            .into_iter()
            .map(from_attribute_map)
            .collect::<Result<_>>()?,
        last_evaluated_key: last_evaluated_key.map(from_attribute_map).transpose()?,
    })
}

fn to_scalar_type(attribute_type: AttributeType) -> ScalarAttributeType {
    match attribute_type {
        AttributeType::String => ScalarAttributeType::S,
        AttributeType::Number => ScalarAttributeType::N,
        AttributeType::Binary => ScalarAttributeType::B,
    }
}

fn key_schema(key: &KeyDefinition) -> Result<Vec<KeySchemaElement>> {
    let mut elements = vec![KeySchemaElement::builder()
        .attribute_name(&key.hash.0)
        .key_type(KeyType::Hash)
        .build()
        .map_err(map_build_error)?];

    if let Some((name, _)) = &key.range {
        elements.push(
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(KeyType::Range)
                .build()
                .map_err(map_build_error)?,
        );
    }

    Ok(elements)
}

fn provisioned_throughput(billing_mode: &BillingMode) -> Result<Option<ProvisionedThroughput>> {
    match billing_mode {
        BillingMode::Provisioned { read, write } => Ok(Some(
            ProvisionedThroughput::builder()
                .read_capacity_units(*read)
                .write_capacity_units(*write)
                .build()
                .map_err(map_build_error)?,
        )),
        BillingMode::PayPerRequest => Ok(None),
    }
}

fn projection_all() -> Projection {
    Projection::builder()
        .projection_type(ProjectionType::All)
        .build()
}

#[async_trait]
impl TableBackend for DynamoDbBackend {
    async fn get_item(&self, table_name: &str, key: &Item) -> Result<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(to_attribute_map(key)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table_name))?;

        result.item.map(from_attribute_map).transpose()
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(to_attribute_map(&item)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table_name))?;

        Ok(())
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<Option<Item>> {
        let UpdateRequest {
            table_name,
            plan,
            return_values,
        } = request;

        let values: AttributeMap = plan
            .values
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute_value(v)))
            .collect();

        let result = self
            .client
            .update_item()
            .table_name(&table_name)
            .set_key(Some(to_attribute_map(&plan.key)))
            .update_expression(plan.expression)
            .set_expression_attribute_names(non_empty(plan.names))
            .set_expression_attribute_values(non_empty(values))
            .return_values(ReturnValue::from(return_values.as_str()))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &table_name))?;

        result
            .attributes
            .and_then(non_empty)
            .map(from_attribute_map)
            .transpose()
    }

    async fn query(&self, request: QueryRequest) -> Result<Page> {
        let rendered =
            RenderedCondition::render(Some(&request.key_condition), request.filter.as_ref());
        let values: AttributeMap = rendered
            .values
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute_value(v)))
            .collect();

        tracing::trace!(
            table = %request.table_name,
            index = ?request.index_name,
            key_condition = ?rendered.key_condition,
            filter = ?rendered.filter,
            "Querying page"
        );

        let result = self
            .client
            .query()
            .table_name(&request.table_name)
            .set_index_name(request.index_name.clone())
            .set_key_condition_expression(rendered.key_condition)
            .set_filter_expression(rendered.filter)
            .set_expression_attribute_names(non_empty(rendered.names))
            .set_expression_attribute_values(non_empty(values))
            .set_exclusive_start_key(request.exclusive_start_key.as_ref().map(to_attribute_map))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &request.table_name))?;

        page_from_output(result.items, result.last_evaluated_key)
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page> {
        let rendered = RenderedCondition::render(None, request.filter.as_ref());
        let values: AttributeMap = rendered
            .values
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute_value(v)))
            .collect();

        tracing::trace!(table = %request.table_name, filter = ?rendered.filter, "Scanning page");

        let result = self
            .client
            .scan()
            .table_name(&request.table_name)
            .set_filter_expression(rendered.filter)
            .set_expression_attribute_names(non_empty(rendered.names))
            .set_expression_attribute_values(non_empty(values))
            .set_exclusive_start_key(request.exclusive_start_key.as_ref().map(to_attribute_map))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &request.table_name))?;

        page_from_output(result.items, result.last_evaluated_key)
    }

    async fn batch_delete(&self, table_name: &str, keys: Vec<Item>) -> Result<Vec<Item>> {
        let requests = keys
            .iter()
            .map(|key| {
                let delete = DeleteRequest::builder()
                    .set_key(Some(to_attribute_map(key)))
                    .build()
                    .map_err(map_build_error)?;
                Ok(WriteRequest::builder().delete_request(delete).build())
            })
            .collect::<Result<Vec<_>>>()?;

        let result = self
            .client
            .batch_write_item()
            .request_items(table_name, requests)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table_name))?;

        result
            .unprocessed_items
            .and_then(|mut unprocessed| unprocessed.remove(table_name))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.delete_request)
            .map(|delete| from_attribute_map(delete.key))
            .collect()
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start = None;

        loop {
            let result = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "*"))?;

            names.extend(result.table_names.unwrap_or_default());
            match result.last_evaluated_table_name {
                Some(name) => start = Some(name),
                None => break,
            }
        }

        Ok(names)
    }

    async fn describe_table(&self, table_name: &str) -> Result<Option<TableDescription>> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(result) => result.table.as_ref().map(description_from_sdk).transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(map_sdk_error(err, table_name)),
        }
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        definition.validate()?;
        let throughput = provisioned_throughput(&definition.billing_mode)?;

        let attribute_definitions = definition
            .attribute_definitions()?
            .into_iter()
            .map(|(name, attribute_type)| {
                AttributeDefinition::builder()
                    .attribute_name(name)
                    .attribute_type(to_scalar_type(attribute_type))
                    .build()
                    .map_err(map_build_error)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut request = self
            .client
            .create_table()
            .table_name(&definition.table_name)
            .set_key_schema(Some(key_schema(&definition.primary)?))
            .set_attribute_definitions(Some(attribute_definitions))
            .set_provisioned_throughput(throughput.clone());

        request = match definition.billing_mode {
            BillingMode::Provisioned { .. } => request.billing_mode(SdkBillingMode::Provisioned),
            BillingMode::PayPerRequest => request.billing_mode(SdkBillingMode::PayPerRequest),
        };

        for (name, key) in &definition.global_indexes {
            request = request.global_secondary_indexes(
                GlobalSecondaryIndex::builder()
                    .index_name(name)
                    .set_key_schema(Some(key_schema(key)?))
                    .projection(projection_all())
                    .set_provisioned_throughput(throughput.clone())
                    .build()
                    .map_err(map_build_error)?,
            );
        }

        // Local indexes share the table's throughput.
        for (name, key) in &definition.local_indexes {
            request = request.local_secondary_indexes(
                LocalSecondaryIndex::builder()
                    .index_name(name)
                    .set_key_schema(Some(key_schema(key)?))
                    .projection(projection_all())
                    .build()
                    .map_err(map_build_error)?,
            );
        }

        request
            .send()
            .await
            .map_err(|e| map_create_table_error(e, &definition.table_name))?;

        Ok(())
    }

    async fn delete_table(&self, table_name: &str) -> Result<()> {
        self.client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| map_delete_table_error(e, table_name))?;

        Ok(())
    }
}
