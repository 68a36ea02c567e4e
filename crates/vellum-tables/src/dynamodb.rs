//! Amazon DynamoDB table backend.
//!
//! Items keep their key in the string attributes `PK` and `SK`; every other
//! field of the body becomes an attribute of its own. The table must already
//! exist with `PK` as partition key and `SK` as sort key.
//!
//! DynamoDB applies `Limit` before the filter expression, so a scan page can
//! hold fewer items than asked for (even none) while more remain. Callers
//! keep following `last_evaluated`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json::{Number, Value};

use vellum_core::error::{VellumError, VellumResult};
use vellum_core::traits::{ScanPage, ScanRequest, TableBackend, TableItem};
use vellum_core::types::{FieldMap, ItemKey};

const PK: &str = "PK";
const SK: &str = "SK";

type Attributes = HashMap<String, AttributeValue>;

/// Wide table stored in DynamoDB.
pub struct DynamoDbTable {
    client: Client,
    table_name: String,
}

impl DynamoDbTable {
    /// Build a client from the default AWS credential chain.
    ///
    /// `region` and `endpoint_url` override the environment; point the
    /// endpoint at DynamoDB Local for development.
    pub async fn new(
        table_name: &str,
        region: Option<&str>,
        endpoint_url: Option<&str>,
    ) -> VellumResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        tracing::info!(table = table_name, ?region, ?endpoint_url, "connecting to DynamoDB");
        Ok(Self::with_client(Client::new(&sdk_config), table_name))
    }

    /// Use an already configured client.
    pub fn with_client(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

fn sdk_error(operation: &str, table: &str, err: impl std::error::Error + Send + Sync + 'static) -> VellumError {
    let message = format!(
        "DynamoDB {} on {} failed: {}",
        operation,
        table,
        DisplayErrorContext(&err)
    );
    VellumError::storage_with_source(message, err)
}

fn key_attributes(key: &ItemKey) -> Attributes {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(key.pk.clone())),
        (SK.to_string(), AttributeValue::S(key.sk.clone())),
    ])
}

fn item_to_attributes(item: TableItem) -> VellumResult<Attributes> {
    let mut attributes = key_attributes(&item.key);
    for (name, value) in item.body {
        if name == PK || name == SK {
            return Err(VellumError::validation(format!(
                "Field '{}' collides with a key attribute",
                name
            )));
        }
        attributes.insert(name, json_to_attribute(value));
    }
    Ok(attributes)
}

fn attributes_to_key(attributes: &Attributes) -> VellumResult<ItemKey> {
    let string_attr = |name: &str| match attributes.get(name) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        _ => Err(VellumError::parse(format!(
            "DynamoDB item is missing the string attribute {}",
            name
        ))),
    };
    Ok(ItemKey::new(string_attr(PK)?, string_attr(SK)?))
}

fn attributes_to_item(mut attributes: Attributes) -> VellumResult<TableItem> {
    let key = attributes_to_key(&attributes)?;
    attributes.remove(PK);
    attributes.remove(SK);

    let body = attributes
        .into_iter()
        .map(|(name, value)| Ok((name, attribute_to_json(value)?)))
        .collect::<VellumResult<FieldMap>>()?;
    Ok(TableItem::new(key, body))
}

fn json_to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => {
            AttributeValue::L(values.into_iter().map(json_to_attribute).collect())
        }
        Value::Object(map) => AttributeValue::M(
            map.into_iter()
                .map(|(k, v)| (k, json_to_attribute(v)))
                .collect(),
        ),
    }
}

fn parse_number(raw: &str) -> VellumResult<Value> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(Value::Number(n.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| VellumError::parse(format!("Unrepresentable number '{}'", raw)))
}

fn attribute_to_json(value: AttributeValue) -> VellumResult<Value> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => parse_number(&n)?,
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => Value::Array(
            values
                .into_iter()
                .map(attribute_to_json)
                .collect::<VellumResult<_>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| Ok((k, attribute_to_json(v)?)))
                .collect::<VellumResult<_>>()?,
        ),
        AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n))
                .collect::<VellumResult<_>>()?,
        ),
        other => {
            return Err(VellumError::parse(format!(
                "Unsupported DynamoDB attribute type: {:?}",
                other
            )))
        }
    })
}

#[async_trait]
impl TableBackend for DynamoDbTable {
    async fn put_item(&self, item: TableItem) -> VellumResult<()> {
        let attributes = item_to_attributes(item)?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(attributes))
            .send()
            .await
            .map_err(|e| sdk_error("PutItem", &self.table_name, e))?;
        Ok(())
    }

    async fn get_item(&self, key: &ItemKey) -> VellumResult<Option<TableItem>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| sdk_error("GetItem", &self.table_name, e))?;

        output.item.map(attributes_to_item).transpose()
    }

    async fn delete_item(&self, key: &ItemKey) -> VellumResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key)))
            .send()
            .await
            .map_err(|e| sdk_error("DeleteItem", &self.table_name, e))?;
        Ok(())
    }

    async fn query_partition(&self, pk: &str) -> VellumResult<Vec<TableItem>> {
        let mut items = Vec::new();
        let mut start: Option<Attributes> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", PK)
                .expression_attribute_values(":pk", AttributeValue::S(pk.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start.take())
                .send()
                .await
                .map_err(|e| sdk_error("Query", &self.table_name, e))?;

            for attributes in output.items.unwrap_or_default() {
                items.push(attributes_to_item(attributes)?);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn scan(&self, request: ScanRequest) -> VellumResult<ScanPage> {
        let mut filters = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        if let Some(prefix) = &request.pk_prefix {
            filters.push("begins_with(#pk, :prefix)");
            names.insert("#pk".to_string(), PK.to_string());
            values.insert(":prefix".to_string(), AttributeValue::S(prefix.clone()));
        }
        if let Some(sk) = &request.sort_key {
            filters.push("#sk = :sk");
            names.insert("#sk".to_string(), SK.to_string());
            values.insert(":sk".to_string(), AttributeValue::S(sk.clone()));
        }

        let limit = request
            .limit
            .map(|limit| i32::try_from(limit).unwrap_or(i32::MAX));

        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_filter_expression((!filters.is_empty()).then(|| filters.join(" AND ")))
            .set_expression_attribute_names((!names.is_empty()).then_some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .set_limit(limit)
            .set_exclusive_start_key(request.exclusive_start.as_ref().map(key_attributes))
            .send()
            .await
            .map_err(|e| sdk_error("Scan", &self.table_name, e))?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(attributes_to_item)
            .collect::<VellumResult<Vec<_>>>()?;
        let last_evaluated = match output.last_evaluated_key {
            Some(key) if !key.is_empty() => Some(attributes_to_key(&key)?),
            _ => None,
        };

        Ok(ScanPage {
            items,
            last_evaluated,
        })
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }
}
