//! Plans a `find` call: query against an index, or a full scan.

use crate::error::{CoreError, Result};
use crate::expression::{attr, key, Condition};
use crate::resolver::split_key_fields;
use crate::schema::{IndexSelector, TableSchema};
use crate::value::{FieldValue, Fields, Value};

/// Arguments of a `find` or `clear` call.
///
/// ```
/// use dynamesa_core::{key, FindArgs, PRIMARY_KEY};
///
/// // Query the primary index with an explicit key condition.
/// let args = FindArgs::new()
///     .on(PRIMARY_KEY)
///     .arg(key("id").eq("1") & key("ts").gt(500000));
///
/// // Query a secondary index, with `hair` as a post-filter.
/// let args = FindArgs::new().on("AgeIndex").eq("age", 823).eq("hair", "white");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindArgs {
    selector: Option<IndexSelector>,
    conditions: Vec<Option<Condition>>,
    filters: Vec<(String, Value)>,
}

impl FindArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the index to query. Without a selector the call is a scan.
    pub fn on(mut self, selector: impl Into<IndexSelector>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Appends a positional condition.
    ///
    /// After a selector the first one is the key condition and the second
    /// the filter; pass `None::<Condition>` to keep the synthesized key condition while
    /// still supplying a filter. Without a selector the only one is the filter.
    pub fn arg(mut self, condition: impl Into<Option<Condition>>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Adds an equality field filter.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Builds field filters from a mapping. Sentinel fields are ignored.
    pub fn from_fields(fields: Fields) -> Self {
        let filters = fields
            .into_iter()
            .filter_map(|(name, value)| match value {
                FieldValue::Set(value) => Some((name, value)),
                FieldValue::Remove | FieldValue::Missing => None,
            })
            .collect();
        Self {
            filters,
            ..Self::default()
        }
    }
}

/// The request a `find` call turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum FindPlan {
    Query {
        /// `None` for the primary index.
        index_name: Option<String>,
        key_condition: Condition,
        filter: Option<Condition>,
    },
    Scan {
        filter: Option<Condition>,
    },
}

impl FindPlan {
    pub fn filter(&self) -> Option<&Condition> {
        match self {
            FindPlan::Query { filter, .. } | FindPlan::Scan { filter } => filter.as_ref(),
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, FindPlan::Query { .. })
    }
}

fn equality_filters(filters: Vec<(String, Value)>) -> impl Iterator<Item = Condition> {
    filters.into_iter().map(|(name, value)| attr(name).eq(value))
}

/// Decides between query and scan and builds both conditions.
pub fn plan_find(table: &str, schema: &TableSchema, args: FindArgs) -> Result<FindPlan> {
    let FindArgs {
        selector,
        conditions,
        filters,
    } = args;

    let Some(selector) = selector else {
        if conditions.len() > 1 {
            return Err(CoreError::UsageError(
                "table.find takes at most 1 positional condition without an index: the filter expression"
                    .to_string(),
            ));
        }
        let trailing = conditions.into_iter().flatten();
        let filter = Condition::all(equality_filters(filters).chain(trailing));
        return Ok(FindPlan::Scan { filter });
    };

    if conditions.len() > 2 {
        return Err(CoreError::UsageError(
            "table.find takes at most 3 positional arguments: index name, key condition expression, and filter expression"
                .to_string(),
        ));
    }

    let key_schema = schema.key_schema_for(table, &selector)?;
    let mut positional = conditions.into_iter();
    let explicit_key_condition = positional.next().flatten();
    let trailing = positional.next().flatten();

    let (key_condition, remaining) = match explicit_key_condition {
        Some(condition) => (condition, filters),
        None => {
            let (key_fields, remaining) = split_key_fields(key_schema, filters);
            let mut parts = Vec::new();
            for element in key_schema.elements() {
                let value = key_fields
                    .iter()
                    .find(|(name, _)| *name == element.name)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| CoreError::MissingKeyField {
                        operation: "table.find",
                        key_type: element.key_type.as_str(),
                        field: element.name.clone(),
                        table: table.to_string(),
                    })?;
                parts.push(key(element.name.clone()).eq(value));
            }
            let condition = Condition::all(parts).ok_or_else(|| {
                CoreError::InvalidKeySchema(format!("Index on {} has no key attributes", table))
            })?;
            (condition, remaining)
        }
    };

    let filter = Condition::all(equality_filters(remaining).chain(trailing));

    Ok(FindPlan::Query {
        index_name: selector.index_name().map(str::to_string),
        key_condition,
        filter,
    })
}
