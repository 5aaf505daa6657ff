//! Request assembly.
//!
//! A single DynamoDB request may carry a condition, an update and a projection at
//! once; all of them must draw placeholders from one namespace. [`ExpressionBuilder`]
//! compiles them in order against one [`PlaceholderTable`] and
//! [`ApplyExpressions`] writes the result onto the AWS SDK request builders.

use crate::common::{condition::Condition, placeholder::PlaceholderTable, projection::Projection};
use crate::error::Result;
use crate::update::Update;

use aws_sdk_dynamodb::{operation, types};
use std::collections;

/// Expressions and attribute maps ready for a request.
///
/// Every field is `None` when the request does not carry it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestExpressions {
    /// `ConditionExpression` of a write.
    pub condition_expression: Option<String>,
    /// `KeyConditionExpression` of a query.
    pub key_condition_expression: Option<String>,
    /// `FilterExpression` of a query or scan.
    pub filter_expression: Option<String>,
    /// `UpdateExpression` of an update.
    pub update_expression: Option<String>,
    /// `ProjectionExpression` of a read.
    pub projection_expression: Option<String>,
    /// `ExpressionAttributeNames` shared by every expression above.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// `ExpressionAttributeValues` shared by every expression above.
    pub expression_attribute_values: Option<collections::HashMap<String, types::AttributeValue>>,
}

impl RequestExpressions {
    /// Drop attribute map entries that no expression references.
    ///
    /// DynamoDB rejects requests carrying unused placeholders. A map left empty
    /// becomes `None`.
    pub fn retain_referenced(self) -> Self {
        let referenced: collections::HashSet<String> = [
            &self.condition_expression,
            &self.key_condition_expression,
            &self.filter_expression,
            &self.update_expression,
            &self.projection_expression,
        ]
        .into_iter()
        .flatten()
        .flat_map(|expression| placeholders(expression))
        .map(str::to_string)
        .collect();
        Self {
            expression_attribute_names: retain_placeholders(
                self.expression_attribute_names,
                &referenced,
            ),
            expression_attribute_values: retain_placeholders(
                self.expression_attribute_values,
                &referenced,
            ),
            ..self
        }
    }
}

/// `#name` and `:value` placeholders in an expression, in order of appearance.
fn placeholders(expression: &str) -> impl Iterator<Item = &str> {
    expression.match_indices(['#', ':']).map(move |(start, _)| {
        let body = &expression[start + 1..];
        let end = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        &expression[start..=start + end]
    })
}

fn retain_placeholders<V>(
    map: Option<collections::HashMap<String, V>>,
    referenced: &collections::HashSet<String>,
) -> Option<collections::HashMap<String, V>> {
    let mut map = map?;
    map.retain(|placeholder, _| referenced.contains(placeholder));
    (!map.is_empty()).then_some(map)
}

/// Compiles the expressions of one request against one placeholder table.
///
/// ```rust
/// use dynamodb_expressions::{
///     common::condition::{Condition, Template, exists},
///     request::ExpressionBuilder,
///     update::{self, Update},
/// };
///
/// let expressions = ExpressionBuilder::default()
///     .condition(&Condition::from(Template::from([("id", exists())])))
///     .unwrap()
///     .update(&Update::default().with("visits", update::add(1)))
///     .unwrap()
///     .build();
/// assert_eq!(
///     expressions.condition_expression.as_deref(),
///     Some("attribute_exists(#id)")
/// );
/// assert_eq!(
///     expressions.update_expression.as_deref(),
///     Some("SET #visits = #visits + :visits")
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExpressionBuilder {
    expressions: RequestExpressions,
    table: PlaceholderTable,
}

impl ExpressionBuilder {
    /// Continue allocating from an existing table.
    pub fn with_table(table: PlaceholderTable) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    /// Compile the condition of a conditional write.
    pub fn condition(mut self, condition: &Condition) -> Result<Self> {
        let expression = condition.compile_with(&mut self.table)?;
        self.expressions.condition_expression = Some(expression);
        Ok(self)
    }

    /// Compile the key condition of a query.
    pub fn key_condition(mut self, condition: &Condition) -> Result<Self> {
        let expression = condition.compile_with(&mut self.table)?;
        self.expressions.key_condition_expression = Some(expression);
        Ok(self)
    }

    /// Compile the filter of a query or scan.
    pub fn filter(mut self, condition: &Condition) -> Result<Self> {
        let expression = condition.compile_with(&mut self.table)?;
        self.expressions.filter_expression = Some(expression);
        Ok(self)
    }

    /// Compile the update expression.
    pub fn update(mut self, update: &Update) -> Result<Self> {
        let expression = update.compile_with(&mut self.table)?;
        self.expressions.update_expression = Some(expression);
        Ok(self)
    }

    /// Compile the projection; an empty projection leaves the request without one.
    pub fn projection(mut self, projection: &Projection) -> Result<Self> {
        let expression = projection.compile_with(&mut self.table)?;
        self.expressions.projection_expression = (!expression.is_empty()).then_some(expression);
        Ok(self)
    }

    /// The table every expression so far was compiled against.
    pub fn table(&self) -> &PlaceholderTable {
        &self.table
    }

    /// Attach the attribute maps and return the expressions.
    pub fn build(self) -> RequestExpressions {
        let attributes = self.table.to_expression_attributes();
        RequestExpressions {
            expression_attribute_names: attributes.expression_attribute_names,
            expression_attribute_values: attributes.expression_attribute_values,
            ..self.expressions
        }
    }
}

/// Write [`RequestExpressions`] onto an AWS SDK request builder.
///
/// Each builder takes only the fields its request accepts; the others are dropped,
/// and so are the attribute map entries only they referenced. Absent fields leave
/// the builder untouched.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::{Client, types::AttributeValue};
/// use dynamodb_expressions::{
///     common::condition::{Condition, Template, exists},
///     request::{ApplyExpressions, ExpressionBuilder},
///     update::Update,
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let expressions = ExpressionBuilder::default()
///     .condition(&Condition::from(Template::from([("id", exists())])))?
///     .update(&Update::default().with("name", "Jane"))?
///     .build();
/// client
///     .update_item()
///     .table_name("users")
///     .key("id", AttributeValue::S("1".to_string()))
///     .apply_expressions(expressions)
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub trait ApplyExpressions: Sized {
    /// Set every expression field this builder supports.
    fn apply_expressions(self, expressions: RequestExpressions) -> Self;
}

/// `builder.set_<field>(expressions.<field>)`, only when the field is present
macro_rules! apply_field {
    ($builder:ident, $expressions:ident, $field:ident => $setter:ident) => {
        match $expressions.$field {
            Some(value) => $builder.$setter(Some(value)),
            None => $builder,
        }
    };
    ($builder:ident, $expressions:ident, condition_expression) => {
        apply_field!($builder, $expressions, condition_expression => set_condition_expression)
    };
    ($builder:ident, $expressions:ident, key_condition_expression) => {
        apply_field!(
            $builder,
            $expressions,
            key_condition_expression => set_key_condition_expression
        )
    };
    ($builder:ident, $expressions:ident, filter_expression) => {
        apply_field!($builder, $expressions, filter_expression => set_filter_expression)
    };
    ($builder:ident, $expressions:ident, update_expression) => {
        apply_field!($builder, $expressions, update_expression => set_update_expression)
    };
    ($builder:ident, $expressions:ident, projection_expression) => {
        apply_field!($builder, $expressions, projection_expression => set_projection_expression)
    };
    ($builder:ident, $expressions:ident, expression_attribute_names) => {
        apply_field!(
            $builder,
            $expressions,
            expression_attribute_names => set_expression_attribute_names
        )
    };
    ($builder:ident, $expressions:ident, expression_attribute_values) => {
        apply_field!(
            $builder,
            $expressions,
            expression_attribute_values => set_expression_attribute_values
        )
    };
}

/// implement `ApplyExpressions` for builders accepting the listed fields
macro_rules! impl_apply_expressions {
    (@impl $builder:ty, [$($field:ident),+ $(,)?]) => {
        impl ApplyExpressions for $builder {
            fn apply_expressions(self, expressions: RequestExpressions) -> Self {
                let mut accepted = RequestExpressions::default();
                $(
                    accepted.$field = expressions.$field;
                )+
                let accepted = accepted.retain_referenced();
                let builder = self;
                $(
                    let builder = apply_field!(builder, accepted, $field);
                )+
                builder
            }
        }
    };
    ($fields:tt => $($builder:ty),+ $(,)?) => {
        $(
            impl_apply_expressions!(@impl $builder, $fields);
        )+
    };
}

impl_apply_expressions!(
    [projection_expression, expression_attribute_names] =>
    operation::get_item::builders::GetItemInputBuilder,
    operation::get_item::builders::GetItemFluentBuilder,
    types::builders::GetBuilder,
    types::builders::KeysAndAttributesBuilder,
);

impl_apply_expressions!(
    [condition_expression, expression_attribute_names, expression_attribute_values] =>
    operation::put_item::builders::PutItemInputBuilder,
    operation::put_item::builders::PutItemFluentBuilder,
    operation::delete_item::builders::DeleteItemInputBuilder,
    operation::delete_item::builders::DeleteItemFluentBuilder,
    types::builders::PutBuilder,
    types::builders::DeleteBuilder,
    types::builders::ConditionCheckBuilder,
);

impl_apply_expressions!(
    [
        update_expression,
        condition_expression,
        expression_attribute_names,
        expression_attribute_values,
    ] =>
    operation::update_item::builders::UpdateItemInputBuilder,
    operation::update_item::builders::UpdateItemFluentBuilder,
    types::builders::UpdateBuilder,
);

impl_apply_expressions!(
    [
        key_condition_expression,
        filter_expression,
        projection_expression,
        expression_attribute_names,
        expression_attribute_values,
    ] =>
    operation::query::builders::QueryInputBuilder,
    operation::query::builders::QueryFluentBuilder,
);

impl_apply_expressions!(
    [
        filter_expression,
        projection_expression,
        expression_attribute_names,
        expression_attribute_values,
    ] =>
    operation::scan::builders::ScanInputBuilder,
    operation::scan::builders::ScanFluentBuilder,
);
