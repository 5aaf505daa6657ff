use crate::error::Result;

use aws_sdk_dynamodb::{primitives::Blob, types};
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::sync;

/// A value bound to a value placeholder.
///
/// Scalars (`S`, `N`, `B`, `BOOL`, `NULL`) are deduplicated by content when they
/// reach a [`PlaceholderTable`](crate::common::placeholder::PlaceholderTable).
/// Compound values (`L`, `M`, `SS`, `NS`, `BS`) are deduplicated by instance:
/// clones of one `Literal` share a placeholder, two literals built separately
/// from equal data do not.
///
/// ```rust
/// use dynamodb_expressions::common::literal::Literal;
///
/// let name = Literal::from("Jane");
/// let age = Literal::from(42);
/// let tags = Literal::string_set(["admin", "ops"]);
/// let address = Literal::new(serde_json::json!({"city": "Rome"})).unwrap();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Literal(sync::Arc<types::AttributeValue>);

impl Literal {
    /// Serialize any value into a literal.
    pub fn new<T: Serialize>(value: T) -> Result<Self> {
        let value: types::AttributeValue = to_attribute_value(value)?;
        Ok(Self::from(value))
    }

    /// A `NULL` literal.
    pub fn null() -> Self {
        Self::from(types::AttributeValue::Null(true))
    }

    /// A list literal (`L`).
    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Literal>,
    {
        let values = values
            .into_iter()
            .map(Literal::into_attribute_value)
            .collect();
        Self::from(types::AttributeValue::L(values))
    }

    /// A string set literal (`SS`).
    pub fn string_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::from(types::AttributeValue::Ss(values))
    }

    /// A number set literal (`NS`).
    pub fn number_set<I, N>(values: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: ToString,
    {
        let values = values.into_iter().map(|value| value.to_string()).collect();
        Self::from(types::AttributeValue::Ns(values))
    }

    /// The wrapped attribute value.
    pub fn attribute_value(&self) -> &types::AttributeValue {
        &self.0
    }

    /// Unwrap into the attribute value, cloning only if the instance is shared.
    pub fn into_attribute_value(self) -> types::AttributeValue {
        sync::Arc::unwrap_or_clone(self.0)
    }

    pub(crate) fn instance_id(&self) -> usize {
        sync::Arc::as_ptr(&self.0) as usize
    }
}

impl From<types::AttributeValue> for Literal {
    fn from(value: types::AttributeValue) -> Self {
        Self(sync::Arc::new(value))
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::from(types::AttributeValue::S(value))
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::from(types::AttributeValue::Bool(value))
    }
}

impl From<Blob> for Literal {
    fn from(value: Blob) -> Self {
        Self::from(types::AttributeValue::B(value))
    }
}

macro_rules! impl_from_number {
    ($($number:ty),* $(,)?) => {
        $(
            impl From<$number> for Literal {
                fn from(value: $number) -> Self {
                    Self::from(types::AttributeValue::N(value.to_string()))
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
