use crate::common::literal::Literal;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::collections;

/// Prefix of every expression attribute name placeholder.
pub(crate) const NAME_PREFIX: char = '#';

/// Prefix of every expression attribute value placeholder.
pub(crate) const VALUE_PREFIX: char = ':';

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub(crate) fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Lookup key deciding whether two literals are "the same value".
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum ValueKey {
    Binary(Vec<u8>),
    Bool(bool),
    Instance(usize),
    Null(bool),
    Number(String),
    String(String),
}

impl ValueKey {
    fn of(literal: &Literal) -> Self {
        match literal.attribute_value() {
            types::AttributeValue::B(blob) => Self::Binary(blob.as_ref().to_vec()),
            types::AttributeValue::Bool(value) => Self::Bool(*value),
            types::AttributeValue::N(value) => Self::Number(value.clone()),
            types::AttributeValue::Null(value) => Self::Null(*value),
            types::AttributeValue::S(value) => Self::String(value.clone()),
            _ => Self::Instance(literal.instance_id()),
        }
    }
}

/// Wire-level attribute maps of a request.
///
/// Either map is `None` when it would be empty, since DynamoDB rejects empty
/// `ExpressionAttributeNames` and `ExpressionAttributeValues`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionAttributes {
    /// Name placeholder to raw attribute name.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Value placeholder to attribute value.
    pub expression_attribute_values: Option<collections::HashMap<String, types::AttributeValue>>,
}

/// Append-only allocator of name and value placeholders.
///
/// Names map 1:1 onto `#name` placeholders. Values handed to
/// [`add_value`](Self::add_value) get sequential `:v1`, `:v2`, ... placeholders in
/// first-encounter order, and inserting the same value again returns the
/// placeholder it already has.
///
/// ```rust
/// use dynamodb_expressions::common::{literal::Literal, placeholder::PlaceholderTable};
///
/// let mut table = PlaceholderTable::default();
/// assert_eq!(table.add_name("name"), "#name");
/// assert_eq!(table.add_value(&Literal::from("X")), ":v1");
/// assert_eq!(table.add_value(&Literal::from("X")), ":v1");
/// assert_eq!(table.add_value(&Literal::from(2)), ":v2");
/// ```
#[derive(Clone, Debug, Default)]
pub struct PlaceholderTable {
    names: IndexMap<String, String>,
    name_placeholders: collections::HashMap<String, String>,
    values: IndexMap<String, Literal>,
    value_placeholders: collections::HashMap<ValueKey, String>,
}

impl PlaceholderTable {
    /// Placeholder for a raw attribute name, allocating it on first sight.
    ///
    /// Characters outside `[A-Za-z0-9_]` become `_`; a `_<n>` suffix keeps two
    /// raw names from sharing one placeholder.
    pub fn add_name(&mut self, raw: &str) -> String {
        if let Some(placeholder) = self.names.get(raw) {
            return placeholder.clone();
        }
        let body = sanitize(raw);
        let mut placeholder = format!("{NAME_PREFIX}{body}");
        let mut suffix = 1;
        while self.name_placeholders.contains_key(&placeholder) {
            suffix += 1;
            placeholder = format!("{NAME_PREFIX}{body}_{suffix}");
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            attribute = raw,
            placeholder = placeholder.as_str(),
            "allocated name placeholder"
        );
        self.names.insert(raw.to_string(), placeholder.clone());
        self.name_placeholders
            .insert(placeholder.clone(), raw.to_string());
        placeholder
    }

    /// Sequential placeholder for a value, allocating it on first sight.
    pub fn add_value(&mut self, literal: &Literal) -> String {
        let key = ValueKey::of(literal);
        if let Some(placeholder) = self.value_placeholders.get(&key) {
            return placeholder.clone();
        }
        let mut index = self.values.len() + 1;
        let mut placeholder = format!("{VALUE_PREFIX}v{index}");
        while self.values.contains_key(&placeholder) {
            index += 1;
            placeholder = format!("{VALUE_PREFIX}v{index}");
        }
        self.insert_value(key, placeholder.clone(), literal);
        placeholder
    }

    /// Bind a value under an explicit placeholder such as `:age`.
    ///
    /// Returns `preferred` when it is free or already holds the same value,
    /// otherwise the first free `<preferred>_<n>`.
    pub fn add_value_as(&mut self, preferred: &str, literal: &Literal) -> String {
        let key = ValueKey::of(literal);
        let mut placeholder = preferred.to_string();
        let mut suffix = 1;
        while let Some(existing) = self.values.get(&placeholder) {
            if ValueKey::of(existing) == key {
                return placeholder;
            }
            suffix += 1;
            placeholder = format!("{preferred}_{suffix}");
        }
        self.insert_value(key, placeholder.clone(), literal);
        placeholder
    }

    /// Allocate a name and a value placeholder at once.
    pub fn add(&mut self, name: &str, literal: &Literal) -> (String, String) {
        (self.add_name(name), self.add_value(literal))
    }

    fn insert_value(&mut self, key: ValueKey, placeholder: String, literal: &Literal) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            placeholder = placeholder.as_str(),
            "allocated value placeholder"
        );
        self.value_placeholders
            .entry(key)
            .or_insert_with(|| placeholder.clone());
        self.values.insert(placeholder, literal.clone());
    }

    /// Raw attribute name behind a placeholder.
    pub fn name(&self, placeholder: &str) -> Option<&str> {
        self.name_placeholders.get(placeholder).map(String::as_str)
    }

    /// Placeholder already allocated for a raw attribute name.
    pub fn name_placeholder(&self, raw: &str) -> Option<&str> {
        self.names.get(raw).map(String::as_str)
    }

    /// Value behind a placeholder.
    pub fn value(&self, placeholder: &str) -> Option<&Literal> {
        self.values.get(placeholder)
    }

    /// Placeholder already allocated for a value.
    pub fn value_placeholder(&self, literal: &Literal) -> Option<&str> {
        self.value_placeholders
            .get(&ValueKey::of(literal))
            .map(String::as_str)
    }

    /// Number of distinct names.
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Number of distinct values.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// `true` when nothing has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// `(placeholder, raw name)` pairs in allocation order.
    pub fn names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .map(|(raw, placeholder)| (placeholder.as_str(), raw.as_str()))
    }

    /// `(placeholder, value)` pairs in allocation order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.values
            .iter()
            .map(|(placeholder, literal)| (placeholder.as_str(), literal))
    }

    /// The attribute maps to send alongside the compiled expressions.
    pub fn to_expression_attributes(&self) -> ExpressionAttributes {
        let expression_attribute_names = (!self.names.is_empty()).then(|| {
            self.names()
                .map(|(placeholder, raw)| (placeholder.to_string(), raw.to_string()))
                .collect()
        });
        let expression_attribute_values = (!self.values.is_empty()).then(|| {
            self.values()
                .map(|(placeholder, literal)| {
                    (placeholder.to_string(), literal.attribute_value().clone())
                })
                .collect()
        });
        ExpressionAttributes {
            expression_attribute_names,
            expression_attribute_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::plain("name", "#name")]
    #[case::underscore("first_name", "#first_name")]
    #[case::digits("field1", "#field1")]
    #[case::dash("first-name", "#first_name")]
    #[case::space("first name", "#first_name")]
    #[case::unicode("prénom", "#pr_nom")]
    fn test_add_name(#[case] raw: &str, #[case] expected: &str) {
        let mut table = PlaceholderTable::default();
        assert_eq!(table.add_name(raw), expected);
        assert_eq!(table.name(expected), Some(raw));
        assert_eq!(table.name_placeholder(raw), Some(expected));
    }

    #[test]
    fn test_add_name_is_idempotent() {
        let mut table = PlaceholderTable::default();
        let first = table.add_name("a");
        assert_eq!(table.name_count(), 1);
        let second = table.add_name("a");
        assert_eq!(first, second);
        assert_eq!(table.name_count(), 1);
    }

    #[test]
    fn test_add_name_keeps_sanitized_collisions_apart() {
        let mut table = PlaceholderTable::default();
        assert_eq!(table.add_name("a-b"), "#a_b");
        assert_eq!(table.add_name("a_b"), "#a_b_2");
        assert_eq!(table.add_name("a.b"), "#a_b_3");
        assert_eq!(table.add_name("a_b"), "#a_b_2");
        assert_eq!(table.name("#a_b"), Some("a-b"));
        assert_eq!(table.name("#a_b_2"), Some("a_b"));
        assert_eq!(table.name_count(), 3);
    }

    #[test]
    fn test_add_value_is_sequential_in_first_encounter_order() {
        let mut table = PlaceholderTable::default();
        assert_eq!(table.add_value(&Literal::from("a")), ":v1");
        assert_eq!(table.add_value(&Literal::from(1)), ":v2");
        assert_eq!(table.add_value(&Literal::from(true)), ":v3");
        assert_eq!(table.add_value(&Literal::null()), ":v4");
        assert_eq!(table.add_value(&Literal::from("a")), ":v1");
        assert_eq!(table.add_value(&Literal::from(1)), ":v2");
        assert_eq!(table.value_count(), 4);
    }

    #[test]
    fn test_add_value_distinguishes_string_from_number() {
        let mut table = PlaceholderTable::default();
        assert_eq!(table.add_value(&Literal::from("1")), ":v1");
        assert_eq!(table.add_value(&Literal::from(1)), ":v2");
    }

    #[test]
    fn test_add_value_compound_by_instance() {
        let mut table = PlaceholderTable::default();
        let tags = Literal::string_set(["a", "b"]);
        let same_tags = tags.clone();
        let equal_tags = Literal::string_set(["a", "b"]);
        assert_eq!(table.add_value(&tags), ":v1");
        assert_eq!(table.add_value(&same_tags), ":v1");
        assert_eq!(table.add_value(&equal_tags), ":v2");
        assert_eq!(table.value_placeholder(&same_tags), Some(":v1"));
        assert_eq!(table.value_placeholder(&equal_tags), Some(":v2"));
    }

    #[test]
    fn test_add_value_as() {
        let mut table = PlaceholderTable::default();
        let five = Literal::from(5);
        assert_eq!(table.add_value_as(":age", &five), ":age");
        assert_eq!(table.add_value_as(":age", &five), ":age");
        assert_eq!(table.add_value_as(":age", &Literal::from(6)), ":age_2");
        assert_eq!(table.value_count(), 2);
    }

    #[test]
    fn test_add_value_skips_explicit_placeholders() {
        let mut table = PlaceholderTable::default();
        table.add_value_as(":v1", &Literal::from("x"));
        assert_eq!(table.add_value(&Literal::from("y")), ":v2");
        assert_eq!(table.add_value(&Literal::from("z")), ":v3");
    }

    #[test]
    fn test_add() {
        let mut table = PlaceholderTable::default();
        let (name, value) = table.add("status", &Literal::from("active"));
        assert_eq!(name, "#status");
        assert_eq!(value, ":v1");
        assert_eq!(
            table.value(":v1").map(Literal::attribute_value),
            Some(&types::AttributeValue::S("active".to_string()))
        );
    }

    #[test]
    fn test_to_expression_attributes_empty() {
        let table = PlaceholderTable::default();
        assert!(table.is_empty());
        assert_eq!(
            table.to_expression_attributes(),
            ExpressionAttributes::default()
        );
    }

    #[test]
    fn test_to_expression_attributes_names_only() {
        let mut table = PlaceholderTable::default();
        table.add_name("a");
        let attributes = table.to_expression_attributes();
        assert_eq!(
            attributes.expression_attribute_names,
            Some(collections::HashMap::from([(
                "#a".to_string(),
                "a".to_string()
            )]))
        );
        assert_eq!(attributes.expression_attribute_values, None);
    }

    #[test]
    fn test_to_expression_attributes() {
        let mut table = PlaceholderTable::default();
        table.add("name", &Literal::from("X"));
        let attributes = table.to_expression_attributes();
        assert_eq!(
            attributes,
            ExpressionAttributes {
                expression_attribute_names: Some(collections::HashMap::from([(
                    "#name".to_string(),
                    "name".to_string()
                )])),
                expression_attribute_values: Some(collections::HashMap::from([(
                    ":v1".to_string(),
                    types::AttributeValue::S("X".to_string())
                )])),
            }
        );
    }
}
