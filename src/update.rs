//! Update expression building.
//!
//! An [`Update`] maps attribute paths to [`Action`]s and compiles into an update
//! expression with up to four clauses, always in the order `SET`, `REMOVE`, `ADD`,
//! `DELETE`.
//!
//! Value placeholders here are derived from the updated path (`:age`,
//! `:address_city`, `:items_0`) instead of the sequential `:v1`, `:v2`, ... used
//! by conditions and projections. Name placeholders are shared with them.

use crate::common::{self, literal::Literal, placeholder::PlaceholderTable};
use crate::error::{Error, Result};

use indexmap::IndexMap;

/// Suffix of the placeholder holding a reference's fallback value.
const DEFAULT_SUFFIX: &str = "_default";

/// Another attribute, optionally guarded by a fallback value.
///
/// ```rust
/// use dynamodb_expressions::update::{Update, reference};
///
/// let update = Update::default()
///     .with("nickname", reference("name"))
///     .with("visits", reference("previous_visits").with_default(0));
/// let compiled = update.compile().unwrap();
/// assert_eq!(
///     compiled.expression,
///     "SET #nickname = #name, #visits = if_not_exists(#previous_visits, :visits_default)"
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    /// The referenced attribute path.
    pub to: String,
    /// Value used when the referenced attribute does not exist.
    pub default: Option<Literal>,
}

impl Reference {
    /// Fall back to `default` when the referenced attribute does not exist.
    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn render(&self, path: &str, table: &mut PlaceholderTable) -> Result<String> {
        let to = common::render_path(&self.to, table)?;
        match &self.default {
            Some(default) => {
                let preferred = format!("{}{DEFAULT_SUFFIX}", common::path_value_placeholder(path));
                let default = table.add_value_as(&preferred, default);
                Ok(format!("if_not_exists({to}, {default})"))
            }
            None => Ok(to),
        }
    }
}

/// Right-hand side of arithmetic, list and set actions.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A literal bound to the path-derived value placeholder.
    Literal(Literal),
    /// Another attribute.
    Reference(Reference),
}

impl Operand {
    fn render(&self, path: &str, table: &mut PlaceholderTable) -> Result<String> {
        match self {
            Self::Literal(literal) => {
                Ok(table.add_value_as(&common::path_value_placeholder(path), literal))
            }
            Self::Reference(reference) => reference.render(path, table),
        }
    }
}

impl From<Literal> for Operand {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Reference> for Operand {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

common::impl_from_scalars!(Operand, literal => Operand::Literal(literal));

/// What to do with one attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// `SET path = value`
    Set(Literal),
    /// `SET path = other` or `SET path = if_not_exists(other, default)`
    Reference(Reference),
    /// `SET path = path + value`
    Add(Operand),
    /// `SET path = path - value`
    Subtract(Operand),
    /// `SET path = list_append(path, value)`
    Append(Operand),
    /// `SET path = list_append(value, path)`
    Prepend(Operand),
    /// `REMOVE path`
    Remove,
    /// `ADD path value`
    AddToSet(Operand),
    /// `DELETE path value`
    RemoveFromSet(Operand),
}

impl From<Literal> for Action {
    fn from(literal: Literal) -> Self {
        Self::Set(literal)
    }
}

impl From<Reference> for Action {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

common::impl_from_scalars!(Action, literal => Action::Set(literal));

/// Per-clause accumulators, rendered in a fixed order.
#[derive(Debug, Default)]
struct Clauses {
    set: Vec<String>,
    remove: Vec<String>,
    add: Vec<String>,
    delete: Vec<String>,
}

impl Clauses {
    fn push(&mut self, path: &str, action: &Action, table: &mut PlaceholderTable) -> Result<()> {
        let name = common::render_path(path, table)?;
        match action {
            Action::Set(literal) => {
                let value = table.add_value_as(&common::path_value_placeholder(path), literal);
                self.set.push(format!("{name} = {value}"));
            }
            Action::Reference(reference) => {
                let value = reference.render(path, table)?;
                self.set.push(format!("{name} = {value}"));
            }
            Action::Add(operand) => {
                let value = operand.render(path, table)?;
                self.set.push(format!("{name} = {name} + {value}"));
            }
            Action::Subtract(operand) => {
                let value = operand.render(path, table)?;
                self.set.push(format!("{name} = {name} - {value}"));
            }
            Action::Append(operand) => {
                let value = operand.render(path, table)?;
                self.set.push(format!("{name} = list_append({name}, {value})"));
            }
            Action::Prepend(operand) => {
                let value = operand.render(path, table)?;
                self.set.push(format!("{name} = list_append({value}, {name})"));
            }
            Action::Remove => self.remove.push(name),
            Action::AddToSet(operand) => {
                let value = operand.render(path, table)?;
                self.add.push(format!("{name} {value}"));
            }
            Action::RemoveFromSet(operand) => {
                let value = operand.render(path, table)?;
                self.delete.push(format!("{name} {value}"));
            }
        }
        Ok(())
    }

    fn render(self) -> String {
        [
            ("SET", self.set),
            ("REMOVE", self.remove),
            ("ADD", self.add),
            ("DELETE", self.delete),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(keyword, items)| format!("{keyword} {}", items.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Update directives keyed by attribute path.
///
/// ```rust
/// use dynamodb_expressions::{common::literal::Literal, update};
///
/// let update = update::Update::default()
///     .with("age", update::remove())
///     .with("tags", update::add_to_set(Literal::string_set(["new"])))
///     .with("name", "Jane")
///     .with("visits", update::add(1));
/// let compiled = update.compile().unwrap();
/// assert_eq!(
///     compiled.expression,
///     "SET #name = :name, #visits = #visits + :visits REMOVE #age ADD #tags :tags"
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update(IndexMap<String, Action>);

impl Update {
    /// Add an action, replacing any previous action for the same path.
    pub fn with(mut self, path: impl Into<String>, action: impl Into<Action>) -> Self {
        self.insert(path, action);
        self
    }

    /// Insert an action, returning the one it replaced.
    pub fn insert(&mut self, path: impl Into<String>, action: impl Into<Action>) -> Option<Action> {
        self.0.insert(path.into(), action.into())
    }

    /// Number of updated paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no path is updated.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compile against a fresh placeholder table.
    pub fn compile(&self) -> Result<common::CompiledExpression> {
        let mut table = PlaceholderTable::default();
        let expression = self.compile_with(&mut table)?;
        Ok(common::CompiledExpression { expression, table })
    }

    /// Compile against a shared placeholder table.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expressions.update", skip(table), err)
    )]
    pub fn compile_with(&self, table: &mut PlaceholderTable) -> Result<String> {
        if self.is_empty() {
            return Err(Error::InvalidUpdate(
                "update requires at least one attribute".to_string(),
            ));
        }
        let mut clauses = Clauses::default();
        for (path, action) in &self.0 {
            clauses.push(path, action, table)?;
        }
        Ok(clauses.render())
    }
}

impl<K, V> FromIterator<(K, V)> for Update
where
    K: Into<String>,
    V: Into<Action>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(path, action)| (path.into(), action.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Update
where
    K: Into<String>,
    V: Into<Action>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl TryFrom<Update> for common::CompiledExpression {
    type Error = Error;

    fn try_from(update: Update) -> Result<Self> {
        update.compile()
    }
}

/// Point at another attribute.
pub fn reference(to: impl Into<String>) -> Reference {
    Reference {
        to: to.into(),
        default: None,
    }
}

/// Remove the attribute.
pub fn remove() -> Action {
    Action::Remove
}

/// Increment a number.
pub fn add(value: impl Into<Operand>) -> Action {
    Action::Add(value.into())
}

/// Decrement a number.
pub fn subtract(value: impl Into<Operand>) -> Action {
    Action::Subtract(value.into())
}

/// Append to the end of a list.
pub fn append(value: impl Into<Operand>) -> Action {
    Action::Append(value.into())
}

/// Prepend to the beginning of a list.
pub fn prepend(value: impl Into<Operand>) -> Action {
    Action::Prepend(value.into())
}

/// Add elements to a set.
pub fn add_to_set(value: impl Into<Operand>) -> Action {
    Action::AddToSet(value.into())
}

/// Remove elements from a set.
pub fn remove_from_set(value: impl Into<Operand>) -> Action {
    Action::RemoveFromSet(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_sdk_dynamodb::types;
    use rstest::rstest;
    use std::collections;

    fn names(pairs: &[(&str, &str)]) -> Option<collections::HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(placeholder, name)| (placeholder.to_string(), name.to_string()))
                .collect(),
        )
    }

    fn values(
        pairs: &[(&str, types::AttributeValue)],
    ) -> Option<collections::HashMap<String, types::AttributeValue>> {
        Some(
            pairs
                .iter()
                .map(|(placeholder, value)| (placeholder.to_string(), value.clone()))
                .collect(),
        )
    }

    fn list(values: &[&str]) -> types::AttributeValue {
        types::AttributeValue::L(
            values
                .iter()
                .map(|value| types::AttributeValue::S(value.to_string()))
                .collect(),
        )
    }

    #[rstest]
    #[case::set_literal(
        Update::from([("name", "Jane")]),
        "SET #name = :name",
        names(&[("#name", "name")]),
        values(&[(":name", types::AttributeValue::S("Jane".to_string()))])
    )]
    #[case::set_nested_path(
        Update::from([("address.city", "Rome")]),
        "SET #address.#city = :address_city",
        names(&[("#address", "address"), ("#city", "city")]),
        values(&[(":address_city", types::AttributeValue::S("Rome".to_string()))])
    )]
    #[case::set_indexed_path(
        Update::from([("items[0]", "first")]),
        "SET #items[0] = :items_0",
        names(&[("#items", "items")]),
        values(&[(":items_0", types::AttributeValue::S("first".to_string()))])
    )]
    #[case::reference(
        Update::from([("a", reference("b"))]),
        "SET #a = #b",
        names(&[("#a", "a"), ("#b", "b")]),
        None
    )]
    #[case::reference_with_default(
        Update::from([("a", reference("b").with_default(0))]),
        "SET #a = if_not_exists(#b, :a_default)",
        names(&[("#a", "a"), ("#b", "b")]),
        values(&[(":a_default", types::AttributeValue::N("0".to_string()))])
    )]
    #[case::reference_to_self_with_default(
        Update::from([("count", reference("count").with_default(1))]),
        "SET #count = if_not_exists(#count, :count_default)",
        names(&[("#count", "count")]),
        values(&[(":count_default", types::AttributeValue::N("1".to_string()))])
    )]
    #[case::add_number(
        Update::from([("count", add(5))]),
        "SET #count = #count + :count",
        names(&[("#count", "count")]),
        values(&[(":count", types::AttributeValue::N("5".to_string()))])
    )]
    #[case::add_reference(
        Update::from([("count", add(reference("delta")))]),
        "SET #count = #count + #delta",
        names(&[("#count", "count"), ("#delta", "delta")]),
        None
    )]
    #[case::add_reference_with_default(
        Update::from([("count", add(reference("delta").with_default(1)))]),
        "SET #count = #count + if_not_exists(#delta, :count_default)",
        names(&[("#count", "count"), ("#delta", "delta")]),
        values(&[(":count_default", types::AttributeValue::N("1".to_string()))])
    )]
    #[case::subtract_number(
        Update::from([("stock", subtract(2))]),
        "SET #stock = #stock - :stock",
        names(&[("#stock", "stock")]),
        values(&[(":stock", types::AttributeValue::N("2".to_string()))])
    )]
    #[case::append(
        Update::from([("items", append(Literal::list([Literal::from("x")])))]),
        "SET #items = list_append(#items, :items)",
        names(&[("#items", "items")]),
        values(&[(":items", list(&["x"]))])
    )]
    #[case::prepend(
        Update::from([("items", prepend(Literal::list([Literal::from("x")])))]),
        "SET #items = list_append(:items, #items)",
        names(&[("#items", "items")]),
        values(&[(":items", list(&["x"]))])
    )]
    #[case::append_reference(
        Update::from([("items", append(reference("other_items")))]),
        "SET #items = list_append(#items, #other_items)",
        names(&[("#items", "items"), ("#other_items", "other_items")]),
        None
    )]
    #[case::subtract_reference(
        Update::from([("stock", subtract(reference("sold")))]),
        "SET #stock = #stock - #sold",
        names(&[("#stock", "stock"), ("#sold", "sold")]),
        None
    )]
    #[case::append_reference_with_default(
        Update::from([(
            "items",
            append(reference("extra").with_default(Literal::list([Literal::from("x")]))),
        )]),
        "SET #items = list_append(#items, if_not_exists(#extra, :items_default))",
        names(&[("#items", "items"), ("#extra", "extra")]),
        values(&[(":items_default", list(&["x"]))])
    )]
    #[case::prepend_reference(
        Update::from([("items", prepend(reference("history")))]),
        "SET #items = list_append(#history, #items)",
        names(&[("#items", "items"), ("#history", "history")]),
        None
    )]
    #[case::prepend_reference_with_default(
        Update::from([(
            "items",
            prepend(reference("history").with_default(Literal::list(Vec::new()))),
        )]),
        "SET #items = list_append(if_not_exists(#history, :items_default), #items)",
        names(&[("#items", "items"), ("#history", "history")]),
        values(&[(":items_default", list(&[]))])
    )]
    #[case::add_to_set_reference(
        Update::from([("tags", add_to_set(reference("new_tags")))]),
        "ADD #tags #new_tags",
        names(&[("#tags", "tags"), ("#new_tags", "new_tags")]),
        None
    )]
    #[case::remove_from_set_reference(
        Update::from([("scores", remove_from_set(reference("old_scores")))]),
        "DELETE #scores #old_scores",
        names(&[("#scores", "scores"), ("#old_scores", "old_scores")]),
        None
    )]
    #[case::remove(
        Update::from([("age", remove())]),
        "REMOVE #age",
        names(&[("#age", "age")]),
        None
    )]
    #[case::remove_multiple(
        Update::from([("a", remove()), ("b.c[1]", remove())]),
        "REMOVE #a, #b.#c[1]",
        names(&[("#a", "a"), ("#b", "b"), ("#c", "c")]),
        None
    )]
    #[case::add_to_set(
        Update::from([("tags", add_to_set(Literal::string_set(["a", "b"])))]),
        "ADD #tags :tags",
        names(&[("#tags", "tags")]),
        values(&[(
            ":tags",
            types::AttributeValue::Ss(vec!["a".to_string(), "b".to_string()])
        )])
    )]
    #[case::remove_from_set(
        Update::from([("scores", remove_from_set(Literal::number_set([1, 2])))]),
        "DELETE #scores :scores",
        names(&[("#scores", "scores")]),
        values(&[(
            ":scores",
            types::AttributeValue::Ns(vec!["1".to_string(), "2".to_string()])
        )])
    )]
    #[case::clause_order_ignores_map_order(
        Update::default()
            .with("d", remove_from_set(Literal::string_set(["x"])))
            .with("c", add_to_set(Literal::string_set(["y"])))
            .with("b", remove())
            .with("a", 1),
        "SET #a = :a REMOVE #b ADD #c :c DELETE #d :d",
        names(&[("#a", "a"), ("#b", "b"), ("#c", "c"), ("#d", "d")]),
        values(&[
            (":a", types::AttributeValue::N("1".to_string())),
            (":c", types::AttributeValue::Ss(vec!["y".to_string()])),
            (":d", types::AttributeValue::Ss(vec!["x".to_string()])),
        ])
    )]
    #[case::set_and_remove(
        Update::default().with("age", remove()).with("name", "Jane"),
        "SET #name = :name REMOVE #age",
        names(&[("#age", "age"), ("#name", "name")]),
        values(&[(":name", types::AttributeValue::S("Jane".to_string()))])
    )]
    #[case::same_literal_per_path(
        Update::default().with("a", 1).with("b", 1),
        "SET #a = :a, #b = :b",
        names(&[("#a", "a"), ("#b", "b")]),
        values(&[
            (":a", types::AttributeValue::N("1".to_string())),
            (":b", types::AttributeValue::N("1".to_string())),
        ])
    )]
    #[case::colliding_derived_placeholders(
        Update::default().with("a.b", 1).with("a_b", 2),
        "SET #a.#b = :a_b, #a_b = :a_b_2",
        names(&[("#a", "a"), ("#b", "b"), ("#a_b", "a_b")]),
        values(&[
            (":a_b", types::AttributeValue::N("1".to_string())),
            (":a_b_2", types::AttributeValue::N("2".to_string())),
        ])
    )]
    #[case::sanitized_names(
        Update::from([("first-name", "Jane")]),
        "SET #first_name = :first_name",
        names(&[("#first_name", "first-name")]),
        values(&[(":first_name", types::AttributeValue::S("Jane".to_string()))])
    )]
    fn test_update_compile(
        #[case] update: Update,
        #[case] expected_expression: &str,
        #[case] expected_names: Option<collections::HashMap<String, String>>,
        #[case] expected_values: Option<collections::HashMap<String, types::AttributeValue>>,
    ) {
        let compiled: common::CompiledExpression = update.try_into().unwrap();
        assert_eq!(compiled.expression, expected_expression);
        let attributes = compiled.expression_attributes();
        assert_eq!(attributes.expression_attribute_names, expected_names);
        assert_eq!(attributes.expression_attribute_values, expected_values);
    }

    #[test]
    fn test_update_empty() {
        let error = Update::default().compile().unwrap_err();
        assert!(matches!(error, Error::InvalidUpdate(_)));
    }

    #[test]
    fn test_update_invalid_path() {
        let error = Update::from([("a.", 1)]).compile().unwrap_err();
        assert!(matches!(error, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_update_shared_table_with_condition() {
        use crate::common::condition::{Condition, Template};

        let mut table = PlaceholderTable::default();
        let condition = Condition::from(Template::from([("version", 3)]))
            .compile_with(&mut table)
            .unwrap();
        let update = Update::default()
            .with("version", add(1))
            .with("name", "Jane")
            .compile_with(&mut table)
            .unwrap();
        assert_eq!(condition, "#version = :v1");
        assert_eq!(update, "SET #version = #version + :version, #name = :name");
        assert_eq!(table.name_count(), 2);
        assert_eq!(table.value_count(), 3);
    }

    #[test]
    fn test_update_compile_is_idempotent() {
        let update = Update::default()
            .with("a", reference("b").with_default("x"))
            .with("c", remove())
            .with("d", add_to_set(Literal::string_set(["y"])));
        let first = update.compile().unwrap();
        let second = update.compile().unwrap();
        assert_eq!(first.expression, second.expression);
        assert_eq!(
            first.expression_attributes(),
            second.expression_attributes()
        );
    }
}
