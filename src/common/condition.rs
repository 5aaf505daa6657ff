use crate::common::{self, literal::Literal, placeholder::PlaceholderTable};
use crate::error::{Error, Result};

use indexmap::IndexMap;
use std::{fmt, ops};

/// Logical operator for combining conditions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Comparison operator between an attribute and a value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComparisonOperator {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator = match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        };
        f.write_str(operator)
    }
}

/// DynamoDB attribute type tags accepted by `attribute_type`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttributeType {
    /// `S`
    String,
    /// `SS`
    StringSet,
    /// `N`
    Number,
    /// `NS`
    NumberSet,
    /// `B`
    Binary,
    /// `BS`
    BinarySet,
    /// `BOOL`
    Boolean,
    /// `NULL`
    Null,
    /// `L`
    List,
    /// `M`
    Map,
}

impl AttributeType {
    /// The type descriptor DynamoDB expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::StringSet => "SS",
            Self::Number => "N",
            Self::NumberSet => "NS",
            Self::Binary => "B",
            Self::BinarySet => "BS",
            Self::Boolean => "BOOL",
            Self::Null => "NULL",
            Self::List => "L",
            Self::Map => "M",
        }
    }
}

/// A value position inside a condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A literal bound to a value placeholder.
    Literal(Literal),
    /// `size(path)` of another attribute.
    Size(String),
}

impl From<Literal> for Operand {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl_from_scalars!(Operand, literal => Operand::Literal(literal));

/// A test on an attribute whose path is implied by where it is used.
///
/// Predicates are the values of a [`Template`]; [`Predicate::on`] turns one into
/// an explicit [`Expression`].
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Compares the attribute with a value.
    Comparison(ComparisonOperator, Operand),
    /// Checks if the attribute is between two values (inclusive).
    Between(Operand, Operand),
    /// Checks if the attribute equals one of the values.
    In(Vec<Operand>),
    /// Checks if the attribute exists, or does not when `negate` is set.
    Exists {
        /// Render `attribute_not_exists` instead.
        negate: bool,
    },
    /// Checks the attribute type.
    Type(AttributeType),
    /// Checks if the attribute begins with a prefix.
    BeginsWith(Literal),
    /// Checks if the attribute contains a value.
    Contains(Literal),
    /// Negates another predicate.
    Not(Box<Predicate>),
    /// Applies the inner predicate to `size(path)` instead of the attribute.
    Size(Box<Predicate>),
}

impl Predicate {
    /// Attach the attribute path this predicate tests.
    pub fn on(self, operand: impl Into<String>) -> Expression {
        let operand = operand.into();
        match self {
            Self::Comparison(operator, value) => Expression::Comparison {
                operand,
                operator,
                value,
            },
            Self::Between(lower, upper) => Expression::Between {
                operand,
                lower,
                upper,
            },
            Self::In(values) => Expression::In { operand, values },
            Self::Exists { negate } => Expression::Exists { operand, negate },
            Self::Type(attribute_type) => Expression::Type {
                operand,
                attribute_type,
            },
            Self::BeginsWith(prefix) => Expression::BeginsWith { operand, prefix },
            Self::Contains(value) => Expression::Contains { operand, value },
            Self::Not(predicate) => Expression::Not(Box::new(predicate.on(operand).into())),
            Self::Size(predicate) => Expression::Size { operand, predicate },
        }
    }

    fn render(&self, path: &str, table: &mut PlaceholderTable) -> Result<String> {
        let subject = common::render_path(path, table)?;
        self.render_subject(&subject, false, table)
    }

    /// Render against an already rendered left-hand side; `sized` once it is `size(..)`.
    fn render_subject(
        &self,
        subject: &str,
        sized: bool,
        table: &mut PlaceholderTable,
    ) -> Result<String> {
        match self {
            Self::Comparison(operator, value) => {
                render_comparison(subject, *operator, value, table)
            }
            Self::Between(lower, upper) => render_between(subject, lower, upper, table),
            Self::In(values) => render_in(subject, values, table),
            Self::Not(predicate) => Ok(format!(
                "NOT ({})",
                predicate.render_subject(subject, sized, table)?
            )),
            Self::Size(_) if sized => {
                Err(Error::InvalidCondition("size() cannot be nested".to_string()))
            }
            Self::Size(predicate) => {
                predicate.render_subject(&format!("size({subject})"), true, table)
            }
            _ if sized => Err(Error::InvalidCondition(
                "size() only applies to comparison, BETWEEN or IN predicates".to_string(),
            )),
            Self::Exists { negate } => Ok(render_exists(subject, *negate)),
            Self::Type(attribute_type) => Ok(render_type(subject, *attribute_type, table)),
            Self::BeginsWith(prefix) => Ok(render_function("begins_with", subject, prefix, table)),
            Self::Contains(value) => Ok(render_function("contains", subject, value, table)),
        }
    }
}

impl ops::Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

/// Condition node with an explicit attribute path.
///
/// ```rust
/// use dynamodb_expressions::common::condition::{ComparisonOperator, Expression};
///
/// let expression = Expression::Comparison {
///     operand: "age".to_string(),
///     operator: ComparisonOperator::GreaterThanOrEqual,
///     value: 18.into(),
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// `operand <operator> value`
    Comparison {
        /// The attribute path.
        operand: String,
        /// The comparison operator.
        operator: ComparisonOperator,
        /// The right-hand side.
        value: Operand,
    },
    /// Sub-conditions combined with a logical operator.
    Logical {
        /// The logical operator.
        operator: LogicalOperator,
        /// The sub-conditions, at least one.
        conditions: Vec<Condition>,
    },
    /// `operand BETWEEN lower AND upper`
    Between {
        /// The attribute path.
        operand: String,
        /// The inclusive lower bound.
        lower: Operand,
        /// The inclusive upper bound.
        upper: Operand,
    },
    /// `operand IN (values)`
    In {
        /// The attribute path.
        operand: String,
        /// The candidate values, at least one.
        values: Vec<Operand>,
    },
    /// `NOT (condition)`
    Not(Box<Condition>),
    /// `attribute_exists(operand)` or `attribute_not_exists(operand)`
    Exists {
        /// The attribute path.
        operand: String,
        /// Render `attribute_not_exists` instead.
        negate: bool,
    },
    /// `attribute_type(operand, type)`
    Type {
        /// The attribute path.
        operand: String,
        /// The expected type.
        attribute_type: AttributeType,
    },
    /// `begins_with(operand, prefix)`
    BeginsWith {
        /// The attribute path.
        operand: String,
        /// The prefix.
        prefix: Literal,
    },
    /// `contains(operand, value)`
    Contains {
        /// The attribute path.
        operand: String,
        /// The contained value.
        value: Literal,
    },
    /// The predicate applied to `size(operand)`.
    Size {
        /// The attribute path.
        operand: String,
        /// A comparison, `BETWEEN` or `IN` predicate.
        predicate: Box<Predicate>,
    },
}

impl Expression {
    fn render(&self, table: &mut PlaceholderTable) -> Result<String> {
        match self {
            Self::Comparison {
                operand,
                operator,
                value,
            } => {
                let subject = common::render_path(operand, table)?;
                render_comparison(&subject, *operator, value, table)
            }
            Self::Logical {
                operator,
                conditions,
            } => {
                if conditions.is_empty() {
                    return Err(Error::InvalidCondition(format!(
                        "{} expression requires at least one sub-condition",
                        operator.trim()
                    )));
                }
                let mut fragments = Vec::with_capacity(conditions.len());
                for condition in conditions {
                    let fragment = condition.render(table)?;
                    if condition.is_compound() {
                        fragments.push(format!("({fragment})"));
                    } else {
                        fragments.push(fragment);
                    }
                }
                let separator: &str = operator;
                Ok(fragments.join(separator))
            }
            Self::Between {
                operand,
                lower,
                upper,
            } => {
                let subject = common::render_path(operand, table)?;
                render_between(&subject, lower, upper, table)
            }
            Self::In { operand, values } => {
                let subject = common::render_path(operand, table)?;
                render_in(&subject, values, table)
            }
            Self::Not(condition) => Ok(format!("NOT ({})", condition.render(table)?)),
            Self::Exists { operand, negate } => {
                let subject = common::render_path(operand, table)?;
                Ok(render_exists(&subject, *negate))
            }
            Self::Type {
                operand,
                attribute_type,
            } => {
                let subject = common::render_path(operand, table)?;
                Ok(render_type(&subject, *attribute_type, table))
            }
            Self::BeginsWith { operand, prefix } => {
                let subject = common::render_path(operand, table)?;
                Ok(render_function("begins_with", &subject, prefix, table))
            }
            Self::Contains { operand, value } => {
                let subject = common::render_path(operand, table)?;
                Ok(render_function("contains", &subject, value, table))
            }
            Self::Size { operand, predicate } => {
                let subject = common::render_path(operand, table)?;
                predicate.render_subject(&format!("size({subject})"), true, table)
            }
        }
    }
}

/// A template value: a bare value (implicit `=`) or a predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateValue {
    /// `path = value`
    Literal(Literal),
    /// The predicate applied to the path.
    Predicate(Predicate),
}

impl From<Literal> for TemplateValue {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Predicate> for TemplateValue {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

impl_from_scalars!(TemplateValue, literal => TemplateValue::Literal(literal));

/// Shorthand condition keyed by attribute path; all entries are ANDed.
///
/// ```rust
/// use dynamodb_expressions::common::condition::{Condition, Template, greater_than};
///
/// let template = Template::default()
///     .with("status", "active")
///     .with("age", greater_than(18));
/// let compiled = Condition::from(template).compile().unwrap();
/// assert_eq!(compiled.expression, "#status = :v1 AND #age > :v2");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Template(IndexMap<String, TemplateValue>);

impl Template {
    /// Add an entry, replacing any previous entry for the same path.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert(path, value);
        self
    }

    /// Insert an entry, returning the one it replaced.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        value: impl Into<TemplateValue>,
    ) -> Option<TemplateValue> {
        self.0.insert(path.into(), value.into())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the template names no attribute.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn render(&self, table: &mut PlaceholderTable) -> Result<String> {
        if self.is_empty() {
            return Err(Error::InvalidCondition(
                "template requires at least one attribute".to_string(),
            ));
        }
        let mut fragments = Vec::with_capacity(self.len());
        for (path, value) in &self.0 {
            let fragment = match value {
                TemplateValue::Literal(literal) => {
                    let path = common::render_path(path, table)?;
                    format!("{path} = {}", table.add_value(literal))
                }
                TemplateValue::Predicate(predicate) => predicate.render(path, table)?,
            };
            fragments.push(fragment);
        }
        let separator: &str = &LogicalOperator::And;
        Ok(fragments.join(separator))
    }
}

impl<K, V> FromIterator<(K, V)> for Template
where
    K: Into<String>,
    V: Into<TemplateValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(path, value)| (path.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Template
where
    K: Into<String>,
    V: Into<TemplateValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Condition input: a template, an explicit expression, or a list of them (ANDed).
///
/// ```rust
/// use dynamodb_expressions::common::condition::{self, Condition, Template};
///
/// let condition = Condition::from(condition::or([
///     Template::from([("a", 1), ("b", 2)]),
///     Template::from([("c", 3)]),
/// ]));
/// let compiled = condition.compile().unwrap();
/// assert_eq!(compiled.expression, "(#a = :v1 AND #b = :v2) OR #c = :v3");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Shorthand keyed by attribute path.
    Template(Template),
    /// Explicit expression node.
    Expression(Expression),
    /// Conditions combined with AND.
    List(Vec<Condition>),
}

impl From<Template> for Condition {
    fn from(template: Template) -> Self {
        Self::Template(template)
    }
}

impl From<Expression> for Condition {
    fn from(expression: Expression) -> Self {
        Self::Expression(expression)
    }
}

impl From<Vec<Condition>> for Condition {
    fn from(conditions: Vec<Condition>) -> Self {
        Self::List(conditions)
    }
}

impl TryFrom<Condition> for common::CompiledExpression {
    type Error = Error;

    fn try_from(condition: Condition) -> Result<Self> {
        condition.compile()
    }
}

impl Condition {
    /// Compile against a fresh placeholder table.
    pub fn compile(&self) -> Result<common::CompiledExpression> {
        let mut table = PlaceholderTable::default();
        let expression = self.compile_with(&mut table)?;
        Ok(common::CompiledExpression { expression, table })
    }

    /// Compile against a shared placeholder table.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expressions.condition", skip(table), err)
    )]
    pub fn compile_with(&self, table: &mut PlaceholderTable) -> Result<String> {
        self.render(table)
    }

    /// Whether the rendered condition must be parenthesized inside a logical expression.
    fn is_compound(&self) -> bool {
        match self {
            Self::Template(template) => template.len() > 1,
            Self::Expression(Expression::Logical { .. }) => true,
            Self::Expression(_) => false,
            Self::List(conditions) => match conditions.as_slice() {
                [condition] => condition.is_compound(),
                _ => true,
            },
        }
    }

    fn is_disjunction(&self) -> bool {
        matches!(
            self,
            Self::Expression(Expression::Logical {
                operator: LogicalOperator::Or,
                ..
            })
        )
    }

    fn render(&self, table: &mut PlaceholderTable) -> Result<String> {
        match self {
            Self::Template(template) => template.render(table),
            Self::Expression(expression) => expression.render(table),
            Self::List(conditions) => match conditions.as_slice() {
                [] => Err(Error::InvalidCondition(
                    "condition list requires at least one condition".to_string(),
                )),
                [condition] => condition.render(table),
                _ => {
                    let mut fragments = Vec::with_capacity(conditions.len());
                    for condition in conditions {
                        let fragment = condition.render(table)?;
                        if condition.is_disjunction() {
                            fragments.push(format!("({fragment})"));
                        } else {
                            fragments.push(fragment);
                        }
                    }
                    let separator: &str = &LogicalOperator::And;
                    Ok(fragments.join(separator))
                }
            },
        }
    }
}

fn render_operand(operand: &Operand, table: &mut PlaceholderTable) -> Result<String> {
    match operand {
        Operand::Literal(literal) => Ok(table.add_value(literal)),
        Operand::Size(path) => Ok(format!("size({})", common::render_path(path, table)?)),
    }
}

fn render_comparison(
    subject: &str,
    operator: ComparisonOperator,
    value: &Operand,
    table: &mut PlaceholderTable,
) -> Result<String> {
    let value = render_operand(value, table)?;
    Ok(format!("{subject} {operator} {value}"))
}

fn render_between(
    subject: &str,
    lower: &Operand,
    upper: &Operand,
    table: &mut PlaceholderTable,
) -> Result<String> {
    let lower = render_operand(lower, table)?;
    let upper = render_operand(upper, table)?;
    Ok(format!("{subject} BETWEEN {lower} AND {upper}"))
}

fn render_in(subject: &str, values: &[Operand], table: &mut PlaceholderTable) -> Result<String> {
    if values.is_empty() {
        return Err(Error::InvalidCondition(
            "IN expression requires at least one value".to_string(),
        ));
    }
    let mut placeholders = Vec::with_capacity(values.len());
    for value in values {
        placeholders.push(render_operand(value, table)?);
    }
    Ok(format!("{subject} IN ({})", placeholders.join(", ")))
}

fn render_exists(subject: &str, negate: bool) -> String {
    if negate {
        format!("attribute_not_exists({subject})")
    } else {
        format!("attribute_exists({subject})")
    }
}

fn render_type(
    subject: &str,
    attribute_type: AttributeType,
    table: &mut PlaceholderTable,
) -> String {
    let value = table.add_value(&Literal::from(attribute_type.as_str()));
    format!("attribute_type({subject}, {value})")
}

fn render_function(
    function: &str,
    subject: &str,
    value: &Literal,
    table: &mut PlaceholderTable,
) -> String {
    let value = table.add_value(value);
    format!("{function}({subject}, {value})")
}

/// `path = value`
pub fn equals(value: impl Into<Operand>) -> Predicate {
    Predicate::Comparison(ComparisonOperator::Equal, value.into())
}

/// `path <> value`
pub fn not_equals(value: impl Into<Operand>) -> Predicate {
    Predicate::Comparison(ComparisonOperator::NotEqual, value.into())
}

/// `path < value`
pub fn less_than(value: impl Into<Operand>) -> Predicate {
    Predicate::Comparison(ComparisonOperator::LessThan, value.into())
}

/// `path <= value`
pub fn less_than_or_equal(value: impl Into<Operand>) -> Predicate {
    Predicate::Comparison(ComparisonOperator::LessThanOrEqual, value.into())
}

/// `path > value`
pub fn greater_than(value: impl Into<Operand>) -> Predicate {
    Predicate::Comparison(ComparisonOperator::GreaterThan, value.into())
}

/// `path >= value`
pub fn greater_than_or_equal(value: impl Into<Operand>) -> Predicate {
    Predicate::Comparison(ComparisonOperator::GreaterThanOrEqual, value.into())
}

/// `path BETWEEN lower AND upper`
pub fn between(lower: impl Into<Operand>, upper: impl Into<Operand>) -> Predicate {
    Predicate::Between(lower.into(), upper.into())
}

/// `path IN (values)`
pub fn is_in<I>(values: I) -> Predicate
where
    I: IntoIterator,
    I::Item: Into<Operand>,
{
    Predicate::In(values.into_iter().map(Into::into).collect())
}

/// `attribute_exists(path)`
pub fn exists() -> Predicate {
    Predicate::Exists { negate: false }
}

/// `attribute_not_exists(path)`
pub fn not_exists() -> Predicate {
    Predicate::Exists { negate: true }
}

/// `attribute_type(path, type)`
pub fn attribute_type(attribute_type: AttributeType) -> Predicate {
    Predicate::Type(attribute_type)
}

/// `begins_with(path, prefix)`
pub fn begins_with(prefix: impl Into<Literal>) -> Predicate {
    Predicate::BeginsWith(prefix.into())
}

/// `contains(path, value)`
pub fn contains(value: impl Into<Literal>) -> Predicate {
    Predicate::Contains(value.into())
}

/// `size(path)`, usable in any value position.
pub fn size(path: impl Into<String>) -> Operand {
    Operand::Size(path.into())
}

/// Test `size(path)` instead of the attribute: `size_of(greater_than(3))`.
///
/// Only comparison, `BETWEEN` and `IN` predicates apply to a size.
pub fn size_of(predicate: Predicate) -> Predicate {
    Predicate::Size(Box::new(predicate))
}

/// All conditions must hold.
pub fn and<I>(conditions: I) -> Expression
where
    I: IntoIterator,
    I::Item: Into<Condition>,
{
    Expression::Logical {
        operator: LogicalOperator::And,
        conditions: conditions.into_iter().map(Into::into).collect(),
    }
}

/// At least one condition must hold.
pub fn or<I>(conditions: I) -> Expression
where
    I: IntoIterator,
    I::Item: Into<Condition>,
{
    Expression::Logical {
        operator: LogicalOperator::Or,
        conditions: conditions.into_iter().map(Into::into).collect(),
    }
}

/// The condition must not hold.
pub fn not(condition: impl Into<Condition>) -> Expression {
    Expression::Not(Box::new(condition.into()))
}
