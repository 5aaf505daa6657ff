#![doc(
    html_logo_url = "https://raw.githubusercontent.com/dariocurr/dynamodb-expressions/main/assets/logo.png",
    html_favicon_url = "https://raw.githubusercontent.com/dariocurr/dynamodb-expressions/main/assets/logo.png"
)]
#![deny(missing_docs)]
#![deny(warnings)]

//! # DynamoDB Expressions
//!
//! A typed compiler from structured conditions, updates and projections to Amazon
//! DynamoDB expressions.
//!
//! ## Overview
//!
//! DynamoDB requests carry their logic as strings (`ConditionExpression`,
//! `UpdateExpression`, `ProjectionExpression`, ...) plus two side-tables mapping
//! `#name` and `:value` placeholders to the real attribute names and values.
//! This library lets you describe that logic as data and:
//! - Allocates placeholders for you, reusing one placeholder per distinct name and value
//! - Parenthesizes nested logical expressions so precedence survives rendering
//! - Supports nested (`a.b`) and indexed (`items[0]`) attribute paths everywhere
//! - Shares one placeholder namespace across every expression of a request
//!
//! ## Quick Example
//!
//! ```rust
//! use dynamodb_expressions::{
//!     common::condition::{self, Condition, Template},
//!     request::ExpressionBuilder,
//!     update::{self, Update},
//! };
//!
//! // Only bump the version of active items that have not been archived.
//! let condition = Condition::from(condition::and([
//!     Condition::from(Template::from([("status", "active")])),
//!     Condition::from(condition::not(Template::from([("archived", condition::exists())]))),
//! ]));
//! let update = Update::default()
//!     .with("version", update::add(1))
//!     .with("draft", update::remove());
//! let expressions = ExpressionBuilder::default()
//!     .condition(&condition)
//!     .unwrap()
//!     .update(&update)
//!     .unwrap()
//!     .build();
//! assert_eq!(
//!     expressions.condition_expression.as_deref(),
//!     Some("#status = :v1 AND NOT (attribute_exists(#archived))")
//! );
//! assert_eq!(
//!     expressions.update_expression.as_deref(),
//!     Some("SET #version = #version + :version REMOVE #draft")
//! );
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Placeholder table, literals, conditions and projections
//! - [`mod@update`] - Update expressions (SET, REMOVE, ADD, DELETE)
//! - [`mod@request`] - Assembling the expressions of one request onto AWS SDK builders

/// Common utilities for placeholders, literals, conditions and projections.
pub mod common;

/// Error type shared by every compiler.
pub mod error;

/// Request assembly on top of the AWS SDK builders.
pub mod request;

/// Update expression building.
pub mod update;

pub use error::{Error, Result};
