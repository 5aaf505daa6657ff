//! Common building blocks shared by every compiler.
//!
//! This module provides the placeholder table all compilers write through, the
//! literal values bound to value placeholders, and attribute path rendering,
//! together with the condition and projection compilers.

/// Generate `From<scalar>` conversions for a type wrapping a [`literal::Literal`].
macro_rules! impl_from_scalars {
    ($target:ty, $literal:ident => $into:expr) => {
        $crate::common::impl_from_scalars!(
            @impl $target, $literal => $into;
            ::aws_sdk_dynamodb::types::AttributeValue,
            ::aws_sdk_dynamodb::primitives::Blob,
            String, &str, bool,
            i8, i16, i32, i64, i128, isize,
            u8, u16, u32, u64, u128, usize,
            f32, f64
        );
    };
    (@impl $target:ty, $literal:ident => $into:expr; $($scalar:ty),*) => {
        $(
            impl From<$scalar> for $target {
                fn from(value: $scalar) -> Self {
                    let $literal = $crate::common::literal::Literal::from(value);
                    $into
                }
            }
        )*
    };
}

pub(crate) use impl_from_scalars;

/// Condition expression building for conditional writes, key conditions and filters.
pub mod condition;

/// Literal values bound to value placeholders.
pub mod literal;

/// Placeholder allocation shared by every compiler.
pub mod placeholder;

/// Attribute selection for projection expressions.
pub mod projection;

use crate::error::{Error, Result};

/// Separator for attribute path components.
pub(crate) const PATH_SEPARATOR: &str = ".";

/// An expression together with the table holding its placeholders.
#[derive(Clone, Debug, Default)]
pub struct CompiledExpression {
    /// The rendered expression.
    pub expression: String,
    /// Every placeholder the expression references.
    pub table: placeholder::PlaceholderTable,
}

impl CompiledExpression {
    /// The attribute maps to send alongside [`expression`](Self::expression).
    pub fn expression_attributes(&self) -> placeholder::ExpressionAttributes {
        self.table.to_expression_attributes()
    }
}

/// Split a path segment into its attribute name and trailing `[n]` suffixes.
fn split_segment<'a>(path: &str, segment: &'a str) -> Result<(&'a str, &'a str)> {
    let mut name_end = segment.len();
    while segment[..name_end].ends_with(']') {
        let close = name_end - 1;
        let open = segment[..close]
            .rfind('[')
            .ok_or_else(|| Error::invalid_path(path, format!("unbalanced `]` in `{segment}`")))?;
        let index = &segment[open + 1..close];
        if index.is_empty() || !index.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(Error::invalid_path(
                path,
                format!("list index `{index}` is not a non-negative integer"),
            ));
        }
        name_end = open;
    }
    let name = &segment[..name_end];
    if name.is_empty() {
        return Err(Error::invalid_path(path, "empty attribute name"));
    }
    Ok((name, &segment[name_end..]))
}

/// Render an attribute path, allocating one name placeholder per segment.
///
/// `a.b[0]` becomes `#a.#b[0]`: list indexes are kept verbatim.
pub(crate) fn render_path(
    path: &str,
    table: &mut placeholder::PlaceholderTable,
) -> Result<String> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "empty path"));
    }
    let mut segments = Vec::new();
    for segment in path.split(PATH_SEPARATOR) {
        let (name, suffix) = split_segment(path, segment)?;
        let placeholder = table.add_name(name);
        segments.push(format!("{placeholder}{suffix}"));
    }
    Ok(segments.join(PATH_SEPARATOR))
}

/// Path-derived value placeholder: `a.b[0]` becomes `:a_b_0`.
pub(crate) fn path_value_placeholder(path: &str) -> String {
    let flattened = path.replace('[', "_").replace(']', "");
    format!(
        "{}{}",
        placeholder::VALUE_PREFIX,
        placeholder::sanitize(&flattened)
    )
}
