use crate::common::{self, placeholder::PlaceholderTable};
use crate::error::{Error, Result};

use indexmap::IndexSet;

/// Separator between projected paths.
const PROJECTION_SEPARATOR: &str = ", ";

/// Attribute paths to return from a read.
///
/// Duplicates are dropped when compiling; the first occurrence keeps its place.
///
/// ```rust
/// use dynamodb_expressions::common::projection::Projection;
///
/// let projection = Projection::from(["id", "items[0]", "items[1]", "id"]);
/// let compiled = projection.compile().unwrap();
/// assert_eq!(compiled.expression, "#id, #items[0], #items[1]");
/// assert_eq!(compiled.table.name_count(), 2);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Projection(Vec<String>);

impl Projection {
    /// Append a path.
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.0.push(path.into());
        self
    }

    /// The paths as given, duplicates included.
    pub fn paths(&self) -> &[String] {
        &self.0
    }

    /// `true` when no path is projected.
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
    ///
    /// An empty projection renders as an empty string and leaves the table untouched.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expressions.projection", skip(table), err)
    )]
    pub fn compile_with(&self, table: &mut PlaceholderTable) -> Result<String> {
        let paths: IndexSet<&str> = self.0.iter().map(String::as_str).collect();
        let mut rendered = Vec::with_capacity(paths.len());
        for path in paths {
            rendered.push(common::render_path(path, table)?);
        }
        Ok(rendered.join(PROJECTION_SEPARATOR))
    }
}

impl<S: Into<String>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(paths: I) -> Self {
        Self(paths.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> From<Vec<S>> for Projection {
    fn from(paths: Vec<S>) -> Self {
        paths.into_iter().collect()
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Projection {
    fn from(paths: [S; N]) -> Self {
        paths.into_iter().collect()
    }
}

impl TryFrom<Projection> for common::CompiledExpression {
    type Error = Error;

    fn try_from(projection: Projection) -> Result<Self> {
        projection.compile()
    }
}
