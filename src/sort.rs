//! Client controlled sorting of list queries.
//!
//! A requested sort token such as `price` or `-date` ends up in the `ORDER BY`
//! clause of a query, so it is only usable once it has been matched against a
//! fixed safelist. [ValidatedSort::validate] is the only way to build a
//! [ValidatedSort], and only a [ValidatedSort] can be resolved into the
//! [CompiledSort] that the stores accept. The column in a [CompiledSort] is
//! always borrowed from the safelist, never from the request.

use crate::validation::Violations;

/// The tokens a client may sort by. Each token may be prefixed with `-` to sort in descending
/// order, and that prefixed token must be listed too.
pub type Safelist = &'static [&'static str];

/// The sort tokens accepted when listing payments.
///
/// The column names match the result column aliases of the payment list query.
pub const PAYMENT_SORT_SAFELIST: Safelist = &[
    "id",
    "name",
    "payment_type",
    "date",
    "category_name",
    "price",
    "-id",
    "-name",
    "-payment_type",
    "-date",
    "-category_name",
    "-price",
];

/// The default sort token for listings.
pub const DEFAULT_SORT: &str = "id";

/// The direction to order rows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

impl SortDirection {
    /// The SQL keyword for the direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A sort token that is known to be in a safelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedSort {
    token: &'static str,
}

impl ValidatedSort {
    /// Check that `requested` is one of the tokens in `safelist`.
    ///
    /// # Errors
    /// Returns [Violations] for the field `sort` if `requested` is not in the safelist.
    pub fn validate(requested: &str, safelist: Safelist) -> Result<Self, Violations> {
        safelist
            .iter()
            .copied()
            .find(|token| *token == requested)
            .map(|token| Self { token })
            .ok_or_else(|| Violations::single("sort", "invalid sort value"))
    }

    /// Split the token into the column to sort by and the sort direction.
    pub fn resolve(self) -> CompiledSort {
        match self.token.strip_prefix('-') {
            Some(column) => CompiledSort {
                column,
                direction: SortDirection::Descending,
            },
            None => CompiledSort {
                column: self.token,
                direction: SortDirection::Ascending,
            },
        }
    }
}

/// A column and direction that are safe to interpolate into a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledSort {
    column: &'static str,
    direction: SortDirection,
}

impl CompiledSort {
    /// The `<column> <direction>` part of an `ORDER BY` clause.
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.direction.as_sql())
    }
}
