use super::compile::Preload;
use crate::sql::Fragment;

/// The execution boundary a compiled query is applied to.
///
/// The compiler never executes anything; it only calls these methods in a
/// fixed order (eager-loads, joins, selection, filter, pagination, ordering).
/// Implementations either record the calls (see
/// [`SelectBuilder`](super::SelectBuilder)) or forward them to a driver.
pub trait QueryHandle: Sized {
    /// Restricts the selected columns
    fn select(self, columns: &[String]) -> Self;

    /// Drops columns from the result
    fn omit(self, columns: &[String]) -> Self;

    /// Adds one or more `INNER JOIN ... ON ...` clauses
    fn inner_join(self, join: &str) -> Self;

    /// Adds a WHERE condition; called once per non-empty condition group
    fn filter(self, condition: Fragment) -> Self;

    /// Adds one rendered `"table"."column" DIR` term
    fn order(self, term: &str) -> Self;

    fn limit(self, limit: u64) -> Self;

    fn offset(self, offset: u64) -> Self;

    /// Requests an eager-load of a relation
    fn preload(self, preload: Preload) -> Self;
}
