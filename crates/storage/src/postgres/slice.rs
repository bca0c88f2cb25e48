//! Windowing clauses for connection slice queries.
//!
//! The pagination core hands adapters a structured [`Slice`]; this module
//! turns it into the SQL tail every slice query shares: exclusive boundary
//! predicates, a total ORDER BY with the key tie-break, and the peek-ahead
//! LIMIT. Keeping the translation here means no repository assembles
//! window SQL from string templates.
//!
//! SAFETY: This dynamic SQL is safe from injection because:
//! 1. Table and column names come from hardcoded per-field mappings,
//!    never from user input
//! 2. Comparison operators and directions come from enums
//! 3. Cursor keys are bound as parameters, never interpolated

use tracker_core::ports::{OrderDirection, Slice};

/// The SQL fragments of one windowed slice query.
pub(crate) struct WindowClauses {
    /// Boundary predicates to AND into the WHERE clause.
    pub conditions: Vec<String>,
    /// Cursor keys to bind, in order, after the caller's own parameters.
    pub binds: Vec<String>,
    /// Complete ORDER BY clause, including the key tie-break.
    pub order_by: String,
    /// Number of rows to fetch, including the peek-ahead row.
    pub limit: i64,
}

/// Build the windowing clauses for a slice over `table`.
///
/// `column` is the mapped order column; `prefix` qualifies columns when the
/// query joins other tables (e.g. `"d."`); `first_param` is the ordinal of
/// the first placeholder available to this builder.
///
/// The boundary rows are looked up by key in a row-valued subquery, so the
/// comparison covers the order column and the key together; a boundary key
/// that no longer exists selects nothing, matching the cursor contract that
/// stale positions never resurface deleted records.
pub(crate) fn window_clauses<F: Copy>(
    table: &str,
    column: &str,
    prefix: &str,
    slice: &Slice<F>,
    first_param: usize,
) -> WindowClauses {
    // Boundaries are expressed in presentation order: with a descending
    // presentation, "after" means smaller values.
    let (after_op, before_op) = match slice.order.direction {
        OrderDirection::Asc => (">", "<"),
        OrderDirection::Desc => ("<", ">"),
    };

    let mut conditions = Vec::new();
    let mut binds = Vec::new();
    let mut param = first_param;

    if let Some(key) = &slice.after_key {
        conditions.push(boundary(table, column, prefix, after_op, param));
        binds.push(key.clone());
        param += 1;
    }
    if let Some(key) = &slice.before_key {
        conditions.push(boundary(table, column, prefix, before_op, param));
        binds.push(key.clone());
    }

    let fetch_direction = if slice.from_end {
        slice.order.direction.reversed()
    } else {
        slice.order.direction
    };
    let dir = match fetch_direction {
        OrderDirection::Asc => "ASC",
        OrderDirection::Desc => "DESC",
    };

    WindowClauses {
        conditions,
        binds,
        order_by: format!(
            "ORDER BY {p}{col} {dir}, {p}key {dir}",
            p = prefix,
            col = column,
            dir = dir
        ),
        limit: i64::from(slice.limit),
    }
}

fn boundary(table: &str, column: &str, prefix: &str, op: &str, param: usize) -> String {
    format!(
        "({p}{col}, {p}key) {op} (SELECT {col}, key FROM {table} WHERE key = ${n})",
        p = prefix,
        col = column,
        op = op,
        table = table,
        n = param
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::ports::OrderSpec;

    #[derive(Debug, Clone, Copy)]
    struct F;

    fn slice(
        direction: OrderDirection,
        after: Option<&str>,
        before: Option<&str>,
        from_end: bool,
    ) -> Slice<F> {
        Slice {
            order: OrderSpec {
                field: F,
                direction,
            },
            after_key: after.map(String::from),
            before_key: before.map(String::from),
            from_end,
            limit: 21,
        }
    }

    #[test]
    fn forward_ascending_window() {
        let w = window_clauses(
            "domains",
            "domain",
            "",
            &slice(OrderDirection::Asc, Some("k1"), None, false),
            1,
        );
        assert_eq!(
            w.conditions,
            vec!["(domain, key) > (SELECT domain, key FROM domains WHERE key = $1)"]
        );
        assert_eq!(w.binds, vec!["k1"]);
        assert_eq!(w.order_by, "ORDER BY domain ASC, key ASC");
        assert_eq!(w.limit, 21);
    }

    #[test]
    fn descending_presentation_flips_the_operators() {
        let w = window_clauses(
            "domains",
            "last_ran",
            "",
            &slice(OrderDirection::Desc, Some("k1"), Some("k2"), false),
            3,
        );
        assert_eq!(
            w.conditions,
            vec![
                "(last_ran, key) < (SELECT last_ran, key FROM domains WHERE key = $3)",
                "(last_ran, key) > (SELECT last_ran, key FROM domains WHERE key = $4)",
            ]
        );
        assert_eq!(w.binds, vec!["k1", "k2"]);
        assert_eq!(w.order_by, "ORDER BY last_ran DESC, key DESC");
    }

    // Le sens de parcours s'inverse pour `last`, pas les bornes
    #[test]
    fn from_end_reverses_the_fetch_order_only() {
        let w = window_clauses(
            "scans",
            "scanned_at",
            "",
            &slice(OrderDirection::Asc, None, Some("k9"), true),
            2,
        );
        assert_eq!(
            w.conditions,
            vec!["(scanned_at, key) < (SELECT scanned_at, key FROM scans WHERE key = $2)"]
        );
        assert_eq!(w.order_by, "ORDER BY scanned_at DESC, key DESC");
    }

    #[test]
    fn joined_queries_qualify_their_columns() {
        let w = window_clauses(
            "domains",
            "domain",
            "d.",
            &slice(OrderDirection::Asc, Some("k1"), None, false),
            2,
        );
        assert_eq!(
            w.conditions,
            vec!["(d.domain, d.key) > (SELECT domain, key FROM domains WHERE key = $2)"]
        );
        assert_eq!(w.order_by, "ORDER BY d.domain ASC, d.key ASC");
    }

    #[test]
    fn unbounded_window_has_no_conditions() {
        let w = window_clauses(
            "organizations",
            "name",
            "",
            &slice(OrderDirection::Asc, None, None, false),
            1,
        );
        assert!(w.conditions.is_empty());
        assert!(w.binds.is_empty());
    }
}
