//! Relay-style cursor pagination over an injected query source.
//!
//! [`Paginator`] turns an ordering, a validated window, and a
//! [`ConnectionSource`] into a [`Connection`]: validate arguments, decode
//! boundary cursors, count, fetch one windowed slice with a peek-ahead row,
//! and assemble edges and page info. The source owns the actual query
//! execution; the paginator owns the contract.
//!
//! A paginator is a pure function of its arguments and the source's results.
//! It keeps no state across calls.

use async_trait::async_trait;
use tracing::{error, warn};

use crate::error::{ConnectionError, ConnectionResult, FetchError, FetchResult, ValidationError};
use crate::metrics::{QueryTimer, record_connection_query};
use crate::models::{Keyed, Viewer};

use super::cursor;
use super::page_args::{PageArgs, WindowAnchor, validate};

// =============================================================================
// Ordering
// =============================================================================

/// Ordering direction for connection queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl OrderDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            OrderDirection::Asc => OrderDirection::Desc,
            OrderDirection::Desc => OrderDirection::Asc,
        }
    }
}

/// Ordering specification: a connection-specific field plus a direction.
///
/// Equal primary values are always tie-broken by the record key in the same
/// direction, so the presentation order is total and reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec<F> {
    pub field: F,
    pub direction: OrderDirection,
}

// =============================================================================
// Connection Shape
// =============================================================================

/// A single record in a paginated result, with its position cursor.
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The record itself.
    pub node: T,
    /// Opaque cursor marking this record's position.
    pub cursor: String,
}

/// Information about the current page in a paginated result.
///
/// Cursors are empty strings when the page has no edges; this shape is a
/// compatibility contract with the API schema and must not change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Whether records exist after this page.
    pub has_next_page: bool,
    /// Whether records exist before this page.
    pub has_previous_page: bool,
    /// Cursor of the first edge, or empty.
    pub start_cursor: String,
    /// Cursor of the last edge, or empty.
    pub end_cursor: String,
}

/// Paginated result set in the Relay connection shape.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// Edges in ascending presentation order.
    pub edges: Vec<Edge<T>>,
    /// Information about the current page.
    pub page_info: PageInfo,
    /// Total records matching the connection's filter, ignoring the window.
    pub total_count: u64,
}

impl<T> Connection<T> {
    /// The canonical empty connection.
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }
}

// =============================================================================
// Source Seam
// =============================================================================

/// One windowed slice request handed to a [`ConnectionSource`].
///
/// The source must order records by `(order.field, key)` with the direction
/// applied to the whole pair, treat `after_key`/`before_key` as exclusive
/// boundaries in that presentation order, and return at most `limit` rows.
/// When `from_end` is set the rows are fetched from the far end (reversed
/// order) and returned in that fetch order; the paginator flips the page
/// back before emitting edges.
#[derive(Debug, Clone)]
pub struct Slice<F> {
    /// Requested ordering.
    pub order: OrderSpec<F>,
    /// Key decoded from the `after` cursor, if any.
    pub after_key: Option<String>,
    /// Key decoded from the `before` cursor, if any.
    pub before_key: Option<String>,
    /// Whether the window anchors at the end of the ordered set (`last`).
    pub from_end: bool,
    /// Number of rows to fetch, already including the peek-ahead row.
    pub limit: u32,
}

/// An ordered, filtered set of records that can be counted and sliced.
///
/// Implementations live in the storage layer and translate [`Slice`]
/// parameters into backend queries. The paginator only ever calls `total`
/// once and `slice` at most once per page.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Record type produced by this source.
    type Node: Keyed + Send;
    /// Order-field enum for this connection type.
    type Field: Copy + Send + Sync;

    /// Display name of the connection, used in user-facing error messages.
    fn name(&self) -> &'static str;

    /// User-facing subject for the generic failure message
    /// ("Unable to load {subject}. Please try again.").
    fn subject(&self) -> &'static str;

    /// Cursor type tag of the backing collection; cursors carrying any other
    /// tag are rejected before a query runs.
    fn type_tag(&self) -> &'static str;

    /// Root identifier for diagnostics (e.g. the claiming organization key).
    fn root(&self) -> Option<&str> {
        None
    }

    /// Count all records matching the connection's filter, ignoring the window.
    async fn total(&self) -> FetchResult<u64>;

    /// Fetch one windowed slice. See [`Slice`] for the ordering contract.
    async fn slice(&self, slice: &Slice<Self::Field>) -> FetchResult<Vec<Self::Node>>;

    /// Attach denormalized parent-reference fields to fetched records.
    ///
    /// Pure post-processing; runs after the slice is truncated and flipped
    /// into presentation order.
    fn decorate(&self, _nodes: &mut [Self::Node]) {}
}

// =============================================================================
// Paginator
// =============================================================================

/// Produces one [`Connection`] page from a [`ConnectionSource`].
pub struct Paginator<'a, S: ConnectionSource> {
    source: &'a S,
    viewer: Viewer,
}

impl<'a, S: ConnectionSource> Paginator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            viewer: Viewer::anonymous(),
        }
    }

    /// Attach the acting user for diagnostics.
    pub fn for_viewer(mut self, viewer: &Viewer) -> Self {
        self.viewer = viewer.clone();
        self
    }

    /// Compute one page of the connection.
    ///
    /// Validation failures short-circuit before any query executes. Source
    /// failures are logged with their root cause and surfaced as the generic
    /// [`ConnectionError::Unavailable`]. The result is all-or-nothing; no
    /// partial connection is ever returned.
    pub async fn paginate(
        &self,
        order: OrderSpec<S::Field>,
        args: &PageArgs,
    ) -> ConnectionResult<Connection<S::Node>> {
        let window = validate(self.source.name(), args)?;
        let after_key = self.decode_boundary(args.after.as_deref())?;
        let before_key = self.decode_boundary(args.before.as_deref())?;

        record_connection_query(self.source.name());
        let _timer = QueryTimer::new(self.source.name());

        let total = self
            .source
            .total()
            .await
            .map_err(|e| self.unavailable("count", e))?;

        // No records match the connection's filter at all: the windowed
        // query is skipped entirely.
        if total == 0 {
            return Ok(Connection::empty());
        }

        let from_end = window.anchor == WindowAnchor::End;
        let slice = Slice {
            order,
            after_key,
            before_key,
            from_end,
            limit: window.limit.saturating_add(1),
        };

        let mut rows = self
            .source
            .slice(&slice)
            .await
            .map_err(|e| self.unavailable("slice", e))?;

        // Peek-ahead: one row beyond the requested size signals more records
        // on the fetch side of the window.
        let has_more = rows.len() > window.limit as usize;
        rows.truncate(window.limit as usize);
        if from_end {
            rows.reverse();
        }
        self.source.decorate(&mut rows);

        let tag = self.source.type_tag();
        let edges: Vec<Edge<S::Node>> = rows
            .into_iter()
            .map(|node| Edge {
                cursor: cursor::encode(tag, node.key()),
                node,
            })
            .collect();

        let (has_next_page, has_previous_page) = if from_end {
            (args.before.is_some(), has_more)
        } else {
            (has_more, args.after.is_some())
        };

        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()).unwrap_or_default(),
            end_cursor: edges.last().map(|e| e.cursor.clone()).unwrap_or_default(),
        };

        Ok(Connection {
            edges,
            page_info,
            total_count: total,
        })
    }

    fn decode_boundary(&self, cursor: Option<&str>) -> Result<Option<String>, ValidationError> {
        let Some(raw) = cursor else { return Ok(None) };
        cursor::decode_for(self.source.name(), self.source.type_tag(), raw)
            .map(Some)
            .map_err(|err| {
                warn!(
                    connection = self.source.name(),
                    error = %err,
                    "rejected pagination cursor"
                );
                err
            })
    }

    fn unavailable(&self, stage: &'static str, err: FetchError) -> ConnectionError {
        error!(
            connection = self.source.name(),
            user = self.viewer.log_key(),
            root = self.source.root().unwrap_or("-"),
            kind = err.kind(),
            stage = stage,
            error = %err,
            "connection query failed"
        );
        ConnectionError::Unavailable {
            subject: self.source.subject().to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: String,
        name: String,
        claimed_by: Option<String>,
    }

    impl Item {
        fn new(key: &str, name: &str) -> Self {
            Self {
                key: key.to_string(),
                name: name.to_string(),
                claimed_by: None,
            }
        }
    }

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.key
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum ItemField {
        Name,
    }

    /// In-memory reference implementation of the slice contract.
    struct MemSource {
        rows: Vec<Item>,
        root: Option<String>,
        fail: Option<FetchError>,
        total_calls: AtomicUsize,
        slice_calls: AtomicUsize,
    }

    impl MemSource {
        fn new(rows: Vec<Item>) -> Self {
            Self {
                rows,
                root: None,
                fail: None,
                total_calls: AtomicUsize::new(0),
                slice_calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: FetchError) -> Self {
            let mut src = Self::new(vec![Item::new("a", "a")]);
            src.fail = Some(err);
            src
        }
    }

    #[async_trait]
    impl ConnectionSource for MemSource {
        type Node = Item;
        type Field = ItemField;

        fn name(&self) -> &'static str {
            "Domain"
        }

        fn subject(&self) -> &'static str {
            "domains"
        }

        fn type_tag(&self) -> &'static str {
            "domains"
        }

        fn root(&self) -> Option<&str> {
            self.root.as_deref()
        }

        async fn total(&self) -> FetchResult<u64> {
            self.total_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            Ok(self.rows.len() as u64)
        }

        async fn slice(&self, slice: &Slice<ItemField>) -> FetchResult<Vec<Item>> {
            self.slice_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }

            let ItemField::Name = slice.order.field;
            let mut sorted: Vec<Item> = self.rows.clone();
            sorted.sort_by(|a, b| (&a.name, &a.key).cmp(&(&b.name, &b.key)));
            if slice.order.direction == OrderDirection::Desc {
                sorted.reverse();
            }

            // Exclusive boundaries in presentation order; a boundary key that
            // no longer exists selects nothing, like the backing store.
            fn position(sorted: &[Item], key: &Option<String>) -> Result<Option<usize>, ()> {
                match key {
                    None => Ok(None),
                    Some(k) => sorted
                        .iter()
                        .position(|n| &n.key == k)
                        .map(Some)
                        .ok_or(()),
                }
            }
            let (after, before) = match (
                position(&sorted, &slice.after_key),
                position(&sorted, &slice.before_key),
            ) {
                (Ok(a), Ok(b)) => (a, b),
                _ => return Ok(Vec::new()),
            };

            let windowed: Vec<Item> = sorted
                .into_iter()
                .enumerate()
                .filter(|(i, _)| after.is_none_or(|p| *i > p) && before.is_none_or(|p| *i < p))
                .map(|(_, n)| n)
                .collect();

            let limit = slice.limit as usize;
            if slice.from_end {
                Ok(windowed.into_iter().rev().take(limit).collect())
            } else {
                Ok(windowed.into_iter().take(limit).collect())
            }
        }

        fn decorate(&self, nodes: &mut [Item]) {
            if let Some(root) = &self.root {
                for node in nodes {
                    node.claimed_by = Some(root.clone());
                }
            }
        }
    }

    fn abc_source() -> MemSource {
        MemSource::new(vec![
            Item::new("b", "bravo"),
            Item::new("a", "alpha"),
            Item::new("c", "charlie"),
        ])
    }

    fn asc() -> OrderSpec<ItemField> {
        OrderSpec {
            field: ItemField::Name,
            direction: OrderDirection::Asc,
        }
    }

    fn keys<T: Keyed>(conn: &Connection<T>) -> Vec<String> {
        conn.edges.iter().map(|e| e.node.key().to_string()).collect()
    }

    #[tokio::test]
    async fn first_page_of_three() {
        let source = abc_source();
        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(2))
            .await
            .unwrap();

        assert_eq!(keys(&conn), vec!["a", "b"]);
        assert_eq!(conn.total_count, 3);
        assert!(conn.page_info.has_next_page);
        assert!(!conn.page_info.has_previous_page);
        assert_eq!(conn.page_info.start_cursor, cursor::encode("domains", "a"));
        assert_eq!(conn.page_info.end_cursor, cursor::encode("domains", "b"));
    }

    #[tokio::test]
    async fn second_page_after_end_cursor() {
        let source = abc_source();
        let first = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(2))
            .await
            .unwrap();

        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(2).after(first.page_info.end_cursor))
            .await
            .unwrap();

        assert_eq!(keys(&conn), vec!["c"]);
        assert!(!conn.page_info.has_next_page);
        assert!(conn.page_info.has_previous_page);
    }

    // Parcourir avec first:N visite chaque enregistrement exactement une fois
    #[tokio::test]
    async fn forward_walk_visits_every_record_once() {
        let rows: Vec<Item> = (0..7)
            .map(|i| Item::new(&format!("k{}", i), &format!("name{}", i)))
            .collect();
        let source = MemSource::new(rows);

        let mut seen = Vec::new();
        let mut pages = 0;
        let mut args = PageArgs::first(3);
        loop {
            let conn = Paginator::new(&source).paginate(asc(), &args).await.unwrap();
            pages += 1;
            seen.extend(keys(&conn));
            if !conn.page_info.has_next_page {
                break;
            }
            args = PageArgs::first(3).after(conn.page_info.end_cursor);
        }

        assert_eq!(pages, 3); // ceil(7 / 3)
        assert_eq!(seen.len(), 7);
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 7);
    }

    #[tokio::test]
    async fn last_page_matches_tail_of_forward_walk() {
        let rows: Vec<Item> = (0..5)
            .map(|i| Item::new(&format!("k{}", i), &format!("name{}", i)))
            .collect();
        let source = MemSource::new(rows);

        let tail = Paginator::new(&source)
            .paginate(asc(), &PageArgs::last(2))
            .await
            .unwrap();

        // Forward: pages of 2 end at the same final page, ascending.
        assert_eq!(keys(&tail), vec!["k3", "k4"]);
        assert!(!tail.page_info.has_next_page);
        assert!(tail.page_info.has_previous_page);
    }

    #[tokio::test]
    async fn backward_paging_before_a_cursor() {
        let source = abc_source();
        let conn = Paginator::new(&source)
            .paginate(
                asc(),
                &PageArgs::last(1).before(cursor::encode("domains", "c")),
            )
            .await
            .unwrap();

        assert_eq!(keys(&conn), vec!["b"]);
        assert!(conn.page_info.has_previous_page);
        assert!(conn.page_info.has_next_page);
    }

    #[tokio::test]
    async fn window_bounded_on_both_sides() {
        let source = abc_source();
        let conn = Paginator::new(&source)
            .paginate(
                asc(),
                &PageArgs::first(10)
                    .after(cursor::encode("domains", "a"))
                    .before(cursor::encode("domains", "c")),
            )
            .await
            .unwrap();

        assert_eq!(keys(&conn), vec!["b"]);
        assert!(!conn.page_info.has_next_page);
        assert!(conn.page_info.has_previous_page);
    }

    #[tokio::test]
    async fn descending_order_pages_from_the_top() {
        let source = abc_source();
        let order = OrderSpec {
            field: ItemField::Name,
            direction: OrderDirection::Desc,
        };

        let conn = Paginator::new(&source)
            .paginate(order, &PageArgs::first(2))
            .await
            .unwrap();
        assert_eq!(keys(&conn), vec!["c", "b"]);

        let conn = Paginator::new(&source)
            .paginate(order, &PageArgs::first(2).after(conn.page_info.end_cursor))
            .await
            .unwrap();
        assert_eq!(keys(&conn), vec!["a"]);
        assert!(!conn.page_info.has_next_page);
    }

    #[tokio::test]
    async fn equal_order_values_tie_break_by_key() {
        let source = MemSource::new(vec![
            Item::new("z", "same"),
            Item::new("m", "same"),
            Item::new("a", "same"),
        ]);

        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(2))
            .await
            .unwrap();
        assert_eq!(keys(&conn), vec!["a", "m"]);

        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(2).after(conn.page_info.end_cursor))
            .await
            .unwrap();
        assert_eq!(keys(&conn), vec!["z"]);
    }

    // Test critique: racine vide => aucun slice exécuté
    #[tokio::test]
    async fn empty_root_short_circuits() {
        let source = MemSource::new(Vec::new());
        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(10))
            .await
            .unwrap();

        assert!(conn.edges.is_empty());
        assert_eq!(conn.total_count, 0);
        assert_eq!(conn.page_info, PageInfo::default());
        assert_eq!(conn.page_info.start_cursor, "");
        assert_eq!(conn.page_info.end_cursor, "");
        assert_eq!(source.total_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.slice_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_failure_runs_no_query() {
        let source = abc_source();
        let err = Paginator::new(&source)
            .paginate(asc(), &PageArgs::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectionError::Validation(ValidationError::NoLimitSupplied { .. })
        ));
        assert_eq!(source.total_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.slice_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn foreign_cursor_rejected_before_any_query() {
        let source = abc_source();
        let err = Paginator::new(&source)
            .paginate(
                asc(),
                &PageArgs::first(2).after(cursor::encode("scans", "scans/1")),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectionError::Validation(ValidationError::CursorTypeMismatch { .. })
        ));
        assert_eq!(source.total_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn source_failure_surfaces_the_generic_message() {
        let source = MemSource::failing(FetchError::Query("pg down".into()));
        let err = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(2))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unable to load domains. Please try again.");
        assert!(!err.to_string().contains("pg down"));
    }

    #[tokio::test]
    async fn cursor_failure_surfaces_the_same_message() {
        let source = MemSource::failing(FetchError::Cursor("row 3 decode".into()));
        let err = Paginator::new(&source)
            .for_viewer(&Viewer::known("users/42"))
            .paginate(asc(), &PageArgs::first(2))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unable to load domains. Please try again.");
    }

    #[tokio::test]
    async fn decorate_injects_the_parent_reference() {
        let mut source = abc_source();
        source.root = Some("organizations/77".into());

        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(3))
            .await
            .unwrap();

        assert!(
            conn.edges
                .iter()
                .all(|e| e.node.claimed_by.as_deref() == Some("organizations/77"))
        );
    }

    #[tokio::test]
    async fn zero_limit_returns_an_empty_page_with_peek() {
        let source = abc_source();
        let conn = Paginator::new(&source)
            .paginate(asc(), &PageArgs::first(0))
            .await
            .unwrap();

        assert!(conn.edges.is_empty());
        assert!(conn.page_info.has_next_page);
        assert_eq!(conn.page_info.start_cursor, "");
        assert_eq!(conn.total_count, 3);
    }
}
