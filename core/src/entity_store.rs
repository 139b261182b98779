//! Entity store contract: keyed persistence with ancestor queries and
//! entity-group transactions.
//!
//! # Design
//!
//! The store offers exactly what the conference services consume:
//!
//! - Key allocation under an optional parent
//! - Single and batched lookups
//! - Queries over one kind, optionally scoped to an ancestor, with
//!   property filters and sort orders
//! - Transactions that lock the entities they enlist, buffer writes, and
//!   commit them together (dropping an uncommitted transaction rolls back)
//!
//! Like hosted document stores, a query may range-filter on only one
//! property, and when it does, that property must be the first sort order.
//! [`Query::validate`] enforces this and every implementation calls it.
//!
//! # Implementations
//!
//! - `InMemoryEntityStore` (in `conference-testing`): fast, deterministic,
//!   per-key locking
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` so services can hold an
//! `Arc<dyn EntityStore>`.

use crate::entity::{Entity, Value};
use crate::key::Key;
use futures::Stream;
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed, sendable future used throughout the store traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lazy, finite stream of query results.
pub type EntityStream = Pin<Box<dyn Stream<Item = Result<Entity, EntityStoreError>> + Send>>;

/// Errors that can occur during entity store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityStoreError {
    /// The query cannot be executed with a consistent index order.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A transaction touched a key it did not enlist.
    #[error("Key {key} is not enlisted in the transaction")]
    NotEnlisted {
        /// The offending key
        key: Key,
    },

    /// A stored entity is missing a property or holds the wrong type.
    #[error("Malformed {kind} entity {key}: {reason}")]
    MalformedEntity {
        /// Entity kind
        kind: String,
        /// Entity key
        key: Key,
        /// What was wrong
        reason: String,
    },

    /// The transaction could not be committed; nothing was written.
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Comparison operator of a property filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOp {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `!=`
    Ne,
}

impl FilterOp {
    /// Everything except `=` is an inequality (range) filter.
    #[must_use]
    pub const fn is_inequality(self) -> bool {
        !matches!(self, Self::Eq)
    }

    /// Whether `ordering` (stored value compared to filter value) satisfies
    /// this operator.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::GtEq => !matches!(ordering, Ordering::Less),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::LtEq => !matches!(ordering, Ordering::Greater),
            Self::Ne => !matches!(ordering, Ordering::Equal),
        }
    }

    /// Symbol used in logs and error messages.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Ne => "!=",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `property op value` predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyFilter {
    /// Property name
    pub property: String,
    /// Operator
    pub op: FilterOp,
    /// Right-hand value
    pub value: Value,
}

impl PropertyFilter {
    /// Create a filter.
    #[must_use]
    pub fn new(property: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether `entity` satisfies the filter.
    ///
    /// Entities lacking the property never match. For list properties any
    /// element may satisfy the filter.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        let Some(stored) = entity.get(&self.property) else {
            return false;
        };
        stored
            .scalars()
            .into_iter()
            .filter_map(|v| v.compare(&self.value))
            .any(|ordering| self.op.accepts(ordering))
    }
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.property, self.op, self.value)
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One sort key of a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOrder {
    /// Property to sort on
    pub property: String,
    /// Direction
    pub direction: Direction,
}

impl SortOrder {
    /// Ascending sort on `property`.
    #[must_use]
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Ascending,
        }
    }

    /// Descending sort on `property`.
    #[must_use]
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Descending,
        }
    }
}

/// Query over a single entity kind.
///
/// # Examples
///
/// ```
/// use conference_core::entity_store::{FilterOp, PropertyFilter, Query, SortOrder};
///
/// let query = Query::kind("Conference")
///     .filter(PropertyFilter::new("month", FilterOp::Eq, 6_i64))
///     .filter(PropertyFilter::new("maxAttendees", FilterOp::Gt, 50_i64))
///     .order(SortOrder::ascending("maxAttendees"))
///     .order(SortOrder::ascending("name"));
///
/// assert!(query.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Entity kind
    pub kind: String,
    /// Optional ancestor scope
    pub ancestor: Option<Key>,
    /// Conjunction of filters
    pub filters: Vec<PropertyFilter>,
    /// Sort orders, most significant first
    pub orders: Vec<SortOrder>,
}

impl Query {
    /// Unfiltered query over `kind`.
    #[must_use]
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// Restrict to descendants of `ancestor`.
    #[must_use]
    pub fn ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort order.
    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// The single property carrying inequality filters, if any.
    #[must_use]
    pub fn inequality_property(&self) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.op.is_inequality())
            .map(|f| f.property.as_str())
    }

    /// Check the query can be served from one index scan.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidQuery`] when inequality filters
    /// span more than one property, or when an inequality property is not
    /// the first sort order of a sorted query.
    pub fn validate(&self) -> Result<(), EntityStoreError> {
        let Some(inequality) = self.inequality_property() else {
            return Ok(());
        };
        if let Some(other) = self
            .filters
            .iter()
            .find(|f| f.op.is_inequality() && f.property != inequality)
        {
            return Err(EntityStoreError::InvalidQuery(format!(
                "inequality filters on both '{inequality}' and '{}'",
                other.property
            )));
        }
        match self.orders.first() {
            Some(first) if first.property != inequality => {
                Err(EntityStoreError::InvalidQuery(format!(
                    "first sort order must be the inequality property '{inequality}', found '{}'",
                    first.property
                )))
            },
            _ => Ok(()),
        }
    }

    /// Whether `entity` is selected by this query.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        let key = entity.key();
        key.kind() == self.kind
            && self
                .ancestor
                .as_ref()
                .is_none_or(|ancestor| key.is_descendant_of(ancestor))
            && self
                .orders
                .iter()
                .all(|order| entity.get(&order.property).is_some())
            && self.filters.iter().all(|f| f.matches(entity))
    }

    /// Order two matching entities by this query's sort orders, falling
    /// back to key order so results are deterministic.
    #[must_use]
    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        for order in &self.orders {
            let ordering = match (
                sort_value(a, &order.property),
                sort_value(b, &order.property),
            ) {
                (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.key().cmp(b.key())
    }
}

/// Smallest scalar of a property; list properties sort by their minimum.
fn sort_value<'a>(entity: &'a Entity, property: &str) -> Option<&'a Value> {
    entity
        .get(property)?
        .scalars()
        .into_iter()
        .min_by(|x, y| x.compare(y).unwrap_or(Ordering::Equal))
}

/// Keyed persistence with ancestor queries and entity-group transactions.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; services share one store behind
/// an `Arc`.
pub trait EntityStore: Send + Sync {
    /// Allocate a fresh numeric key of `kind`, optionally under `parent`.
    ///
    /// # Errors
    ///
    /// - `Backend`: allocation failed
    fn allocate_key<'a>(
        &'a self,
        kind: &'a str,
        parent: Option<&'a Key>,
    ) -> BoxFuture<'a, Result<Key, EntityStoreError>>;

    /// Fetch one entity.
    ///
    /// # Errors
    ///
    /// - `Backend`: lookup failed
    fn get<'a>(&'a self, key: &'a Key) -> BoxFuture<'a, Result<Option<Entity>, EntityStoreError>>;

    /// Fetch many entities in one round trip; the result is positionally
    /// aligned with `keys`.
    ///
    /// # Errors
    ///
    /// - `Backend`: lookup failed
    fn get_multi<'a>(
        &'a self,
        keys: &'a [Key],
    ) -> BoxFuture<'a, Result<Vec<Option<Entity>>, EntityStoreError>>;

    /// Insert or replace one entity outside any transaction.
    ///
    /// # Errors
    ///
    /// - `Backend`: write failed
    fn put(&self, entity: Entity) -> BoxFuture<'_, Result<(), EntityStoreError>>;

    /// Run a query, yielding matches lazily in sort order.
    ///
    /// # Errors
    ///
    /// - `InvalidQuery`: the query fails [`Query::validate`]
    /// - `Backend`: the query could not be started
    fn query(&self, query: Query) -> BoxFuture<'_, Result<EntityStream, EntityStoreError>>;

    /// Begin a transaction over the entities named by `keys`.
    ///
    /// Each enlisted key is its own entity group. Concurrent transactions
    /// sharing a key are serialized; transactions over disjoint keys proceed
    /// independently. The keys need not exist yet.
    ///
    /// # Errors
    ///
    /// - `Backend`: locks could not be acquired
    fn begin_transaction<'a>(
        &'a self,
        keys: &'a [Key],
    ) -> BoxFuture<'a, Result<Box<dyn Transaction>, EntityStoreError>>;
}

/// A unit of work over enlisted keys.
///
/// Reads see the committed state of the enlisted keys plus this transaction's own
/// buffered writes. Writes become visible together on [`Transaction::commit`].
/// Dropping the transaction without committing discards every write.
pub trait Transaction: Send {
    /// Read one entity inside the transaction.
    ///
    /// # Errors
    ///
    /// - `NotEnlisted`: `key` was not enlisted
    fn get<'a>(&'a mut self, key: &'a Key)
    -> BoxFuture<'a, Result<Option<Entity>, EntityStoreError>>;

    /// Buffer a write.
    ///
    /// # Errors
    ///
    /// - `NotEnlisted`: the entity's key was not enlisted
    fn put(&mut self, entity: Entity) -> Result<(), EntityStoreError>;

    /// Apply all buffered writes atomically and release the locks.
    ///
    /// # Errors
    ///
    /// - `TransactionAborted`: nothing was written
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), EntityStoreError>>;
}
