//! # Sparse Statement Builders
//!
//! Each repository lists its optional filter and update fields explicitly as
//! `(column, comparison, value)` entries; only present values reach SQL.
//!
//! ```text
//! UserFilters { rank_from: Some(2), level: None, ids: Some([1, 4]) }
//!
//!   SELECT ... WHERE u.deleted_at IS NULL
//!                AND u.id IN (?, ?)        ← ids
//!                AND u.rank >= ?           ← rank_from
//!                                          ← level absent: nothing
//!   ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?
//! ```

use forum_core::{EntityId, Pagination, Sort, SortKey};
use sqlx::{Encode, QueryBuilder, Sqlite, Type};

/// Comparison applied by a filter entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cmp {
    Eq,
    Ge,
    Le,
}

impl Cmp {
    fn as_sql(self) -> &'static str {
        match self {
            Cmp::Eq => " = ",
            Cmp::Ge => " >= ",
            Cmp::Le => " <= ",
        }
    }
}

/// Appends filter conditions to a query that already has a WHERE clause.
pub(crate) struct Conditions<'q, 'a> {
    qb: &'q mut QueryBuilder<'a, Sqlite>,
}

impl<'q, 'a> Conditions<'q, 'a> {
    pub(crate) fn new(qb: &'q mut QueryBuilder<'a, Sqlite>) -> Self {
        Conditions { qb }
    }

    /// `AND column <cmp> value` when `value` is present.
    pub(crate) fn cmp<T>(&mut self, column: &str, cmp: Cmp, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Sqlite> + Type<Sqlite> + Send,
    {
        if let Some(value) = value {
            self.qb.push(" AND ").push(column).push(cmp.as_sql()).push_bind(value);
        }
        self
    }

    /// `AND column IN (...)` when `ids` is present. An empty list matches nothing.
    pub(crate) fn any_of(&mut self, column: &str, ids: Option<&[EntityId]>) -> &mut Self {
        match ids {
            None => {}
            Some([]) => {
                self.qb.push(" AND 0");
            }
            Some(ids) => {
                self.qb.push(" AND ").push(column).push(" IN (");
                let mut list = self.qb.separated(", ");
                for id in ids {
                    list.push_bind(*id);
                }
                list.push_unseparated(")");
            }
        }
        self
    }
}

/// Appends `ORDER BY <key> <order>, id <order> LIMIT ? OFFSET ?`.
pub(crate) fn push_page<K: SortKey>(
    qb: &mut QueryBuilder<'_, Sqlite>,
    sort: Sort<K>,
    pagination: Pagination,
) {
    let order = sort.order.as_sql();
    qb.push(" ORDER BY ")
        .push(sort.by.column())
        .push(" ")
        .push(order)
        .push(", id ")
        .push(order)
        .push(" LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());
}

/// Appends `, column = ?` to an UPDATE's SET list when `value` is present.
pub(crate) fn push_set<'a, T>(qb: &mut QueryBuilder<'a, Sqlite>, column: &str, value: Option<T>)
where
    T: 'a + Encode<'a, Sqlite> + Type<Sqlite> + Send,
{
    if let Some(value) = value {
        qb.push(", ").push(column).push(" = ").push_bind(value);
    }
}

/// Appends ` WHERE id IN (...)` for a non-empty id list.
pub(crate) fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[EntityId]) {
    qb.push(" WHERE id IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::{SortOrder, UserSortBy};

    #[test]
    fn test_conditions_skip_absent_values() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users u WHERE u.deleted_at IS NULL");
        Conditions::new(&mut qb)
            .any_of("u.id", Some(&[1, 2][..]))
            .cmp("u.rank", Cmp::Ge, Some(2_i64))
            .cmp::<i64>("u.rank", Cmp::Le, None);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM users u WHERE u.deleted_at IS NULL AND u.id IN (?, ?) AND u.rank >= ?"
        );
    }

    #[test]
    fn test_empty_id_list_matches_nothing() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE deleted_at IS NULL");
        Conditions::new(&mut qb).any_of("id", Some(&[][..]));

        assert!(qb.sql().ends_with(" AND 0"));
    }

    #[test]
    fn test_page_clause() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
        push_page(
            &mut qb,
            Sort::new(UserSortBy::Rank, SortOrder::Asc),
            Pagination::new(20, 2),
        );

        assert_eq!(
            qb.sql(),
            "SELECT * FROM users ORDER BY rank ASC, id ASC LIMIT ? OFFSET ?"
        );
    }
}
