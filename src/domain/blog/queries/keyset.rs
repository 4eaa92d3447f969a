//! Keyset query shape shared by every parent/child listing
//!
//! ```sql
//! SELECT p."id", ..., c."id" AS "tag_id", c."name" AS "tag_name"
//! FROM (
//!     SELECT "id", ... FROM "articles"
//!     WHERE EXISTS (SELECT "id" FROM "articles" WHERE "id" = $1) AND "id" > $2
//!     ORDER BY "id" ASC
//!     LIMIT $3
//! ) AS p
//! LEFT OUTER JOIN "tags" AS c ON c."article_id" = p."id"
//! ORDER BY p."id" ASC, c."id" ASC NULLS FIRST
//! ```
//!
//! Filtering and limiting happen inside the subquery so they count parents,
//! not joined rows. The EXISTS guard turns a stale cursor into an empty page
//! instead of a scan from the start.

use sqlx::{Postgres, QueryBuilder};

use crate::domain::pagination::{Direction, Pagination};

/// Tables and columns of one parent LEFT JOIN child listing
pub(crate) struct JoinSpec {
    pub parent_table: &'static str,
    pub parent_columns: &'static [&'static str],
    pub child_table: &'static str,
    /// Child column and the alias it is selected under
    pub child_columns: &'static [(&'static str, &'static str)],
    /// Column on the child table pointing at the parent id
    pub foreign_key: &'static str,
}

/// Which parents the subquery keeps
#[derive(Debug, Clone, Copy)]
pub(crate) enum ParentFilter<'a> {
    Page(&'a Pagination),
    Id(&'a str),
}

/// Double-quote an identifier, doubling embedded quotes
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Comparison and sort order for a keyset walk, `None` when not walking
fn keyset(direction: Direction) -> Option<(&'static str, &'static str)> {
    match direction {
        Direction::Forward => Some((">", "ASC")),
        Direction::Backward => Some(("<", "DESC")),
        Direction::None => None,
    }
}

pub(crate) fn select_joined(
    spec: &JoinSpec,
    filter: ParentFilter<'_>,
) -> QueryBuilder<'static, Postgres> {
    let parent_table = quote(spec.parent_table);
    let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

    {
        let mut columns = builder.separated(", ");
        for column in spec.parent_columns {
            columns.push(format!("p.{}", quote(column)));
        }
        for (column, alias) in spec.child_columns {
            columns.push(format!("c.{} AS {}", quote(column), quote(alias)));
        }
    }

    builder.push(" FROM (SELECT ");
    builder.push(
        spec.parent_columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", "),
    );
    builder.push(" FROM ");
    builder.push(&parent_table);

    let order = match filter {
        ParentFilter::Id(id) => {
            builder.push(" WHERE \"id\" = ");
            builder.push_bind(id.to_string());
            "ASC"
        }
        ParentFilter::Page(page) => match keyset(page.direction()).filter(|_| page.is_paginated()) {
            Some((comparison, order)) => {
                if let Some(cursor) = page.cursor() {
                    builder.push(" WHERE EXISTS (SELECT \"id\" FROM ");
                    builder.push(&parent_table);
                    builder.push(" WHERE \"id\" = ");
                    builder.push_bind(cursor.to_string());
                    builder.push(") AND \"id\" ");
                    builder.push(comparison);
                    builder.push(" ");
                    builder.push_bind(cursor.to_string());
                }
                builder.push(" ORDER BY \"id\" ");
                builder.push(order);
                builder.push(" LIMIT ");
                builder.push_bind(page.fetch_limit());
                order
            }
            None => "ASC",
        },
    };

    builder.push(") AS p LEFT OUTER JOIN ");
    builder.push(quote(spec.child_table));
    builder.push(" AS c ON c.");
    builder.push(quote(spec.foreign_key));
    builder.push(" = p.\"id\" ORDER BY p.\"id\" ");
    builder.push(order);
    builder.push(", c.\"id\" ASC NULLS FIRST");

    builder
}
