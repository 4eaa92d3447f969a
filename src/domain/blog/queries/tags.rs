//! Tag domain - statements over `tags` and the `articles` filed under them
//!
//! This is the tag service's side of the pairing: `tags` is the parent table
//! and `articles.tag_id` points back at it.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::keyset::{JoinSpec, ParentFilter, select_joined};
use crate::domain::blog::models::{Tag, TagArticle};
use crate::domain::pagination::{Page, Pagination, split_page};
use crate::domain::rows::{JoinedRow, fold_joined};
use crate::engine::{SingleStatementResult, Statement, StatementResult};
use crate::services::db::PgTransaction;
use crate::services::error::{Error, Result};

const TAGS_WITH_ARTICLES: JoinSpec = JoinSpec {
    parent_table: "tags",
    parent_columns: &["id", "name", "created_at", "updated_at"],
    child_table: "articles",
    child_columns: &[("id", "article_id"), ("title", "article_title")],
    foreign_key: "tag_id",
};

#[derive(sqlx::FromRow)]
struct TagArticleRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    article_id: Option<String>,
    article_title: Option<String>,
}

impl JoinedRow for TagArticleRow {
    type Parent = Tag;

    fn into_parts(self) -> (Tag, Option<TagArticle>) {
        let article = match (self.article_id, self.article_title) {
            (Some(id), Some(title)) => Some(TagArticle { id, title }),
            _ => None,
        };
        let tag = Tag {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
            articles: Vec::new(),
        };
        (tag, article)
    }
}

async fn fetch_tags(conn: &mut PgConnection, filter: ParentFilter<'_>) -> Result<Vec<Tag>> {
    let mut builder = select_joined(&TAGS_WITH_ARTICLES, filter);
    let rows: Vec<TagArticleRow> = builder.build_query_as().fetch_all(conn).await?;
    Ok(fold_joined(rows))
}

async fn fetch_tag(conn: &mut PgConnection, id: &str) -> Result<Tag> {
    fetch_tags(conn, ParentFilter::Id(id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(id))
}

/// One page of tags with their articles
pub fn list_tags(
    pagination: Pagination,
    out: SingleStatementResult<Page<Tag>>,
) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let tags = fetch_tags(&mut *tx, ParentFilter::Page(&pagination)).await?;
            let limit = if pagination.is_paginated() {
                pagination.limit()
            } else {
                0
            };
            out.set(split_page(tags, limit));
            Ok::<_, Error>(())
        })
    })
}

pub fn get_tag(id: String, out: SingleStatementResult<Tag>) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let tag = fetch_tag(&mut *tx, &id).await?;
            out.set(tag);
            Ok::<_, Error>(())
        })
    })
}

pub fn create_tag(name: String, out: SingleStatementResult<Tag>) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let (id, created_at, updated_at): (String, DateTime<Utc>, DateTime<Utc>) =
                sqlx::query_as(
                    r#"
                    INSERT INTO "tags" ("id", "name", "created_at", "updated_at")
                    VALUES ($1, $2, NOW(), NOW())
                    RETURNING "id", "created_at", "updated_at"
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&name)
                .fetch_one(&mut **tx)
                .await?;

            tracing::debug!(tag_id = %id, "created tag");
            out.set(Tag {
                id,
                name,
                created_at,
                updated_at,
                articles: Vec::new(),
            });
            Ok::<_, Error>(())
        })
    })
}

/// Delete a tag, detaching its articles first. Publishes whether a tag was removed.
pub fn delete_tag(id: String, out: SingleStatementResult<bool>) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            sqlx::query(r#"UPDATE "articles" SET "tag_id" = NULL WHERE "tag_id" = $1"#)
                .bind(&id)
                .execute(&mut **tx)
                .await?;

            let result = sqlx::query(r#"DELETE FROM "tags" WHERE "id" = $1"#)
                .bind(&id)
                .execute(&mut **tx)
                .await?;

            out.set(result.rows_affected() > 0);
            Ok::<_, Error>(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, article: Option<(&str, &str)>) -> TagArticleRow {
        let now = Utc::now();
        TagArticleRow {
            id: id.to_string(),
            name: format!("tag{}", id),
            created_at: now,
            updated_at: now,
            article_id: article.map(|(aid, _)| aid.to_string()),
            article_title: article.map(|(_, title)| title.to_string()),
        }
    }

    #[test]
    fn test_fold_tag_rows() {
        let tags = fold_joined(vec![
            row("1", Some(("a1", "first"))),
            row("1", Some(("a2", "second"))),
            row("2", None),
        ]);

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "tag1");
        assert_eq!(
            tags[0].articles,
            vec![
                TagArticle {
                    id: "a1".into(),
                    title: "first".into(),
                },
                TagArticle {
                    id: "a2".into(),
                    title: "second".into(),
                },
            ]
        );
        assert!(tags[1].articles.is_empty());
    }

    #[test]
    fn test_tag_listing_sql_joins_articles() {
        let pagination = Pagination::backward(3, Some("t9".into()));
        let builder = select_joined(&TAGS_WITH_ARTICLES, ParentFilter::Page(&pagination));
        let sql = builder.sql();

        assert!(sql.contains("c.\"title\" AS \"article_title\""));
        assert!(sql.contains("LEFT OUTER JOIN \"articles\" AS c ON c.\"tag_id\" = p.\"id\""));
        assert!(sql.contains("\"id\" < $2 ORDER BY \"id\" DESC LIMIT $3"));
    }
}
