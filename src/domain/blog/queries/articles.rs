//! Article domain - statements over `articles` and their `tags`
//!
//! Every function builds a `Statement` that publishes into the result
//! container it is given. Run it standalone against `Database` or submit it to
//! a shared `Transaction`.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::keyset::{JoinSpec, ParentFilter, quote, select_joined};
use crate::domain::blog::models::{Article, ArticleChanges, ArticleTag, NewArticle};
use crate::domain::pagination::{Page, Pagination, split_page};
use crate::domain::rows::{JoinedRow, fold_joined};
use crate::engine::{MultipleStatementResult, SingleStatementResult, Statement, StatementResult};
use crate::services::db::PgTransaction;
use crate::services::error::{Error, Result};

const ARTICLES_WITH_TAGS: JoinSpec = JoinSpec {
    parent_table: "articles",
    parent_columns: &[
        "id",
        "title",
        "body",
        "thumbnail",
        "created_at",
        "updated_at",
    ],
    child_table: "tags",
    child_columns: &[("id", "tag_id"), ("name", "tag_name")],
    foreign_key: "article_id",
};

/// One row of the articles LEFT JOIN tags query
#[derive(sqlx::FromRow)]
struct ArticleTagRow {
    id: String,
    title: String,
    body: String,
    thumbnail: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    tag_id: Option<String>,
    tag_name: Option<String>,
}

impl JoinedRow for ArticleTagRow {
    type Parent = Article;

    fn into_parts(self) -> (Article, Option<ArticleTag>) {
        let tag = match (self.tag_id, self.tag_name) {
            (Some(id), Some(name)) => Some(ArticleTag { id, name }),
            _ => None,
        };
        let article = Article {
            id: self.id,
            title: self.title,
            body: self.body,
            thumbnail: self.thumbnail,
            created_at: self.created_at,
            updated_at: self.updated_at,
            tags: Vec::new(),
        };
        (article, tag)
    }
}

async fn fetch_articles(conn: &mut PgConnection, filter: ParentFilter<'_>) -> Result<Vec<Article>> {
    let mut builder = select_joined(&ARTICLES_WITH_TAGS, filter);
    let rows: Vec<ArticleTagRow> = builder.build_query_as().fetch_all(conn).await?;
    Ok(fold_joined(rows))
}

async fn fetch_article(conn: &mut PgConnection, id: &str) -> Result<Article> {
    fetch_articles(conn, ParentFilter::Id(id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(id))
}

async fn insert_tags(
    conn: &mut PgConnection,
    article_id: &str,
    names: &[String],
) -> Result<Vec<ArticleTag>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = names.iter().map(|_| Uuid::new_v4().to_string()).collect();
    let mut tags: Vec<ArticleTag> = sqlx::query_as(
        r#"
        INSERT INTO "tags" ("id", "name", "article_id")
        SELECT batch.id, batch.name, $3
        FROM (SELECT unnest($1::text[]) AS id, unnest($2::text[]) AS name) AS batch
        RETURNING "id", "name"
        "#,
    )
    .bind(&ids)
    .bind(names)
    .bind(article_id)
    .fetch_all(conn)
    .await?;

    tags.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(tags)
}

/// One page of articles with their tags.
///
/// Publishes `limit` articles at most; `has_more` reports whether the lookahead
/// row came back.
pub fn list_articles(
    pagination: Pagination,
    out: SingleStatementResult<Page<Article>>,
) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let articles = fetch_articles(&mut *tx, ParentFilter::Page(&pagination)).await?;
            let limit = if pagination.is_paginated() {
                pagination.limit()
            } else {
                0
            };
            out.set(split_page(articles, limit));
            Ok::<_, Error>(())
        })
    })
}

/// A single article with its tags, `NotFound` when the id does not exist
pub fn get_article(id: String, out: SingleStatementResult<Article>) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let article = fetch_article(&mut *tx, &id).await?;
            out.set(article);
            Ok::<_, Error>(())
        })
    })
}

/// Insert an article and its tags, publishing the stored result
pub fn create_article(
    new_article: NewArticle,
    out: SingleStatementResult<Article>,
) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO "articles" ("id", "title", "body", "thumbnail", "created_at", "updated_at")
                VALUES ($1, $2, $3, $4, NOW(), NOW())
                "#,
            )
            .bind(&id)
            .bind(&new_article.title)
            .bind(&new_article.body)
            .bind(&new_article.thumbnail)
            .execute(&mut **tx)
            .await?;

            insert_tags(&mut *tx, &id, &new_article.tag_names).await?;

            let article = fetch_article(&mut *tx, &id).await?;
            tracing::debug!(article_id = %article.id, tags = article.tags.len(), "created article");
            out.set(article);
            Ok::<_, Error>(())
        })
    })
}

/// Apply `changes` and bump `updated_at`; `NotFound` when the id does not exist
pub fn update_article(
    id: String,
    changes: ArticleChanges,
    out: SingleStatementResult<Article>,
) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            if !changes.is_empty() {
                let mut builder = QueryBuilder::<Postgres>::new("UPDATE ");
                builder.push(quote("articles"));
                builder.push(" SET ");
                let mut separated = builder.separated(", ");

                if let Some(title) = &changes.title {
                    separated
                        .push("\"title\" = ")
                        .push_bind_unseparated(title.clone());
                }
                if let Some(body) = &changes.body {
                    separated
                        .push("\"body\" = ")
                        .push_bind_unseparated(body.clone());
                }
                if let Some(thumbnail) = &changes.thumbnail {
                    separated
                        .push("\"thumbnail\" = ")
                        .push_bind_unseparated(thumbnail.clone());
                }
                separated.push("\"updated_at\" = NOW()");

                builder.push(" WHERE \"id\" = ");
                builder.push_bind(id.clone());

                let result = builder.build().execute(&mut **tx).await?;
                if result.rows_affected() == 0 {
                    return Err(Error::not_found(id));
                }
            }

            let article = fetch_article(&mut *tx, &id).await?;
            out.set(article);
            Ok::<_, Error>(())
        })
    })
}

/// Delete an article and its tags. Publishes whether an article was removed.
pub fn delete_article(id: String, out: SingleStatementResult<bool>) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            sqlx::query(r#"DELETE FROM "tags" WHERE "article_id" = $1"#)
                .bind(&id)
                .execute(&mut **tx)
                .await?;

            let result = sqlx::query(r#"DELETE FROM "articles" WHERE "id" = $1"#)
                .bind(&id)
                .execute(&mut **tx)
                .await?;

            out.set(result.rows_affected() > 0);
            Ok::<_, Error>(())
        })
    })
}

/// Attach more tags to an existing article, publishing the new tags in id order
pub fn add_tags(
    article_id: String,
    names: Vec<String>,
    out: MultipleStatementResult<ArticleTag>,
) -> Statement<PgTransaction> {
    Statement::new(out, move |tx: &mut PgTransaction, out| {
        Box::pin(async move {
            let exists: Option<(String,)> =
                sqlx::query_as(r#"SELECT "id" FROM "articles" WHERE "id" = $1"#)
                    .bind(&article_id)
                    .fetch_optional(&mut **tx)
                    .await?;
            if exists.is_none() {
                return Err(Error::not_found(article_id));
            }

            let tags = insert_tags(&mut *tx, &article_id, &names).await?;
            out.set(tags);
            Ok::<_, Error>(())
        })
    })
}
