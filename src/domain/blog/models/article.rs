//! Article service models: articles own their tags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::rows::Nested;

/// A tag as seen from the article service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleTag {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub body: String,
    pub thumbnail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<ArticleTag>,
}

impl Nested for Article {
    type Child = ArticleTag;

    fn key(&self) -> &str {
        &self.id
    }

    fn attach(&mut self, child: ArticleTag) {
        self.tags.push(child);
    }
}

/// Input for creating an article together with its tags
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    pub thumbnail: String,
    pub tag_names: Vec<String>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub thumbnail: Option<String>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.thumbnail.is_none()
    }
}
