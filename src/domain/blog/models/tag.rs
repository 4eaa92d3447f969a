//! Tag service models: tags list the articles filed under them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::rows::Nested;

/// An article as seen from the tag service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagArticle {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub articles: Vec<TagArticle>,
}

impl Nested for Tag {
    type Child = TagArticle;

    fn key(&self) -> &str {
        &self.id
    }

    fn attach(&mut self, child: TagArticle) {
        self.articles.push(child);
    }
}
