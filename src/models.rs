use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Placeholder used when a new article arrives without an image URL.
pub const DEFAULT_ARTICLE_IMG_URL: &str =
    "https://images.pexels.com/photos/97050/pexels-photo-97050.jpeg?w=700&h=700";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Topic {
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTopic {
    pub slug: String,
    pub description: String,
}

/// Full article row plus the derived comment count. Single-article reads
/// return this shape; list rows use [`ArticleSummary`] (no `body`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Article {
    pub article_id: Id,
    pub author: String,
    pub title: String,
    pub body: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub votes: i64,
    pub article_img_url: String,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ArticleSummary {
    pub article_id: Id,
    pub author: String,
    pub title: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub votes: i64,
    pub article_img_url: String,
    pub comment_count: i64,
}

/// One page of article summaries plus the size of the whole filtered set.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArticlePage {
    pub articles: Vec<ArticleSummary>,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewArticle {
    pub author: String,
    pub title: String,
    pub body: String,
    pub topic: String,
    pub article_img_url: Option<String>,
}

impl NewArticle {
    /// Image URL to store: the supplied one, or the fixed placeholder when
    /// the field is missing or blank.
    pub fn img_url_or_default(&self) -> String {
        match self.article_img_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.to_string(),
            _ => DEFAULT_ARTICLE_IMG_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub comment_id: Id,
    pub article_id: Id,
    pub author: String,
    pub body: String,
    pub votes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub username: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub name: String,
    pub avatar_url: String,
}

/// PATCH body for vote adjustments. `inc_votes` is a signed delta; clients
/// never set the counter absolutely.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VotePatch {
    pub inc_votes: i64,
}
