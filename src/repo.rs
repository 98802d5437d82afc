use crate::models::*;
use crate::query::{ArticleQuery, PageQuery};

use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    /// A referenced row is absent. Carries the column/value pair for the
    /// client-facing 404 message.
    #[error("{column} of {value} not found")]
    NotFound { column: String, value: String },
    /// Malformed or invalid-typed input, including store-side type
    /// rejections and foreign-key / not-null violations on insert.
    #[error("bad input")]
    BadInput,
    /// Uniqueness violation (duplicate topic slug or username).
    #[error("already exists")]
    Conflict,
    #[error("store failure: {0}")]
    Internal(#[from] sqlx::Error),
}

impl RepoError {
    pub fn not_found(column: &str, value: impl std::fmt::Display) -> Self {
        RepoError::NotFound {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait TopicRepo: Send + Sync {
    async fn list_topics(&self) -> RepoResult<Vec<Topic>>;
    async fn create_topic(&self, new: NewTopic) -> RepoResult<Topic>;
}

#[async_trait]
pub trait ArticleRepo: Send + Sync {
    async fn get_article(&self, id: Id) -> RepoResult<Article>;
    async fn list_articles(&self, query: ArticleQuery) -> RepoResult<ArticlePage>;
    async fn create_article(&self, new: NewArticle) -> RepoResult<Article>;
    async fn patch_article_votes(&self, id: Id, delta: i64) -> RepoResult<Article>;
    async fn delete_article(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn list_comments(&self, article_id: Id, page: PageQuery) -> RepoResult<Vec<Comment>>;
    async fn create_comment(&self, article_id: Id, new: NewComment) -> RepoResult<Comment>;
    async fn patch_comment_votes(&self, id: Id, delta: i64) -> RepoResult<Comment>;
    async fn delete_comment(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user(&self, username: &str) -> RepoResult<User>;
    /// Seeding hook; there is no HTTP route for user creation.
    async fn create_user(&self, user: User) -> RepoResult<User>;
}

pub trait Repo: TopicRepo + ArticleRepo + CommentRepo + UserRepo {}

impl<T> Repo for T where T: TopicRepo + ArticleRepo + CommentRepo + UserRepo {}

// ---- shared payload validation (fail fast, before any store round-trip) --

fn require_non_empty(fields: &[&str]) -> RepoResult<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(RepoError::BadInput);
    }
    Ok(())
}

pub(crate) fn validate_new_topic(new: &NewTopic) -> RepoResult<()> {
    require_non_empty(&[&new.slug, &new.description])
}

pub(crate) fn validate_new_article(new: &NewArticle) -> RepoResult<()> {
    require_non_empty(&[&new.author, &new.title, &new.body, &new.topic])
}

pub(crate) fn validate_new_comment(new: &NewComment) -> RepoResult<()> {
    require_non_empty(&[&new.username, &new.body])
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    /// Identifiers that may ever be spliced into SQL. Call sites pass
    /// `&'static str` literals; this list is the backstop.
    const KNOWN_IDENTS: &[&str] = &[
        "topics",
        "articles",
        "comments",
        "users",
        "article_id",
        "comment_id",
        "username",
        "slug",
        "author",
        "title",
        "topic",
        "created_at",
        "votes",
        "article_img_url",
    ];

    /// Quotes an allow-listed identifier for interpolation. Doubling any
    /// embedded quote keeps the fragment inert even if the allow-list check
    /// were ever bypassed.
    fn quote_ident(ident: &str) -> String {
        debug_assert!(
            KNOWN_IDENTS.contains(&ident),
            "identifier not allow-listed: {ident}"
        );
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Key value for generic lookups: integer surrogate keys and text
    /// natural keys (usernames, topic slugs).
    #[derive(Debug, Clone, Copy)]
    pub enum Key<'a> {
        Int(i64),
        Text(&'a str),
    }

    impl std::fmt::Display for Key<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Key::Int(v) => write!(f, "{v}"),
                Key::Text(v) => write!(f, "{v}"),
            }
        }
    }

    /// Maps Postgres error codes onto the repo taxonomy. Invalid text
    /// representation / numeric overflow and FK / not-null violations are
    /// the client's fault; unique violations are conflicts; everything else
    /// stays internal.
    fn map_db_err(e: sqlx::Error) -> RepoError {
        let code = match &e {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        };
        match code.as_deref() {
            Some("22P02") | Some("22003") | Some("23502") | Some("23503") => RepoError::BadInput,
            Some("23505") => RepoError::Conflict,
            _ => RepoError::Internal(e),
        }
    }

    /// Existence gate: parameterized equality lookup, read-only. Zero rows
    /// is `NotFound` carrying the column/value; a store-side type rejection
    /// surfaces as `BadInput` rather than a raw driver error.
    pub async fn exists(
        pool: &Pool<Postgres>,
        table: &'static str,
        column: &'static str,
        key: Key<'_>,
    ) -> RepoResult<()> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = $1",
            quote_ident(table),
            quote_ident(column)
        );
        let query = sqlx::query_scalar::<_, i32>(&sql);
        let row = match key {
            Key::Int(v) => query.bind(v).fetch_optional(pool).await,
            Key::Text(v) => query.bind(v).fetch_optional(pool).await,
        };
        match row.map_err(map_db_err)? {
            Some(_) => Ok(()),
            None => Err(RepoError::not_found(column, key)),
        }
    }

    /// Vote adjustment as a single atomic statement; the delta never leaves
    /// the database, so concurrent patches cannot lose updates.
    pub async fn patch_votes(
        pool: &Pool<Postgres>,
        table: &'static str,
        key_column: &'static str,
        id: Id,
        delta: i64,
    ) -> RepoResult<()> {
        let sql = format!(
            "UPDATE {} SET votes = votes + $1 WHERE {} = $2",
            quote_ident(table),
            quote_ident(key_column)
        );
        let done = sqlx::query(&sql)
            .bind(delta)
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_db_err)?;
        if done.rows_affected() == 0 {
            return Err(RepoError::not_found(key_column, id));
        }
        Ok(())
    }

    /// Unconditional delete by key. Callers gate existence first and are
    /// responsible for cascading (article -> its comments, in one tx).
    pub async fn delete_item<'e, E>(
        executor: E,
        table: &'static str,
        key_column: &'static str,
        id: Id,
    ) -> RepoResult<u64>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_ident(table),
            quote_ident(key_column)
        );
        let done = sqlx::query(&sql)
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_db_err)?;
        Ok(done.rows_affected())
    }

    // List rows never carry `body`; the aggregate count rides along so it
    // is exact at read time.
    const ARTICLE_SUMMARY_SELECT: &str = "SELECT a.article_id, a.author, a.title, a.topic, \
         a.created_at, a.votes, a.article_img_url, \
         COUNT(c.comment_id) AS comment_count \
         FROM articles a LEFT JOIN comments c ON c.article_id = a.article_id";

    const COMMENT_SELECT: &str =
        "SELECT comment_id, article_id, author, body, votes, created_at FROM comments";

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }

        async fn fetch_article(&self, id: Id) -> RepoResult<Article> {
            let row = sqlx::query_as::<_, Article>(
                "SELECT a.article_id, a.author, a.title, a.body, a.topic, \
                 a.created_at, a.votes, a.article_img_url, \
                 COUNT(c.comment_id) AS comment_count \
                 FROM articles a LEFT JOIN comments c ON c.article_id = a.article_id \
                 WHERE a.article_id = $1 \
                 GROUP BY a.article_id",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
            row.ok_or_else(|| RepoError::not_found("article_id", id))
        }

        async fn fetch_comment(&self, id: Id) -> RepoResult<Comment> {
            let sql = format!("{COMMENT_SELECT} WHERE comment_id = $1");
            let row = sqlx::query_as::<_, Comment>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;
            row.ok_or_else(|| RepoError::not_found("comment_id", id))
        }
    }

    #[async_trait]
    impl TopicRepo for PgRepo {
        async fn list_topics(&self) -> RepoResult<Vec<Topic>> {
            let recs =
                sqlx::query_as::<_, Topic>("SELECT slug, description FROM topics ORDER BY slug")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_db_err)?;
            Ok(recs)
        }

        async fn create_topic(&self, new: NewTopic) -> RepoResult<Topic> {
            validate_new_topic(&new)?;
            let rec = sqlx::query_as::<_, Topic>(
                "INSERT INTO topics (slug, description) VALUES ($1, $2) \
                 RETURNING slug, description",
            )
            .bind(&new.slug)
            .bind(&new.description)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
            Ok(rec)
        }
    }

    #[async_trait]
    impl ArticleRepo for PgRepo {
        async fn get_article(&self, id: Id) -> RepoResult<Article> {
            self.fetch_article(id).await
        }

        async fn list_articles(&self, query: ArticleQuery) -> RepoResult<ArticlePage> {
            if let Some(topic) = query.topic.as_deref() {
                exists(&self.pool, "topics", "slug", Key::Text(topic)).await?;
            }

            // `sort_by` comes from the fixed allow-list, never the client
            // string; the aggregate sorts by its alias, real columns by
            // their quoted name.
            let order_expr = if query.sort_by == "comment_count" {
                "comment_count".to_string()
            } else {
                format!("a.{}", quote_ident(query.sort_by))
            };

            let mut sql = String::from(ARTICLE_SUMMARY_SELECT);
            if query.topic.is_some() {
                sql.push_str(" WHERE a.topic = $1");
            }
            sql.push_str(" GROUP BY a.article_id");
            sql.push_str(&format!(" ORDER BY {} {}", order_expr, query.order.as_sql()));

            let (limit, offset) = (query.page.limit, query.page.offset());
            let articles = if let Some(topic) = query.topic.as_deref() {
                sql.push_str(" LIMIT $2 OFFSET $3");
                sqlx::query_as::<_, ArticleSummary>(&sql)
                    .bind(topic)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            } else {
                sql.push_str(" LIMIT $1 OFFSET $2");
                sqlx::query_as::<_, ArticleSummary>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            .map_err(map_db_err)?;

            if articles.is_empty() {
                return Err(RepoError::not_found("articles", format!("page {}", query.page.page)));
            }

            // Unpaginated count so callers can report the full filtered set.
            let total_count: i64 = if let Some(topic) = query.topic.as_deref() {
                sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE topic = $1")
                    .bind(topic)
                    .fetch_one(&self.pool)
                    .await
            } else {
                sqlx::query_scalar("SELECT COUNT(*) FROM articles")
                    .fetch_one(&self.pool)
                    .await
            }
            .map_err(map_db_err)?;

            Ok(ArticlePage { articles, total_count })
        }

        async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
            validate_new_article(&new)?;
            // Missing FK targets on create are the client's mistake: 400,
            // not 404.
            exists(&self.pool, "users", "username", Key::Text(&new.author))
                .await
                .map_err(reject_missing_reference)?;
            exists(&self.pool, "topics", "slug", Key::Text(&new.topic))
                .await
                .map_err(reject_missing_reference)?;

            let id: i64 = sqlx::query_scalar(
                "INSERT INTO articles (author, title, body, topic, article_img_url) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING article_id",
            )
            .bind(&new.author)
            .bind(&new.title)
            .bind(&new.body)
            .bind(&new.topic)
            .bind(new.img_url_or_default())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

            self.fetch_article(id).await
        }

        async fn patch_article_votes(&self, id: Id, delta: i64) -> RepoResult<Article> {
            exists(&self.pool, "articles", "article_id", Key::Int(id)).await?;
            patch_votes(&self.pool, "articles", "article_id", id, delta).await?;
            self.fetch_article(id).await
        }

        async fn delete_article(&self, id: Id) -> RepoResult<()> {
            exists(&self.pool, "articles", "article_id", Key::Int(id)).await?;
            // Comments go first and in the same tx, so a failure between the
            // two statements never leaves comments pointing at a dead row.
            let mut tx = self.pool.begin().await.map_err(map_db_err)?;
            delete_item(&mut *tx, "comments", "article_id", id).await?;
            let deleted = delete_item(&mut *tx, "articles", "article_id", id).await?;
            if deleted == 0 {
                return Err(RepoError::not_found("article_id", id));
            }
            tx.commit().await.map_err(map_db_err)?;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(&self, article_id: Id, page: PageQuery) -> RepoResult<Vec<Comment>> {
            exists(&self.pool, "articles", "article_id", Key::Int(article_id)).await?;
            // Most recent first; this ordering is fixed, not client-chosen.
            let sql = format!(
                "{COMMENT_SELECT} WHERE article_id = $1 \
                 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
            );
            let comments = sqlx::query_as::<_, Comment>(&sql)
                .bind(article_id)
                .bind(page.limit)
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await
                .map_err(map_db_err)?;
            if comments.is_empty() {
                // Distinct from the article itself being absent, which the
                // gate above already ruled out.
                return Err(RepoError::not_found("comments for article", article_id));
            }
            Ok(comments)
        }

        async fn create_comment(&self, article_id: Id, new: NewComment) -> RepoResult<Comment> {
            validate_new_comment(&new)?;
            exists(&self.pool, "articles", "article_id", Key::Int(article_id)).await?;
            exists(&self.pool, "users", "username", Key::Text(&new.username)).await?;

            let rec = sqlx::query_as::<_, Comment>(
                "INSERT INTO comments (article_id, author, body) VALUES ($1, $2, $3) \
                 RETURNING comment_id, article_id, author, body, votes, created_at",
            )
            .bind(article_id)
            .bind(&new.username)
            .bind(&new.body)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
            Ok(rec)
        }

        async fn patch_comment_votes(&self, id: Id, delta: i64) -> RepoResult<Comment> {
            exists(&self.pool, "comments", "comment_id", Key::Int(id)).await?;
            patch_votes(&self.pool, "comments", "comment_id", id, delta).await?;
            self.fetch_comment(id).await
        }

        async fn delete_comment(&self, id: Id) -> RepoResult<()> {
            exists(&self.pool, "comments", "comment_id", Key::Int(id)).await?;
            delete_item(&self.pool, "comments", "comment_id", id).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn list_users(&self) -> RepoResult<Vec<User>> {
            let recs = sqlx::query_as::<_, User>(
                "SELECT username, name, avatar_url FROM users ORDER BY username",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
            Ok(recs)
        }

        async fn get_user(&self, username: &str) -> RepoResult<User> {
            let row = sqlx::query_as::<_, User>(
                "SELECT username, name, avatar_url FROM users WHERE username = $1",
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
            row.ok_or_else(|| RepoError::not_found("username", username))
        }

        async fn create_user(&self, user: User) -> RepoResult<User> {
            let rec = sqlx::query_as::<_, User>(
                "INSERT INTO users (username, name, avatar_url) VALUES ($1, $2, $3) \
                 RETURNING username, name, avatar_url",
            )
            .bind(&user.username)
            .bind(&user.name)
            .bind(&user.avatar_url)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
            Ok(rec)
        }
    }

    fn reject_missing_reference(e: RepoError) -> RepoError {
        match e {
            RepoError::NotFound { .. } => RepoError::BadInput,
            other => other,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn quote_ident_doubles_embedded_quotes() {
            assert_eq!(quote_ident("articles"), "\"articles\"");
        }

        #[test]
        fn key_display_matches_bound_value() {
            assert_eq!(Key::Int(42).to_string(), "42");
            assert_eq!(Key::Text("butter_bridge").to_string(), "butter_bridge");
        }
    }
}

// In-memory implementation (feature = "inmem-store"): same contract as the
// Postgres store, used by the integration tests and for local hacking
// without a database.
#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use crate::query::SortOrder;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    // Stored form: no derived comment_count.
    #[derive(Debug, Clone)]
    struct ArticleRow {
        article_id: Id,
        author: String,
        title: String,
        body: String,
        topic: String,
        created_at: chrono::DateTime<Utc>,
        votes: i64,
        article_img_url: String,
    }

    #[derive(Default)]
    struct State {
        topics: Vec<Topic>,
        users: HashMap<String, User>,
        articles: HashMap<Id, ArticleRow>,
        comments: HashMap<Id, Comment>,
        next_article_id: Id,
        next_comment_id: Id,
    }

    impl State {
        fn comment_count(&self, article_id: Id) -> i64 {
            self.comments
                .values()
                .filter(|c| c.article_id == article_id)
                .count() as i64
        }

        fn article_with_count(&self, row: &ArticleRow) -> Article {
            Article {
                article_id: row.article_id,
                author: row.author.clone(),
                title: row.title.clone(),
                body: row.body.clone(),
                topic: row.topic.clone(),
                created_at: row.created_at,
                votes: row.votes,
                article_img_url: row.article_img_url.clone(),
                comment_count: self.comment_count(row.article_id),
            }
        }

        fn summary(&self, row: &ArticleRow) -> ArticleSummary {
            ArticleSummary {
                article_id: row.article_id,
                author: row.author.clone(),
                title: row.title.clone(),
                topic: row.topic.clone(),
                created_at: row.created_at,
                votes: row.votes,
                article_img_url: row.article_img_url.clone(),
                comment_count: self.comment_count(row.article_id),
            }
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl TopicRepo for InMemRepo {
        async fn list_topics(&self) -> RepoResult<Vec<Topic>> {
            let s = self.state.read().unwrap();
            Ok(s.topics.clone())
        }

        async fn create_topic(&self, new: NewTopic) -> RepoResult<Topic> {
            validate_new_topic(&new)?;
            let mut s = self.state.write().unwrap();
            if s.topics.iter().any(|t| t.slug == new.slug) {
                return Err(RepoError::Conflict);
            }
            let topic = Topic { slug: new.slug, description: new.description };
            s.topics.push(topic.clone());
            Ok(topic)
        }
    }

    #[async_trait]
    impl ArticleRepo for InMemRepo {
        async fn get_article(&self, id: Id) -> RepoResult<Article> {
            let s = self.state.read().unwrap();
            let row = s
                .articles
                .get(&id)
                .ok_or_else(|| RepoError::not_found("article_id", id))?;
            Ok(s.article_with_count(row))
        }

        async fn list_articles(&self, query: ArticleQuery) -> RepoResult<ArticlePage> {
            let s = self.state.read().unwrap();
            if let Some(topic) = query.topic.as_deref() {
                if !s.topics.iter().any(|t| t.slug == topic) {
                    return Err(RepoError::not_found("slug", topic));
                }
            }

            let mut rows: Vec<ArticleSummary> = s
                .articles
                .values()
                .filter(|a| query.topic.as_deref().map_or(true, |t| a.topic == t))
                .map(|a| s.summary(a))
                .collect();

            rows.sort_by(|a, b| {
                let ord = match query.sort_by {
                    "article_id" => a.article_id.cmp(&b.article_id),
                    "author" => a.author.cmp(&b.author),
                    "title" => a.title.cmp(&b.title),
                    "topic" => a.topic.cmp(&b.topic),
                    "votes" => a.votes.cmp(&b.votes),
                    "article_img_url" => a.article_img_url.cmp(&b.article_img_url),
                    "comment_count" => a.comment_count.cmp(&b.comment_count),
                    _ => a.created_at.cmp(&b.created_at),
                };
                match query.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });

            let total_count = rows.len() as i64;
            let articles: Vec<ArticleSummary> = rows
                .into_iter()
                .skip(query.page.offset() as usize)
                .take(query.page.limit as usize)
                .collect();
            if articles.is_empty() {
                return Err(RepoError::not_found(
                    "articles",
                    format!("page {}", query.page.page),
                ));
            }
            Ok(ArticlePage { articles, total_count })
        }

        async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
            validate_new_article(&new)?;
            let mut s = self.state.write().unwrap();
            if !s.users.contains_key(&new.author)
                || !s.topics.iter().any(|t| t.slug == new.topic)
            {
                return Err(RepoError::BadInput);
            }
            s.next_article_id += 1;
            let row = ArticleRow {
                article_id: s.next_article_id,
                author: new.author.clone(),
                title: new.title.clone(),
                body: new.body.clone(),
                topic: new.topic.clone(),
                created_at: Utc::now(),
                votes: 0,
                article_img_url: new.img_url_or_default(),
            };
            let article = s.article_with_count(&row);
            s.articles.insert(row.article_id, row);
            Ok(article)
        }

        async fn patch_article_votes(&self, id: Id, delta: i64) -> RepoResult<Article> {
            let mut s = self.state.write().unwrap();
            let row = s
                .articles
                .get_mut(&id)
                .ok_or_else(|| RepoError::not_found("article_id", id))?;
            // Out-of-range arithmetic is the client's fault, as with 22003
            // on the Postgres side.
            row.votes = row.votes.checked_add(delta).ok_or(RepoError::BadInput)?;
            let row = row.clone();
            Ok(s.article_with_count(&row))
        }

        async fn delete_article(&self, id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            if s.articles.remove(&id).is_none() {
                return Err(RepoError::not_found("article_id", id));
            }
            s.comments.retain(|_, c| c.article_id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(&self, article_id: Id, page: PageQuery) -> RepoResult<Vec<Comment>> {
            let s = self.state.read().unwrap();
            if !s.articles.contains_key(&article_id) {
                return Err(RepoError::not_found("article_id", article_id));
            }
            let mut all: Vec<Comment> = s
                .comments
                .values()
                .filter(|c| c.article_id == article_id)
                .cloned()
                .collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let comments: Vec<Comment> = all
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit as usize)
                .collect();
            if comments.is_empty() {
                return Err(RepoError::not_found("comments for article", article_id));
            }
            Ok(comments)
        }

        async fn create_comment(&self, article_id: Id, new: NewComment) -> RepoResult<Comment> {
            validate_new_comment(&new)?;
            let mut s = self.state.write().unwrap();
            if !s.articles.contains_key(&article_id) {
                return Err(RepoError::not_found("article_id", article_id));
            }
            if !s.users.contains_key(&new.username) {
                return Err(RepoError::not_found("username", &new.username));
            }
            s.next_comment_id += 1;
            let comment = Comment {
                comment_id: s.next_comment_id,
                article_id,
                author: new.username,
                body: new.body,
                votes: 0,
                created_at: Utc::now(),
            };
            s.comments.insert(comment.comment_id, comment.clone());
            Ok(comment)
        }

        async fn patch_comment_votes(&self, id: Id, delta: i64) -> RepoResult<Comment> {
            let mut s = self.state.write().unwrap();
            let comment = s
                .comments
                .get_mut(&id)
                .ok_or_else(|| RepoError::not_found("comment_id", id))?;
            comment.votes = comment.votes.checked_add(delta).ok_or(RepoError::BadInput)?;
            Ok(comment.clone())
        }

        async fn delete_comment(&self, id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            if s.comments.remove(&id).is_none() {
                return Err(RepoError::not_found("comment_id", id));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn list_users(&self) -> RepoResult<Vec<User>> {
            let s = self.state.read().unwrap();
            let mut users: Vec<User> = s.users.values().cloned().collect();
            users.sort_by(|a, b| a.username.cmp(&b.username));
            Ok(users)
        }

        async fn get_user(&self, username: &str) -> RepoResult<User> {
            let s = self.state.read().unwrap();
            s.users
                .get(username)
                .cloned()
                .ok_or_else(|| RepoError::not_found("username", username))
        }

        async fn create_user(&self, user: User) -> RepoResult<User> {
            let mut s = self.state.write().unwrap();
            if s.users.contains_key(&user.username) {
                return Err(RepoError::Conflict);
            }
            s.users.insert(user.username.clone(), user.clone());
            Ok(user)
        }
    }
}
