use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::models::*;
use crate::query::{ArticleQuery, PageQuery};
use crate::repo::Repo;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    /// Unmatched-route policy: answer 404 instead of the historical 400.
    pub route_miss_not_found: bool,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("").route(web::get().to(get_api)))
            .service(
                web::resource("/topics")
                    .route(web::get().to(get_topics))
                    .route(web::post().to(post_topic)),
            )
            .service(
                web::resource("/articles")
                    .route(web::get().to(get_articles))
                    .route(web::post().to(post_article)),
            )
            .service(
                web::resource("/articles/{article_id}")
                    .route(web::get().to(get_article))
                    .route(web::patch().to(patch_article))
                    .route(web::delete().to(delete_article)),
            )
            .service(
                web::resource("/articles/{article_id}/comments")
                    .route(web::get().to(get_article_comments))
                    .route(web::post().to(post_comment)),
            )
            .service(
                web::resource("/comments/{comment_id}")
                    .route(web::patch().to(patch_comment))
                    .route(web::delete().to(delete_comment)),
            )
            .service(web::resource("/users").route(web::get().to(get_users)))
            .service(web::resource("/users/{username}").route(web::get().to(get_user))),
    );
    cfg.default_service(web::route().to(route_miss));
}

/// Body deserialization failures are the client's fault; answer a plain 400
/// instead of actix's default error text.
pub fn json_error_handler(
    _err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    ApiError::BadRequest.into()
}

/// Path identifiers are parsed explicitly: a non-numeric id is a 400,
/// never a 500 and never a raw driver error.
fn parse_id(raw: &str) -> Result<Id, ApiError> {
    raw.parse::<Id>().map_err(|_| ApiError::BadRequest)
}

static ENDPOINTS: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "GET /api": { "description": "serves up a json representation of all the available endpoints of the api" },
        "GET /api/topics": { "description": "serves an array of all topics" },
        "POST /api/topics": { "description": "adds a topic and serves it back" },
        "GET /api/articles": { "description": "serves an array of all articles", "queries": ["topic", "sort_by", "order", "limit", "p"] },
        "POST /api/articles": { "description": "adds an article and serves it back" },
        "GET /api/articles/:article_id": { "description": "serves a single article with its comment_count" },
        "PATCH /api/articles/:article_id": { "description": "adjusts an article's votes by inc_votes" },
        "DELETE /api/articles/:article_id": { "description": "deletes an article and its comments" },
        "GET /api/articles/:article_id/comments": { "description": "serves the comments for an article, most recent first", "queries": ["limit", "p"] },
        "POST /api/articles/:article_id/comments": { "description": "adds a comment to an article and serves it back" },
        "PATCH /api/comments/:comment_id": { "description": "adjusts a comment's votes by inc_votes" },
        "DELETE /api/comments/:comment_id": { "description": "deletes a comment" },
        "GET /api/users": { "description": "serves an array of all users" },
        "GET /api/users/:username": { "description": "serves a single user" }
    })
});

#[utoipa::path(
    get,
    path = "/api",
    responses((status = 200, description = "Map of available endpoints"))
)]
pub async fn get_api() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "apis": &*ENDPOINTS }))
}

#[utoipa::path(
    get,
    path = "/api/topics",
    responses((status = 200, description = "List topics", body = [Topic]))
)]
pub async fn get_topics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let topics = data.repo.list_topics().await?;
    Ok(HttpResponse::Ok().json(json!({ "topics": topics })))
}

#[utoipa::path(
    post,
    path = "/api/topics",
    request_body = NewTopic,
    responses(
        (status = 201, description = "Topic created", body = Topic),
        (status = 400, description = "Missing or empty fields"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn post_topic(
    data: web::Data<AppState>,
    payload: web::Json<NewTopic>,
) -> Result<HttpResponse, ApiError> {
    let topic = data.repo.create_topic(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "topic": topic })))
}

#[derive(Debug, Deserialize)]
pub struct ArticleListParams {
    sort_by: Option<String>,
    order: Option<String>,
    topic: Option<String>,
    limit: Option<String>,
    p: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/articles",
    params(
        ("sort_by" = Option<String>, Query, description = "Allow-listed article column, default created_at"),
        ("order" = Option<String>, Query, description = "asc or desc, default desc"),
        ("topic" = Option<String>, Query, description = "Filter by topic slug"),
        ("limit" = Option<String>, Query, description = "Page size, default 10"),
        ("p" = Option<String>, Query, description = "Page number, default 1")
    ),
    responses(
        (status = 200, description = "Page of articles plus total_count", body = ArticlePage),
        (status = 400, description = "Invalid sort, order, or pagination"),
        (status = 404, description = "Unknown topic or empty page")
    )
)]
pub async fn get_articles(
    data: web::Data<AppState>,
    params: web::Query<ArticleListParams>,
) -> Result<HttpResponse, ApiError> {
    let query = ArticleQuery::from_raw(
        params.sort_by.as_deref(),
        params.order.as_deref(),
        params.topic.as_deref(),
        params.limit.as_deref(),
        params.p.as_deref(),
    )?;
    let page = data.repo.list_articles(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = NewArticle,
    responses(
        (status = 201, description = "Article created", body = Article),
        (status = 400, description = "Missing fields or unknown author/topic")
    )
)]
pub async fn post_article(
    data: web::Data<AppState>,
    payload: web::Json<NewArticle>,
) -> Result<HttpResponse, ApiError> {
    let article = data.repo.create_article(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "article": article })))
}

#[utoipa::path(
    get,
    path = "/api/articles/{article_id}",
    params(("article_id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Single article with comment_count", body = Article),
        (status = 400, description = "Non-numeric id"),
        (status = 404, description = "No such article")
    )
)]
pub async fn get_article(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let article = data.repo.get_article(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "article": article })))
}

#[utoipa::path(
    patch,
    path = "/api/articles/{article_id}",
    request_body = VotePatch,
    params(("article_id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Updated article", body = Article),
        (status = 400, description = "Non-numeric id or non-integer inc_votes"),
        (status = 404, description = "No such article")
    )
)]
pub async fn patch_article(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<VotePatch>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let article = data.repo.patch_article_votes(id, payload.inc_votes).await?;
    Ok(HttpResponse::Ok().json(json!({ "article": article })))
}

#[utoipa::path(
    delete,
    path = "/api/articles/{article_id}",
    params(("article_id" = String, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article and its comments deleted"),
        (status = 400, description = "Non-numeric id"),
        (status = 404, description = "No such article")
    )
)]
pub async fn delete_article(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    data.repo.delete_article(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    limit: Option<String>,
    p: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/articles/{article_id}/comments",
    params(
        ("article_id" = String, Path, description = "Article id"),
        ("limit" = Option<String>, Query, description = "Page size, default 10"),
        ("p" = Option<String>, Query, description = "Page number, default 1")
    ),
    responses(
        (status = 200, description = "Comments, most recent first", body = [Comment]),
        (status = 400, description = "Non-numeric id or bad pagination"),
        (status = 404, description = "No such article, or no comments")
    )
)]
pub async fn get_article_comments(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let page = PageQuery::from_raw(params.limit.as_deref(), params.p.as_deref())?;
    let comments = data.repo.list_comments(id, page).await?;
    Ok(HttpResponse::Ok().json(json!({ "comments": comments })))
}

#[utoipa::path(
    post,
    path = "/api/articles/{article_id}/comments",
    request_body = NewComment,
    params(("article_id" = String, Path, description = "Article id")),
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Missing username or body"),
        (status = 404, description = "No such article or user")
    )
)]
pub async fn post_comment(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NewComment>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let comment = data.repo.create_comment(id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    patch,
    path = "/api/comments/{comment_id}",
    request_body = VotePatch,
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Updated comment", body = Comment),
        (status = 400, description = "Non-numeric id or non-integer inc_votes"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn patch_comment(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<VotePatch>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let comment = data.repo.patch_comment_votes(id, payload.inc_votes).await?;
    Ok(HttpResponse::Ok().json(json!({ "comment": comment })))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{comment_id}",
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 400, description = "Non-numeric id"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn delete_comment(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    data.repo.delete_comment(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "List users", body = [User]))
)]
pub async fn get_users(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = data.repo.list_users().await?;
    Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[utoipa::path(
    get,
    path = "/api/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Single user", body = User),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(&path).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Catch-all for unmatched paths. Answers 400 by default, 404 when
/// configured the conventional way.
pub async fn route_miss(data: web::Data<AppState>) -> HttpResponse {
    let body = json!({ "error": "bad route" });
    if data.route_miss_not_found {
        HttpResponse::NotFound().json(body)
    } else {
        HttpResponse::BadRequest().json(body)
    }
}
