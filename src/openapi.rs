use crate::models::{
    Article, ArticlePage, ArticleSummary, Comment, NewArticle, NewComment, NewTopic, Topic, User,
    VotePatch,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::get_api,
        crate::routes::get_topics,
        crate::routes::post_topic,
        crate::routes::get_articles,
        crate::routes::post_article,
        crate::routes::get_article,
        crate::routes::patch_article,
        crate::routes::delete_article,
        crate::routes::get_article_comments,
        crate::routes::post_comment,
        crate::routes::patch_comment,
        crate::routes::delete_comment,
        crate::routes::get_users,
        crate::routes::get_user,
    ),
    components(schemas(
        Topic, NewTopic, Article, ArticleSummary, ArticlePage, NewArticle,
        Comment, NewComment, User, VotePatch
    )),
    tags(
        (name = "topics", description = "Topic operations"),
        (name = "articles", description = "Article operations"),
        (name = "comments", description = "Comment operations"),
        (name = "users", description = "User operations"),
    )
)]
pub struct ApiDoc;
