#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App};
use std::sync::Arc;
use std::time::Duration;

use newsdesk::models::User;
use newsdesk::repo::{inmem::InMemRepo, TopicRepo, UserRepo};
use newsdesk::routes::{config, json_error_handler, AppState};

fn state_with(repo: InMemRepo) -> AppState {
    AppState { repo: Arc::new(repo), route_miss_not_found: false }
}

async fn seeded_repo() -> InMemRepo {
    let repo = InMemRepo::new();
    for username in ["butter_bridge", "icellusedkars", "rogersop"] {
        repo.create_user(User {
            username: username.into(),
            name: username.to_uppercase(),
            avatar_url: "https://example.com/avatar.png".into(),
        })
        .await
        .unwrap();
    }
    repo.create_topic(newsdesk::models::NewTopic {
        slug: "mitch".into(),
        description: "The man, the Mitch".into(),
    })
    .await
    .unwrap();
    repo
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .configure(config),
        )
        .await
    };
}

async fn body_json(resp: actix_web::dev::ServiceResponse) -> serde_json::Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap()
}

#[actix_web::test]
async fn api_index_describes_endpoints() {
    let app = init_app!(state_with(InMemRepo::new()));

    let req = test::TestRequest::get().uri("/api").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v = body_json(resp).await;
    assert!(v["apis"].get("GET /api").is_some());
    assert!(v["apis"].get("GET /api/topics").is_some());
    assert!(v["apis"].get("GET /api/articles").is_some());
}

#[actix_web::test]
async fn unmatched_route_answers_400_by_default_404_when_configured() {
    let app = init_app!(state_with(InMemRepo::new()));
    let req = test::TestRequest::get().uri("/api/topi").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let mut state = state_with(InMemRepo::new());
    state.route_miss_not_found = true;
    let app = init_app!(state);
    let req = test::TestRequest::get().uri("/api/topi").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn topics_round_trip() {
    let app = init_app!(state_with(InMemRepo::new()));

    let req = test::TestRequest::get().uri("/api/topics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await["topics"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::post()
        .uri("/api/topics")
        .set_json(serde_json::json!({"slug": "bob", "description": "dogs"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    assert_eq!(body_json(resp).await["topic"]["slug"], "bob");

    // appears exactly once in a later list
    let req = test::TestRequest::get().uri("/api/topics").to_request();
    let topics = body_json(test::call_service(&app, req).await).await;
    let matches = topics["topics"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|t| t["slug"] == "bob")
        .count();
    assert_eq!(matches, 1);

    // duplicate slug is a client error, not a 500
    let req = test::TestRequest::post()
        .uri("/api/topics")
        .set_json(serde_json::json!({"slug": "bob", "description": "again"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    // empty fields rejected
    let req = test::TestRequest::post()
        .uri("/api/topics")
        .set_json(serde_json::json!({"slug": "", "description": "dogs"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn article_crud_flow() {
    let app = init_app!(state_with(seeded_repo().await));

    // create
    let req = test::TestRequest::post()
        .uri("/api/articles")
        .set_json(serde_json::json!({
            "author": "butter_bridge",
            "title": "Living in the shadow of a great man",
            "body": "I find this existence challenging",
            "topic": "mitch"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created = body_json(resp).await;
    let id = created["article"]["article_id"].as_i64().unwrap();
    assert_eq!(created["article"]["votes"], 0);
    assert_eq!(created["article"]["comment_count"], 0);
    // placeholder image when none supplied
    assert!(created["article"]["article_img_url"]
        .as_str()
        .unwrap()
        .contains("pexels.com"));

    // read, body included on single reads
    let req = test::TestRequest::get().uri(&format!("/api/articles/{id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v = body_json(resp).await;
    assert_eq!(v["article"]["body"], "I find this existence challenging");

    // non-numeric id -> 400, missing id -> 404
    let req = test::TestRequest::get().uri("/api/articles/banana").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::get().uri("/api/articles/9999").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // vote patches accumulate: 100 then 6 -> 106
    let req = test::TestRequest::patch()
        .uri(&format!("/api/articles/{id}"))
        .set_json(serde_json::json!({"inc_votes": 100}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let req = test::TestRequest::patch()
        .uri(&format!("/api/articles/{id}"))
        .set_json(serde_json::json!({"inc_votes": 6}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await["article"]["votes"], 106);
    let req = test::TestRequest::get().uri(&format!("/api/articles/{id}")).to_request();
    assert_eq!(body_json(test::call_service(&app, req).await).await["article"]["votes"], 106);

    // non-integer delta -> 400
    let req = test::TestRequest::patch()
        .uri(&format!("/api/articles/{id}"))
        .set_json(serde_json::json!({"inc_votes": "six"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // a delta that would overflow the counter -> 400, votes untouched
    let req = test::TestRequest::patch()
        .uri(&format!("/api/articles/{id}"))
        .set_json(serde_json::json!({"inc_votes": i64::MAX}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::get().uri(&format!("/api/articles/{id}")).to_request();
    assert_eq!(body_json(test::call_service(&app, req).await).await["article"]["votes"], 106);

    // unknown author / topic on create -> 400
    let req = test::TestRequest::post()
        .uri("/api/articles")
        .set_json(serde_json::json!({
            "author": "nobody", "title": "t", "body": "b", "topic": "mitch"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // delete -> 204, then gone
    let req = test::TestRequest::delete().uri(&format!("/api/articles/{id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);
    let req = test::TestRequest::get().uri(&format!("/api/articles/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn articles_list_validation_and_pagination() {
    let app = init_app!(state_with(seeded_repo().await));

    // nothing inserted yet: the empty page is an error by policy
    let req = test::TestRequest::get().uri("/api/articles").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    for i in 0..8 {
        let req = test::TestRequest::post()
            .uri("/api/articles")
            .set_json(serde_json::json!({
                "author": "butter_bridge",
                "title": format!("article {i}"),
                "body": "b",
                "topic": "mitch"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    // default order: created_at descending, list rows carry no body
    let req = test::TestRequest::get().uri("/api/articles").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v = body_json(resp).await;
    assert_eq!(v["total_count"], 8);
    let articles = v["articles"].as_array().unwrap();
    assert_eq!(articles[0]["title"], "article 7");
    assert!(articles[0].get("body").is_none());

    // explicit sort
    let req = test::TestRequest::get()
        .uri("/api/articles?sort_by=article_id&order=asc&limit=3")
        .to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    let ids: Vec<i64> = v["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["article_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [1, 2, 3]);

    // disjoint pages, stable total_count
    let req = test::TestRequest::get().uri("/api/articles?limit=5&p=1").to_request();
    let p1 = body_json(test::call_service(&app, req).await).await;
    let req = test::TestRequest::get().uri("/api/articles?limit=5&p=2").to_request();
    let p2 = body_json(test::call_service(&app, req).await).await;
    assert_eq!(p1["total_count"], 8);
    assert_eq!(p2["total_count"], 8);
    let ids1: Vec<i64> = p1["articles"].as_array().unwrap().iter().map(|a| a["article_id"].as_i64().unwrap()).collect();
    let ids2: Vec<i64> = p2["articles"].as_array().unwrap().iter().map(|a| a["article_id"].as_i64().unwrap()).collect();
    assert_eq!(ids1.len(), 5);
    assert_eq!(ids2.len(), 3);
    assert!(ids2.iter().all(|id| !ids1.contains(id)));

    // validation failures are 400s
    for uri in [
        "/api/articles?order=sideways",
        "/api/articles?sort_by=passwords",
        "/api/articles?limit=0",
        "/api/articles?limit=ten",
        "/api/articles?p=-1",
        // offset would not fit in i64
        "/api/articles?limit=9223372036854775807&p=3",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400, "{uri}");
    }

    // unknown topic is 404; beyond-the-end page is 404
    let req = test::TestRequest::get().uri("/api/articles?topic=dogs").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::get().uri("/api/articles?limit=5&p=9").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn comment_endpoints() {
    let app = init_app!(state_with(seeded_repo().await));

    let req = test::TestRequest::post()
        .uri("/api/articles")
        .set_json(serde_json::json!({
            "author": "icellusedkars", "title": "commented", "body": "b", "topic": "mitch"
        }))
        .to_request();
    let id = body_json(test::call_service(&app, req).await).await["article"]["article_id"]
        .as_i64()
        .unwrap();

    // no comments yet -> 404 (article itself exists)
    let req = test::TestRequest::get()
        .uri(&format!("/api/articles/{id}/comments"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // create a comment: bare comment object, server-assigned fields
    let req = test::TestRequest::post()
        .uri(&format!("/api/articles/{id}/comments"))
        .set_json(serde_json::json!({"username": "butter_bridge", "body": "hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let comment = body_json(resp).await;
    assert_eq!(comment["votes"], 0);
    assert_eq!(comment["author"], "butter_bridge");
    assert!(comment["comment_id"].as_i64().is_some());
    assert!(comment["created_at"].as_str().is_some());
    let comment_id = comment["comment_id"].as_i64().unwrap();

    // the article's derived count moved up by one
    let req = test::TestRequest::get().uri(&format!("/api/articles/{id}")).to_request();
    let v = body_json(test::call_service(&app, req).await).await;
    assert_eq!(v["article"]["comment_count"], 1);

    // listing returns it
    let req = test::TestRequest::get()
        .uri(&format!("/api/articles/{id}/comments"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await["comments"].as_array().unwrap().len(), 1);

    // gates: unknown article 404, unknown user 404, empty body 400
    let req = test::TestRequest::post()
        .uri("/api/articles/9999/comments")
        .set_json(serde_json::json!({"username": "butter_bridge", "body": "hi"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::post()
        .uri(&format!("/api/articles/{id}/comments"))
        .set_json(serde_json::json!({"username": "ghost", "body": "hi"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::post()
        .uri(&format!("/api/articles/{id}/comments"))
        .set_json(serde_json::json!({"username": "butter_bridge", "body": ""}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // patch comment votes with a signed delta
    let req = test::TestRequest::patch()
        .uri(&format!("/api/comments/{comment_id}"))
        .set_json(serde_json::json!({"inc_votes": 5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await["comment"]["votes"], 5);
    let req = test::TestRequest::patch()
        .uri(&format!("/api/comments/{comment_id}"))
        .set_json(serde_json::json!({"inc_votes": -2}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await["comment"]["votes"], 3);

    // non-numeric comment id -> 400
    let req = test::TestRequest::patch()
        .uri("/api/comments/first")
        .set_json(serde_json::json!({"inc_votes": 1}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // delete comment -> 204, second delete -> 404
    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{comment_id}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{comment_id}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn deleting_an_article_cascades_over_http() {
    let app = init_app!(state_with(seeded_repo().await));

    let req = test::TestRequest::post()
        .uri("/api/articles")
        .set_json(serde_json::json!({
            "author": "rogersop", "title": "doomed", "body": "b", "topic": "mitch"
        }))
        .to_request();
    let id = body_json(test::call_service(&app, req).await).await["article"]["article_id"]
        .as_i64()
        .unwrap();
    let req = test::TestRequest::post()
        .uri(&format!("/api/articles/{id}/comments"))
        .set_json(serde_json::json!({"username": "butter_bridge", "body": "soon gone"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::delete().uri(&format!("/api/articles/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    // both the article and its comments are gone
    let req = test::TestRequest::get().uri(&format!("/api/articles/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::get()
        .uri(&format!("/api/articles/{id}/comments"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn user_endpoints() {
    let app = init_app!(state_with(seeded_repo().await));

    let req = test::TestRequest::get().uri("/api/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).await["users"].as_array().unwrap().len(), 3);

    // single user is a bare object
    let req = test::TestRequest::get().uri("/api/users/butter_bridge").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let user = body_json(resp).await;
    assert_eq!(user["username"], "butter_bridge");
    assert!(user["avatar_url"].as_str().is_some());

    let req = test::TestRequest::get().uri("/api/users/ghost").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
