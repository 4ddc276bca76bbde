mod common;

use axum::http::StatusCode;
use uuid::Uuid;

#[tokio::test]
async fn index_returns_a_page_of_posts() {
    let app = common::app().await;
    let user = app.create_user("index_shape").await;
    app.create_post(user.id, "Пост для главной страницы", None)
        .await;

    // A unique query string gives this test its own cache entry.
    let stamp = Uuid::new_v4();
    let response = app.get(&format!("/?stamp={}", stamp), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    let page = &body["page"];
    assert!(page["object_list"].is_array());
    assert_eq!(page["number"], 1);
    assert!(page["num_pages"].as_i64().unwrap() >= 1);
    assert_eq!(page["has_previous"], false);
}

#[tokio::test]
async fn index_is_served_from_cache_within_the_ttl() {
    let app = common::app().await;
    let user = app.create_user("index_cache").await;
    app.create_post(user.id, "Первый пост", None).await;

    let stamp = Uuid::new_v4();
    let path = format!("/?stamp={}", stamp);
    let first = app.get(&path, None).await;
    assert_eq!(first.status, StatusCode::OK);

    // A write between the two reads must not show up: the cached body is
    // returned verbatim until it expires.
    app.create_post(user.id, "Пост, которого кэш не видит", None)
        .await;
    let second = app.get(&path, None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.json(), second.json());
}

#[tokio::test]
async fn group_page_paginates_by_ten() {
    let app = common::app().await;
    let user = app.create_user("group_pages").await;
    let (group_id, slug) = app.create_group("pagination").await;
    for i in 0..13 {
        app.create_post(user.id, &format!("Пост номер {}", i), Some(group_id))
            .await;
    }

    let response = app.get(&format!("/group/{}/", slug), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["group"]["slug"], slug.as_str());
    assert_eq!(body["page"]["object_list"].as_array().unwrap().len(), 10);
    assert_eq!(body["page"]["number"], 1);
    assert_eq!(body["page"]["num_pages"], 2);
    assert_eq!(body["page"]["has_next"], true);

    let response = app.get(&format!("/group/{}/?page=2", slug), None).await;
    let body = response.json();
    assert_eq!(body["page"]["object_list"].as_array().unwrap().len(), 3);
    assert_eq!(body["page"]["number"], 2);
    assert_eq!(body["page"]["has_next"], false);
    assert_eq!(body["page"]["has_previous"], true);
}

#[tokio::test]
async fn out_of_range_page_numbers_clamp_to_the_last_page() {
    let app = common::app().await;
    let user = app.create_user("group_clamp").await;
    let (group_id, slug) = app.create_group("clamp").await;
    for i in 0..13 {
        app.create_post(user.id, &format!("Пост {}", i), Some(group_id))
            .await;
    }

    // Past the end and below one both land on the last page.
    for query in ["page=999", "page=0", "page=-3"] {
        let response = app
            .get(&format!("/group/{}/?{}", slug, query), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["page"]["number"], 2, "query {}", query);
    }

    // Garbage falls back to the first page instead.
    let response = app.get(&format!("/group/{}/?page=abc", slug), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["page"]["number"], 1);
}

#[tokio::test]
async fn unknown_group_is_a_404_that_names_the_path() {
    let app = common::app().await;
    let slug = format!("no-such-group-{}", Uuid::new_v4());
    let response = app.get(&format!("/group/{}/", slug), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.json();
    assert_eq!(body["error"], "page not found");
    assert_eq!(body["path"], format!("/group/{}/", slug));
}

#[tokio::test]
async fn profile_shows_the_author_and_their_posts() {
    let app = common::app().await;
    let author = app.create_user("profile_author").await;
    app.create_post(author.id, "Мой пост", None).await;

    let response = app
        .get(&format!("/profile/{}/", author.username), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["author"]["username"], author.username.as_str());
    // Email never shows up on the profile page.
    assert!(body["author"].get("email").is_none());
    assert_eq!(body["following"], false);
    assert_eq!(body["page"]["object_list"].as_array().unwrap().len(), 1);
    assert_eq!(body["page"]["object_list"][0]["text"], "Мой пост");
}

#[tokio::test]
async fn profile_reports_following_state_for_the_viewer() {
    let app = common::app().await;
    let viewer = app.create_user("profile_viewer").await;
    let author = app.create_user("profile_followed").await;
    app.get(
        &format!("/profile/{}/follow/", author.username),
        Some(&viewer.session),
    )
    .await;

    let response = app
        .get(
            &format!("/profile/{}/", author.username),
            Some(&viewer.session),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["following"], true);
}

#[tokio::test]
async fn post_detail_has_comments_and_an_empty_comment_form() {
    let app = common::app().await;
    let author = app.create_user("detail_author").await;
    let commenter = app.create_user("detail_commenter").await;
    let post_id = app
        .create_post(author.id, "Пост с комментариями", None)
        .await;
    app.create_comment(post_id, commenter.id, "Первый комментарий")
        .await;
    app.create_comment(post_id, commenter.id, "Второй комментарий")
        .await;

    let response = app.get(&format!("/posts/{}/", post_id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["post"]["text"], "Пост с комментариями");
    assert_eq!(body["post"]["author_username"], author.username.as_str());
    assert_eq!(body["comments"].as_array().unwrap().len(), 2);

    let form = &body["form"];
    assert_eq!(form["fields"][0]["name"], "text");
    assert_eq!(form["fields"][0]["label"], "Текст комментария");
    assert_eq!(form["fields"][0]["help_text"], "Текст нового комментария");
    assert_eq!(form["fields"][0]["value"], "");
}

#[tokio::test]
async fn unknown_and_malformed_post_ids_are_404() {
    let app = common::app().await;

    let response = app.get(&format!("/posts/{}/", Uuid::new_v4()), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/posts/not-a-uuid/", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn about_pages_are_public() {
    let app = common::app().await;

    let response = app.get("/about/author/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Об авторе проекта");

    let response = app.get("/about/tech/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Технологии");
}

#[tokio::test]
async fn unknown_urls_fall_through_to_a_404_with_the_path() {
    let app = common::app().await;
    let response = app.get("/no/such/page/", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.json();
    assert_eq!(body["error"], "page not found");
    assert_eq!(body["path"], "/no/such/page/");
}
