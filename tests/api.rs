mod common;

use common::{select_texts, spawn, spawn_with, SiteOptions, WEBHOOK_SECRET};
use estate_showcase::backends::CatalogBackend;
use estate_showcase::models::PropertyFields;
use serde_json::{json, Value};

#[tokio::test]
async fn contact_api_reports_short_message() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/api/contact"))
        .json(&json!({
            "name": "Asha",
            "email": "asha@example.com",
            "subject": "Visit",
            "message": "short"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("at least 10 characters"));
    assert!(site.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn contact_api_validation_messages_are_distinct() {
    let site = spawn().await;
    let cases = [
        (json!({"email": "a@b.co", "subject": "s", "message": "long enough text"}), "Name is required"),
        (json!({"name": "A", "email": "a@b", "subject": "s", "message": "long enough text"}), "Valid email is required"),
        (json!({"name": "A", "email": "a@b.co", "message": "long enough text"}), "Subject is required"),
    ];
    for (payload, expected) in cases {
        let response = site
            .http
            .post(site.url("/api/contact"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], expected);
    }
}

#[tokio::test]
async fn contact_api_relays_valid_message() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/api/contact"))
        .json(&json!({
            "name": "Asha",
            "email": "asha@example.com",
            "subject": "Visit",
            "message": "Is the villa still available?"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "ok": true }));
    assert_eq!(site.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn lead_endpoints_are_rate_limited_per_client() {
    let site = spawn().await;
    let send = |ip: &'static str| {
        site.http
            .post(site.url("/api/callback"))
            .header("x-forwarded-for", ip)
            .json(&json!({ "name": "Ravi", "phone": "9811122233" }))
            .send()
    };
    for _ in 0..10 {
        assert_eq!(send("203.0.113.5").await.unwrap().status(), 200);
    }
    let limited = send("203.0.113.5").await.unwrap();
    assert_eq!(limited.status(), 429);
    assert!(limited.headers().contains_key("retry-after"));

    // another client is unaffected
    assert_eq!(send("198.51.100.9").await.unwrap().status(), 200);
}

#[tokio::test]
async fn webhook_rejects_wrong_secret() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/api/revalidate"))
        .header("x-webhook-secret", "guess")
        .json(&json!({ "paths": ["/"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn webhook_requires_paths() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/api/revalidate"))
        .header("x-webhook-secret", WEBHOOK_SECRET)
        .json(&json!({ "paths": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.json::<Value>().await.unwrap()["ok"], false);
}

#[tokio::test]
async fn webhook_refreshes_cached_pages() {
    let site = spawn().await;
    let count = |html: String| select_texts(&html, "article.card h3").len();

    assert_eq!(count(site.get("/listings").await.text().await.unwrap()), 6);

    site.catalog
        .create_property(
            "token",
            PropertyFields {
                title: "Lake View Villa".to_string(),
                slug: "lake-view-villa".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // still served from the page cache
    assert_eq!(count(site.get("/listings").await.text().await.unwrap()), 6);

    let response = site
        .http
        .post(site.url("/api/revalidate"))
        .header("x-webhook-secret", WEBHOOK_SECRET)
        .json(&json!({ "paths": ["/listings/"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({ "revalidated": true, "paths": ["/listings/"] })
    );
    assert_eq!(count(site.get("/listings").await.text().await.unwrap()), 7);
}

#[tokio::test]
async fn webhook_accepts_admin_bearer_token() {
    let site = spawn().await;
    let token = site.token().await;
    let response = site
        .http
        .post(site.url("/api/revalidate"))
        .bearer_auth(&token)
        .json(&json!({ "paths": ["/"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn allow_list_keeps_other_accounts_out() {
    let site = spawn_with(SiteOptions {
        vars: vec![("ADMIN_EMAILS", "someone-else@example.com")],
        ..Default::default()
    })
    .await;
    let response = site
        .http
        .post(site.url("/admin/login"))
        .form(&[("email", common::ADMIN_EMAIL), ("password", common::ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert!(response.headers().get("set-cookie").is_none());

    let response = site
        .http
        .post(site.url("/api/revalidate"))
        .bearer_auth("not-a-session")
        .json(&json!({ "paths": ["/"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn reorder_api_requires_session_and_saves_order() {
    let site = spawn().await;
    let payload = json!({ "image_ids": ["p1-img3", "p1-img1", "p1-img2"] });

    let response = site
        .http
        .put(site.url("/api/admin/properties/p1/images/order"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let token = site.token().await;
    let response = site
        .http
        .put(site.url("/api/admin/properties/p1/images/order"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let images = site.catalog.list_images("p1").await.unwrap();
    let ids: Vec<&str> = images.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["p1-img3", "p1-img1", "p1-img2"]);
}

#[tokio::test]
async fn reorder_api_rejects_lists_that_are_not_the_whole_gallery() {
    let site = spawn().await;
    let token = site.token().await;
    let snapshot = |id: &'static str| {
        let catalog = site.catalog.clone();
        async move {
            catalog
                .list_images(id)
                .await
                .unwrap()
                .into_iter()
                .map(|i| (i.id, i.display_order))
                .collect::<Vec<_>>()
        }
    };
    let p1_before = snapshot("p1").await;
    let p2_before = snapshot("p2").await;

    for image_ids in [
        json!(["p1-img3"]),
        json!(["p2-img3", "p2-img3"]),
        json!(["p1-img1", "p1-img2", "p2-img1"]),
    ] {
        let response = site
            .http
            .put(site.url("/api/admin/properties/p1/images/order"))
            .bearer_auth(&token)
            .json(&json!({ "image_ids": image_ids }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    assert_eq!(snapshot("p1").await, p1_before);
    assert_eq!(snapshot("p2").await, p2_before);
}
