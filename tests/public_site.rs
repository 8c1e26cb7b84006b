mod common;

use common::{select_attrs, select_texts, spawn};

#[tokio::test]
async fn home_shows_gallery_and_newest_listings() {
    let site = spawn().await;
    let response = site.get("/").await;
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();

    let featured = select_texts(&html, "article.card h3");
    assert_eq!(
        featured,
        vec!["Penthouse Royale", "Green Meadows 3BHK", "Business Park Office"]
    );
    let gallery_links = select_attrs(&html, ".gallery figure a", "href");
    assert!(gallery_links.contains(&"/listings/urban-studio".to_string()));
    assert!(html.contains("https://wa.me/919812345678"));
}

#[tokio::test]
async fn listings_filter_by_kind_and_bedrooms() {
    let site = spawn().await;

    let html = site.get("/listings").await.text().await.unwrap();
    assert_eq!(select_texts(&html, "article.card h3").len(), 6);

    let html = site.get("/listings?kind=villa").await.text().await.unwrap();
    assert_eq!(select_texts(&html, "article.card h3"), vec!["Seaside Luxury Villa"]);

    let html = site
        .get("/listings?kind=&min_bedrooms=3&min_price=")
        .await
        .text()
        .await
        .unwrap();
    let titles = select_texts(&html, "article.card h3");
    assert_eq!(titles.len(), 3);
    assert!(titles.iter().all(|t| t != "Urban Studio"));
}

#[tokio::test]
async fn detail_by_slug_shows_formatted_price() {
    let site = spawn().await;
    let response = site.get("/listings/urban-studio").await;
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();
    assert_eq!(select_texts(&html, "h1"), vec!["Urban Studio"]);
    assert_eq!(select_texts(&html, ".price-card .price"), vec!["₹32,00,000"]);
    // the enquiry link names the property
    let whatsapp = select_attrs(&html, ".detail .button.whatsapp", "href");
    assert!(whatsapp[0].contains("Urban%20Studio"));
}

#[tokio::test]
async fn detail_falls_back_to_id_when_slug_misses() {
    let site = spawn().await;
    let response = site.get("/listings/p3").await;
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();
    assert_eq!(select_texts(&html, "h1"), vec!["Urban Studio"]);
}

#[tokio::test]
async fn unknown_property_and_page_render_not_found() {
    let site = spawn().await;

    let response = site.get("/listings/no-such-home").await;
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().contains("find that property"));

    let response = site.get("/nowhere").await;
    assert_eq!(response.status(), 404);
    let html = response.text().await.unwrap();
    assert_eq!(select_texts(&html, "h1"), vec!["Not found"]);
}

#[tokio::test]
async fn callback_dialog_opens_from_query_flag() {
    let site = spawn().await;

    let closed = site.get("/about").await.text().await.unwrap();
    assert!(select_texts(&closed, "dialog").is_empty());

    let open = site.get("/about?callback=open").await.text().await.unwrap();
    assert_eq!(select_attrs(&open, "dialog form", "action"), vec!["/callback"]);
    assert_eq!(
        select_attrs(&open, "dialog input[name=return_to]", "value"),
        vec!["/about"]
    );
}

#[tokio::test]
async fn callback_request_is_relayed_and_redirects_back() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/callback"))
        .form(&[
            ("name", "Ravi"),
            ("phone", "+91 98111 22233"),
            ("notes", "Evenings please"),
            ("return_to", "/listings/urban-studio"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(
        response.headers()["location"],
        "/listings/urban-studio?callback=sent"
    );

    let sent = site.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[Website Callback] Ravi");
    assert!(sent[0].text.contains("Evenings please"));
}

#[tokio::test]
async fn invalid_callback_reopens_dialog_with_error() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/callback"))
        .form(&[("name", "Ravi"), ("phone", "12"), ("return_to", "/about")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let html = response.text().await.unwrap();
    assert_eq!(
        select_texts(&html, "dialog .error"),
        vec!["Please enter a valid phone number"]
    );
    assert_eq!(select_attrs(&html, "dialog input[name=name]", "value"), vec!["Ravi"]);
    assert!(site.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn contact_form_rejects_short_message() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/contact"))
        .form(&[
            ("name", "Asha"),
            ("email", "asha@example.com"),
            ("subject", "Visit"),
            ("message", "short"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let html = response.text().await.unwrap();
    assert!(html.contains("Message must be at least 10 characters"));
    assert_eq!(
        select_attrs(&html, "input[name=email]", "value"),
        vec!["asha@example.com"]
    );
}

#[tokio::test]
async fn contact_form_sends_message() {
    let site = spawn().await;
    let response = site
        .http
        .post(site.url("/contact"))
        .form(&[
            ("name", "Asha"),
            ("email", "asha@example.com"),
            ("subject", "Visit"),
            ("message", "Can I see the villa on Saturday?"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Your message has been sent"));
    let sent = site.mailer.sent().await;
    assert_eq!(sent[0].subject, "[Website Contact] Visit");
    assert_eq!(sent[0].reply_to.as_deref(), Some("asha@example.com"));
}

#[tokio::test]
async fn static_assets_are_served() {
    let site = spawn().await;
    let response = site.get("/static/placeholder.svg").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("<svg"));
    assert_eq!(site.get("/static/site.css").await.status(), 200);
}
