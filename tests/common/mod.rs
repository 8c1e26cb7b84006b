#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use estate_showcase::backends::{Backends, MemoryAuth, MemoryCatalog, MemoryStorage, ObjectStorage};
use estate_showcase::leads::{LeadRelay, RecordingMailer};
use estate_showcase::{router, AppState, Config};
use scraper::{Html, Selector};
use tokio::net::TcpListener;

pub const ADMIN_EMAIL: &str = "owner@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse";
pub const WEBHOOK_SECRET: &str = "s3cret";

/// A running site on an ephemeral port, backed by in-memory fakes
pub struct TestSite {
    pub base: String,
    pub catalog: Arc<MemoryCatalog>,
    pub storage: Option<Arc<MemoryStorage>>,
    pub mailer: Arc<RecordingMailer>,
    pub http: reqwest::Client,
}

pub struct SiteOptions {
    pub bucket: Option<&'static str>,
    pub catalog: MemoryCatalog,
    pub vars: Vec<(&'static str, &'static str)>,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            bucket: None,
            catalog: MemoryCatalog::seeded(),
            vars: Vec::new(),
        }
    }
}

pub async fn spawn() -> TestSite {
    spawn_with(SiteOptions::default()).await
}

pub async fn spawn_with(options: SiteOptions) -> TestSite {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("REVALIDATE_SECRET".to_string(), WEBHOOK_SECRET.to_string()),
        ("WHATSAPP_NUMBER".to_string(), "+91 98123 45678".to_string()),
    ]);
    for (k, v) in &options.vars {
        vars.insert(k.to_string(), v.to_string());
    }
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();

    let catalog = Arc::new(options.catalog);
    let storage = options.bucket.map(|b| Arc::new(MemoryStorage::new(b)));
    let mailer = Arc::new(RecordingMailer::new());
    let backends = Backends {
        catalog: catalog.clone(),
        storage: storage.clone().map(|s| s as Arc<dyn ObjectStorage>),
        auth: Arc::new(MemoryAuth::new().with_account(ADMIN_EMAIL, ADMIN_PASSWORD)),
        media: storage.clone(),
    };
    let state = AppState::with_leads(&config, backends, LeadRelay::with_mailer(mailer.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    TestSite {
        base: format!("http://{}", addr),
        catalog,
        storage,
        mailer,
        http,
    }
}

impl TestSite {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http.get(self.url(path)).send().await.unwrap()
    }

    /// Sign in through the login form and return the session cookie header value
    pub async fn login(&self) -> String {
        let response = self
            .http
            .post(self.url("/admin/login"))
            .form(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 303);
        let set_cookie = response
            .headers()
            .get("set-cookie")
            .expect("session cookie")
            .to_str()
            .unwrap()
            .to_string();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Bearer token straight from a fresh login cookie
    pub async fn token(&self) -> String {
        let cookie = self.login().await;
        cookie.split_once('=').unwrap().1.to_string()
    }
}

pub fn select_texts(html: &str, selector: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect()
}

pub fn select_attrs(html: &str, selector: &str, attr: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr).map(str::to_string))
        .collect()
}
