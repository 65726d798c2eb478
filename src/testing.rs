//! In-process stand-in for the remote site, served by axum on a loopback port.
//!
//! Layout mirrors production with both origins on one server: `GET /login`
//! (form), `POST /login`, `GET /?c=...` (account page), `GET /` (home) and
//! `POST /` (JSON endpoint).

use core::{
    ops::Deref,
    sync::atomic::{AtomicUsize, Ordering},
};
use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{
        StatusCode,
        header::{CONTENT_TYPE, LOCATION, SET_COOKIE},
    },
    response::{Html, IntoResponse, Response},
    routing::get,
};
use reqwest::Url;
use tokio::net::TcpListener;

use crate::{
    config::{Credentials, Endpoints},
    scrape::Session,
};

const ODRI_ID: &str = "1";
const ACCOUNT_PATH: &str =
    "/?r=champstudy&c=mypage/my_lec/my_lec_refund&sub=refund_class_view&odri_id=1";

#[derive(Debug, Clone, Copy)]
pub enum AccountReply {
    Redirect,
    Body(&'static str),
}

#[derive(Debug, Default)]
pub struct Hits {
    pub login_page: AtomicUsize,
    pub login_post: AtomicUsize,
    pub account: AtomicUsize,
    pub home: AtomicUsize,
    pub ajax: AtomicUsize,
}

pub struct Site {
    token: Option<&'static str>,
    login_to_account: bool,
    ajax: Option<&'static str>,
    /// Popped per account GET; the last one repeats.
    replies: Mutex<VecDeque<AccountReply>>,
    form: Mutex<Option<HashMap<String, String>>>,
    ajax_form: Mutex<Option<HashMap<String, String>>>,
    pub hits: Hits,
}

pub struct FakeSite(Arc<Site>);

impl Deref for FakeSite {
    type Target = Site;

    fn deref(&self) -> &Site {
        &self.0
    }
}

impl FakeSite {
    pub fn new(token: Option<&'static str>, replies: Vec<AccountReply>) -> Self {
        Self(Arc::new(Site {
            token,
            login_to_account: false,
            ajax: None,
            replies: Mutex::new(replies.into()),
            form: Mutex::default(),
            ajax_form: Mutex::default(),
            hits: Hits::default(),
        }))
    }

    fn site_mut(&mut self) -> &mut Site {
        Arc::get_mut(&mut self.0).expect("site configured before serving")
    }

    pub fn login_redirect_to_account(mut self) -> Self {
        self.site_mut().login_to_account = true;
        self
    }

    pub fn with_ajax(mut self, body: &'static str) -> Self {
        self.site_mut().ajax = Some(body);
        self
    }

    pub fn last_form(&self) -> Option<HashMap<String, String>> {
        self.form.lock().unwrap().clone()
    }

    pub fn last_ajax_date(&self) -> Option<String> {
        self.ajax_form
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|f| f.get("now_date").cloned())
    }

    /// Serves the site and returns a fresh session pointed at it, with a
    /// cookie file path that does not exist yet.
    pub async fn session(&self, name: &str) -> (Session, PathBuf) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new()
            .route("/login", get(login_page).post(login_post))
            .route("/", get(root).post(ajax))
            .with_state(Arc::clone(&self.0));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        make_session(&base, name)
    }

    /// A session whose endpoints point at a port nobody listens on.
    pub async fn dead_session(name: &str) -> (Session, PathBuf) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        make_session(&base, name)
    }
}

fn make_session(base: &str, name: &str) -> (Session, PathBuf) {
    let path = std::env::temp_dir().join(format!("attend-{}-{name}.json", std::process::id()));
    crate::cookies::remove(&path);
    let session = Session::new(
        Credentials::new("student", "secret"),
        Endpoints::with_bases(base, base, ODRI_ID),
        path.clone(),
    )
    .unwrap();
    (session, path)
}

/// Puts a cookie in the jar as if a previous run had logged in.
pub fn seed_cookie(session: &Session) {
    let url = Url::parse(&session.endpoints.home).unwrap();
    session
        .jar
        .lock()
        .unwrap()
        .parse("hackers=seeded; Path=/", &url)
        .unwrap();
}

async fn login_page(State(site): State<Arc<Site>>) -> Html<String> {
    site.hits.login_page.fetch_add(1, Ordering::SeqCst);
    let token = site.token.map_or_else(String::new, |t| {
        format!(r#"<input type="hidden" name="_token" value="{t}">"#)
    });
    Html(format!(
        r#"<html><body><form method="post" action="/login">{token}
<input name="login_id"><input name="password" type="password">
</form></body></html>"#
    ))
}

async fn login_post(
    State(site): State<Arc<Site>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    site.hits.login_post.fetch_add(1, Ordering::SeqCst);
    let rejected = form.get("_token").is_none_or(String::is_empty);
    *site.form.lock().unwrap() = Some(form);
    if rejected {
        return StatusCode::from_u16(419).unwrap().into_response();
    }
    let location = if site.login_to_account { ACCOUNT_PATH } else { "/" };
    (
        StatusCode::FOUND,
        [(SET_COOKIE, "hackers=session; Path=/"), (LOCATION, location)],
    )
        .into_response()
}

async fn root(
    State(site): State<Arc<Site>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !query.contains_key("c") {
        site.hits.home.fetch_add(1, Ordering::SeqCst);
        return Html("<html><body>home</body></html>").into_response();
    }

    site.hits.account.fetch_add(1, Ordering::SeqCst);
    let reply = {
        let mut replies = site.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().copied()
        }
    };
    match reply {
        Some(AccountReply::Redirect) => {
            (StatusCode::FOUND, [(LOCATION, "/login")]).into_response()
        }
        Some(AccountReply::Body(body)) => Html(body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn ajax(
    State(site): State<Arc<Site>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    site.hits.ajax.fetch_add(1, Ordering::SeqCst);
    *site.ajax_form.lock().unwrap() = Some(form);
    match site.ajax {
        Some(body) => ([(CONTENT_TYPE, "application/json")], body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Captures the `content` of every webhook POST.
pub struct Webhook {
    pub url: String,
    received: Arc<Mutex<Vec<String>>>,
}

impl Webhook {
    pub async fn spawn() -> Self {
        let received = Arc::<Mutex<Vec<String>>>::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let app = Router::new()
            .route("/hook", axum::routing::post(hook))
            .with_state(Arc::clone(&received));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Self { url, received }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

async fn hook(
    State(received): State<Arc<Mutex<Vec<String>>>>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> StatusCode {
    let content = body["content"].as_str().unwrap_or_default().to_owned();
    received.lock().unwrap().push(content);
    StatusCode::NO_CONTENT
}
