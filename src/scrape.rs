use std::{path::PathBuf, sync::Arc};

use reqwest::{
    Client, redirect,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER},
};
use reqwest_cookie_store::CookieStoreMutex;

use crate::{
    config::{Credentials, Endpoints, constants},
    cookies,
};

pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36",
);

/// Client with the shared jar, fixed headers and no automatic redirects.
pub fn basic(jar: Arc<CookieStoreMutex>, endpoints: &Endpoints) -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    if let Ok(origin) = HeaderValue::from_str(&endpoints.login_origin()) {
        headers.insert(ORIGIN, origin);
    }
    if let Ok(referer) = HeaderValue::from_str(&endpoints.login_page) {
        headers.insert(REFERER, referer);
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .cookie_provider(jar)
        .redirect(redirect::Policy::none())
        .connect_timeout(constants::CONNECT_TIMEOUT)
        .timeout(constants::REQUEST_TIMEOUT)
        .build()
}

/// One authenticated conversation with the site: client, jar, where the jar
/// lives on disk, who logs in, and which URLs to hit.
pub struct Session {
    pub client: Client,
    pub jar: Arc<CookieStoreMutex>,
    pub cookie_path: PathBuf,
    pub credentials: Credentials,
    pub endpoints: Endpoints,
}

impl Session {
    /// Loads the persisted jar from `cookie_path` and builds the client on it.
    pub fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        cookie_path: PathBuf,
    ) -> reqwest::Result<Self> {
        let jar = Arc::new(CookieStoreMutex::new(cookies::load(&cookie_path)));
        let client = basic(Arc::clone(&jar), &endpoints)?;
        Ok(Self {
            client,
            jar,
            cookie_path,
            credentials,
            endpoints,
        })
    }

    #[inline]
    pub fn has_cookies(&self) -> bool {
        !cookies::is_empty(&self.jar)
    }

    pub fn persist(&self) -> crate::Result<()> {
        cookies::save(&self.jar, &self.cookie_path)
    }
}
