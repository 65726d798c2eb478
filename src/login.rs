use reqwest::{Client, StatusCode, Url, header::LOCATION};

use crate::{
    error::{Error, Result},
    parse,
    scrape::Session,
};

const MAX_REDIRECT_HOPS: usize = 5;

/// Fetches the login form, submits the credentials and leaves the session's
/// jar holding cookies for both the member and the lecture domain. The jar is
/// persisted on success.
///
/// A page without an anti-forgery token is not an error here: the form is
/// posted with an empty token and the server's answer decides.
pub async fn login(session: &Session) -> Result<()> {
    let Session {
        client,
        credentials,
        endpoints,
        ..
    } = session;

    tracing::info!(target: "login", "\x1b[33mlogging in\x1b[0m as {}", credentials.login_id);

    let page = client
        .get(&endpoints.login_page)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let token = parse::extract_token(&page).unwrap_or_else(|| {
        tracing::warn!(target: "login", "no _token on the login page, posting an empty one");
        Default::default()
    });

    let form = [
        ("_token", token.as_str()),
        ("login_id", credentials.login_id.as_str()),
        ("password", credentials.password()),
        ("keep_login", "on"),
    ];
    let response = client
        .post(&endpoints.login_post)
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK && status != StatusCode::FOUND {
        tracing::error!(target: "login", "\x1b[31mlogin rejected\x1b[0m: {status}");
        return Err(Error::Auth { status });
    }

    if status == StatusCode::FOUND {
        if let Some(location) = location_of(&response) {
            follow(client, location, Url::parse(&endpoints.account).ok().as_ref()).await;
        }
    }

    // The login response only sets member-domain cookies; the lecture site
    // issues its own on first visit.
    match client.get(&endpoints.home).send().await {
        Ok(r) => tracing::debug!(target: "login", "home visited: {}", r.status()),
        Err(e) => tracing::warn!(target: "login", "home visit failed: {e}"),
    }

    session.persist()?;
    tracing::info!(target: "login", "\x1b[36mlogged in\x1b[0m");
    Ok(())
}

fn location_of(response: &reqwest::Response) -> Option<Url> {
    let raw = response.headers().get(LOCATION)?.to_str().ok()?;
    match response.url().join(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(target: "login", "unusable Location {raw:?}: {e}");
            None
        }
    }
}

/// GETs along a redirect chain, stopping short of `stop` (the account page,
/// which the fetcher requests itself and counts against its attempts).
async fn follow(client: &Client, mut url: Url, stop: Option<&Url>) {
    for _ in 0..MAX_REDIRECT_HOPS {
        if stop == Some(&url) {
            tracing::debug!(target: "login", "redirect reached the account page, not following");
            return;
        }
        tracing::debug!(target: "login", "following redirect to {url}");
        let response = match client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "login", "redirect to {url} failed: {e}");
                return;
            }
        };
        if !response.status().is_redirection() {
            return;
        }
        match location_of(&response) {
            Some(next) => url = next,
            None => return,
        }
    }
    tracing::warn!(target: "login", "stopped after {MAX_REDIRECT_HOPS} redirects at {url}");
}
