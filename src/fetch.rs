use chrono::NaiveDate;
use compact_str::{CompactString, format_compact};
use reqwest::header::{ACCEPT, HeaderValue};

use crate::{
    decision::{self, Attendance, Clock},
    error::{Error, Result},
    login::login,
    parse::{self, AjaxAttendance, AttendanceMap},
    scrape::Session,
};

/// Account page round trips per fetch. Each failed attempt costs one login.
pub const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// A map together with where it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub map: AttendanceMap,
    /// Weekly list HTML, present when the JSON endpoint answered.
    pub weekly: Option<String>,
}

enum Attempt {
    Done(Fetched),
    Expired(CompactString),
}

pub struct Fetcher<C> {
    session: Session,
    state: SessionState,
    clock: C,
}

impl<C: Clock> Fetcher<C> {
    /// A session with stored cookies is presumed logged in until the site
    /// says otherwise.
    pub fn new(session: Session, clock: C) -> Self {
        let state = if session.has_cookies() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };
        tracing::debug!(target: "fetch", "initial state: {state:?}");
        Self {
            session,
            state,
            clock,
        }
    }

    #[inline]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn fetch_attendance_map(&mut self) -> Result<AttendanceMap> {
        self.fetch().await.map(|f| f.map)
    }

    /// Runs the login/fetch machine. Login and transport failures end it at
    /// once; expiry (a redirect, a logged-out page, missing or malformed
    /// data) drops back to `Unauthenticated` until `MAX_ATTEMPTS` is spent.
    pub async fn fetch(&mut self) -> Result<Fetched> {
        let mut last = CompactString::default();
        for attempt in 1..=MAX_ATTEMPTS {
            if self.state == SessionState::Unauthenticated {
                login(&self.session).await?;
                self.state = SessionState::Authenticated;
            }

            match self.attempt().await? {
                Attempt::Done(fetched) => {
                    let n = fetched.map.len();
                    tracing::info!(target: "fetch", "\x1b[36m{n} dates\x1b[0m (try {attempt})");
                    return Ok(fetched);
                }
                Attempt::Expired(reason) => {
                    tracing::warn!(target: "fetch", "attempt {attempt}/{MAX_ATTEMPTS}: {reason}");
                    self.state = SessionState::Unauthenticated;
                    last = reason;
                }
            }
        }

        Err(Error::Fetch {
            attempts: MAX_ATTEMPTS,
            last: last.into(),
        })
    }

    async fn attempt(&self) -> Result<Attempt> {
        let response = self
            .session
            .client
            .get(&self.session.endpoints.account)
            .send()
            .await?;

        let status = response.status();
        if status.is_redirection() {
            let reason = format_compact!("account page redirected ({status})");
            return Ok(Attempt::Expired(reason));
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Ok(Attempt::Expired(format_compact!("account page answered {status}")));
        }
        if parse::is_logged_out(&body) {
            return Ok(Attempt::Expired("account page is logged out".into()));
        }

        match parse::extract_cal_list(&body) {
            Some(Ok(map)) => return Ok(Attempt::Done(Fetched { map, weekly: None })),
            Some(Err(e)) => return Ok(Attempt::Expired(format_compact!("{e}"))),
            None => tracing::debug!(target: "fetch", "no cal_list on the account page"),
        }

        let Some(ajax) = &self.session.endpoints.ajax else {
            return Ok(Attempt::Expired("no cal_list and no fallback endpoint".into()));
        };
        match self.ajax(ajax, self.clock.today()).await {
            Ok(fetched) => Ok(Attempt::Done(fetched)),
            Err(Error::Parse(e)) => Ok(Attempt::Expired(format_compact!("fallback: {e}"))),
            Err(e) => Err(e),
        }
    }

    async fn ajax(&self, url: &str, today: NaiveDate) -> Result<Fetched> {
        let now_date = decision::date_key(today);
        let form = [
            ("r", "champstudy"),
            ("m", "mypage"),
            ("a", "attend_list.ajax"),
            ("now_date", now_date.as_str()),
        ];
        let response = self
            .session
            .client
            .post(url)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
            )
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Parse(format!("status {status}")));
        }
        let ajax = AjaxAttendance::from_body(&response.text().await?)?;
        Ok(Fetched {
            map: ajax.to_map()?,
            weekly: Some(ajax.list),
        })
    }
}

/// Fetch + decide for the fetcher's own clock.
pub async fn check_attendance<C: Clock>(fetcher: &mut Fetcher<C>) -> Result<Attendance> {
    let Fetched { map, weekly } = fetcher.fetch().await?;
    let date = fetcher.clock().today();
    Ok(Attendance {
        date,
        present: decision::is_present_on(&map, date),
        map,
        weekly,
    })
}
