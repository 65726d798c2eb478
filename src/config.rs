use core::fmt;
use std::path::PathBuf;

use compact_str::{CompactString, format_compact};
use reqwest::Url;

pub mod constants {
    use core::time::Duration;

    macro_rules! env_or_default {
        ($name:expr, $default:expr) => {
            if let Some(s) = option_env!($name) {
                s
            } else {
                $default
            }
        };
    }

    pub const MEMBER_BASE: &str =
        env_or_default!("CHAMP_MEMBER_BASE", "https://member.hackers.com");
    pub const CHAMP_BASE: &str = env_or_default!("CHAMP_BASE", "https://champ.hackers.com");
    pub const SERVICE_ID: &str = "3090";
    pub const DEFAULT_ODRI_ID: &str = "1493945512";
    pub const COOKIE_FILE_NAME: &str = "champ_attendance_cookies.json";

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
}

/// Login identifier and secret; immutable once read.
#[derive(Clone)]
pub struct Credentials {
    pub login_id: CompactString,
    password: String,
}

impl Credentials {
    pub fn new(login_id: impl Into<CompactString>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: password.into(),
        }
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Every URL the session talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub login_page: String,
    pub login_post: String,
    pub account: String,
    pub home: String,
    /// JSON endpoint consulted when the account page has no `cal_list`.
    pub ajax: Option<String>,
}

impl Endpoints {
    /// Production endpoints for the given lecture resource id.
    pub fn production(odri_id: &str) -> Self {
        use constants::{CHAMP_BASE, MEMBER_BASE};
        Self::with_bases(MEMBER_BASE, CHAMP_BASE, odri_id)
    }

    /// Same layout as production, rooted at arbitrary origins.
    pub fn with_bases(member: &str, champ: &str, odri_id: &str) -> Self {
        let home = format!("{champ}/");
        let login_post = format!("{member}/login");
        let query = [("service_id", constants::SERVICE_ID), ("return_url", home.as_str())];
        Self {
            login_page: Url::parse_with_params(&login_post, query)
                .map_or_else(|_| login_post.clone(), String::from),
            login_post,
            account: format!(
                "{champ}/?r=champstudy&c=mypage/my_lec/my_lec_refund\
                 &sub=refund_class_view&odri_id={odri_id}"
            ),
            ajax: Some(home.clone()),
            home,
        }
    }

    #[must_use]
    pub fn without_ajax(mut self) -> Self {
        self.ajax = None;
        self
    }

    /// Origin (scheme + host) of the login service, sent as `Origin`.
    pub fn login_origin(&self) -> CompactString {
        Url::parse(&self.login_post).map_or_else(
            |_| CompactString::default(),
            |u| format_compact!("{}", u.origin().ascii_serialization()),
        )
    }
}

/// `<cache_dir>/champ_attendance_cookies.json`, or the working directory when
/// the platform has no cache directory.
pub fn default_cookie_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_default()
        .join(constants::COOKIE_FILE_NAME)
}
