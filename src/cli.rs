use std::path::PathBuf;

use crate::{
    config::{Credentials, Endpoints, constants, default_cookie_path},
    scrape::Session,
};

/// Options shared by every binary that talks to the site.
#[derive(clap::Args)]
pub struct SessionArgs {
    /// Hackers login id.
    #[arg(long, env = "HACKERS_ID")]
    pub login_id: String,
    #[arg(long, env = "HACKERS_PW", hide_env_values = true)]
    pub password: String,
    /// Lecture resource id on the refund attendance page.
    #[arg(long, env = "CHAMP_ODRI_ID", default_value = constants::DEFAULT_ODRI_ID)]
    pub odri_id: String,
    /// Where the cookie jar is kept between runs.
    #[arg(long, env = "CHAMP_COOKIE_FILE", value_name = "file")]
    pub cookie_file: Option<PathBuf>,
    /// Never fall back to the JSON attendance endpoint.
    #[arg(long)]
    pub no_ajax: bool,
    /// Discard stored cookies and log in from scratch.
    #[arg(long)]
    pub fresh: bool,
}

impl SessionArgs {
    pub fn cookie_path(&self) -> PathBuf {
        self.cookie_file.clone().unwrap_or_else(default_cookie_path)
    }

    pub fn into_session(self) -> reqwest::Result<Session> {
        let cookie_path = self.cookie_path();
        if self.fresh {
            crate::cookies::remove(&cookie_path);
        }
        let mut endpoints = Endpoints::production(&self.odri_id);
        if self.no_ajax {
            endpoints = endpoints.without_ajax();
        }
        Session::new(
            Credentials::new(self.login_id, self.password),
            endpoints,
            cookie_path,
        )
    }
}
