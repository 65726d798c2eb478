//! Pure extraction of the data embedded in the site's pages.
//!
//! Nothing here touches the network, so every function can be exercised
//! against frozen documents.

use std::sync::LazyLock;

use compact_str::CompactString;
use hashbrown::HashMap;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Date (`YYYY-MM-DD`) to presence marker.
pub type AttendanceMap = HashMap<CompactString, CompactString>;

pub const PRESENT: &str = "Y";

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="_token"\s+value="([^"]+)""#).unwrap());
static CAL_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)cal_list\s*=\s*(\{[^}]*\})").unwrap());
static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\}").unwrap());
static SEL_TOKEN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[name="_token"]"#).unwrap());
static SEL_LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="login_id"], input[name="password"]"#).unwrap()
});

/// Substrings that only appear on pages served to a logged-out visitor.
const LOGGED_OUT_MARKERS: [&str; 3] = [
    "location.href='https://member.hackers.com/login",
    "로그인이 필요",
    "login_required",
];

/// The login form's anti-forgery token, if the page still carries one.
pub fn extract_token(html: &str) -> Option<CompactString> {
    let document = Html::parse_document(html);
    if let Some(value) = document
        .select(&SEL_TOKEN)
        .find_map(|input| input.attr("value"))
        .filter(|v| !v.is_empty())
    {
        return Some(value.into());
    }
    TOKEN
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().into())
}

/// Heuristic: does this page look like it was served to someone logged out?
pub fn is_logged_out(html: &str) -> bool {
    if LOGGED_OUT_MARKERS.iter().any(|m| html.contains(m)) {
        return true;
    }
    Html::parse_document(html)
        .select(&SEL_LOGIN_FORM)
        .next()
        .is_some()
}

/// Finds `cal_list = { ... }` in a page and parses it.
///
/// Returns `None` when the assignment is absent and `Some(Err(_))` when it is
/// present but not a date-to-marker object. Single-quoted and double-quoted
/// literals are both accepted, as is a trailing comma.
pub fn extract_cal_list(html: &str) -> Option<Result<AttendanceMap>> {
    let literal = CAL_LIST.captures(html)?.get(1)?.as_str();
    Some(parse_object_literal(literal))
}

fn parse_object_literal(literal: &str) -> Result<AttendanceMap> {
    let normalized = literal.replace('\'', "\"");
    let normalized = TRAILING_COMMA.replace_all(&normalized, "}");
    let raw = serde_json::from_str::<HashMap<CompactString, Value>>(&normalized)
        .map_err(|e| Error::Parse(format!("cal_list {literal:?}: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|(date, marker)| (date, marker_of(marker)))
        .collect())
}

fn marker_of(value: Value) -> CompactString {
    match value {
        Value::String(s) => s.into(),
        Value::Bool(true) => PRESENT.into(),
        Value::Null | Value::Bool(false) => CompactString::default(),
        other => other.to_string().into(),
    }
}

/// Body of the `attend_list.ajax` endpoint.
#[derive(Debug, Deserialize)]
pub struct AjaxAttendance {
    /// Absent on error bodies such as a login-required answer.
    #[serde(default)]
    pub check_date_list: Option<Value>,
    /// Rendered weekly list; kept only so callers can dump it.
    #[serde(default)]
    pub list: String,
}

impl AjaxAttendance {
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("ajax body: {e}")))
    }

    /// `check_date_list` in the same shape as `cal_list`. The endpoint sends
    /// an object when there are entries and `[]` (or a list of dates) when not.
    /// A body without the field is not an attendance answer at all.
    pub fn to_map(&self) -> Result<AttendanceMap> {
        let Some(list) = self.check_date_list.as_ref().filter(|v| !v.is_null()) else {
            return Err(Error::Parse("ajax body has no check_date_list".into()));
        };
        match list {
            Value::Object(o) => Ok(o
                .iter()
                .map(|(k, v)| (k.as_str().into(), marker_of(v.clone())))
                .collect()),
            Value::Array(a) => a
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok((s.as_str().into(), PRESENT.into())),
                    other => Err(Error::Parse(format!("check_date_list item {other}"))),
                })
                .collect(),
            other => Err(Error::Parse(format!("check_date_list is {other}"))),
        }
    }
}
