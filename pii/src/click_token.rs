use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Leading segment of every click token
pub const CLICK_TOKEN_VERSION: &str = "fb";

/// Highest meaningful subdomain index (`www.example.com` is 2)
pub const MAX_SUBDOMAIN_INDEX: u8 = 2;

/// Whole seconds since the Unix epoch; clocks before the epoch read as 0.
pub fn unix_seconds(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// `fb.<subdomain index>.<creation time>.<click id>`
///
/// The creation time is taken from the `now` passed in, so two tokens for
/// the same click id built at different instants differ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClickToken(String);

impl ClickToken {
    pub fn format(click_id: &str, subdomain_index: u8, now: SystemTime) -> Self {
        ClickToken(format!(
            "{CLICK_TOKEN_VERSION}.{subdomain_index}.{}.{click_id}",
            unix_seconds(now)
        ))
    }

    /// Builds a token only when there is a click id to put in it.
    pub fn from_click_id(
        click_id: Option<&str>,
        subdomain_index: u8,
        now: SystemTime,
    ) -> Option<Self> {
        click_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self::format(id, subdomain_index, now))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClickToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
