//! Client IP and user agent fallbacks taken from request headers.
//!
//! Only trustworthy behind a reverse proxy that overwrites these headers,
//! which is why it is off unless configured.

use crate::event::EventRequest;
use http::HeaderMap;
use http::header::USER_AGENT;
use std::net::IpAddr;

/// Header priority for IP extraction, highest first.
const IP_HEADERS: &[&str] = &[
    "cf-connecting-ip", // Cloudflare
    "x-real-ip",        // Nginx
    "x-forwarded-for",  // first IP in chain
];

pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    IP_HEADERS.iter().find_map(|header| {
        headers
            .get(*header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .and_then(|ip| ip.parse::<IpAddr>().ok())
    })
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .map(str::to_string)
}

/// Fills client IP and user agent from headers where the event has none.
/// Values sent in the event always win.
pub fn apply(event: &mut EventRequest, headers: &HeaderMap) {
    if is_blank(&event.client_ip_address) {
        event.client_ip_address = client_ip(headers).map(|ip| ip.to_string());
    }
    if is_blank(&event.client_user_agent) {
        event.client_user_agent = user_agent(headers);
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
