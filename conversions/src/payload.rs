//! Conversions API request body
//!
//! ```json
//! {"data": [{
//!     "event_name": "Purchase",
//!     "event_time": 1700000000,
//!     "user_data": {"ph": ["<sha256>"], "fbc": "fb.0.1700000000.IwAR..."},
//!     "custom_data": {"value": 42.5, "currency": "USD"},
//!     "event_source_url": "https://shop.example/thanks",
//!     "action_source": "website"
//! }]}
//! ```

use crate::event::ValidatedEvent;
use pii::{ClickToken, unix_seconds};
use serde::Serialize;
use serde_json::Number;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// Where the conversion took place
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    #[default]
    Website,
    App,
    Email,
    PhoneCall,
    Chat,
    PhysicalStore,
    SystemGenerated,
    BusinessMessaging,
    Other,
}

impl ActionSource {
    pub const ALL: [ActionSource; 9] = [
        ActionSource::Website,
        ActionSource::App,
        ActionSource::Email,
        ActionSource::PhoneCall,
        ActionSource::Chat,
        ActionSource::PhysicalStore,
        ActionSource::SystemGenerated,
        ActionSource::BusinessMessaging,
        ActionSource::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ActionSource::Website => "website",
            ActionSource::App => "app",
            ActionSource::Email => "email",
            ActionSource::PhoneCall => "phone_call",
            ActionSource::Chat => "chat",
            ActionSource::PhysicalStore => "physical_store",
            ActionSource::SystemGenerated => "system_generated",
            ActionSource::BusinessMessaging => "business_messaging",
            ActionSource::Other => "other",
        }
    }

    /// Accepted values, comma separated, for error messages.
    pub fn expected() -> String {
        Self::ALL
            .iter()
            .map(ActionSource::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown action source {0:?}, expected one of {expected}", expected = ActionSource::expected())]
pub struct UnknownActionSource(pub String);

impl FromStr for ActionSource {
    type Err = UnknownActionSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| UnknownActionSource(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub data: Vec<ServerEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerEvent {
    pub event_name: String,
    /// Unix seconds
    pub event_time: u64,
    pub user_data: UserData,
    pub custom_data: CustomData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source_url: Option<String>,
    pub action_source: ActionSource,
}

/// Hashed identity. Every hashed field is a one-element array.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserData {
    pub ph: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zp: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<ClickToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,
    pub currency: String,
}

/// Turns validated events into the hashed envelope.
#[derive(Clone, Copy, Debug)]
pub struct Assembler {
    subdomain_index: u8,
}

impl Assembler {
    pub fn new(subdomain_index: u8) -> Self {
        Assembler { subdomain_index }
    }

    /// `now` is used for both the event time and the click token, so the
    /// two always agree.
    pub fn assemble(&self, event: &ValidatedEvent, now: SystemTime) -> EventEnvelope {
        let hashed = event.identity.hash();
        let fbc =
            ClickToken::from_click_id(event.identity.click_id(), self.subdomain_index, now);

        let user_data = UserData {
            ph: vec![hashed.phone],
            zp: hashed.zip.map(|h| vec![h]),
            ct: hashed.city.map(|h| vec![h]),
            st: hashed.state.map(|h| vec![h]),
            fbc,
            client_ip_address: event.client_ip_address.clone(),
            client_user_agent: event.client_user_agent.clone(),
        };

        EventEnvelope {
            data: vec![ServerEvent {
                event_name: event.event_name.clone(),
                event_time: unix_seconds(now),
                user_data,
                custom_data: CustomData {
                    value: event.value.clone(),
                    currency: event.currency.clone(),
                },
                event_source_url: event.event_source_url.clone(),
                action_source: event.action_source,
            }],
        }
    }
}
