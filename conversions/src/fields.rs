use serde::de::IntoDeserializer;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request fields that can be declared required or reported as invalid.
///
/// Serialized with the wire names callers send, so configuration and error
/// responses use the same spelling as request bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Field {
    #[serde(rename = "ph", alias = "phone")]
    Phone,
    #[serde(rename = "value")]
    Value,
    #[serde(rename = "currency")]
    Currency,
    #[serde(rename = "PIXEL_ID", alias = "pixel_id")]
    PixelId,
    #[serde(rename = "ACCESS_TOKEN", alias = "access_token")]
    AccessToken,
    #[serde(rename = "source_url", alias = "event_source_url")]
    EventSourceUrl,
    #[serde(rename = "event_name")]
    EventName,
    #[serde(rename = "action_source")]
    ActionSource,
    #[serde(rename = "fbclid", alias = "click_id")]
    ClickId,
    #[serde(rename = "zp", alias = "zip")]
    Zip,
    #[serde(rename = "ct", alias = "city")]
    City,
    #[serde(rename = "st", alias = "state")]
    State,
    #[serde(rename = "client_ip_address")]
    ClientIpAddress,
    #[serde(rename = "client_user_agent")]
    ClientUserAgent,
}

impl Field {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Field::Phone => "ph",
            Field::Value => "value",
            Field::Currency => "currency",
            Field::PixelId => "PIXEL_ID",
            Field::AccessToken => "ACCESS_TOKEN",
            Field::EventSourceUrl => "source_url",
            Field::EventName => "event_name",
            Field::ActionSource => "action_source",
            Field::ClickId => "fbclid",
            Field::Zip => "zp",
            Field::City => "ct",
            Field::State => "st",
            Field::ClientIpAddress => "client_ip_address",
            Field::ClientUserAgent => "client_user_agent",
        }
    }

    /// Looks up a request key, wire name or alias.
    pub fn from_wire(key: &str) -> Option<Field> {
        let deserializer: StrDeserializer<'_, ValueError> = key.into_deserializer();
        Field::deserialize(deserializer).ok()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<pii::IdentityField> for Field {
    fn from(field: pii::IdentityField) -> Self {
        match field {
            pii::IdentityField::Phone => Field::Phone,
            pii::IdentityField::Zip => Field::Zip,
            pii::IdentityField::City => Field::City,
            pii::IdentityField::State => Field::State,
        }
    }
}

/// Fields required when no configuration says otherwise.
pub fn default_required_fields() -> Vec<Field> {
    vec![
        Field::Phone,
        Field::Value,
        Field::PixelId,
        Field::AccessToken,
        Field::EventSourceUrl,
        Field::EventName,
    ]
}
