//! Incoming event fields and their validation
//!
//! Validation is a pure pre-check: it decides which fields are missing or
//! malformed and brings the identity fields into canonical form, but never
//! hashes anything and never touches the network.

use crate::config::{RouteAction, ValidationConfig};
use crate::fields::Field;
use crate::payload::ActionSource;
use pii::{IdentityField, NormalizedIdentity, PiiError, RawIdentity, StateStrategy};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_EVENT_NAME: &str = "Purchase";

/// An event exactly as the caller sent it.
///
/// Field names follow the wire format (`ph`, `PIXEL_ID`, `source_url`, ...)
/// with descriptive aliases accepted as well.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EventRequest {
    #[serde(rename = "ph", alias = "phone", default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    pub value: Option<Value>,
    pub currency: Option<String>,
    #[serde(
        rename = "PIXEL_ID",
        alias = "pixel_id",
        default,
        deserialize_with = "lenient_string"
    )]
    pub pixel_id: Option<String>,
    #[serde(rename = "ACCESS_TOKEN", alias = "access_token")]
    pub access_token: Option<String>,
    #[serde(rename = "source_url", alias = "event_source_url")]
    pub event_source_url: Option<String>,
    pub event_name: Option<String>,
    pub action_source: Option<String>,
    #[serde(rename = "fbclid", alias = "click_id")]
    pub click_id: Option<String>,
    #[serde(rename = "zp", alias = "zip", default, deserialize_with = "lenient_string")]
    pub zip: Option<String>,
    #[serde(rename = "ct", alias = "city")]
    pub city: Option<String>,
    #[serde(rename = "st", alias = "state")]
    pub state: Option<String>,
    pub client_ip_address: Option<String>,
    pub client_user_agent: Option<String>,
}

/// Renames aliases to wire names. When a field arrives under both, the wire
/// name wins and the alias is ignored.
fn canonicalize(pairs: impl IntoIterator<Item = (String, Value)>) -> Map<String, Value> {
    let mut fields = Map::new();
    let mut aliased = Vec::new();

    for (key, value) in pairs {
        match Field::from_wire(&key) {
            Some(field) if field.as_str() != key => aliased.push((field.as_str(), value)),
            _ => {
                fields.entry(key).or_insert(value);
            }
        }
    }
    for (key, value) in aliased {
        fields.entry(key).or_insert(value);
    }

    fields
}

/// Phone numbers, ZIP codes and pixel ids regularly arrive as JSON numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

impl EventRequest {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice(bytes)? {
            Value::Object(fields) => serde_json::from_value(Value::Object(canonicalize(fields))),
            other => serde_json::from_value(other),
        }
    }

    /// Parses `application/x-www-form-urlencoded` pairs, as found in query
    /// strings and form posts. A repeated key keeps its first value.
    pub fn from_form(encoded: &str) -> Result<Self, serde_json::Error> {
        let pairs = url::form_urlencoded::parse(encoded.as_bytes())
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())));
        serde_json::from_value(Value::Object(canonicalize(pairs)))
    }

    /// Copy safe to echo back to the caller.
    pub fn redacted(&self) -> Self {
        EventRequest {
            access_token: self.access_token.as_ref().map(|_| "[redacted]".to_string()),
            ..self.clone()
        }
    }

    fn is_present(&self, field: Field) -> bool {
        let text = match field {
            Field::Value => {
                return match &self.value {
                    None | Some(Value::Null) => false,
                    Some(Value::String(s)) => !s.trim().is_empty(),
                    Some(_) => true,
                };
            }
            Field::Phone => &self.phone,
            Field::Currency => &self.currency,
            Field::PixelId => &self.pixel_id,
            Field::AccessToken => &self.access_token,
            Field::EventSourceUrl => &self.event_source_url,
            Field::EventName => &self.event_name,
            Field::ActionSource => &self.action_source,
            Field::ClickId => &self.click_id,
            Field::Zip => &self.zip,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::ClientIpAddress => &self.client_ip_address,
            Field::ClientUserAgent => &self.client_user_agent,
        };
        non_empty(text).is_some()
    }

    pub fn validate(&self, rules: &ValidationRules) -> Result<ValidatedEvent, ValidationError> {
        let mut problems: Vec<FieldProblem> = rules
            .required
            .iter()
            .filter(|field| !self.is_present(**field))
            .map(|field| FieldProblem::missing(*field))
            .collect();

        let action_source = match non_empty(&self.action_source) {
            None => ActionSource::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                problems.push(FieldProblem::invalid(
                    Field::ActionSource,
                    format!("must be one of {}", ActionSource::expected()),
                ));
                ActionSource::default()
            }),
        };

        let value = match &self.value {
            None | Some(Value::Null) => None,
            Some(raw) => parse_value(raw)
                .map_err(|reason| problems.push(FieldProblem::invalid(Field::Value, reason)))
                .ok()
                .flatten(),
        };

        let currency = match non_empty(&self.currency) {
            None => DEFAULT_CURRENCY.to_string(),
            Some(raw) if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_alphabetic()) => {
                raw.to_ascii_uppercase()
            }
            Some(_) => {
                problems.push(FieldProblem::invalid(
                    Field::Currency,
                    "must be a three-letter ISO 4217 code",
                ));
                DEFAULT_CURRENCY.to_string()
            }
        };

        let pixel_id = non_empty(&self.pixel_id);
        if let Some(pixel_id) = pixel_id
            && !pixel_id.chars().all(|c| c.is_ascii_digit())
        {
            problems.push(FieldProblem::invalid(Field::PixelId, "must be numeric"));
        }

        let event_source_url = non_empty(&self.event_source_url);
        if let Some(raw) = event_source_url
            && !is_web_url(raw)
        {
            problems.push(FieldProblem::invalid(
                Field::EventSourceUrl,
                "must be an absolute http(s) URL",
            ));
        }

        // Normalized even without a phone so ZIP and state problems are
        // reported in the same response as the missing phone.
        let phone = non_empty(&self.phone);
        let identity = RawIdentity {
            phone: phone.unwrap_or_default().to_string(),
            zip: self.zip.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            click_id: self.click_id.clone(),
        }
        .normalize(rules.state_strategy)
        .map_err(|errors| {
            problems.extend(
                errors
                    .into_iter()
                    .filter(|error| phone.is_some() || error.field() != IdentityField::Phone)
                    .map(|error| {
                        let field = Field::from(error.field());
                        let PiiError::InvalidFormat { reason, .. } = error;
                        FieldProblem::invalid(field, reason)
                    }),
            )
        })
        .ok();

        let identity = match identity {
            Some(identity) if problems.is_empty() => identity,
            Some(_) => return Err(ValidationError::new(problems)),
            None => {
                if !problems.iter().any(|p| p.field == Field::Phone) {
                    problems.push(FieldProblem::missing(Field::Phone));
                }
                return Err(ValidationError::new(problems));
            }
        };

        let destination = match (pixel_id, non_empty(&self.access_token)) {
            (Some(pixel_id), Some(access_token)) => Some(Destination {
                pixel_id: pixel_id.to_string(),
                access_token: access_token.to_string(),
            }),
            _ => None,
        };

        Ok(ValidatedEvent {
            identity,
            value,
            currency,
            event_name: non_empty(&self.event_name)
                .unwrap_or(DEFAULT_EVENT_NAME)
                .to_string(),
            event_source_url: event_source_url.map(str::to_string),
            action_source,
            destination,
            client_ip_address: non_empty(&self.client_ip_address).map(str::to_string),
            client_user_agent: non_empty(&self.client_user_agent).map(str::to_string),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_web_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Numbers pass through untouched; numeric strings (query strings have
/// nothing else) are converted. Zero is a value like any other.
fn parse_value(raw: &Value) -> Result<Option<Number>, &'static str> {
    const REASON: &str = "must be a number";

    match raw {
        Value::Number(n) => Ok(Some(n.clone())),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            if let Ok(int) = s.parse::<i64>() {
                return Ok(Some(Number::from(int)));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Some)
                .ok_or(REASON)
        }
        _ => Err(REASON),
    }
}

/// Which fields a route insists on, and how state values are normalized.
#[derive(Clone, Debug)]
pub struct ValidationRules {
    required: BTreeSet<Field>,
    state_strategy: StateStrategy,
}

impl ValidationRules {
    /// The phone number is always required. Sending additionally needs the
    /// pixel id and access token, whatever the configuration says.
    pub fn new(config: &ValidationConfig, action: RouteAction) -> Self {
        let mut required: BTreeSet<Field> = config.required_fields.iter().copied().collect();
        required.insert(Field::Phone);

        if action == RouteAction::SendEvent {
            required.insert(Field::PixelId);
            required.insert(Field::AccessToken);
        }

        ValidationRules {
            required,
            state_strategy: config.state_strategy,
        }
    }
}

/// Where an event is sent. The access token never shows up in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub pixel_id: String,
    pub access_token: String,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("pixel_id", &self.pixel_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

/// An event that passed validation, identity in canonical form.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedEvent {
    pub identity: NormalizedIdentity,
    pub value: Option<Number>,
    pub currency: String,
    pub event_name: String,
    pub event_source_url: Option<String>,
    pub action_source: ActionSource,
    pub destination: Option<Destination>,
    pub client_ip_address: Option<String>,
    pub client_user_agent: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Missing,
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldProblem {
    pub field: Field,
    pub problem: ProblemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FieldProblem {
    pub fn missing(field: Field) -> Self {
        FieldProblem {
            field,
            problem: ProblemKind::Missing,
            reason: None,
        }
    }

    pub fn invalid(field: Field, reason: impl Into<String>) -> Self {
        FieldProblem {
            field,
            problem: ProblemKind::Invalid,
            reason: Some(reason.into()),
        }
    }
}

/// Every problem found while validating one event.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.problems))]
pub struct ValidationError {
    problems: Vec<FieldProblem>,
}

impl ValidationError {
    pub fn new(problems: Vec<FieldProblem>) -> Self {
        ValidationError { problems }
    }

    pub fn problems(&self) -> &[FieldProblem] {
        &self.problems
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.problems.iter().map(|p| p.field)
    }
}

/// `Missing required fields: a, b; Invalid fields: c (reason)`
fn summarize(problems: &[FieldProblem]) -> String {
    let missing: Vec<&str> = problems
        .iter()
        .filter(|p| p.problem == ProblemKind::Missing)
        .map(|p| p.field.as_str())
        .collect();
    let invalid: Vec<String> = problems
        .iter()
        .filter(|p| p.problem == ProblemKind::Invalid)
        .map(|p| match &p.reason {
            Some(reason) => format!("{} ({reason})", p.field),
            None => p.field.to_string(),
        })
        .collect();

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing required fields: {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!("Invalid fields: {}", invalid.join(", ")));
    }
    if parts.is_empty() {
        return "Invalid request".to_string();
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::default_required_fields;
    use serde_json::json;

    fn send_rules() -> ValidationRules {
        ValidationRules::new(&ValidationConfig::default(), RouteAction::SendEvent)
    }

    fn complete() -> Value {
        json!({
            "ph": "5551234567",
            "value": 0,
            "currency": "USD",
            "PIXEL_ID": "769496975311812",
            "ACCESS_TOKEN": "secret-token",
            "source_url": "https://x.test",
            "event_name": "Purchase",
            "action_source": "website"
        })
    }

    fn request(body: Value) -> EventRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_complete_event_validates() {
        let event = request(complete()).validate(&send_rules()).unwrap();

        assert_eq!(event.identity.phone(), "15551234567");
        assert_eq!(event.value, Some(Number::from(0)));
        assert_eq!(event.currency, "USD");
        assert_eq!(event.event_name, "Purchase");
        assert_eq!(event.event_source_url.as_deref(), Some("https://x.test"));
        assert_eq!(event.action_source, ActionSource::Website);
        assert_eq!(
            event.destination,
            Some(Destination {
                pixel_id: "769496975311812".into(),
                access_token: "secret-token".into(),
            })
        );
    }

    #[test]
    fn test_zero_value_is_not_missing() {
        for value in [json!(0), json!(0.0), json!("0")] {
            let mut body = complete();
            body["value"] = value;
            let event = request(body).validate(&send_rules()).unwrap();
            assert!(event.value.is_some());
        }
    }

    #[test]
    fn test_missing_fields_are_all_named() {
        let mut body = complete();
        let fields = body.as_object_mut().unwrap();
        fields.remove("source_url");
        fields.insert("value".into(), Value::Null);
        fields.insert("event_name".into(), json!("  "));

        let err = request(body).validate(&send_rules()).unwrap_err();
        let fields: Vec<Field> = err.fields().collect();
        assert_eq!(
            fields,
            vec![Field::Value, Field::EventSourceUrl, Field::EventName]
        );
        assert_eq!(
            err.to_string(),
            "Missing required fields: value, source_url, event_name"
        );
    }

    #[test]
    fn test_invalid_action_source() {
        let mut body = complete();
        body["action_source"] = json!("carrier_pigeon");

        let err = request(body).validate(&send_rules()).unwrap_err();
        assert_eq!(
            err.problems(),
            &[FieldProblem::invalid(
                Field::ActionSource,
                format!("must be one of {}", ActionSource::expected())
            )]
        );
    }

    #[test]
    fn test_missing_and_invalid_reported_together() {
        let body = json!({
            "ph": "12",
            "value": "a lot",
            "zp": "abc",
            "currency": "dollars",
            "PIXEL_ID": "pixel/../../me",
            "source_url": "not a url",
            "event_name": "Purchase"
        });

        let err = request(body).validate(&send_rules()).unwrap_err();
        let fields: BTreeSet<Field> = err.fields().collect();
        assert_eq!(
            fields,
            BTreeSet::from([
                Field::AccessToken,
                Field::Value,
                Field::Currency,
                Field::PixelId,
                Field::EventSourceUrl,
                Field::Phone,
                Field::Zip,
            ])
        );
        let message = err.to_string();
        assert!(message.starts_with("Missing required fields: ACCESS_TOKEN; Invalid fields: "));
        assert!(message.contains("ph (phone number must include country code)"));
        assert!(message.contains("zp (invalid ZIP code format)"));
    }

    #[test]
    fn test_phone_always_required() {
        let config = ValidationConfig {
            required_fields: vec![],
            ..Default::default()
        };
        let rules = ValidationRules::new(&config, RouteAction::Acknowledge);

        let err = EventRequest::default().validate(&rules).unwrap_err();
        assert_eq!(err.problems(), &[FieldProblem::missing(Field::Phone)]);
    }

    #[test]
    fn test_missing_phone_still_reports_other_identity_fields() {
        let config = ValidationConfig {
            required_fields: vec![],
            ..Default::default()
        };
        let rules = ValidationRules::new(&config, RouteAction::Acknowledge);
        let event = request(json!({"zp": "abc", "st": "Atlantis", "ct": "Springfield"}));

        let err = event.validate(&rules).unwrap_err();
        let problems = err.problems();
        assert_eq!(problems.len(), 3);
        assert!(problems.contains(&FieldProblem::missing(Field::Phone)));
        assert!(problems.iter().any(|p| p.field == Field::Zip && p.problem == ProblemKind::Invalid));
        assert!(problems.iter().any(|p| p.field == Field::State && p.problem == ProblemKind::Invalid));
        assert!(err.to_string().starts_with("Missing required fields: ph; Invalid fields: "));
    }

    #[test]
    fn test_validation_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(ValidationError::new(vec![]));
        assert_eq!(err.to_string(), "Invalid request");

        let err = ValidationError::new(vec![FieldProblem::invalid(Field::Currency, "too long")]);
        assert_eq!(err.to_string(), "Invalid fields: currency (too long)");
    }

    #[test]
    fn test_send_requires_destination() {
        let config = ValidationConfig {
            required_fields: vec![Field::Phone],
            ..Default::default()
        };
        let send = ValidationRules::new(&config, RouteAction::SendEvent);
        let acknowledge = ValidationRules::new(&config, RouteAction::Acknowledge);
        let event = request(json!({"ph": "5551234567"}));

        let err = event.validate(&send).unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec![Field::PixelId, Field::AccessToken]
        );

        let validated = event.validate(&acknowledge).unwrap();
        assert_eq!(validated.destination, None);
        assert_eq!(validated.event_name, DEFAULT_EVENT_NAME);
        assert_eq!(validated.currency, DEFAULT_CURRENCY);
        assert_eq!(validated.value, None);
        assert_eq!(validated.action_source, ActionSource::Website);
    }

    #[test]
    fn test_numeric_fields_accepted_as_numbers() {
        let event = request(json!({
            "ph": 5551234567u64,
            "zp": 90210,
            "PIXEL_ID": 769496975311812u64,
            "ACCESS_TOKEN": "t",
            "value": 12.5,
        }));
        assert_eq!(event.phone.as_deref(), Some("5551234567"));
        assert_eq!(event.zip.as_deref(), Some("90210"));

        let config = ValidationConfig {
            required_fields: default_required_fields()
                .into_iter()
                .filter(|f| !matches!(f, Field::EventSourceUrl | Field::EventName))
                .collect(),
            ..Default::default()
        };
        let rules = ValidationRules::new(&config, RouteAction::SendEvent);
        let validated = event.validate(&rules).unwrap();
        assert_eq!(validated.identity.zip(), Some("90210"));
        assert_eq!(validated.value, Number::from_f64(12.5));
    }

    #[test]
    fn test_aliases_and_form_encoding() {
        let event = EventRequest::from_form(
            "phone=%28555%29+123-4567&value=19.99&pixel_id=1&access_token=t&event_source_url=https%3A%2F%2Fshop.test%2Fthanks&event_name=Purchase&click_id=abc&zip=SW1A+1AA&city=London&state=CA",
        )
        .unwrap();

        assert_eq!(event.phone.as_deref(), Some("(555) 123-4567"));
        assert_eq!(event.value, Some(json!("19.99")));
        assert_eq!(event.event_source_url.as_deref(), Some("https://shop.test/thanks"));
        assert_eq!(event.click_id.as_deref(), Some("abc"));

        let validated = event.validate(&send_rules()).unwrap();
        assert_eq!(validated.value, Number::from_f64(19.99));
        assert_eq!(validated.identity.zip(), Some("sw1a1aa"));
        assert_eq!(validated.identity.city(), Some("london"));
        assert_eq!(validated.identity.state(), Some("ca"));
        assert_eq!(validated.identity.click_id(), Some("abc"));
    }

    #[test]
    fn test_wire_name_wins_over_alias() {
        let event = EventRequest::from_form("phone=999&ph=5551234567&zip=11111&zp=90210").unwrap();
        assert_eq!(event.phone.as_deref(), Some("5551234567"));
        assert_eq!(event.zip.as_deref(), Some("90210"));

        let event =
            EventRequest::from_json(br#"{"ph": "5551234567", "phone": "999", "city": "Boston"}"#)
                .unwrap();
        assert_eq!(event.phone.as_deref(), Some("5551234567"));
        assert_eq!(event.city.as_deref(), Some("Boston"));
    }

    #[test]
    fn test_repeated_form_key_keeps_first_value() {
        let event = EventRequest::from_form("ph=5551234567&ph=999&phone=888").unwrap();
        assert_eq!(event.phone.as_deref(), Some("5551234567"));

        let event = EventRequest::from_form("phone=5551234567&phone=999").unwrap();
        assert_eq!(event.phone.as_deref(), Some("5551234567"));
    }

    #[test]
    fn test_rejects_structured_phone() {
        assert!(EventRequest::from_json(br#"{"ph": {"number": "5551234567"}}"#).is_err());
    }

    #[test]
    fn test_redacted_hides_token() {
        let event = request(complete()).redacted();
        assert_eq!(event.access_token.as_deref(), Some("[redacted]"));
        assert_eq!(event.pixel_id.as_deref(), Some("769496975311812"));
        assert_eq!(EventRequest::default().redacted().access_token, None);
    }

    #[test]
    fn test_destination_debug_hides_token() {
        let destination = Destination {
            pixel_id: "1".into(),
            access_token: "secret-token".into(),
        };
        assert!(!format!("{destination:?}").contains("secret-token"));
    }

    #[test]
    fn test_currency_is_uppercased() {
        let mut body = complete();
        body["currency"] = json!("eur");
        let event = request(body).validate(&send_rules()).unwrap();
        assert_eq!(event.currency, "EUR");
    }
}
