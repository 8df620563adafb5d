use crate::fields::{Field, default_required_fields};
use pii::{MAX_SUBDOMAIN_INDEX, StateStrategy};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Subdomain index {0} is out of range (0-2)")]
    InvalidSubdomainIndex(u8),

    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("Upstream API version must look like 'v18.0', got {0:?}")]
    InvalidApiVersion(String),

    #[error("Upstream base URL must be http or https: {0}")]
    InvalidBaseUrl(Url),

    #[error("max_body_bytes cannot be 0")]
    InvalidBodyLimit,

    #[error("No routes configured")]
    NoRoutes,

    #[error("Route path must start with '/': {0}")]
    InvalidRoutePath(String),

    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),
}

/// HTTP methods supported for route matching
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_method(&self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

impl PartialEq<http::Method> for HttpMethod {
    fn eq(&self, other: &http::Method) -> bool {
        self.as_method() == *other
    }
}

/// What to do with a request that matched a route
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Validate, hash, and forward the event to the conversions API
    SendEvent,
    /// Validate only and echo the received fields back
    Acknowledge,
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming events
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub click_token: ClickTokenConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub client_context: ClientContextConfig,
    /// Largest request body accepted, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Request routing rules, first match wins
    pub routes: Vec<Route>,
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.upstream.validate()?;

        if self.click_token.subdomain_index > MAX_SUBDOMAIN_INDEX {
            return Err(ConfigValidationError::InvalidSubdomainIndex(
                self.click_token.subdomain_index,
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigValidationError::InvalidBodyLimit);
        }

        if self.routes.is_empty() {
            return Err(ConfigValidationError::NoRoutes);
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !route.r#match.path.starts_with('/') {
                return Err(ConfigValidationError::InvalidRoutePath(
                    route.r#match.path.clone(),
                ));
            }

            if !seen.insert((&route.r#match.path, route.r#match.method)) {
                let method = route
                    .r#match
                    .method
                    .map(|m| m.as_method().to_string())
                    .unwrap_or_else(|| "*".to_string());
                return Err(ConfigValidationError::DuplicateRoute(format!(
                    "{method} {}",
                    route.r#match.path
                )));
            }
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Conversions API endpoint settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub api_version: String,
    /// Bound on the whole upstream exchange, body included
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: Url::parse("https://graph.facebook.com").expect("static URL parses"),
            api_version: "v18.0".into(),
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        let version_ok = self.api_version.strip_prefix('v').is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.')
        });
        if !version_ok {
            return Err(ConfigValidationError::InvalidApiVersion(
                self.api_version.clone(),
            ));
        }

        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ConfigValidationError::InvalidBaseUrl(self.base_url.clone()));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClickTokenConfig {
    /// 0 when events come from a bare domain, 1 for one subdomain level, 2 for two
    pub subdomain_index: u8,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub required_fields: Vec<Field>,
    pub state_strategy: StateStrategy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            required_fields: default_required_fields(),
            state_strategy: StateStrategy::default(),
        }
    }
}

/// Fallbacks for client IP and user agent when the body leaves them out
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientContextConfig {
    /// Only enable behind a proxy that sets the forwarding headers
    pub from_headers: bool,
}

/// Routing rule configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Route {
    pub r#match: Match,
    pub action: RouteAction,
}

/// Request matching criteria
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Match {
    /// Exact path to match (e.g., "/api/purchase")
    pub path: String,
    /// Optional HTTP method to match; any method when absent
    pub method: Option<HttpMethod>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            listener: Listener {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            admin_listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            upstream: UpstreamConfig::default(),
            click_token: ClickTokenConfig::default(),
            validation: ValidationConfig::default(),
            client_context: ClientContextConfig::default(),
            max_body_bytes: 1024,
            routes: vec![Route {
                r#match: Match {
                    path: "/api/purchase".to_string(),
                    method: Some(HttpMethod::Post),
                },
                action: RouteAction::SendEvent,
            }],
        }
    }

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
listener:
    host: "0.0.0.0"
    port: 3000
admin_listener:
    host: "127.0.0.1"
    port: 3001
upstream:
    base_url: "https://graph.example.test"
    api_version: v19.0
    timeout_secs: 5
click_token:
    subdomain_index: 1
validation:
    required_fields: [ph, value, PIXEL_ID, ACCESS_TOKEN]
    state_strategy: truncate
client_context:
    from_headers: true
routes:
    - match:
        path: /api/purchase
        method: POST
      action: send_event
    - match:
        path: /api/purchase
        method: GET
      action: acknowledge
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.upstream.api_version, "v19.0");
        assert_eq!(config.upstream.timeout_secs, 5);
        assert_eq!(config.click_token.subdomain_index, 1);
        assert_eq!(config.validation.required_fields.len(), 4);
        assert_eq!(config.validation.state_strategy, StateStrategy::Truncate);
        assert!(config.client_context.from_headers);
        assert_eq!(config.max_body_bytes, 64 * 1024);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].r#match.method, Some(HttpMethod::Get));
        assert_eq!(config.routes[1].action, RouteAction::Acknowledge);
    }

    #[test]
    fn test_defaults() {
        let yaml = r#"
listener: {host: "0.0.0.0", port: 3000}
admin_listener: {host: "127.0.0.1", port: 3001}
routes:
    - match: {path: /events}
      action: send_event
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.upstream, UpstreamConfig::default());
        assert_eq!(
            config.upstream.base_url.as_str(),
            "https://graph.facebook.com/"
        );
        assert_eq!(config.click_token.subdomain_index, 0);
        assert_eq!(config.validation.required_fields, default_required_fields());
        assert_eq!(config.validation.state_strategy, StateStrategy::CodeList);
        assert!(!config.client_context.from_headers);
        assert_eq!(config.routes[0].r#match.method, None);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = base_config();
        config.listener.port = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidPort
        ));

        let mut config = base_config();
        config.click_token.subdomain_index = 3;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidSubdomainIndex(3)
        ));

        let mut config = base_config();
        config.upstream.timeout_secs = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidTimeout
        ));

        for version in ["18.0", "v", "vlatest"] {
            let mut config = base_config();
            config.upstream.api_version = version.to_string();
            assert!(matches!(
                config.validate().unwrap_err(),
                ConfigValidationError::InvalidApiVersion(_)
            ));
        }

        let mut config = base_config();
        config.upstream.base_url = Url::parse("ftp://graph.example.test").unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidBaseUrl(_)
        ));

        let mut config = base_config();
        config.max_body_bytes = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidBodyLimit
        ));

        let mut config = base_config();
        config.routes.clear();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::NoRoutes
        ));

        let mut config = base_config();
        config.routes[0].r#match.path = "api/purchase".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidRoutePath(_)
        ));

        let mut config = base_config();
        let duplicate = config.routes[0].clone();
        config.routes.push(duplicate);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Duplicate route: POST /api/purchase");
    }

    #[test]
    fn test_deserialization_errors() {
        // Invalid URL
        assert!(
            serde_yaml::from_str::<UpstreamConfig>(r#"{base_url: "not-a-url"}"#).is_err()
        );

        // Invalid port type
        assert!(
            serde_yaml::from_str::<Listener>(r#"{host: "0.0.0.0", port: "not_a_number"}"#)
                .is_err()
        );

        // Unknown required field name
        assert!(
            serde_yaml::from_str::<ValidationConfig>("required_fields: [ph, carrier_pigeon]")
                .is_err()
        );

        // Invalid HTTP method and action
        assert!(serde_yaml::from_str::<HttpMethod>("INVALID_METHOD").is_err());
        assert!(serde_yaml::from_str::<RouteAction>("forward").is_err());
    }

    #[test]
    fn test_http_method_matches_request_method() {
        assert!(HttpMethod::Post == http::Method::POST);
        assert!(HttpMethod::Get != http::Method::POST);
    }
}
