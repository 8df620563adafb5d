use crate::error::PiiError;
use crate::hash::hash;
use crate::normalize::{normalize_city, normalize_phone, normalize_zip};
use crate::state::{StateStrategy, normalize_state};

/// Identity fields as the caller sent them
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawIdentity {
    pub phone: String,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub click_id: Option<String>,
}

/// Canonical pre-hash form. Only obtainable through [`RawIdentity::normalize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedIdentity {
    phone: String,
    zip: Option<String>,
    city: Option<String>,
    state: Option<String>,
    click_id: Option<String>,
}

/// SHA-256 hex digests of the normalized fields. The click id is not hashed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashedIdentity {
    pub phone: String,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl RawIdentity {
    /// Normalizes every field, reporting all failures rather than the first.
    ///
    /// Optional fields that are blank, or that normalize to nothing (a city
    /// made only of digits), are dropped instead of being hashed as empty
    /// strings.
    pub fn normalize(
        &self,
        state_strategy: StateStrategy,
    ) -> Result<NormalizedIdentity, Vec<PiiError>> {
        let mut errors = Vec::new();

        let phone = normalize_phone(&self.phone).map_err(|e| errors.push(e)).ok();

        let zip = present(&self.zip)
            .and_then(|zip| normalize_zip(zip).map_err(|e| errors.push(e)).ok());

        let city = present(&self.city)
            .map(normalize_city)
            .filter(|city| !city.is_empty());

        let state = present(&self.state)
            .and_then(|state| {
                normalize_state(state, state_strategy)
                    .map_err(|e| errors.push(e))
                    .ok()
            })
            .filter(|state| !state.is_empty());

        let click_id = present(&self.click_id).map(str::to_string);

        match phone {
            Some(phone) if errors.is_empty() => Ok(NormalizedIdentity {
                phone,
                zip,
                city,
                state,
                click_id,
            }),
            _ => Err(errors),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl NormalizedIdentity {
    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn zip(&self) -> Option<&str> {
        self.zip.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn click_id(&self) -> Option<&str> {
        self.click_id.as_deref()
    }

    pub fn hash(&self) -> HashedIdentity {
        HashedIdentity {
            phone: hash(&self.phone),
            zip: self.zip.as_deref().map(hash),
            city: self.city.as_deref().map(hash),
            state: self.state.as_deref().map(hash),
        }
    }
}
