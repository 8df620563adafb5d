use crate::error::{IdentityField, PiiError};
use serde::Deserialize;

/// How a raw state value is turned into a two-letter code
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateStrategy {
    /// First two characters of the trimmed, lowercased value. Wrong for most
    /// full state names ("new york" becomes "ne").
    Truncate,
    /// Two-letter code or full name of a US state or territory, looked up in
    /// a fixed table. Anything else is rejected.
    #[default]
    CodeList,
}

// (code, name with everything outside a-z removed)
static STATES: &[(&str, &str)] = &[
    ("al", "alabama"),
    ("ak", "alaska"),
    ("az", "arizona"),
    ("ar", "arkansas"),
    ("ca", "california"),
    ("co", "colorado"),
    ("ct", "connecticut"),
    ("de", "delaware"),
    ("fl", "florida"),
    ("ga", "georgia"),
    ("hi", "hawaii"),
    ("id", "idaho"),
    ("il", "illinois"),
    ("in", "indiana"),
    ("ia", "iowa"),
    ("ks", "kansas"),
    ("ky", "kentucky"),
    ("la", "louisiana"),
    ("me", "maine"),
    ("md", "maryland"),
    ("ma", "massachusetts"),
    ("mi", "michigan"),
    ("mn", "minnesota"),
    ("ms", "mississippi"),
    ("mo", "missouri"),
    ("mt", "montana"),
    ("ne", "nebraska"),
    ("nv", "nevada"),
    ("nh", "newhampshire"),
    ("nj", "newjersey"),
    ("nm", "newmexico"),
    ("ny", "newyork"),
    ("nc", "northcarolina"),
    ("nd", "northdakota"),
    ("oh", "ohio"),
    ("ok", "oklahoma"),
    ("or", "oregon"),
    ("pa", "pennsylvania"),
    ("ri", "rhodeisland"),
    ("sc", "southcarolina"),
    ("sd", "southdakota"),
    ("tn", "tennessee"),
    ("tx", "texas"),
    ("ut", "utah"),
    ("vt", "vermont"),
    ("va", "virginia"),
    ("wa", "washington"),
    ("wv", "westvirginia"),
    ("wi", "wisconsin"),
    ("wy", "wyoming"),
    ("dc", "districtofcolumbia"),
    ("as", "americansamoa"),
    ("gu", "guam"),
    ("mp", "northernmarianaislands"),
    ("pr", "puertorico"),
    ("vi", "usvirginislands"),
];

pub fn normalize_state(raw: &str, strategy: StateStrategy) -> Result<String, PiiError> {
    let lowered = raw.trim().to_lowercase();

    match strategy {
        StateStrategy::Truncate => Ok(lowered.chars().take(2).collect()),
        StateStrategy::CodeList => {
            let key: String = lowered.chars().filter(char::is_ascii_lowercase).collect();

            STATES
                .iter()
                .find(|(code, name)| *code == key || *name == key)
                .map(|(code, _)| code.to_string())
                .ok_or_else(|| {
                    PiiError::invalid(IdentityField::State, "not a known state code or name")
                })
        }
    }
}
