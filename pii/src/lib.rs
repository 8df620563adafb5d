//! Customer identity normalization and hashing
//!
//! Raw identity fields arrive with arbitrary casing and punctuation. Before
//! they leave the relay they are brought into the canonical form the
//! conversions API matches on and then SHA-256 hashed:
//!
//! ```text
//! RawIdentity --normalize--> NormalizedIdentity --hash--> HashedIdentity
//! ```
//!
//! Hashing is only reachable through [`NormalizedIdentity::hash`], so raw
//! input never gets digested by accident.

mod click_token;
mod error;
mod hash;
mod identity;
mod normalize;
mod state;

pub use click_token::{CLICK_TOKEN_VERSION, ClickToken, MAX_SUBDOMAIN_INDEX, unix_seconds};
pub use error::{IdentityField, PiiError};
pub use hash::{DIGEST_HEX_LEN, hash};
pub use identity::{HashedIdentity, NormalizedIdentity, RawIdentity};
pub use normalize::{normalize_city, normalize_phone, normalize_zip};
pub use state::{StateStrategy, normalize_state};
