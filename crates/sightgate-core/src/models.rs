//! Domain models
//!
//! The classification produced by the vision service, the routing decision made
//! from it, and the metadata mapping written next to the routed object.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ACCEPTED_CONTAINER, META_ADULT_SCORE, META_IS_ADULT, META_IS_RACY, META_RACY_SCORE,
    REJECTED_CONTAINER,
};

/// Key/value metadata attached to a stored object, separate from its bytes.
pub type ObjectMetadata = BTreeMap<String, String>;

/// Image contents buffered for one invocation.
///
/// Immutable once loaded; clones share the same buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes(Bytes);

impl ImageBytes {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// A cheap handle to the underlying buffer, e.g. for a request body.
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of one classification pass over an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_adult_content: bool,
    pub adult_score: f32,
    pub is_racy_content: bool,
    pub racy_score: f32,
    pub request_id: String,
}

impl ClassificationResult {
    /// Whether either classifier flag is raised.
    pub fn is_flagged(&self) -> bool {
        self.is_adult_content || self.is_racy_content
    }
}

/// One of the two fixed destination containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Accepted,
    Rejected,
}

impl Destination {
    pub fn container(&self) -> &'static str {
        match self {
            Destination::Accepted => ACCEPTED_CONTAINER,
            Destination::Rejected => REJECTED_CONTAINER,
        }
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.container())
    }
}

/// Pick the destination for a pair of classifier flags.
///
/// Anything adult or racy is rejected; only a fully clean result is accepted.
pub fn route(is_adult_content: bool, is_racy_content: bool) -> Destination {
    if is_adult_content || is_racy_content {
        Destination::Rejected
    } else {
        Destination::Accepted
    }
}

/// Render a boolean flag the way it is stored in object metadata.
pub fn format_flag(flag: bool) -> String {
    let text = if flag { "True" } else { "False" };
    text.to_string()
}

/// Render a probability in `[0, 1]` as a whole percentage, e.g. `0.873` -> `"87%"`.
///
/// Rounds half away from zero on the score's shortest decimal form, so `0.285`
/// renders as `"29%"` even though the nearest `f32` is slightly below it.
/// The result never contains whitespace.
pub fn format_score(score: f32) -> String {
    format!("{}%", whole_percent(score))
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn whole_percent(score: f32) -> i64 {
    let fallback = || (f64::from(score) * 100.0).round() as i64;
    if !score.is_finite() || score.abs() >= 1.0e9 {
        return fallback();
    }

    // `Display` for floats never uses exponent notation.
    let decimal = score.abs().to_string();
    let (whole, fraction) = decimal.split_once('.').unwrap_or((decimal.as_str(), ""));
    let Ok(whole) = whole.parse::<i64>() else {
        return fallback();
    };
    let digit = |i: usize| {
        fraction
            .as_bytes()
            .get(i)
            .map_or(0, |b| i64::from(b.saturating_sub(b'0')))
    };

    let mut percent = whole * 100 + digit(0) * 10 + digit(1);
    if digit(2) >= 5 {
        percent += 1;
    }
    if score.is_sign_negative() {
        -percent
    } else {
        percent
    }
}

/// Destination container plus the metadata mapping derived from a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationRecord {
    pub destination: Destination,
    pub metadata: ObjectMetadata,
}

impl DestinationRecord {
    /// Always yields exactly the four classification keys.
    pub fn from_classification(result: &ClassificationResult) -> Self {
        let mut metadata = ObjectMetadata::new();
        metadata.insert(META_IS_ADULT.to_string(), format_flag(result.is_adult_content));
        metadata.insert(META_ADULT_SCORE.to_string(), format_score(result.adult_score));
        metadata.insert(META_IS_RACY.to_string(), format_flag(result.is_racy_content));
        metadata.insert(META_RACY_SCORE.to_string(), format_score(result.racy_score));

        Self {
            destination: route(result.is_adult_content, result.is_racy_content),
            metadata,
        }
    }

    pub fn container(&self) -> &'static str {
        self.destination.container()
    }
}
