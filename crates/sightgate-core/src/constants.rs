/// Container the trigger reads new uploads from.
pub const DEFAULT_SOURCE_CONTAINER: &str = "uploaded";

/// Destination for images the classifier did not flag.
pub const ACCEPTED_CONTAINER: &str = "accepted";

/// Destination for images flagged as adult or racy.
pub const REJECTED_CONTAINER: &str = "rejected";

/// Header carrying the vision service subscription key.
pub const DEFAULT_AUTH_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Largest image the loader will buffer (the largest signed 32-bit length).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = i32::MAX as u64;

// Metadata keys written alongside every routed object
pub const META_IS_ADULT: &str = "isAdultContent";
pub const META_ADULT_SCORE: &str = "adultScore";
pub const META_IS_RACY: &str = "isRacyContent";
pub const META_RACY_SCORE: &str = "racyScore";
