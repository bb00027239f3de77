/// Provenance tag applied to rows created through the submission pipeline.
pub const COMMUNITY_SOURCE: &str = "community-submission";

/// Version written to the meta row when none exists yet.
pub const CATALOG_VERSION: &str = "1.0.0";

/// How many slug suffix candidates the submit path will try before giving up.
pub const MAX_SLUG_ATTEMPTS: usize = 64;
