//! Shared constants

/// Default object-storage bucket holding note files.
pub const DEFAULT_NOTES_BUCKET: &str = "notes";

/// Default table names in the record store.
pub const DEFAULT_NOTES_TABLE: &str = "notes";
pub const DEFAULT_PROFILES_TABLE: &str = "profiles";

/// Per-network-call timeout.
pub const NETWORK_TIMEOUT_SECS: u64 = 30;

/// RetryScheduler defaults.
pub const MAX_UPLOAD_RETRIES: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound on a single connectivity probe.
pub const CONNECTIVITY_PROBE_TIMEOUT_MS: u64 = 3000;

/// Lifetime of a pre-signed upload URL.
pub const SIGNED_UPLOAD_EXPIRY_SECS: u64 = 600;

/// Access tokens expiring within this window are refreshed before use.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Cache-Control sent with uploaded objects.
pub const UPLOAD_CACHE_CONTROL: &str = "3600";
