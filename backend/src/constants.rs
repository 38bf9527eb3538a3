// =============================================================================
// Expiring Friends Constants
// =============================================================================
// Tunables for the relationship service, its store and the binaries, kept in
// one place.

// =============================================================================
// DATABASE CONFIGURATION
// =============================================================================

/// Pool size when DB_MAX_CONNECTIONS is unset or unparsable
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// How long to wait for a pooled connection before failing an operation
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// EXPIRY SWEEPER
// =============================================================================

/// Default interval between global expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Log a heartbeat every N sweeps that removed nothing
pub const SWEEP_HEARTBEAT_EVERY_N_ITERS: usize = 10;

// =============================================================================
// FRIEND REQUESTS
// =============================================================================

/// Friendship lifetime used by friendctl when --duration-ms is omitted (one week)
pub const DEFAULT_FRIENDSHIP_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

// =============================================================================
// LOGGING
// =============================================================================

/// Filter applied when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str =
    "expiring_friends=info,friendctl=debug,expiry_sweeper=debug,migrate=info,sqlx=warn";
