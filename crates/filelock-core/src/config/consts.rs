//! Default values for lock configuration

/// Wait slicing
pub mod wait {
    /// Length of one wait slice; interrupts and deadlines are checked between slices
    pub const INTERRUPT_INTERVAL_MS: u64 = 200;

    /// First delay between non-blocking attempts inside a slice (POSIX)
    pub const POLL_INITIAL_MS: u64 = 10;

    /// Upper bound for the in-slice poll delay (POSIX)
    pub const POLL_MAX_MS: u64 = 100;

    /// Log a progress line once a wait has lasted this long
    pub const WAIT_NOTICE_MS: u64 = 2_000;
}

/// Lock file creation
pub mod file {
    /// Owner read/write
    pub const MODE: u32 = 0o600;

    /// Largest accepted permission value
    pub const MAX_MODE: u32 = 0o777;
}
