use std::time::Duration;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

/// Upper bound on a single frame write, so a stalled peer cannot pin the
/// writer duty past session teardown.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
