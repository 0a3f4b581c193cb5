//! Telemetry helpers for structured logging and tracing.

/// Install a default env-filtered fmt subscriber unless one is already set.
///
/// Every rescheduler event carries a `rescheduler` field with the instance
/// name. Start, stop and shutdown log at `info`; dispatch, skip and
/// rate-limit deferrals (with `task_key`, `seq`, `pending`, `wait_ms`) at
/// `debug`; refused submits and rejected adds at `warn`; a panicked dispatch
/// thread at `error`. `RUST_LOG=shard_rescheduler=debug` shows every
/// dispatch decision.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
