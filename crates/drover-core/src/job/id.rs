use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing sequence for job identifiers.
///
/// Local to the current runner process.
static JOB_SEQ: AtomicU64 = AtomicU64::new(1);

/// Returns next numeric sequence value.
fn next_seq() -> u64 {
    JOB_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Build a human-readable id for a dispatched job.
///
/// Format: `{job}-{seq:x}`, where `seq` is a per-process hex sequence. The same
/// job file dispatched twice gets two ids.
pub fn make_job_id(job_name: &str) -> String {
    format!("{job_name}-{seq:x}", seq = next_seq())
}
