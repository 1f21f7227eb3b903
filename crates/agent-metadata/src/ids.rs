use agentos_protocol::{CoreError, CoreResult, ErrorDomain};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const INITIAL_VERSION: &str = "1";

static FALLBACK_COUNTER: AtomicU32 = AtomicU32::new(0);

pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn random_suffix() -> u32 {
    let mut bytes = [0u8; 4];
    if getrandom::getrandom(&mut bytes).is_ok() {
        return u32::from_be_bytes(bytes);
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    nanos ^ FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed).rotate_left(16)
}

/// `<13-digit unix ms>-<8 hex>`. The fixed-width time prefix keeps lexical order
/// equal to creation order. Collisions are not re-checked.
#[must_use]
pub fn generate_agent_id() -> String {
    format!("{:013}-{:08x}", unix_now_ms(), random_suffix())
}

/// Next optimistic-concurrency version.
///
/// Integer versions increment; anything else is replaced by the current time in
/// milliseconds. An integer version at `u64::MAX` has no successor and fails
/// with `OPERATION_FAILED`.
pub fn next_version(current: &str) -> CoreResult<String> {
    match current.trim().parse::<u64>() {
        Ok(n) => n.checked_add(1).map(|next| next.to_string()).ok_or_else(|| {
            CoreError::operation_failed(ErrorDomain::Agent, "agent version counter exhausted")
                .with_details(serde_json::json!({ "version": current }))
        }),
        Err(_) => Ok(unix_now_ms().to_string()),
    }
}

/// Ids become file names, so only a conservative alphabet is accepted.
pub fn validate_agent_id(id: &str) -> CoreResult<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(
            CoreError::invalid_argument(ErrorDomain::Agent, format!("invalid agent id: {id:?}"))
                .with_details(serde_json::json!({ "id": id })),
        )
    }
}
