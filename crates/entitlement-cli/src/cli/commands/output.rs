use entitlement_core::PermissionResponse;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn verdict(allowed: bool) -> &'static str {
    if allowed {
        "ALLOW"
    } else {
        "DENY"
    }
}

/// One human-readable line per response.
pub fn response_line(resp: &PermissionResponse) -> String {
    let mut line = format!(
        "{} via {} ({:.2} ms)",
        verdict(resp.allowed),
        resp.backend.as_str(),
        resp.elapsed_ms
    );
    if let Some(message) = resp.message.as_deref() {
        line.push_str(" - ");
        line.push_str(message);
    }
    line
}
