//! Small time and id helpers shared across the workspace.

/// Current UTC instant, truncated to whole seconds.
///
/// Every timestamp the engine persists (`createdAt`, `issuedAt`, ...) goes
/// through this function rather than a bare `Utc::now()` call scattered
/// through the codebase, so a future "freeze the clock" test harness has a
/// single seam to patch.
pub fn now_utc() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

/// Six random uppercase hex characters, used to disambiguate certificate
/// numbers and generated tenant schema names.
pub fn random_hex6() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 3] = rng.gen();
    hex_upper(&bytes)
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_hex6_is_six_uppercase_hex_chars() {
        let s = random_hex6();
        assert_eq!(s.len(), 6);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
