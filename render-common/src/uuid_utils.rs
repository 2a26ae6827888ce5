//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4, used for locally-issued identifiers (SSE client
/// ids, request-scoped span ids) — job/track/user ids themselves are
/// opaque strings owned by the enqueuer.
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a UUID from a string.
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_distinct_v4_uuids() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn parse_round_trips_generated_uuid() {
        let u = generate();
        let parsed = parse(&u.to_string()).unwrap();
        assert_eq!(u, parsed);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(parse("not-a-uuid").is_err());
    }
}
