//! Opaque id generation shared by sessions, contexts, pages, and browser instances.

/// Generates a new random opaque id with the given prefix, e.g. `sess_...`.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_are_unique() {
        let a = new_id("sess");
        let b = new_id("sess");
        assert!(a.starts_with("sess_"));
        assert_ne!(a, b);
    }
}
