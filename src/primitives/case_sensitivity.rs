/// Whether a directory's child-name comparisons are case-sensitive.
///
/// Read once from the host filesystem at `FSOverlay` construction time and threaded through
/// explicitly from there on; this crate never stores it as module-level or process-global state.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    #[inline]
    pub fn from_probe(is_case_sensitive: bool) -> Self {
        match is_case_sensitive {
            true => Self::Sensitive,
            false => Self::Insensitive,
        }
    }

    #[inline]
    pub fn names_eq(&self, a: &str, b: &str) -> bool {
        match self {
            Self::Sensitive => a == b,
            Self::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_distinguishes_case() {
        let cs = CaseSensitivity::Sensitive;
        assert!(cs.names_eq("a.txt", "a.txt"));
        assert!(!cs.names_eq("a.txt", "A.txt"));
    }

    #[test]
    fn insensitive_ignores_case() {
        let cs = CaseSensitivity::Insensitive;
        assert!(cs.names_eq("a.txt", "A.TXT"));
        assert!(!cs.names_eq("a.txt", "b.txt"));
    }
}
