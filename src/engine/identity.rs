//! Method identity keys.
//!
//! Before, after and error events of one invocation are rendered at different points of the
//! wrapper and may spell the argument list differently (erased generics, boxed primitives). The
//! identity key drops everything after the opening parenthesis so that these events still join,
//! while overloads that differ before the parenthesis stay apart.

/// Borrowing form of [`canonicalize`].
///
/// # Examples
///
/// ```rust
/// use probeweave::engine::canonical_key;
///
/// assert_eq!(canonical_key("a.b.C.execute(java.lang.String)"), "a.b.C.execute(");
/// assert_eq!(canonical_key("a.b.C.execute"), "a.b.C.execute");
/// ```
#[must_use]
pub fn canonical_key(long_name: &str) -> &str {
    match long_name.find('(') {
        Some(open) => &long_name[..=open],
        None => long_name,
    }
}

/// Derive the correlation key of a method from its long name.
///
/// Returns the prefix up to and including the first `(`, or the input unchanged when there is
/// no argument list.
#[must_use]
pub fn canonicalize(long_name: &str) -> String {
    canonical_key(long_name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_after_open_paren() {
        assert_eq!(canonicalize("a.b.C.execute(java.lang.String)"), "a.b.C.execute(");
        assert_eq!(canonicalize("a.b.C.run()"), "a.b.C.run(");
        assert_eq!(canonicalize("a.b.C$D.f(int[],long)"), "a.b.C$D.f(");
    }

    #[test]
    fn no_delimiter_is_identity() {
        assert_eq!(canonicalize("a.b.C.execute"), "a.b.C.execute");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn first_paren_wins() {
        assert_eq!(canonical_key("f((x)"), "f(");
        assert_eq!(canonical_key("("), "(");
    }

    #[test]
    fn shared_prefix_shares_key() {
        let erased = canonicalize("a.b.C.execute(java.lang.Object)");
        let precise = canonicalize("a.b.C.execute(java.lang.String)");
        assert_eq!(erased, precise);
        assert_ne!(canonicalize("a.b.C.execute(int)"), canonicalize("a.b.C.exec(int)"));
    }

    #[test]
    fn multibyte_names() {
        assert_eq!(canonicalize("ü.Ünïcode(ß)"), "ü.Ünïcode(");
    }
}
