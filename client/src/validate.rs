/// Email acceptance rule, matching the server's: 7-bit ASCII only,
/// `local@domain.tld` shape with a top-level label of at least two
/// letters. The app gates contact entry on this before the add call
/// so the user gets feedback at the field, not from a rejected save.
pub fn is_valid_email(email: &str) -> bool {
    if !email.is_ascii() || email.is_empty() {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._%+-".contains(&b))
    {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    if host.is_empty()
        || !host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return false;
    }
    tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        assert!(is_valid_email("dana@example.com"));
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn rejects_missing_or_short_tld() {
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("a@b."));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(!is_valid_email("דנה@example.com"));
        assert!(!is_valid_email("dana@exämple.com"));
    }

    #[test]
    fn rejects_structural_junk() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dana@"));
        assert!(!is_valid_email("dana example@c.om"));
    }
}
