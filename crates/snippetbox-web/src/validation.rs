//! Form validation shared by the handlers.

use std::collections::BTreeMap;

/// Errors collected while checking one form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Validator {
    pub field_errors: BTreeMap<&'static str, String>,
    pub non_field_errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record an error for `key` unless one is already there.
    pub fn add_field_error(&mut self, key: &'static str, message: impl Into<String>) {
        self.field_errors.entry(key).or_insert_with(|| message.into());
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    pub fn check_field(&mut self, ok: bool, key: &'static str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }

    pub fn field_error(&self, key: &str) -> Option<&str> {
        self.field_errors.get(key).map(String::as_str)
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// A pragmatic email shape check: one `@`, a non-empty local part of
/// printable characters, and a domain of dot-separated alphanumeric or `-`
/// labels.
pub fn matches_email(value: &str) -> bool {
    if value.len() > 254 {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c));
    if !local_ok {
        return false;
    }

    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_field_error_wins() {
        let mut v = Validator::new();
        assert!(v.is_valid());
        v.check_field(false, "title", "This field cannot be blank");
        v.check_field(false, "title", "This field cannot be more than 100 characters long");
        assert!(!v.is_valid());
        assert_eq!(v.field_error("title"), Some("This field cannot be blank"));
    }

    #[test]
    fn char_counts_are_unicode_aware() {
        assert!(max_chars("ééé", 3));
        assert!(!max_chars("éééé", 3));
        assert!(min_chars("pässwörd", 8));
        assert!(!not_blank("  \t"));
    }

    #[test]
    fn email_shapes() {
        for ok in ["alice@example.com", "a.b+c@sub.example.co.uk", "x_y@a-b.io", "a@x"] {
            assert!(matches_email(ok), "{}", ok);
        }
        for bad in ["", "alice", "@example.com", "alice@", "a@-x.com", "a b@x.com", "a@x..com"] {
            assert!(!matches_email(bad), "{}", bad);
        }
    }

    #[test]
    fn permitted_values() {
        assert!(permitted_value(&7, &[1, 7, 365]));
        assert!(!permitted_value(&30, &[1, 7, 365]));
    }
}
