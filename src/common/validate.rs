use lazy_static::lazy_static;
use regex::Regex;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Treats `""` the same as an omitted field.
pub fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
