use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

fn uganda_mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(0|\+256)7\d{8}$").expect("valid phone regex"))
}

fn strip_whitespace(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Validate a Ugandan mobile number (`07XXXXXXXX` or `+2567XXXXXXXX`).
/// Whitespace anywhere in the input is ignored.
pub fn validate_ug_phone(phone: &str) -> AppResult<()> {
    if !uganda_mobile_regex().is_match(&strip_whitespace(phone)) {
        return Err(AppError::ValidationError(
            "Invalid phone number format. Use 07XXXXXXXX or +2567XXXXXXXX".to_string(),
        ));
    }

    Ok(())
}

/// Normalize a Ugandan mobile number to `+256XXXXXXXXX`.
/// Input that is not in a recognised local form is returned without whitespace.
pub fn format_ug_phone(phone: &str) -> String {
    let compact = strip_whitespace(phone);

    if let Some(rest) = compact.strip_prefix('0')
        && rest.len() == 9
    {
        format!("+256{rest}")
    } else {
        compact
    }
}
