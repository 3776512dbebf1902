//! Common field validators for settings values.
//!
//! Every validator is a pure function returning `Ok(())` or a
//! `ValidationError` carrying a stable code and a human-readable message.

use std::net::IpAddr;

use validator::{ValidateEmail, ValidateUrl, ValidationError};

/// Lowest valid TCP/UDP port.
pub const MIN_PORT: u16 = 1;

/// Highest valid TCP/UDP port.
pub const MAX_PORT: u16 = 65535;

/// Maximum total length of a domain name.
const MAX_DOMAIN_LENGTH: usize = 253;

lazy_static::lazy_static! {
    static ref E164_REGEX: regex::Regex = regex::Regex::new(r"^\+[1-9]\d{1,14}$").unwrap();
    static ref HEX_COLOR_REGEX: regex::Regex =
        regex::Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap();
    static ref TIMEZONE_REGEX: regex::Regex =
        regex::Regex::new(r"^(?:UTC|GMT|[A-Z][A-Za-z_]+(?:/[A-Z][A-Za-z0-9_+\-]+){1,2})$").unwrap();
    static ref CRON_FIELD_REGEX: regex::Regex =
        regex::Regex::new(r"^(?:\*|\?|[0-9A-Za-z]+(?:-[0-9A-Za-z]+)?)(?:/\d+)?(?:,(?:\*|[0-9A-Za-z]+(?:-[0-9A-Za-z]+)?)(?:/\d+)?)*[LW#0-9]*$").unwrap();
    static ref DOMAIN_REGEX: regex::Regex =
        regex::Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}$").unwrap();
}

fn error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates the character length of a string against optional bounds.
pub fn validate_length(
    value: &str,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if let Some(min) = min {
        if len < min {
            return Err(error(
                "length_min",
                format!("Must be at least {} characters", min),
            ));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(error(
                "length_max",
                format!("Must be at most {} characters", max),
            ));
        }
    }
    Ok(())
}

/// Validates a number against optional inclusive bounds.
///
/// With `integer_only`, fractional values are rejected before the range check.
pub fn validate_number_range(
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
    integer_only: bool,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(error("number_invalid", "Must be a valid number"));
    }
    if integer_only && value.fract() != 0.0 {
        return Err(error("number_integer", "Must be a whole number"));
    }
    if let Some(min) = min {
        if value < min {
            return Err(error("range_min", format!("Must be at least {}", min)));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(error("range_max", format!("Must be at most {}", max)));
        }
    }
    Ok(())
}

/// Validates the shape of an email address.
pub fn validate_email_address(value: &str) -> Result<(), ValidationError> {
    if value.validate_email() {
        Ok(())
    } else {
        Err(error("email", "Must be a valid email address"))
    }
}

/// Extra constraints applied on top of the URL shape check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlRules {
    /// Reject every scheme except `https`.
    pub https_only: bool,
    /// Reject `localhost` and loopback hosts.
    pub forbid_localhost: bool,
}

/// Validates the shape of a URL, optionally enforcing HTTPS and a public host.
pub fn validate_url_address(value: &str, rules: UrlRules) -> Result<(), ValidationError> {
    let Some((scheme, rest)) = value.split_once("://") else {
        return Err(error("url", "Must be a valid URL"));
    };
    if !value.validate_url() || rest.is_empty() {
        return Err(error("url", "Must be a valid URL"));
    }
    if rules.https_only && !scheme.eq_ignore_ascii_case("https") {
        return Err(error("url_https", "URL must use HTTPS"));
    }
    if rules.forbid_localhost && is_loopback_host(url_host(rest)) {
        return Err(error("url_localhost", "Localhost URLs are not allowed"));
    }
    Ok(())
}

/// Extracts the host portion from the part of a URL after `scheme://`.
fn url_host(rest: &str) -> &str {
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    if let Some(stripped) = host_port.strip_prefix('[') {
        return stripped.split(']').next().unwrap_or(stripped);
    }
    host_port.split(':').next().unwrap_or(host_port)
}

fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost")
    {
        return true;
    }
    host.parse::<IpAddr>()
        .map(|ip| ip.is_loopback() || ip.is_unspecified())
        .unwrap_or(false)
}

/// Validates a phone number in E.164 format (`+` followed by up to 15 digits).
pub fn validate_phone_e164(value: &str) -> Result<(), ValidationError> {
    if E164_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(error(
            "phone",
            "Must be a valid phone number in E.164 format (e.g. +14155552671)",
        ))
    }
}

/// Validates that a number is a whole port number in [1, 65535].
pub fn validate_port(value: f64) -> Result<(), ValidationError> {
    let in_range = value.fract() == 0.0
        && value >= f64::from(MIN_PORT)
        && value <= f64::from(MAX_PORT);
    if in_range {
        Ok(())
    } else {
        Err(error(
            "port",
            format!("Port must be between {} and {}", MIN_PORT, MAX_PORT),
        ))
    }
}

/// Validates an IPv4 or IPv6 address.
pub fn validate_ip_address(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| error("ip", "Must be a valid IPv4 or IPv6 address"))
}

/// Validates a `#rgb` or `#rrggbb` color.
pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(error("hex_color", "Must be a hex color such as #1a2b3c"))
    }
}

/// Validates the shape of an IANA timezone identifier (`Area/Location` or `UTC`).
pub fn validate_timezone(value: &str) -> Result<(), ValidationError> {
    if TIMEZONE_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(error("timezone", "Must be a valid timezone identifier"))
    }
}

/// Validates a cron expression with 5 or 6 whitespace-separated fields.
pub fn validate_cron(value: &str) -> Result<(), ValidationError> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if !(5..=6).contains(&fields.len()) {
        return Err(error(
            "cron_fields",
            "Cron expression must have 5 or 6 fields",
        ));
    }
    if fields.iter().all(|f| CRON_FIELD_REGEX.is_match(f)) {
        Ok(())
    } else {
        Err(error("cron", "Must be a valid cron expression"))
    }
}

/// Validates a fully qualified domain name.
pub fn validate_domain(value: &str) -> Result<(), ValidationError> {
    if value.len() <= MAX_DOMAIN_LENGTH && DOMAIN_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(error("domain", "Must be a valid domain name"))
    }
}

/// Character-class requirements for password strength checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRules {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

/// Validates a password against the configured strength rules.
pub fn validate_password_strength(
    value: &str,
    rules: PasswordRules,
) -> Result<(), ValidationError> {
    if value.chars().count() < rules.min_length {
        return Err(error(
            "password_length",
            format!("Password must be at least {} characters", rules.min_length),
        ));
    }
    if rules.require_uppercase && !value.chars().any(char::is_uppercase) {
        return Err(error(
            "password_uppercase",
            "Password must contain an uppercase letter",
        ));
    }
    if rules.require_lowercase && !value.chars().any(char::is_lowercase) {
        return Err(error(
            "password_lowercase",
            "Password must contain a lowercase letter",
        ));
    }
    if rules.require_digit && !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(error("password_digit", "Password must contain a number"));
    }
    if rules.require_special && value.chars().all(char::is_alphanumeric) {
        return Err(error(
            "password_special",
            "Password must contain a special character",
        ));
    }
    Ok(())
}
