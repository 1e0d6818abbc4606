//! Input validation for form submissions and admin requests.

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;
use url::{Host, Url};

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Invalid mobile phone number: {0}")]
    InvalidPhone(String),
    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("Invalid inline image: {0}")]
    InvalidImage(String),
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Local addresses not allowed: {0}")]
    LocalAddress(String),
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Returns the trimmed value, or `MissingField` when it is empty.
pub fn require(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Like [`require`] for optional fields: blank values become `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates an email address and returns it trimmed and lowercased.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = require("email", email)?;
    if !EMAIL_RE.is_match(&email) || email.contains("..") {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(email.to_lowercase())
}

/// Validates a Korean mobile number and formats it with dashes.
///
/// `010` numbers must have 11 digits (`010-XXXX-XXXX`); the older
/// `011/016/017/018/019` prefixes also allow a 3-digit middle block.
pub fn normalize_phone(phone: &str) -> Result<String, ValidationError> {
    let raw = require("phone", phone)?;
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '.'))
        .collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone(raw));
    }

    let prefix = digits.get(..3).unwrap_or_default();
    let valid_length = match prefix {
        "010" => digits.len() == 11,
        "011" | "016" | "017" | "018" | "019" => digits.len() == 10 || digits.len() == 11,
        _ => false,
    };
    if !valid_length {
        return Err(ValidationError::InvalidPhone(raw));
    }

    let middle_end = digits.len() - 4;
    Ok(format!(
        "{}-{}-{}",
        &digits[..3],
        &digits[3..middle_end],
        &digits[middle_end..]
    ))
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Validates a URL the service is about to fetch on a user's behalf.
/// Only http(s) URLs to public hosts are accepted.
pub fn validate_url(url_str: &str) -> Result<Url, ValidationError> {
    let url_str = require("url", url_str)?;
    let url =
        Url::parse(&url_str).map_err(|_| ValidationError::MalformedUrl(url_str.clone()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(ValidationError::UnsupportedScheme(scheme.to_string())),
    }

    let local = match url.host() {
        None => return Err(ValidationError::MalformedUrl(url_str)),
        Some(Host::Domain(domain)) => {
            let domain = domain.to_lowercase();
            domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".local")
        }
        Some(Host::Ipv4(ip)) => is_local_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_local_ip(IpAddr::V6(ip)),
    };
    if local {
        return Err(ValidationError::LocalAddress(
            url.host_str().unwrap_or_default().to_string(),
        ));
    }

    Ok(url)
}

fn is_local_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => {
            ip.is_loopback()
                || ip.is_private()
                || ip.is_link_local()
                || ip.is_unspecified()
                || ip.is_broadcast()
        }
        IpAddr::V6(ip) => ip.is_loopback() || ip.is_unspecified(),
    }
}
