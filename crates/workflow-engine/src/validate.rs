//! Input validators shared by the canonicalizers.
//!
//! All checks are pure; they either return the normalized value or an
//! `InvalidInput` error naming the offending field.

use crate::error::WorkflowError;
use std::net::IpAddr;

/// 5 GHz UNII channels
pub const CHANNELS_5GHZ: [u32; 27] = [
    36, 40, 44, 48, 52, 56, 60, 64, 100, 104, 108, 112, 116, 120, 124, 128, 132, 136, 140, 144, 149, 153, 157, 161,
    165, 169, 173,
];

/// IPv4 dotted quad or IPv6
pub fn is_valid_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

/// Up to 253 characters, labels of 1 to 63 alphanumerics or hyphens, no leading or trailing hyphen
pub fn is_valid_hostname(value: &str) -> bool {
    if value.is_empty() || value.len() > 253 {
        return false;
    }
    value.trim_end_matches('.').split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Six hex octets separated by `:` or `-`
pub fn is_valid_mac(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 17 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if i % 3 == 2 {
            *b == b':' || *b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

/// 8 to 12 alphanumerics
pub fn is_valid_serial(value: &str) -> bool {
    (8..=12).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Lowercase, colon-separated form of a valid MAC address
pub fn normalize_mac(value: &str) -> String {
    value.to_ascii_lowercase().replace('-', ":")
}

/// Match `value` case-insensitively against `allowed` and return the allowed spelling
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<String, WorkflowError> {
    allowed
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(value.trim()))
        .map(|candidate| (*candidate).to_string())
        .ok_or_else(|| {
            WorkflowError::InvalidInput(format!(
                "'{}' is not a valid {}; expected one of: {}",
                value,
                field,
                allowed.join(", ")
            ))
        })
}

/// Optional variant of [`one_of`]
pub fn optional_one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<Option<String>, WorkflowError> {
    value.map(|v| one_of(field, v, allowed)).transpose()
}

/// Check an inclusive numeric range
pub fn in_range<T>(field: &str, value: T, min: T, max: T) -> Result<T, WorkflowError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(WorkflowError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(value)
}

/// Require a non-empty string
pub fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, WorkflowError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(WorkflowError::InvalidInput(format!("{} is required", field))),
    }
}

/// Treat an empty or whitespace-only string as absent
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Check a channel number against the allowed set of a band
pub fn check_channel(field: &str, band: RadioBand, channel: u32) -> Result<u32, WorkflowError> {
    let allowed = match band {
        RadioBand::Ghz24 => (1..=14).contains(&channel),
        RadioBand::Ghz5 | RadioBand::Tri => CHANNELS_5GHZ.contains(&channel),
        RadioBand::Ghz6 => (1..=233).contains(&channel) && (channel - 1) % 4 == 0,
        RadioBand::Xor => (1..=14).contains(&channel) || CHANNELS_5GHZ.contains(&channel),
    };
    if allowed {
        Ok(channel)
    } else {
        Err(WorkflowError::InvalidInput(format!(
            "{} {} is not a valid channel for the {} radio",
            field,
            channel,
            band.label()
        )))
    }
}

/// Radio band of an access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RadioBand {
    Ghz24,
    Ghz5,
    Ghz6,
    Xor,
    Tri,
}

impl RadioBand {
    /// Every band, in the order radios are listed on the Controller
    pub const ALL: [RadioBand; 5] = [RadioBand::Ghz24, RadioBand::Ghz5, RadioBand::Xor, RadioBand::Ghz6, RadioBand::Tri];

    /// Controller `radioType` code
    pub fn radio_type(self) -> u8 {
        match self {
            RadioBand::Ghz24 => 1,
            RadioBand::Ghz5 => 2,
            RadioBand::Xor => 3,
            RadioBand::Ghz6 => 6,
            RadioBand::Tri => 7,
        }
    }

    /// Band for a Controller `radioType` code
    pub fn from_radio_type(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.radio_type() == code)
    }

    /// Human readable band name
    pub fn label(self) -> &'static str {
        match self {
            RadioBand::Ghz24 => "2.4 GHz",
            RadioBand::Ghz5 => "5 GHz",
            RadioBand::Ghz6 => "6 GHz",
            RadioBand::Xor => "XOR",
            RadioBand::Tri => "TRI",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_addresses() {
        assert!(is_valid_ip("10.1.2.3"));
        assert!(is_valid_ip("2001:db8::1"));
        assert!(!is_valid_ip("10.1.2"));
        assert!(!is_valid_ip("10.1.2.256"));
        assert!(!is_valid_ip("edge-1"));
    }

    #[test]
    fn test_hostnames() {
        assert!(is_valid_hostname("edge-1.campus.example.com"));
        assert!(is_valid_hostname("SJ-EN-9300"));
        assert!(!is_valid_hostname("-edge"));
        assert!(!is_valid_hostname("edge-"));
        assert!(!is_valid_hostname("a..b"));
        assert!(!is_valid_hostname(&"a".repeat(64)));
        assert!(!is_valid_hostname(&format!("{}a", "a.".repeat(127))));
    }

    #[test]
    fn test_macs_and_serials() {
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
        assert!(is_valid_mac("AA-BB-CC-DD-EE-FF"));
        assert!(!is_valid_mac("aabb.ccdd.eeff"));
        assert!(!is_valid_mac("aa:bb:cc:dd:ee:fg"));
        assert_eq!(normalize_mac("AA-BB-CC-DD-EE-FF"), "aa:bb:cc:dd:ee:ff");

        assert!(is_valid_serial("FJC2327U0S2"));
        assert!(!is_valid_serial("FJC23"));
        assert!(!is_valid_serial("FJC2327U0S2XYZ"));
        assert!(!is_valid_serial("FJC-2327U0"));
    }

    #[test]
    fn test_one_of_returns_canonical_spelling() {
        assert_eq!(one_of("protocol", "lacp", &["ON", "LACP", "PAGP"]).unwrap(), "LACP");
        assert!(one_of("protocol", "static", &["ON", "LACP", "PAGP"]).is_err());
    }

    #[test]
    fn test_channels_per_band() {
        assert!(check_channel("channel_number", RadioBand::Ghz24, 11).is_ok());
        assert!(check_channel("channel_number", RadioBand::Ghz24, 36).is_err());
        assert!(check_channel("channel_number", RadioBand::Ghz5, 165).is_ok());
        assert!(check_channel("channel_number", RadioBand::Ghz5, 38).is_err());
        assert!(check_channel("channel_number", RadioBand::Ghz6, 233).is_ok());
        assert!(check_channel("channel_number", RadioBand::Ghz6, 3).is_err());
        assert!(check_channel("channel_number", RadioBand::Xor, 6).is_ok());
    }

    #[test]
    fn test_ranges() {
        assert!(in_range("antenna_gain", 40, 0, 40).is_ok());
        assert!(in_range("led_brightness_level", 9, 1, 8).is_err());
    }
}
