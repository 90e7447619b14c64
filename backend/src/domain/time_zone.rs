//! Fixed UTC offsets in Bridge's `+HH:MM` text form.

use chrono::FixedOffset;

/// Format an offset as `+HH:MM` or `-HH:MM`.
///
/// # Examples
/// ```
/// use chrono::FixedOffset;
/// use bridge_backend::domain::time_zone::format_offset;
///
/// let offset = FixedOffset::west_opt(7 * 3600).expect("valid offset");
/// assert_eq!(format_offset(&offset), "-07:00");
/// ```
pub fn format_offset(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parse `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match text.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Serde adapter for `Option<FixedOffset>` fields.
pub mod option {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialize as `+HH:MM` or `null`.
    pub fn serialize<S: Serializer>(
        value: &Option<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(offset) => serializer.serialize_str(&super::format_offset(offset)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from `+HH:MM` or `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<FixedOffset>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| {
                super::parse_offset(&text)
                    .ok_or_else(|| D::Error::custom(format!("invalid time zone offset: {text}")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("+05:30", 5 * 3600 + 30 * 60)]
    #[case("-08:00", -8 * 3600)]
    #[case("Z", 0)]
    #[case("UTC", 0)]
    fn parses_offsets(#[case] text: &str, #[case] seconds: i32) {
        let offset = parse_offset(text).expect("offset parses");
        assert_eq!(offset.local_minus_utc(), seconds);
    }

    #[rstest]
    #[case("05:00")]
    #[case("+5")]
    #[case("+05:75")]
    #[case("")]
    fn rejects_malformed_offsets(#[case] text: &str) {
        assert!(parse_offset(text).is_none());
    }

    #[rstest]
    fn formats_utc_with_a_plus_sign() {
        let utc = FixedOffset::east_opt(0).expect("utc");
        assert_eq!(format_offset(&utc), "+00:00");
    }
}
