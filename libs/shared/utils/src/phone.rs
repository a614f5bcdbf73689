/// Normalise a phone number to E.164.
///
/// Separators are stripped and a `00` prefix is treated as `+`. Numbers without a country code
/// get `default_country_code`; for the default of `1`, an 11-digit number starting with `1` is
/// taken as already carrying it. Returns `None` when nothing dialable remains.
pub fn normalize_phone_number(raw: &str, default_country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let mut digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return None;
    }

    if has_plus {
        return valid_e164(digits);
    }

    if let Some(rest) = digits.strip_prefix("00") {
        return valid_e164(rest.to_string());
    }

    let country = default_country_code.trim_start_matches('+');
    if country == "1" && digits.len() == 11 && digits.starts_with('1') {
        return valid_e164(digits);
    }

    // Trunk prefix used for national dialling in most non-NANP countries.
    if country != "1" && digits.starts_with('0') {
        digits.remove(0);
    }

    valid_e164(format!("{}{}", country, digits))
}

fn valid_e164(digits: String) -> Option<String> {
    if digits.len() < 8 || digits.len() > 15 {
        return None;
    }
    Some(format!("+{}", digits))
}
