use crate::error::{LookupError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical representation of a parsed phone number. `e164` is the identity
/// key for both storage tiers: two inputs that normalize to the same `e164`
/// are the same real-world line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedNumber {
    pub e164: String,
    pub national: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
}

/// Numbering-plan metadata for one region. Validation is length-based with an
/// extra digit-pattern rule for NANP regions.
struct RegionPlan {
    region: &'static str,
    calling_code: &'static str,
    country_name: &'static str,
    /// Trunk digit callers dial domestically before the subscriber number.
    trunk_prefix: Option<char>,
    min_len: usize,
    max_len: usize,
    nanp: bool,
}

const PLANS: &[RegionPlan] = &[
    RegionPlan { region: "US", calling_code: "1", country_name: "United States", trunk_prefix: Some('1'), min_len: 10, max_len: 10, nanp: true },
    RegionPlan { region: "CA", calling_code: "1", country_name: "Canada", trunk_prefix: Some('1'), min_len: 10, max_len: 10, nanp: true },
    RegionPlan { region: "GB", calling_code: "44", country_name: "United Kingdom", trunk_prefix: Some('0'), min_len: 9, max_len: 10, nanp: false },
    RegionPlan { region: "DE", calling_code: "49", country_name: "Germany", trunk_prefix: Some('0'), min_len: 6, max_len: 11, nanp: false },
    RegionPlan { region: "FR", calling_code: "33", country_name: "France", trunk_prefix: Some('0'), min_len: 9, max_len: 9, nanp: false },
    RegionPlan { region: "ES", calling_code: "34", country_name: "Spain", trunk_prefix: None, min_len: 9, max_len: 9, nanp: false },
    RegionPlan { region: "IT", calling_code: "39", country_name: "Italy", trunk_prefix: None, min_len: 8, max_len: 11, nanp: false },
    RegionPlan { region: "NL", calling_code: "31", country_name: "Netherlands", trunk_prefix: Some('0'), min_len: 9, max_len: 9, nanp: false },
    RegionPlan { region: "AU", calling_code: "61", country_name: "Australia", trunk_prefix: Some('0'), min_len: 9, max_len: 9, nanp: false },
    RegionPlan { region: "JP", calling_code: "81", country_name: "Japan", trunk_prefix: Some('0'), min_len: 9, max_len: 10, nanp: false },
    RegionPlan { region: "IN", calling_code: "91", country_name: "India", trunk_prefix: Some('0'), min_len: 10, max_len: 10, nanp: false },
    RegionPlan { region: "BR", calling_code: "55", country_name: "Brazil", trunk_prefix: Some('0'), min_len: 10, max_len: 11, nanp: false },
    RegionPlan { region: "MX", calling_code: "52", country_name: "Mexico", trunk_prefix: None, min_len: 10, max_len: 10, nanp: false },
    RegionPlan { region: "SE", calling_code: "46", country_name: "Sweden", trunk_prefix: Some('0'), min_len: 7, max_len: 9, nanp: false },
];

static BY_REGION: Lazy<HashMap<&'static str, &'static RegionPlan>> = Lazy::new(|| {
    PLANS.iter().map(|p| (p.region, p)).collect()
});

/// Plans ordered longest-calling-code-first for prefix matching. Stable sort
/// keeps the US entry ahead of CA for the shared +1 code.
static BY_CODE: Lazy<Vec<&'static RegionPlan>> = Lazy::new(|| {
    let mut plans: Vec<&'static RegionPlan> = PLANS.iter().collect();
    plans.sort_by(|a, b| b.calling_code.len().cmp(&a.calling_code.len()));
    plans
});

fn invalid() -> LookupError {
    LookupError::Validation("Invalid phone number".to_string())
}

/// Parse raw user input into a `NormalizedNumber`, assuming `default_region`
/// for numbers dialed without a country code. Pure and deterministic.
pub fn normalize(input: &str, default_region: &str) -> Result<NormalizedNumber> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LookupError::Validation(
            "Phone number is required".to_string(),
        ));
    }

    let international = trimmed.starts_with('+');
    let mut digits = String::new();
    for (i, c) in trimmed.chars().enumerate() {
        match c {
            '0'..='9' => digits.push(c),
            '+' if i == 0 => {}
            ' ' | '-' | '(' | ')' | '.' | '/' => {}
            _ => return Err(invalid()),
        }
    }

    // "00" is the common international dialing prefix.
    let (international, digits) = if !international && digits.starts_with("00") {
        (true, digits[2..].to_string())
    } else {
        (international, digits)
    };

    let (plan, nsn) = if international {
        let plan = BY_CODE
            .iter()
            .find(|p| digits.starts_with(p.calling_code))
            .ok_or_else(invalid)?;
        (*plan, digits[plan.calling_code.len()..].to_string())
    } else {
        let region = default_region.trim().to_ascii_uppercase();
        let plan = *BY_REGION.get(region.as_str()).ok_or_else(invalid)?;
        let mut nsn = digits;
        if let Some(trunk) = plan.trunk_prefix {
            if nsn.len() > plan.max_len && nsn.starts_with(trunk) {
                nsn.remove(0);
            }
        }
        (plan, nsn)
    };

    if nsn.len() < plan.min_len || nsn.len() > plan.max_len {
        return Err(invalid());
    }
    if plan.nanp && !valid_nanp(&nsn) {
        return Err(invalid());
    }

    Ok(NormalizedNumber {
        e164: format!("+{}{}", plan.calling_code, nsn),
        national: format_national(plan, &nsn),
        country_code: format!("+{}", plan.calling_code),
        region_code: Some(plan.region.to_string()),
        country_name: Some(plan.country_name.to_string()),
    })
}

/// NANP numbers are NXX NXX XXXX: area code and exchange both start 2-9.
fn valid_nanp(nsn: &str) -> bool {
    let bytes = nsn.as_bytes();
    bytes.len() == 10 && (b'2'..=b'9').contains(&bytes[0]) && (b'2'..=b'9').contains(&bytes[3])
}

fn format_national(plan: &RegionPlan, nsn: &str) -> String {
    if plan.nanp {
        return format!("({}) {}-{}", &nsn[0..3], &nsn[3..6], &nsn[6..10]);
    }
    let dialed = match plan.trunk_prefix {
        Some(trunk) => format!("{}{}", trunk, nsn),
        None => nsn.to_string(),
    };
    group_digits(&dialed)
}

/// Space-separate a digit string into groups of three, folding a trailing
/// single digit into the final group.
fn group_digits(digits: &str) -> String {
    let mut groups = Vec::new();
    let mut rest = digits;
    while !rest.is_empty() {
        let take = if rest.len() == 4 { 4 } else { 3.min(rest.len()) };
        groups.push(&rest[..take]);
        rest = &rest[take..];
    }
    groups.join(" ")
}
