//! Search, lookup and statistics over a record sequence.
//!
//! These are plain functions over slices; `MetadataIndex` wires them to a
//! fresh `read_all()` on every call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::record::ContentRecord;

/// Aggregate counts over the full index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    /// Number of records.
    pub total_content: usize,
    /// Sum of every `amount`, parsed as floating point.
    pub total_earnings: f64,
    /// Number of distinct `wallet_address` values.
    pub unique_wallets: usize,
}

/// Records whose summary contains `query`, ignoring case, in store order.
pub fn search(records: &[ContentRecord], query: &str) -> Vec<ContentRecord> {
    records
        .iter()
        .filter(|r| r.summary_matches(query))
        .cloned()
        .collect()
}

/// First record whose `rootHash` equals `root_hash` exactly.
pub fn lookup(records: &[ContentRecord], root_hash: &str) -> Option<ContentRecord> {
    records.iter().find(|r| r.root_hash == root_hash).cloned()
}

pub fn statistics(records: &[ContentRecord]) -> ContentStats {
    let wallets: HashSet<&str> = records.iter().map(|r| r.wallet_address.as_str()).collect();
    // `Sum for f64` starts at -0.0, which would serialize as `-0.0` for an empty index.
    let total_earnings = records
        .iter()
        .map(|r| parse_amount(&r.amount))
        .fold(0.0, |acc, amount| acc + amount);

    ContentStats {
        total_content: records.len(),
        total_earnings,
        unique_wallets: wallets.len(),
    }
}

/// Parse a decimal amount the lenient way a JS `parseFloat` would.
///
/// Surrounding whitespace is ignored and the longest numeric prefix wins, so
/// `"0.5 USDC"` is 0.5. Anything without a numeric prefix, and any non-finite
/// result, is 0.
pub fn parse_amount(amount: &str) -> f64 {
    let trimmed = amount.trim();
    let prefix = &trimmed[..numeric_prefix_len(trimmed)];
    match prefix.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Length of the longest `[+-]digits[.digits][e[+-]digits]` prefix.
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }

    if digits == 0 {
        return 0;
    }

    // Exponent only counts when followed by at least one digit.
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    i
}
