use anyhow::{Result, bail};
use std::collections::HashSet;

/// Seed used when no seed token is given.
pub const DEFAULT_SEED: u64 = 1337;

/// Resolve CLI seed arguments into a deduplicated seed list.
///
/// Accepts decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hexadecimal. Order of first appearance is kept.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let seed = parse_seed(token)?;
        if seen.insert(seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_seed(token: &str) -> Result<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        if let Ok(value) = u64::from_str_radix(&hex.replace('_', ""), 16) {
            return Ok(value);
        }
    } else if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    } else if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    bail!("Unrecognized seed token: {token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_decimal_negative_and_hex() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xC0_FFEE", "18446744073709551615"]))
            .unwrap();
        assert_eq!(seeds, vec![42, 7, 0x00C0_FFEE, u64::MAX]);
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let seeds = resolve_seed_inputs(&tokens(&["9", "0x9", "3", "9"])).unwrap();
        assert_eq!(seeds, vec![9, 3]);
    }

    #[test]
    fn falls_back_to_default_seed() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
        assert_eq!(
            resolve_seed_inputs(&tokens(&["", "  "])).unwrap(),
            vec![DEFAULT_SEED]
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = resolve_seed_inputs(&tokens(&["banana"])).unwrap_err();
        assert!(err.to_string().contains("banana"));
        assert!(resolve_seed_inputs(&tokens(&["0xZZ"])).is_err());
    }
}
