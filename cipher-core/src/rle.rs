//! Run-length encoding of integer sequences
//!
//! The CIPHER input file stores its (often very long) integer mappings in a compact
//! textual form, one item per line. A run of `n > 1` repeated values `v` is written
//! as `"n of v"` and a single value as `"v"`:
//!
//! ```rust
//! use cipher_core::rle::{compress, decompress};
//!
//! let values = vec![4, 4, 4, 1, 2, 2];
//! let text = compress(&values).unwrap();
//! assert_eq!(text, "3 of 4\n1\n2 of 2");
//! assert_eq!(decompress(&text).unwrap(), values);
//! ```

use crate::errors::{CipherError, CipherResult};

/// Delimiter placed between encoded items unless another is requested.
pub const DEFAULT_ITEM_DELIMITER: &str = "\n";

const RUN_SEPARATOR: &str = "of";

/// Split a sequence into maximal runs of equal values.
///
/// Returns the run lengths and the value of each run.
pub fn compress_runs(values: &[i64]) -> CipherResult<(Vec<usize>, Vec<i64>)> {
    let mut counts: Vec<usize> = Vec::new();
    let mut run_values: Vec<i64> = Vec::new();

    for &value in values {
        match run_values.last() {
            Some(&last) if last == value => {
                if let Some(count) = counts.last_mut() {
                    *count += 1;
                }
            }
            _ => {
                run_values.push(value);
                counts.push(1);
            }
        }
    }

    check_run_lengths(&counts, values.len())?;
    Ok((counts, run_values))
}

/// Check that run lengths account for every value of the encoded sequence.
fn check_run_lengths(counts: &[usize], num_values: usize) -> CipherResult<()> {
    let sum: usize = counts.iter().sum();
    if sum != num_values {
        return Err(CipherError::RunLengthSum {
            sum,
            expected: num_values,
        });
    }
    Ok(())
}

/// Encode a sequence using the default (newline) delimiter.
pub fn compress(values: &[i64]) -> CipherResult<String> {
    compress_with_delimiter(values, DEFAULT_ITEM_DELIMITER)
}

/// Encode a sequence, joining items with `item_delimiter`.
pub fn compress_with_delimiter(values: &[i64], item_delimiter: &str) -> CipherResult<String> {
    let (counts, run_values) = compress_runs(values)?;
    Ok(counts
        .iter()
        .zip(run_values.iter())
        .map(|(n, v)| match n {
            1 => format!("{v}"),
            _ => format!("{n} {RUN_SEPARATOR} {v}"),
        })
        .collect::<Vec<_>>()
        .join(item_delimiter))
}

/// Decode text produced by [`compress`].
pub fn decompress(text: &str) -> CipherResult<Vec<i64>> {
    decompress_with_delimiter(text, DEFAULT_ITEM_DELIMITER)
}

/// Decode text whose items are separated by `item_delimiter`.
///
/// Empty items (e.g. from a trailing delimiter) are ignored.
pub fn decompress_with_delimiter(text: &str, item_delimiter: &str) -> CipherResult<Vec<i64>> {
    let mut out = Vec::new();
    for token in text.split(item_delimiter) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.split_once(RUN_SEPARATOR) {
            Some((count, value)) => {
                let count: usize = parse_item(token, count)?;
                let value: i64 = parse_item(token, value)?;
                out.extend(std::iter::repeat(value).take(count));
            }
            None => out.push(parse_item(token, token)?),
        }
    }
    Ok(out)
}

fn parse_item<T>(token: &str, item: &str) -> CipherResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    item.trim()
        .parse::<T>()
        .map_err(|e| CipherError::RunLengthDecode {
            token: token.to_string(),
            details: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_expected_compression() {
        let values = vec![1, 1, 1, 1, 2, 2, 1, 2, 3, 1, 3, 3, 2, 2, 2, 1, 1, 4];
        assert_eq!(
            compress(&values).unwrap(),
            "4 of 1\n2 of 2\n1\n2\n3\n1\n2 of 3\n3 of 2\n2 of 1\n4"
        );
    }

    #[test]
    fn test_runs() {
        let (counts, values) = compress_runs(&[7, 7, -1, 7]).unwrap();
        assert_eq!(counts, vec![2, 1, 1]);
        assert_eq!(values, vec![7, -1, 7]);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = StdRng::seed_from_u64(12);
        let values: Vec<i64> = (0..100).map(|_| rng.gen_range(0..3)).collect();
        assert_eq!(decompress(&compress(&values).unwrap()).unwrap(), values);
    }

    #[test]
    fn test_round_trip_single_run() {
        let values = vec![5; 64];
        let text = compress(&values).unwrap();
        assert_eq!(text, "64 of 5");
        assert_eq!(decompress(&text).unwrap(), values);
    }

    #[test]
    fn test_round_trip_all_distinct() {
        let values: Vec<i64> = (0..10).collect();
        assert_eq!(decompress(&compress(&values).unwrap()).unwrap(), values);
    }

    #[test]
    fn test_round_trip_negative_values() {
        let values = vec![-1, -1, 0, 3, 3, 3, -1];
        assert_eq!(decompress(&compress(&values).unwrap()).unwrap(), values);
    }

    #[test]
    fn test_custom_delimiter() {
        let values = vec![1, 1, 2];
        let text = compress_with_delimiter(&values, ", ").unwrap();
        assert_eq!(text, "2 of 1, 2");
        assert_eq!(decompress_with_delimiter(&text, ", ").unwrap(), values);
    }

    #[test]
    fn test_empty_items_ignored() {
        assert_eq!(decompress("2 of 3\n\n1\n").unwrap(), vec![3, 3, 1]);
    }

    #[test]
    fn test_malformed_item() {
        let err = decompress("2 of x").unwrap_err();
        assert!(matches!(err, CipherError::RunLengthDecode { .. }));

        let err = decompress("three").unwrap_err();
        assert!(matches!(err, CipherError::RunLengthDecode { .. }));
    }

    #[test]
    fn test_run_lengths_checked() {
        assert!(check_run_lengths(&[2, 1, 1], 4).is_ok());
        let err = check_run_lengths(&[2, 1], 4).unwrap_err();
        assert!(matches!(
            err,
            CipherError::RunLengthSum {
                sum: 3,
                expected: 4
            }
        ));
        assert_eq!(compress(&[]).unwrap(), "");
    }
}
