//! Natural ("human") ordering of names.
//!
//! Names are split into alternating runs of ASCII digits and non-digits.
//! Two digit runs compare by numeric value, any other pair of runs compares
//! as plain case-sensitive text. Numeric values of any length are supported
//! since digit runs are never converted to integers.

use std::cmp::Ordering;

/// Splits off the leading run of `s`, returning the run, whether it is a
/// digit run, and the remainder.
fn split_run(s: &str) -> Option<(&str, bool, &str)> {
    let first = s.chars().next()?;
    let digits = first.is_ascii_digit();
    let end = s
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit() != digits)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len());

    Some((&s[..end], digits, &s[end..]))
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');

    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

pub fn compare(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);

    loop {
        match (split_run(a), split_run(b)) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((run_a, digits_a, rest_a)), Some((run_b, digits_b, rest_b))) => {
                let ord = if digits_a && digits_b {
                    compare_digit_runs(run_a, run_b)
                } else {
                    run_a.cmp(run_b)
                };

                if ord != Ordering::Equal {
                    return ord;
                }

                a = rest_a;
                b = rest_b;
            }
        }
    }
}
