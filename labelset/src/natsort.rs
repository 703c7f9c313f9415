//! Natural ordering of serialized `name="value"` tokens.
//!
//! Runs of ASCII digits compare by numeric magnitude, so `foo2` sorts
//! before `foo11`. Magnitudes are compared on the digit strings
//! themselves (count of significant digits first, then lexically), so
//! runs of any width are supported without parsing.

use std::cmp::Ordering;

/// Separator between a label name and its quoted value.
const SEPARATOR: u8 = b'=';

/// Compares two tokens in natural order.
///
/// Byte-identical tokens are always equal. Runs that differ only in
/// leading zeros (`7` vs `007`) compare equal as numbers; if nothing
/// else separates the tokens, the run with fewer digits sorts first.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a.as_bytes(), b.as_bytes());
    let mut padding = Ordering::Equal;
    loop {
        // Never step into a digit run, even when both sides agree on it.
        let common = a
            .iter()
            .zip(b)
            .take_while(|(x, y)| x == y && !x.is_ascii_digit())
            .count();
        a = &a[common..];
        b = &b[common..];

        let (x, y) = match (a.first(), b.first()) {
            (None, None) => return padding,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&x), Some(&y)) => (x, y),
        };
        match (x.is_ascii_digit(), y.is_ascii_digit()) {
            (true, true) => {
                let (run_a, rest_a) = split_digit_run(a);
                let (run_b, rest_b) = split_digit_run(b);
                let (num_a, num_b) = (trim_leading_zeros(run_a), trim_leading_zeros(run_b));
                let ord = num_a
                    .len()
                    .cmp(&num_b.len())
                    .then_with(|| num_a.cmp(num_b));
                if ord != Ordering::Equal {
                    return ord;
                }
                if padding == Ordering::Equal {
                    padding = run_a.len().cmp(&run_b.len());
                }
                a = rest_a;
                b = rest_b;
            }
            (true, false) => return digit_run_against(y),
            (false, true) => return digit_run_against(x).reverse(),
            (false, false) => return a.cmp(b),
        }
    }
}

/// Sorts tokens in place by [`compare`].
pub fn sort<S: AsRef<str>>(tokens: &mut [S]) {
    tokens.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
}

/// Ordering of a digit run against a token continuing with the
/// non-digit byte `other`.
///
/// A run sorts after the separator, so `name="` precedes `name1="`.
/// Bytes between `9` and the separator (`:`, `;`, `<`) get the same
/// treatment to keep the ordering transitive; every other byte compares
/// as it would byte-wise.
fn digit_run_against(other: u8) -> Ordering {
    if other <= SEPARATOR {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn split_digit_run(s: &[u8]) -> (&[u8], &[u8]) {
    let len = s.iter().take_while(|c| c.is_ascii_digit()).count();
    s.split_at(len)
}

fn trim_leading_zeros(run: &[u8]) -> &[u8] {
    let zeros = run.iter().take_while(|&&c| c == b'0').count();
    &run[zeros..]
}
