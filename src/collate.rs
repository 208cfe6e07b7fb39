//! Category-name collation.
//!
//! Names sort case-insensitively with embedded digit runs compared by numeric
//! value, so "Project 9" comes before "project 10". Ties fall back to a plain
//! byte comparison to keep the order total and deterministic.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    compare_chunks(a, b).then_with(|| a.cmp(b))
}

fn compare_chunks(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ord = compare_numbers(&take_digits(&mut left), &take_digits(&mut right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

// Digit runs of any length: strip leading zeros, then longer means larger.
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    #[test]
    fn ignores_case() {
        assert_eq!(sorted(vec!["beta", "Alpha", "alpha2", "Gamma"]), vec!["Alpha", "alpha2", "beta", "Gamma"]);
    }

    #[test]
    fn compares_digit_runs_numerically() {
        assert_eq!(
            sorted(vec!["Project 10", "project 9", "Project 100", "Project 09x"]),
            vec!["project 9", "Project 09x", "Project 10", "Project 100"]
        );
    }

    #[test]
    fn is_total_for_case_variants() {
        assert_eq!(natural_cmp("Work", "work"), "Work".cmp("work"));
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
    }

    #[test]
    fn handles_huge_numbers() {
        assert_eq!(natural_cmp("v99999999999999999999999", "v100000000000000000000000"), Ordering::Less);
    }
}
