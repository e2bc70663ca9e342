//! Token-set similarity between composite keys.
//!
//! Both strings are preprocessed (every character that is not a Unicode
//! alphanumeric or `_` turned into a space, lowercased), split into unique
//! whitespace tokens, and compared as:
//!
//! ```text
//! sect = sorted(a ∩ b)
//! ab   = sect + sorted(a − b)
//! ba   = sect + sorted(b − a)
//! score = max(ratio(sect, ab), ratio(sect, ba), ratio(ab, ba))
//! ```
//!
//! where `ratio = 2·LCS / (len_a + len_b)` over chars, scaled to 0-100 and rounded half
//! to even. A string that is empty after preprocessing scores 0.

use std::collections::{BTreeSet, HashMap};

/// A similarity implementation. Selected once per run and passed to the
/// matcher as a type parameter.
pub trait Scorer: Send + Sync {
    /// Similarity of two composite keys, 0..=100.
    fn score(&self, left: &str, right: &str) -> u8;
}

/// Reference implementation: dynamic-programming LCS.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetRatio;

impl Scorer for TokenSetRatio {
    fn score(&self, left: &str, right: &str) -> u8 {
        token_set_ratio(left, right, lcs_dp)
    }
}

/// Same scores as [`TokenSetRatio`], computing LCS bit-parallel when the
/// shorter string fits in a machine word.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastTokenSetRatio;

impl Scorer for FastTokenSetRatio {
    fn score(&self, left: &str, right: &str) -> u8 {
        token_set_ratio(left, right, lcs_fast)
    }
}

/// Map characters other than Unicode alphanumerics and `_` to spaces,
/// lowercase, trim.
pub fn preprocess(s: &str) -> String {
    let mapped: String = s
        .chars()
        .flat_map(|c| -> Vec<char> {
            if c.is_alphanumeric() || c == '_' {
                c.to_lowercase().collect()
            } else {
                vec![' ']
            }
        })
        .collect();
    mapped.trim().to_string()
}

type Lcs = fn(&[char], &[char]) -> usize;

fn token_set_ratio(left: &str, right: &str, lcs: Lcs) -> u8 {
    let p1 = preprocess(left);
    let p2 = preprocess(right);
    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    let tokens1: BTreeSet<&str> = p1.split_whitespace().collect();
    let tokens2: BTreeSet<&str> = p2.split_whitespace().collect();

    let sect: Vec<&str> = tokens1.intersection(&tokens2).copied().collect();
    let diff1: Vec<&str> = tokens1.difference(&tokens2).copied().collect();
    let diff2: Vec<&str> = tokens2.difference(&tokens1).copied().collect();

    let sorted_sect = sect.join(" ");
    let combined_1to2 = format!("{} {}", sorted_sect, diff1.join(" "));
    let combined_2to1 = format!("{} {}", sorted_sect, diff2.join(" "));
    let combined_1to2 = combined_1to2.trim();
    let combined_2to1 = combined_2to1.trim();

    [
        ratio(&sorted_sect, combined_1to2, lcs),
        ratio(&sorted_sect, combined_2to1, lcs),
        ratio(combined_1to2, combined_2to1, lcs),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// Indel similarity ratio of two preprocessed strings over their chars, 0..=100.
fn ratio(a: &str, b: &str, lcs: Lcs) -> u8 {
    if a == b {
        return 100;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let lensum = a.len() + b.len();
    let distance = lensum - 2 * lcs(&a, &b);
    let r = (lensum - distance) as f64 / lensum as f64;
    (100.0 * r).round_ties_even() as u8
}

/// Longest common subsequence length, O(n·m) time, O(min) space.
fn lcs_dp(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

fn lcs_fast(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.len() > 64 {
        return lcs_dp(a, b);
    }
    lcs_bit_parallel(short, long)
}

/// Bit-parallel LCS (Hyyrö). `pattern` must be at most 64 chars.
fn lcs_bit_parallel(pattern: &[char], text: &[char]) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    let mut peq: HashMap<char, u64> = HashMap::with_capacity(pattern.len());
    for (i, &c) in pattern.iter().enumerate() {
        *peq.entry(c).or_insert(0) |= 1u64 << i;
    }
    let mut v: u64 = !0;
    for c in text {
        let u = v & peq.get(c).copied().unwrap_or(0);
        v = v.wrapping_add(u) | (v - u);
    }
    let mask = if pattern.len() == 64 {
        !0u64
    } else {
        (1u64 << pattern.len()) - 1
    };
    (!v & mask).count_ones() as usize
}
