//! Ratcliff/Obershelp similarity between article names.
//!
//! The ratio is `2·M / T`, where `T` is the total length of both strings and
//! `M` the number of characters in matching blocks. Blocks are found by
//! taking the longest common substring (earliest on ties) and recursing on
//! both sides of it.

use std::collections::HashMap;

/// Similarity ratio in `[0, 1]` between `a` and `b`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Upper bound on [`ratio`] from character counts only.
pub fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }
    let mut matches = 0;
    let mut len_a = 0;
    for c in a.chars() {
        len_a += 1;
        if let Some(n) = available.get_mut(&c) {
            if *n > 0 {
                *n -= 1;
                matches += 1;
            }
        }
    }
    let total = len_a + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &positions, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest block `a[i..i+k] == b[j..j+k]` within the given bounds; among
/// equally long blocks the one starting earliest in `a`, then in `b`, wins.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(js) = positions.get(c) {
            for &j in js {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j.checked_sub(1).and_then(|p| run_lengths.get(&p)).copied().unwrap_or(0) + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        run_lengths = next;
    }
    (best_i, best_j, best_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_identical_and_disjoint() {
        assert_close(ratio("ROBE", "ROBE"), 1.0);
        assert_close(ratio("ROBE", "XYZ"), 0.0);
        assert_close(ratio("", ""), 1.0);
    }

    #[test]
    fn test_known_ratios() {
        // 2 * 3 / 8
        assert_close(ratio("abcd", "bcde"), 0.75);
        // "ab" then "cd" on the right of it.
        assert_close(ratio("abxcd", "abcd"), 8.0 / 9.0);
        assert_close(ratio("TUNIQUE", "TUNIQUES"), 14.0 / 15.0);
    }

    #[test]
    fn test_quick_ratio_bounds_ratio() {
        for (a, b) in [("PANTALON", "PANTALONS"), ("ROBE LONGUE", "LONGUE ROBE"), ("X", "Y")] {
            assert!(quick_ratio(a, b) + 1e-12 >= ratio(a, b));
        }
    }
}
