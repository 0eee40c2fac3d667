//! Ratcliff/Obershelp string similarity.
//!
//! `ratio = 2 * M / (|a| + |b|)` where `M` is the total length of the matching
//! blocks found by repeatedly taking the longest common substring and recursing
//! on the unmatched pieces to its left and right. Lengths count `char`s.

/// Similarity of `a` and `b` in `[0.0, 1.0]`. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    score(matching_chars(&a, &b), a.len() + b.len())
}

/// Cheap upper bound on [`ratio`] from the lengths alone.
pub fn length_bound(a: &str, b: &str) -> f64 {
    let la = a.chars().count();
    let lb = b.chars().count();
    score(la.min(lb), la + lb)
}

fn score(matches: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / total as f64
}

/// Total size of the matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
///
/// Ties resolve to the earliest start in `a`, then the earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run[j - blo + 1] = length of the common suffix ending at a[i-1], b[j]
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            curr[slot] = if a[i] == b[j] { prev[slot - 1] + 1 } else { 0 };
            let k = curr[slot];
            if k > best_k {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_k = k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_k)
}
