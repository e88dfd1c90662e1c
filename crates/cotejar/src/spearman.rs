//! Spearman rank correlation between two level orderings.
//!
//! The coefficient is computed over rank vectors indexed by level: for each
//! ordering, a level's rank is its position in that ordering. Ties in the
//! inputs (possible when ranks are derived from equal scores) use mid-ranks,
//! in which case the coefficient falls back to Pearson correlation on the
//! rank vectors instead of the d-squared shortcut, and the p-value goes
//! through the t-approximation instead of the tie-free permutation table.

use crate::level::Level;
use crate::result::{CotejarError, CotejarResult};
use std::collections::BTreeSet;

/// Spearman correlation with its two-sided significance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpearmanResult {
    /// Rank correlation coefficient in [-1, 1]
    pub rho: f64,
    /// Two-sided p-value for the null hypothesis of no association
    pub p_value: f64,
}

/// Correlate two orderings of the same level set.
///
/// # Errors
///
/// [`CotejarError::InsufficientData`] when fewer than two levels are
/// compared, [`CotejarError::SetMismatch`] when the orderings cover
/// different level sets or contain duplicates.
pub fn correlate_orders(reference: &[Level], candidate: &[Level]) -> CotejarResult<SpearmanResult> {
    check_level_sets(reference, candidate)?;
    let ranks_a = ranks_from_order(reference);
    let ranks_b = align_ranks(reference, candidate);
    Ok(correlate_ranks(&ranks_a, &ranks_b))
}

/// Correlate two rank vectors directly. Callers guarantee equal length of
/// at least three; orderings go through [`correlate_orders`] instead.
#[must_use]
pub fn correlate_ranks(ranks_a: &[f64], ranks_b: &[f64]) -> SpearmanResult {
    debug_assert_eq!(ranks_a.len(), ranks_b.len());
    let n = ranks_a.len();
    let tied = has_ties(ranks_a) || has_ties(ranks_b);
    let rho = if tied {
        pearson(ranks_a, ranks_b)
    } else {
        let d_squared: f64 = ranks_a
            .iter()
            .zip(ranks_b)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        let nf = n as f64;
        1.0 - 6.0 * d_squared / (nf * (nf * nf - 1.0))
    };
    let rho = rho.clamp(-1.0, 1.0);
    SpearmanResult {
        rho,
        p_value: two_sided_p(rho, n, tied),
    }
}

/// Assign mid-ranks to scores: the smallest score gets rank 1, equal scores
/// share the average of the ranks they occupy.
#[must_use]
pub fn rank_scores(scores: &[f64]) -> Vec<f64> {
    let n = scores.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && (scores[indices[j + 1]] - scores[indices[i]]).abs() < f64::EPSILON {
            j += 1;
        }
        // positions i..=j hold equal scores; 1-based ranks i+1..=j+1
        let mid = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &indices[i..=j] {
            ranks[idx] = mid;
        }
        i = j + 1;
    }
    ranks
}

fn check_level_sets(reference: &[Level], candidate: &[Level]) -> CotejarResult<()> {
    if reference.len() < 2 {
        return Err(CotejarError::InsufficientData {
            n: reference.len(),
        });
    }
    let set_a: BTreeSet<Level> = reference.iter().copied().collect();
    let set_b: BTreeSet<Level> = candidate.iter().copied().collect();
    if set_a.len() != reference.len() || set_b.len() != candidate.len() {
        return Err(CotejarError::set_mismatch("ordering contains duplicate levels"));
    }
    if set_a != set_b {
        let missing: Vec<String> = set_a.difference(&set_b).map(Level::to_string).collect();
        let extra: Vec<String> = set_b.difference(&set_a).map(Level::to_string).collect();
        return Err(CotejarError::set_mismatch(format!(
            "orderings cover different levels (missing: [{}], unexpected: [{}])",
            missing.join(", "),
            extra.join(", ")
        )));
    }
    Ok(())
}

/// Rank vector of an ordering over itself: level at position i has rank i+1.
fn ranks_from_order(order: &[Level]) -> Vec<f64> {
    (1..=order.len()).map(|r| r as f64).collect()
}

/// Rank of each of `reference`'s levels within `candidate`.
fn align_ranks(reference: &[Level], candidate: &[Level]) -> Vec<f64> {
    reference
        .iter()
        .map(|level| {
            // set equality was checked, the position exists
            let pos = candidate.iter().position(|c| c == level).unwrap_or(0);
            (pos + 1) as f64
        })
        .collect()
}

fn has_ties(ranks: &[f64]) -> bool {
    let mut sorted = ranks.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.windows(2).any(|w| (w[0] - w[1]).abs() < f64::EPSILON)
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x < f64::EPSILON || var_y < f64::EPSILON {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

/// Largest n for which the permutation null distribution is enumerated
/// exactly; above it the t-approximation takes over. 9! is 362880
/// permutations, well within test-suite time.
const EXACT_P_MAX_N: usize = 9;

/// Two-sided p-value for an observed rho over n items. The exact
/// permutation distribution only models tie-free ranks, so tied inputs use
/// the t-approximation at every n.
fn two_sided_p(rho: f64, n: usize, tied: bool) -> f64 {
    if (rho.abs() - 1.0).abs() < 1e-12 {
        // perfect agreement or reversal is the most extreme outcome under
        // any null tail, report exact zero
        return 0.0;
    }
    if n <= EXACT_P_MAX_N && !tied {
        exact_p(rho, n)
    } else {
        t_approximation_p(rho, n)
    }
}

/// Exact permutation p-value: the fraction of the n! rank permutations
/// whose |rho| is at least the observed |rho|.
fn exact_p(rho: f64, n: usize) -> f64 {
    let nf = n as f64;
    let denom = nf * (nf * nf - 1.0);
    // |rho| >= |observed| translates to d_squared thresholds on both tails
    let threshold = rho.abs() - 1e-12;
    let mut perm: Vec<usize> = (0..n).collect();
    let mut extreme = 0u64;
    let mut total = 0u64;
    permute(&mut perm, 0, &mut |p| {
        let d_squared: f64 = p
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                let d = i as f64 - r as f64;
                d * d
            })
            .sum();
        let perm_rho = 1.0 - 6.0 * d_squared / denom;
        if perm_rho.abs() >= threshold {
            extreme += 1;
        }
        total += 1;
    });
    extreme as f64 / total as f64
}

fn permute(items: &mut [usize], k: usize, visit: &mut impl FnMut(&[usize])) {
    if k == items.len() {
        visit(items);
        return;
    }
    for i in k..items.len() {
        items.swap(k, i);
        permute(items, k + 1, visit);
        items.swap(k, i);
    }
}

/// Student-t approximation: t = rho * sqrt((n-2)/(1-rho^2)) with n-2
/// degrees of freedom, two-sided tail via the regularized incomplete beta
/// function.
fn t_approximation_p(rho: f64, n: usize) -> f64 {
    let df = (n - 2) as f64;
    let t_squared = rho * rho * df / (1.0 - rho * rho);
    // P(|T| >= t) = I_{df/(df+t^2)}(df/2, 1/2)
    incomplete_beta(df / (df + t_squared), df / 2.0, 0.5).clamp(0.0, 1.0)
}

/// Regularized incomplete beta function I_x(a, b).
fn incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    // continued fraction converges fastest below the (a+1)/(a+b+2) pivot
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

/// Lentz-method continued fraction for the incomplete beta function.
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-30;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let mf = m as f64;
        let m2 = 2.0 * mf;
        let aa = mf * (b - mf) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + mf) * (qab + mf) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Lanczos approximation of ln(gamma(x)), g = 7, 9 coefficients.
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 8] = [
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // reflection formula
        return std::f64::consts::PI.ln()
            - (std::f64::consts::PI * x).sin().ln()
            - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = 0.999_999_999_999_809_9;
    for (i, &c) in COEFFICIENTS.iter().enumerate() {
        acc += c / (x + (i + 1) as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn any_permutation() -> impl Strategy<Value = Vec<Level>> {
        Just((0u32..=10).collect::<Vec<u32>>()).prop_shuffle().prop_map(|values| {
            values
                .into_iter()
                .map(|v| Level::new(v).unwrap())
                .collect()
        })
    }

    proptest! {
        /// rho and p stay within their mathematical ranges for any
        /// permutation pair.
        #[test]
        fn prop_rho_and_p_in_range(a in any_permutation(), b in any_permutation()) {
            let result = correlate_orders(&a, &b).unwrap();
            prop_assert!((-1.0..=1.0).contains(&result.rho));
            prop_assert!((0.0..=1.0).contains(&result.p_value));
        }

        /// Correlation of a permutation with itself is exactly 1.
        #[test]
        fn prop_self_correlation_is_one(a in any_permutation()) {
            let result = correlate_orders(&a, &a).unwrap();
            prop_assert!((result.rho - 1.0).abs() < 1e-12);
            prop_assert!(result.p_value.abs() < 1e-12);
        }

        /// Swapping the argument order never changes the result.
        #[test]
        fn prop_symmetry(a in any_permutation(), b in any_permutation()) {
            let ab = correlate_orders(&a, &b).unwrap();
            let ba = correlate_orders(&b, &a).unwrap();
            prop_assert!((ab.rho - ba.rho).abs() < 1e-9);
            prop_assert!((ab.p_value - ba.p_value).abs() < 1e-9);
        }
    }
}
