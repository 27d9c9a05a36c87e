// ── Result Structs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisherResult {
    /// Two-tailed p-value, clamped to [0, 1].
    pub p_value: f64,
    /// Hypergeometric probability of the observed table.
    pub point_probability: f64,
    /// Total observations in the table (a + b + c + d).
    pub total: u64,
    /// Set when `total` exceeded the exact-summation limit and log-gamma was used.
    pub precision_warning: bool,
}

// ── Log Factorials ──────────────────────────────────────────────────

/// ln(n!) by direct summation of ln(k) for k in 1..=n. ln(0!) = 0.
pub fn ln_factorial(n: u64) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

/// ln(n!) for several arguments with a single summation pass up to the largest.
/// Each result equals `ln_factorial` of the matching argument.
fn ln_factorials<const N: usize>(args: [u64; N]) -> [f64; N] {
    let mut order: [usize; N] = std::array::from_fn(|i| i);
    order.sort_by_key(|&i| args[i]);

    let mut out = [0.0; N];
    let mut acc = 0.0;
    let mut k: u64 = 1;
    for i in order {
        while k < args[i] {
            k += 1;
            acc += (k as f64).ln();
        }
        out[i] = acc;
    }
    out
}

/// Lanczos approximation of ln(Gamma(x)) for x > 0.
#[allow(clippy::excessive_precision)]
fn ln_gamma(x: f64) -> f64 {
    // Lanczos coefficients (g=7)
    let coefficients = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = coefficients[0];
    let t = x + 7.5; // g + 0.5

    for (i, &coef) in coefficients.iter().enumerate().skip(1) {
        acc += coef / (x + i as f64);
    }

    0.5 * (2.0 * std::f64::consts::PI).ln() + (t.ln() * (x + 0.5)) - t + acc.ln()
}

// ── Fisher's Exact Test ─────────────────────────────────────────────

/// Fisher's exact test on the 2x2 table
///
/// ```text
///            clicks   non-clicks
/// control      a          b
/// test         c          d
/// ```
///
/// The two-tailed value is `2 * P(observed table)`, not the sum over all
/// tables at least as extreme. Downstream reports are calibrated to this
/// approximation, so it is kept as is. The doubled value can exceed 1 for
/// degenerate tables and is clamped.
pub fn fisher_exact_test(a: u64, b: u64, c: u64, d: u64) -> f64 {
    fisher_exact_test_bounded(a, b, c, d, u64::MAX).p_value
}

/// Same as [`fisher_exact_test`], switching to log-gamma when the table holds
/// more than `exact_count_limit` observations. Summing logs one by one loses
/// precision and time at that scale.
pub fn fisher_exact_test_bounded(
    a: u64,
    b: u64,
    c: u64,
    d: u64,
    exact_count_limit: u64,
) -> FisherResult {
    // Margins are summed in u128 so counts near u64::MAX cannot overflow.
    let (a, b, c, d) = (a as u128, b as u128, c as u128, d as u128);
    let n = a + b + c + d;
    let args = [a + b, c + d, a + c, b + d, a, b, c, d, n];
    let precision_warning = n > exact_count_limit as u128;

    let [f_ab, f_cd, f_ac, f_bd, f_a, f_b, f_c, f_d, f_n] = if precision_warning {
        args.map(|k| ln_gamma(k as f64 + 1.0))
    } else {
        // n <= exact_count_limit, so every margin fits in u64.
        ln_factorials(args.map(|k| k as u64))
    };

    // Paired sums keep the result bit-identical when control and test swap.
    let log_p = ((f_ab + f_cd) + (f_ac + f_bd)) - ((f_a + f_b) + (f_c + f_d)) - f_n;
    let point_probability = log_p.exp();
    let p_value = if point_probability.is_nan() {
        1.0
    } else {
        (2.0 * point_probability).clamp(0.0, 1.0)
    };

    FisherResult {
        p_value,
        point_probability,
        total: u64::try_from(n).unwrap_or(u64::MAX),
        precision_warning,
    }
}
