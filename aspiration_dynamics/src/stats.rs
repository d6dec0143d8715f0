//! Small numeric helpers: moments and the F distribution tail

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
///
/// A constant series yields exactly 0.0.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    if values.iter().all(|&x| x == first) {
        return 0.0;
    }

    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// P(F > f) for an F(d1, d2) variable
pub fn f_survival(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() || d1 <= 0.0 || d2 <= 0.0 {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    if f.is_infinite() {
        return 0.0;
    }
    let x = d2 / (d2 + d1 * f);
    regularized_incomplete_beta(d2 / 2.0, d1 / 2.0, x).clamp(0.0, 1.0)
}

/// Regularized incomplete beta I_x(a, b)
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // continued fraction converges fastest on this side of the mean
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Lanczos approximation of ln Γ(x) for x > 0
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
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
        // reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = COEFFS[0];
    for (i, &c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    let t = x + G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

/// Modified Lentz evaluation of the incomplete beta continued fraction
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-300;

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
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
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

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mean_and_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(mean(&values), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(std_dev(&values), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_series_has_exactly_zero_std() {
        // 0.1 × 3 / 3 != 0.1 in floating point; the shortcut avoids that residue
        assert_eq!(std_dev(&[0.1, 0.1, 0.1]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[-4.0]), 0.0);
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert_abs_diff_eq!(ln_gamma(1.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ln_gamma(5.0), 24f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            ln_gamma(0.5),
            std::f64::consts::PI.sqrt().ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn incomplete_beta_known_values() {
        // I_x(1, 1) = x
        assert_abs_diff_eq!(regularized_incomplete_beta(1.0, 1.0, 0.3), 0.3, epsilon = 1e-12);
        // I_x(2, 1) = x²
        assert_abs_diff_eq!(regularized_incomplete_beta(2.0, 1.0, 0.6), 0.36, epsilon = 1e-12);
        // symmetry: I_0.5(a, a) = 0.5
        assert_abs_diff_eq!(regularized_incomplete_beta(3.5, 3.5, 0.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn f_survival_known_values() {
        // F(2, d2): P(F > f) = (1 + 2f/d2)^(-d2/2)
        let expected = (1.0f64 + 2.0 * 3.0 / 10.0).powf(-5.0);
        assert_abs_diff_eq!(f_survival(3.0, 2.0, 10.0), expected, epsilon = 1e-10);

        // Critical value F(1, 10) at 5% is about 4.9646
        assert_abs_diff_eq!(f_survival(4.9646, 1.0, 10.0), 0.05, epsilon = 1e-4);
    }

    #[test]
    fn f_survival_edges() {
        assert_eq!(f_survival(0.0, 3.0, 12.0), 1.0);
        assert_eq!(f_survival(f64::INFINITY, 3.0, 12.0), 0.0);
        assert!(f_survival(1.0, 0.0, 12.0).is_nan());
    }
}
