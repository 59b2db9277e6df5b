//! Shared numeric helpers.

/// Probability clamp, `(2^-52)^(1/3)`.
///
/// Every model probability is kept inside `[PROB_EPS, 1 - PROB_EPS]` so that
/// downstream logs and ratios never see 0 or 1.
pub const PROB_EPS: f64 = 6.055_454_452_393_343e-6;

pub const LOG_2_PI: f64 = 1.8378770664093453;

#[inline]
pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// `exp(x) / (1 + exp(x))` with the overflow case pinned to `1 - PROB_EPS`
/// and the result clamped into the probability band.
#[inline]
pub fn clamped_logistic(x: f64) -> f64 {
    let exp_x = x.exp();
    if exp_x.is_infinite() {
        return 1.0 - PROB_EPS;
    }
    clamp_probability(exp_x / (1.0 + exp_x))
}

/// Natural log of the gamma function (Lanczos, g = 7).
pub fn ln_gamma(x: f64) -> f64 {
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
    let t = x + 7.5;
    for (i, &c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    0.5 * LOG_2_PI + (x + 0.5) * t.ln() - t + acc.ln()
}
