//! Definite integration over the theta domain.

use crate::error::Result;

/// Integrates a one-argument function over `[lower, upper]` using a fixed
/// number of subintervals. The integrand may fail; the first failure aborts
/// the integration.
pub trait Integrator: Send + Sync {
    fn integrate(
        &self,
        f: &mut dyn FnMut(f64) -> Result<f64>,
        subintervals: usize,
        lower: f64,
        upper: f64,
    ) -> Result<f64>;
}

pub const DEFAULT_SUBINTERVALS: usize = 10;
pub const DEFAULT_POINTS: usize = 15;

/// Composite Gauss-Legendre rule: `subintervals` equal panels with an
/// `n`-point rule on each.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    pub fn new(n: usize) -> Self {
        let (nodes, weights) = gauss_legendre_rule(n.max(1));
        Self { nodes, weights }
    }

    pub fn points(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for GaussLegendre {
    fn default() -> Self {
        Self::new(DEFAULT_POINTS)
    }
}

impl Integrator for GaussLegendre {
    fn integrate(
        &self,
        f: &mut dyn FnMut(f64) -> Result<f64>,
        subintervals: usize,
        lower: f64,
        upper: f64,
    ) -> Result<f64> {
        if lower == upper {
            return Ok(0.0);
        }
        let panels = subintervals.max(1);
        let width = (upper - lower) / panels as f64;
        let half = 0.5 * width;

        let mut total = 0.0;
        for panel in 0..panels {
            let mid = lower + (panel as f64 + 0.5) * width;
            let mut panel_sum = 0.0;
            for (&x, &w) in self.nodes.iter().zip(&self.weights) {
                panel_sum += w * f(mid + half * x)?;
            }
            total += half * panel_sum;
        }
        Ok(total)
    }
}

/// Nodes and weights on `[-1, 1]` by Newton iteration on the Legendre
/// polynomial roots.
fn gauss_legendre_rule(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let m = n.div_ceil(2);

    for i in 0..m {
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 0.0;
        for _ in 0..100 {
            let (p, d) = legendre(n, x);
            dp = d;
            let dx = p / d;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let (_, d) = legendre(n, x);
        if d != 0.0 {
            dp = d;
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

/// `(P_n(x), P_n'(x))` by the three-term recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}
