//! Pass^k estimators over repeated trials of one task.
//!
//! `pass^k = C(c, k) / C(n, k)`: the probability that `k` trials drawn without
//! replacement from `n` recorded trials (`c` of them successful) all succeed.

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// The `k` values reported everywhere.
pub const PASS_K_VALUES: [u32; 3] = [1, 2, 4];

/// Rendering of an undefined estimator.
pub const INSUFFICIENT_SAMPLE: &str = "insufficient sample";

/// `C(c, k) / C(n, k)`, or `None` when it cannot be computed (`n < k` or
/// `c > n`). A zero from `c < k` is a defined value.
pub fn pass_at_k(n: u32, c: u32, k: u32) -> Option<f64> {
    if n < k || c > n || n == 0 {
        return None;
    }
    // C(c,k)/C(n,k) = prod_{i<k} (c-i)/(n-i); terms vanish once i reaches c.
    let mut ratio = 1.0_f64;
    for i in 0..k {
        if i >= c {
            return Some(0.0);
        }
        ratio *= f64::from(c - i) / f64::from(n - i);
    }
    Some(ratio)
}

/// Pass^1, Pass^2 and Pass^4 for one population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassAtK {
    pub p1: Option<f64>,
    pub p2: Option<f64>,
    pub p4: Option<f64>,
}

impl PassAtK {
    pub fn from_counts(n: u32, c: u32) -> Self {
        Self {
            p1: pass_at_k(n, c, 1),
            p2: pass_at_k(n, c, 2),
            p4: pass_at_k(n, c, 4),
        }
    }

    /// Value for one of [`PASS_K_VALUES`].
    pub fn get(&self, k: u32) -> Option<f64> {
        match k {
            1 => self.p1,
            2 => self.p2,
            4 => self.p4,
            _ => None,
        }
    }

    pub fn values(&self) -> [Option<f64>; 3] {
        [self.p1, self.p2, self.p4]
    }

    pub fn from_values(values: [Option<f64>; 3]) -> Self {
        Self {
            p1: values[0],
            p2: values[1],
            p4: values[2],
        }
    }
}

/// Render an estimator with three decimals, or [`INSUFFICIENT_SAMPLE`].
pub fn render_pass_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => INSUFFICIENT_SAMPLE.to_string(),
    }
}

/// Trial counts and estimators for one (model, domain, task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAggregate {
    pub model: String,
    pub domain: String,
    pub task_id: String,
    /// Trials recorded.
    pub n: u32,
    /// Trials passed; `c <= n`.
    pub c: u32,
    pub pass_at: PassAtK,
}

impl TaskAggregate {
    pub fn new(
        model: impl Into<String>,
        domain: impl Into<String>,
        task_id: impl Into<String>,
        n: u32,
        c: u32,
    ) -> Self {
        Self {
            model: model.into(),
            domain: domain.into(),
            task_id: task_id.into(),
            n,
            c,
            pass_at: PassAtK::from_counts(n, c),
        }
    }

    /// Aggregate the verdicts of every trial of one task.
    pub fn from_verdicts<'a>(
        model: impl Into<String>,
        domain: impl Into<String>,
        task_id: impl Into<String>,
        verdicts: impl IntoIterator<Item = &'a Verdict>,
    ) -> Self {
        let (n, c) = verdicts.into_iter().fold((0u32, 0u32), |(n, c), v| {
            (n + 1, c + u32::from(v.passed))
        });
        Self::new(model, domain, task_id, n, c)
    }
}
