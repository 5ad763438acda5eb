//! L2-regularized binary logistic regression.
//!
//! Minimizes the sample-weight-normalized objective
//!
//! ```text
//! f(w, b) = (1 / S) * ( sum_i s_i * logloss(y_i, sigmoid(w.x_i + b)) + |w|^2 / (2C) )
//! ```
//!
//! with `S = sum_i s_i`, using Newton steps with backtracking line search.
//! The intercept is not penalized.

use fd_types::{FdResult, Label, ModelError};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-class sample weighting applied while fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Every row weighs 1.
    Uniform,
    /// Row weight `n_samples / (n_classes * count(class))`.
    Balanced,
}

impl ClassWeight {
    /// Weight for each class, indexed by [`Label::index`].
    pub fn class_weights(self, labels: &[Label]) -> [f64; 2] {
        match self {
            ClassWeight::Uniform => [1.0, 1.0],
            ClassWeight::Balanced => {
                let mut counts = [0usize; 2];
                for label in labels {
                    counts[label.index()] += 1;
                }
                let n = labels.len() as f64;
                let mut weights = [0.0; 2];
                for (w, &count) in weights.iter_mut().zip(counts.iter()) {
                    *w = if count == 0 { 0.0 } else { n / (2.0 * count as f64) };
                }
                weights
            }
        }
    }
}

/// Solver settings for a single fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength; smaller is stronger.
    pub c: f64,
    pub class_weight: ClassWeight,
    pub max_iter: usize,
    /// Convergence threshold on the max-abs gradient.
    pub tol: f64,
}

impl LogisticParams {
    pub fn balanced(c: f64) -> Self {
        Self {
            c,
            class_weight: ClassWeight::Balanced,
            max_iter: 100,
            tol: 1e-4,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

/// A fitted logistic regression classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    intercept: f64,
    c: f64,
    n_iter: usize,
    converged: bool,
}

impl LogisticRegression {
    pub fn fit(x: &Array2<f64>, y: &[Label], params: &LogisticParams) -> FdResult<Self> {
        if !(params.c.is_finite() && params.c > 0.0) {
            return Err(ModelError::InvalidParameter {
                parameter: "C".to_string(),
                message: format!("must be positive and finite, got {}", params.c),
            }
            .into());
        }
        if x.nrows() != y.len() || x.nrows() == 0 {
            return Err(ModelError::FitFailed {
                message: format!("{} rows and {} labels", x.nrows(), y.len()),
            }
            .into());
        }

        let class_weights = params.class_weight.class_weights(y);
        let weights: Array1<f64> = y.iter().map(|l| class_weights[l.index()]).collect();
        let targets: Array1<f64> = y.iter().map(|l| l.as_f64()).collect();
        let total_weight = weights.sum();
        if total_weight <= 0.0 {
            return Err(ModelError::FitFailed {
                message: "all sample weights are zero".to_string(),
            }
            .into());
        }

        let n_features = x.ncols();
        let design = with_intercept_column(x);
        let mut penalty = Array1::from_elem(n_features + 1, 1.0 / params.c);
        penalty[n_features] = 0.0;

        let problem = Problem {
            design: &design,
            targets: &targets,
            weights: &weights,
            penalty: &penalty,
            total_weight,
        };

        let mut theta = Array1::<f64>::zeros(n_features + 1);
        let mut objective = problem.objective(&theta);
        let mut converged = false;
        let mut n_iter = 0;

        for iteration in 0..params.max_iter {
            let (gradient, hessian) = problem.gradient_and_hessian(&theta);
            let max_grad = gradient.iter().fold(0.0f64, |m, g| m.max(g.abs()));
            if max_grad <= params.tol {
                converged = true;
                break;
            }

            let step = solve_regularized(&hessian, &gradient).ok_or_else(|| ModelError::FitFailed {
                message: "Newton system is not positive definite".to_string(),
            })?;

            let decrease = gradient.dot(&step);
            let mut t = 1.0;
            let mut accepted = false;
            for _ in 0..40 {
                let candidate = &theta - &(&step * t);
                let value = problem.objective(&candidate);
                if value.is_finite() && value <= objective - 1e-4 * t * decrease {
                    theta = candidate;
                    objective = value;
                    accepted = true;
                    break;
                }
                t *= 0.5;
            }

            n_iter = iteration + 1;
            if !accepted {
                // No further decrease representable in f64.
                converged = max_grad <= params.tol.sqrt();
                break;
            }
        }

        if !objective.is_finite() {
            return Err(ModelError::FitFailed {
                message: "objective became non-finite".to_string(),
            }
            .into());
        }
        if !converged {
            warn!(
                c = params.c,
                iterations = n_iter,
                "Logistic regression did not converge; increase max_iter or standardize features"
            );
        }
        debug!(c = params.c, iterations = n_iter, objective, "Fitted logistic regression");

        Ok(Self {
            coefficients: theta.slice(s![..n_features]).to_owned(),
            intercept: theta[n_features],
            c: params.c,
            n_iter,
            converged,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Signed distance to the decision boundary, one value per row.
    ///
    /// Each row is computed on its own so a row's score never depends on the
    /// other rows of the batch.
    pub fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| self.decision_row(row))
            .collect()
    }

    /// Probability of [`Label::Fraud`] for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        self.decision_function(x).mapv(sigmoid)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<Label> {
        self.decision_function(x)
            .iter()
            .map(|&z| if z > 0.0 { Label::Fraud } else { Label::Legitimate })
            .collect()
    }

    fn decision_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        row.dot(&self.coefficients) + self.intercept
    }
}

struct Problem<'a> {
    design: &'a Array2<f64>,
    targets: &'a Array1<f64>,
    weights: &'a Array1<f64>,
    penalty: &'a Array1<f64>,
    total_weight: f64,
}

impl Problem<'_> {
    fn objective(&self, theta: &Array1<f64>) -> f64 {
        let z = self.design.dot(theta);
        let loss: f64 = z
            .iter()
            .zip(self.targets.iter())
            .zip(self.weights.iter())
            .map(|((&z, &y), &s)| s * (log1p_exp(z) - y * z))
            .sum();
        let reg: f64 = theta
            .iter()
            .zip(self.penalty.iter())
            .map(|(t, p)| 0.5 * p * t * t)
            .sum();
        (loss + reg) / self.total_weight
    }

    fn gradient_and_hessian(&self, theta: &Array1<f64>) -> (Array1<f64>, Array2<f64>) {
        let z = self.design.dot(theta);
        let p = z.mapv(sigmoid);

        let residual = (&p - self.targets) * self.weights;
        let mut gradient = self.design.t().dot(&residual) + &(self.penalty * theta);
        gradient /= self.total_weight;

        let curvature = (&p * &p.mapv(|v| 1.0 - v)) * self.weights;
        let scaled = self.design * &curvature.insert_axis(Axis(1));
        let mut hessian = self.design.t().dot(&scaled);
        for (i, p) in self.penalty.iter().enumerate() {
            hessian[[i, i]] += p;
        }
        hessian /= self.total_weight;

        (gradient, hessian)
    }
}

fn with_intercept_column(x: &Array2<f64>) -> Array2<f64> {
    let mut design = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
    design.slice_mut(s![.., ..x.ncols()]).assign(x);
    design
}

/// Solve `a * x = b` for symmetric `a`, adding diagonal jitter until the
/// Cholesky factorization succeeds.
fn solve_regularized(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let scale = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-300);
    let mut jitter = 0.0;
    for _ in 0..12 {
        let mut shifted = a.clone();
        if jitter > 0.0 {
            for i in 0..shifted.nrows() {
                shifted[[i, i]] += jitter;
            }
        }
        if let Some(l) = cholesky(&shifted) {
            return Some(cholesky_solve(&l, b));
        }
        jitter = if jitter == 0.0 { scale * 1e-12 } else { jitter * 10.0 };
    }
    None
}

fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !(diag > 0.0 && diag.is_finite()) {
            return None;
        }
        let ljj = diag.sqrt();
        l[[j, j]] = ljj;
        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / ljj;
        }
    }
    Some(l)
}

fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    // forward: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }
    // backward: L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<Label>) {
        let x = array![[-2.0], [-1.5], [-1.0], [-0.5], [0.5], [1.0], [1.5], [2.0]];
        let y = vec![
            Label::Legitimate,
            Label::Legitimate,
            Label::Legitimate,
            Label::Legitimate,
            Label::Fraud,
            Label::Fraud,
            Label::Fraud,
            Label::Fraud,
        ];
        (x, y)
    }

    #[test]
    fn sigmoid_is_stable_and_bounded() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0 && sigmoid(800.0) > 0.999);
        assert!(sigmoid(-800.0) >= 0.0 && sigmoid(-800.0) < 1e-300);
        assert!((log1p_exp(0.0) - 2f64.ln()).abs() < 1e-12);
        assert!((log1p_exp(1000.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn balanced_weights_are_inverse_frequency() {
        let labels = vec![Label::Legitimate, Label::Legitimate, Label::Legitimate, Label::Fraud];
        let w = ClassWeight::Balanced.class_weights(&labels);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
        assert_eq!(ClassWeight::Uniform.class_weights(&labels), [1.0, 1.0]);
    }

    #[test]
    fn fits_a_separable_problem() {
        let (x, y) = separable();
        let model = LogisticRegression::fit(&x, &y, &LogisticParams::balanced(1.0)).unwrap();

        assert!(model.converged());
        assert!(model.coefficients()[0] > 0.0);
        assert_eq!(model.predict(&x), y);

        let proba = model.predict_proba(&x);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba[0] < 0.5 && proba[7] > 0.5);
    }

    #[test]
    fn stronger_regularization_shrinks_coefficients() {
        let (x, y) = separable();
        let weak = LogisticRegression::fit(&x, &y, &LogisticParams::balanced(100.0)).unwrap();
        let strong = LogisticRegression::fit(&x, &y, &LogisticParams::balanced(1e-4)).unwrap();
        assert!(strong.coefficients()[0].abs() < weak.coefficients()[0].abs());
        assert!(strong.coefficients()[0].abs() < 1e-2);
    }

    #[test]
    fn balanced_weighting_keeps_the_minority_class_visible() {
        // 18 legitimate rows around -1, 2 fraud rows around +1 with overlap.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..18 {
            rows.push(-1.0 + (i as f64) * 0.1);
            labels.push(Label::Legitimate);
        }
        rows.push(0.9);
        labels.push(Label::Fraud);
        rows.push(1.1);
        labels.push(Label::Fraud);
        let x = Array2::from_shape_vec((rows.len(), 1), rows).unwrap();

        let balanced = LogisticRegression::fit(&x, &labels, &LogisticParams::balanced(1.0)).unwrap();
        let predictions = balanced.predict(&x);
        assert_eq!(predictions[18], Label::Fraud);
        assert_eq!(predictions[19], Label::Fraud);
    }

    #[test]
    fn rejects_invalid_c() {
        let (x, y) = separable();
        let result = LogisticRegression::fit(&x, &y, &LogisticParams::balanced(0.0));
        assert!(result.is_err());
    }

    #[test]
    fn cholesky_solves_spd_system() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let x = solve_regularized(&a, &b).unwrap();
        let residual = a.dot(&x) - &b;
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn row_scores_do_not_depend_on_batch() {
        let (x, y) = separable();
        let model = LogisticRegression::fit(&x, &y, &LogisticParams::balanced(1.0)).unwrap();
        let batch = model.predict_proba(&x);
        let single = model.predict_proba(&x.slice(s![3..4, ..]).to_owned());
        assert_eq!(batch[3].to_bits(), single[0].to_bits());
    }
}
