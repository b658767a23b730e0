use {
    ndarray::{Array1, ArrayView1},
    serde::{Serialize, Deserialize},
    sprs::CsMat,
    typed_builder::TypedBuilder,
    tracing::{debug, warn},
    toxic_comments_core::{
        config::AuxiliaryConfig,
        error::{PipelineError, Result},
    },
};

/// Tracing target of the per-iteration solver output.
pub const SOLVER_LOG_TARGET: &str = "ridge_solver";

#[derive(TypedBuilder, Debug, Clone)]
pub struct RidgeParams {
    #[builder(default = 1.0)]
    alpha: f64,
    #[builder(default = 1e-6)]
    tolerance: f64,
    #[builder(default = 1000)]
    max_iterations: usize,
}

/// L2-penalized linear model with an unpenalized intercept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RidgeModel {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl RidgeParams {
    pub fn from_config(config: &AuxiliaryConfig) -> Self {
        Self::builder()
            .alpha(config.alpha())
            .tolerance(config.solver_tolerance())
            .max_iterations(config.solver_max_iterations())
            .build()
    }

    /// Solves `(Xc^T Xc + alpha I) w = Xc^T yc` by conjugate gradient, `Xc` and `yc` being
    /// the column-centred design and target. `Xc` is never materialized.
    pub fn fit(&self, x: &CsMat<f64>, y: ArrayView1<f64>) -> Result<RidgeModel> {
        if x.rows() == 0 {
            return Err(PipelineError::input_shape("cannot fit ridge regression on zero rows"));
        }
        if x.rows() != y.len() {
            return Err(PipelineError::input_shape(format!(
                "design matrix has {} rows but target has {}", x.rows(), y.len()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::input_shape("regression target has missing values"));
        }
        if self.alpha < 0.0 {
            return Err(PipelineError::Solver(format!("alpha must not be negative, got {}", self.alpha)));
        }

        let xt = x.transpose_view();
        let means = &xt * &Array1::<f64>::ones(x.rows()) / x.rows() as f64;
        let y_mean = y.mean().unwrap_or(0.0);
        let y_centred = &y - y_mean;

        let centred_dot = |w: &Array1<f64>| x * w - means.dot(w);
        let centred_t_dot = |u: &Array1<f64>| &xt * u - &means * u.sum();
        let apply = |w: &Array1<f64>| centred_t_dot(&centred_dot(w)) + w * self.alpha;

        let b = centred_t_dot(&y_centred);
        let b_norm = b.dot(&b).sqrt();

        let mut w = Array1::zeros(x.cols());
        let mut r = b.clone();
        let mut p = r.clone();
        let mut rs = r.dot(&r);
        let mut converged = b_norm == 0.0;
        let mut iterations = 0;

        while !converged && iterations < self.max_iterations {
            let ap = apply(&p);
            let curvature = p.dot(&ap);
            if curvature <= 0.0 {
                break;
            }

            let step = rs / curvature;
            w.scaled_add(step, &p);
            r.scaled_add(-step, &ap);

            let rs_next = r.dot(&r);
            iterations += 1;
            debug!(target: SOLVER_LOG_TARGET, "iteration {}: residual {:e}", iterations, rs_next.sqrt());

            if rs_next.sqrt() <= self.tolerance * b_norm {
                converged = true;
            } else {
                p = &r + &(p * (rs_next / rs));
                rs = rs_next;
            }
        }

        if !converged {
            warn!("ridge solver stopped after {} iterations without reaching tolerance {:e}", iterations, self.tolerance);
        }
        if w.iter().any(|v: &f64| !v.is_finite()) {
            return Err(PipelineError::Solver("ridge coefficients are not finite".to_owned()));
        }

        let intercept = y_mean - means.dot(&w);

        Ok(RidgeModel {
            coefficients: w,
            intercept,
        })
    }
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RidgeModel {
    pub fn predict(&self, x: &CsMat<f64>) -> Array1<f64> {
        x * &self.coefficients + self.intercept
    }

    pub fn coefficients(&self) -> ArrayView1<f64> {
        self.coefficients.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}
