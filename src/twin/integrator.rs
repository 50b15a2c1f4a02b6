//! Fixed-step ODE integration for compartment burdens.
//!
//! Classic 4th-order Runge-Kutta. The compartment system is linear and
//! mildly stiff at most, so a fixed step with a stability bound on k·dt is
//! enough; the bound is enforced when the transfer table is validated.
//!
//! Reference: Press et al., Numerical Recipes, 3rd ed., Cambridge University Press 2007

/// Largest number of steps a single `run` may take
pub const MAX_STEPS: u64 = 1_000_000;

/// Floor applied after each step (burdens cannot go negative)
const MIN_BURDEN: f64 = 0.0;

/// Configuration for the compartment integrator
#[derive(Debug, Clone)]
pub struct IntegratorConfig {
    /// Nominal integration step (days)
    pub dt_days: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self { dt_days: 1.0 }
    }
}

/// Steps `run` takes to cover `duration_days` with a nominal `dt_days`
pub fn step_count(duration_days: f64, dt_days: f64) -> f64 {
    if duration_days <= 0.0 {
        return 0.0;
    }
    (duration_days / dt_days).ceil().max(1.0)
}

/// 4th-order Runge-Kutta integrator
///
/// Solves dy/dt = f(y) where y holds one burden per compartment.
pub struct RK4Integrator {
    pub config: IntegratorConfig,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    y_temp: Vec<f64>,
}

impl RK4Integrator {
    pub fn new(n_variables: usize, config: IntegratorConfig) -> Self {
        Self {
            config,
            k1: vec![0.0; n_variables],
            k2: vec![0.0; n_variables],
            k3: vec![0.0; n_variables],
            k4: vec![0.0; n_variables],
            y_temp: vec![0.0; n_variables],
        }
    }

    fn resize(&mut self, n_variables: usize) {
        if self.k1.len() != n_variables {
            self.k1.resize(n_variables, 0.0);
            self.k2.resize(n_variables, 0.0);
            self.k3.resize(n_variables, 0.0);
            self.k4.resize(n_variables, 0.0);
            self.y_temp.resize(n_variables, 0.0);
        }
    }

    /// Perform one RK4 step of length `dt`
    ///
    /// k1 = f(y)
    /// k2 = f(y + dt/2 * k1)
    /// k3 = f(y + dt/2 * k2)
    /// k4 = f(y + dt * k3)
    /// y_new = y + dt/6 * (k1 + 2*k2 + 2*k3 + k4)
    pub fn step_by<F>(&mut self, y: &mut [f64], derivatives: F, dt: f64)
    where
        F: Fn(&[f64], &mut [f64]),
    {
        let n = y.len();
        self.resize(n);

        derivatives(y, &mut self.k1);

        for i in 0..n {
            self.y_temp[i] = y[i] + 0.5 * dt * self.k1[i];
        }
        derivatives(&self.y_temp, &mut self.k2);

        for i in 0..n {
            self.y_temp[i] = y[i] + 0.5 * dt * self.k2[i];
        }
        derivatives(&self.y_temp, &mut self.k3);

        for i in 0..n {
            self.y_temp[i] = y[i] + dt * self.k3[i];
        }
        derivatives(&self.y_temp, &mut self.k4);

        let dt_6 = dt / 6.0;
        for i in 0..n {
            y[i] += dt_6 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
            if y[i] < MIN_BURDEN {
                y[i] = MIN_BURDEN;
            }
        }
    }

    /// Integrate for exactly `duration_days`.
    ///
    /// Uses ceil(duration / dt) steps, at most [`MAX_STEPS`], and shortens
    /// them so the last one lands on the horizon. Returns the steps taken.
    pub fn run<F>(&mut self, y: &mut [f64], derivatives: F, duration_days: f64) -> u64
    where
        F: Fn(&[f64], &mut [f64]),
    {
        let n_steps = step_count(duration_days, self.config.dt_days).min(MAX_STEPS as f64) as u64;
        if n_steps == 0 {
            return 0;
        }
        let dt = duration_days / n_steps as f64;
        for _ in 0..n_steps {
            self.step_by(y, &derivatives, dt);
        }
        n_steps
    }
}
