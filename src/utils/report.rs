//! End-of-solve report.

use std::fmt;
use std::time::Duration;

use crate::core::traits::Real;
use crate::kernel::UpdateRule;
use crate::solver::verify::Verification;
use crate::utils::convergence::SolveStats;

/// Everything a finished solve produces, printable in the `jac_solv` output format.
#[derive(Clone, Debug)]
pub struct SolveReport<T> {
    pub n: usize,
    /// Name of the compute resource that ran the sweeps.
    pub device: String,
    pub rule: UpdateRule,
    pub tol: T,
    pub stats: SolveStats<T>,
    /// Wall time from first sweep to solution readback.
    pub elapsed: Duration,
    pub verification: Verification<T>,
    /// The final iterate.
    pub solution: Vec<T>,
}

impl<T: Real> SolveReport<T> {
    /// `‖A·x − b‖₂` exceeds the tolerance.
    pub fn failed_to_converge(&self) -> bool {
        self.verification.error > self.tol
    }
}

impl<T: Real> fmt::Display for SolveReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " ndim = {}", self.n)?;
        writeln!(f, "Using device: {}", self.device)?;
        writeln!(
            f,
            " Convergence = {} with {} iterations and {:.6} seconds",
            fmt_g(self.stats.final_residual),
            self.stats.iterations,
            self.elapsed.as_secs_f64()
        )?;
        write!(
            f,
            "{}: err = {:.6}, solution checksum = {:.6}",
            self.rule.label(),
            self.verification.error,
            self.verification.checksum
        )?;
        if self.failed_to_converge() {
            write!(f, "\nWARNING: solution failed to converge")?;
        }
        Ok(())
    }
}

/// `printf("%g")`: six significant digits, scientific below 1e-4 or from 1e6 up, trailing zeros
/// dropped.
fn fmt_g<T: Real>(v: T) -> String {
    let v = v.to_f64().unwrap_or(f64::NAN);
    if v.is_nan() {
        return "nan".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if v == 0.0 {
        return "0".into();
    }
    let sci = format!("{v:.5e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if !(-4..6).contains(&exp) {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exp.abs());
    }
    let fixed = format!("{v:.*}", (5 - exp) as usize);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::convergence::Termination;

    fn report(err: f64) -> SolveReport<f64> {
        SolveReport {
            n: 4,
            device: "host (serial)".into(),
            rule: UpdateRule::Jacobi,
            tol: 1e-3,
            stats: SolveStats {
                iterations: 1,
                final_residual: 0.5,
                converged: false,
                termination: Termination::MaxItersReached,
                residual_history: vec![0.5],
            },
            elapsed: Duration::from_millis(2),
            verification: Verification { error: err, checksum: 1.25 },
            solution: vec![0.25; 4],
        }
    }

    #[test]
    fn warning_line_only_when_error_exceeds_tolerance() {
        let bad = report(0.1).to_string();
        assert!(bad.starts_with(" ndim = 4\nUsing device: host (serial)\n"));
        assert!(bad.contains(" Convergence = 0.5 with 1 iterations and 0.002000 seconds"));
        assert!(bad.contains("jacobi solver: err = 0.100000, solution checksum = 1.250000"));
        assert!(bad.ends_with("WARNING: solution failed to converge"));

        let good = report(1e-4).to_string();
        assert!(!good.contains("WARNING"));
    }

    #[test]
    fn residual_prints_like_printf_g() {
        assert_eq!(fmt_g(0.5_f64), "0.5");
        assert_eq!(fmt_g(6.286e-7_f64), "6.286e-07");
        assert_eq!(fmt_g(123456789.0_f64), "1.23457e+08");
        assert_eq!(fmt_g(100000.0_f64), "100000");
        assert_eq!(fmt_g(1e-4_f64), "0.0001");
        assert_eq!(fmt_g(0.0_f64), "0");
        assert_eq!(fmt_g(2.5e-3_f32), "0.0025");
    }
}
