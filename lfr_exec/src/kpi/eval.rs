//! KPI evaluation functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::{KpiError, KpiSummary, Params};
use crate::run::TrajectoryLog;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Evaluate the KPIs of a trajectory log.
pub fn evaluate(log: &TrajectoryLog, params: &Params) -> Result<KpiSummary, KpiError> {
    let times: Vec<f64> = log.records().iter().map(|r| r.time_s).collect();
    let lat_errs: Vec<f64> = log
        .records()
        .iter()
        .map(|r| r.error.lat_err_m)
        .collect();

    evaluate_series(&times, &lat_errs, params)
}

/// Evaluate the KPIs of a lateral error time series.
///
/// `times` must be finite and strictly increasing, and the same length as
/// `lat_errs`.
pub fn evaluate_series(
    times: &[f64],
    lat_errs: &[f64],
    params: &Params,
) -> Result<KpiSummary, KpiError> {
    validate_params(params)?;
    validate_series(times, lat_errs)?;

    let n = lat_errs.len();

    // ---- STEADY STATE ----

    let tail_len = ((n as f64 * params.tail_frac).floor() as usize).max(1).min(n);
    let tail = &lat_errs[n - tail_len..];

    let steady_state_value_m = mean(tail.iter().copied());
    let steady_state_err_m = mean(tail.iter().map(|e| e.abs()));

    // ---- SETTLING ----

    let init_err_m = lat_errs[0];
    let band_m = (params.settling_tol_frac * (init_err_m - steady_state_value_m).abs())
        .max(params.band_floor_m);

    let outside = |e: f64| (e - steady_state_value_m).abs() > band_m;

    // The run settles at the sample after the last one outside the band
    let settling_time_s = match lat_errs.iter().rposition(|e| outside(*e)) {
        Some(i) if i == n - 1 => None,
        Some(i) => Some(times[i + 1]),
        None => Some(times[0]),
    };

    // ---- OVERSHOOT ----

    let overshoot_pct = if init_err_m.abs() < params.band_floor_m {
        0.0
    } else {
        let side = init_err_m - steady_state_value_m;
        let sign = if side > 0.0 {
            1.0
        } else if side < 0.0 {
            -1.0
        } else {
            0.0
        };

        let peak_m = lat_errs
            .iter()
            .map(|e| (-sign * (e - steady_state_value_m)).max(0.0))
            .fold(0.0, f64::max);

        100.0 * (peak_m - band_m).max(0.0) / init_err_m.abs()
    };

    // ---- EXTRAS ----

    let peak_lat_err_m = lat_errs.iter().map(|e| e.abs()).fold(0.0, f64::max);
    let rms_lat_err_m = mean(lat_errs.iter().map(|e| e * e)).sqrt();

    debug!(
        "KPIs over {} samples: tail of {}, band half width {:.4} m",
        n, tail_len, band_m
    );

    Ok(KpiSummary {
        overshoot_pct,
        settling_time_s,
        steady_state_err_m,
        steady_state_value_m,
        peak_lat_err_m,
        rms_lat_err_m,
    })
}

fn validate_params(params: &Params) -> Result<(), KpiError> {
    if !(params.tail_frac > 0.0 && params.tail_frac <= 1.0) {
        return Err(KpiError::InvalidParams(format!(
            "tail_frac must be in (0, 1], found {}",
            params.tail_frac
        )));
    }
    if !(params.settling_tol_frac.is_finite() && params.settling_tol_frac >= 0.0) {
        return Err(KpiError::InvalidParams(format!(
            "settling_tol_frac must be finite and non-negative, found {}",
            params.settling_tol_frac
        )));
    }
    if !(params.band_floor_m.is_finite() && params.band_floor_m > 0.0) {
        return Err(KpiError::InvalidParams(format!(
            "band_floor_m must be finite and positive, found {}",
            params.band_floor_m
        )));
    }

    Ok(())
}

fn validate_series(times: &[f64], lat_errs: &[f64]) -> Result<(), KpiError> {
    if times.len() != lat_errs.len() {
        return Err(KpiError::LengthMismatch {
            times: times.len(),
            lat_errs: lat_errs.len(),
        });
    }
    if lat_errs.is_empty() {
        return Err(KpiError::EmptyLog);
    }

    for (index, (t, e)) in times.iter().zip(lat_errs).enumerate() {
        if !(t.is_finite() && e.is_finite()) {
            return Err(KpiError::NonFiniteSample { index });
        }
        if index > 0 && *t <= times[index - 1] {
            return Err(KpiError::NonMonotonicTime { index });
        }
    }

    Ok(())
}

fn mean<I: ExactSizeIterator<Item = f64>>(values: I) -> f64 {
    let n = values.len();
    values.sum::<f64>() / n as f64
}

#[cfg(test)]
mod test {
    use super::*;

    fn times(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn test_exponential_decay() {
        let dt = 0.01;
        let t = times(1000, dt);
        let e: Vec<f64> = t.iter().map(|t| (-t).exp().max(0.01)).collect();

        let kpi = evaluate_series(&t, &e, &Params::default()).unwrap();

        assert!((kpi.steady_state_value_m - 0.01).abs() < 1e-12);
        assert!((kpi.steady_state_err_m - 0.01).abs() < 1e-12);

        // Band is 0.02 * 0.99, so settled once exp(-t) <= 0.0298
        let expected_s = -(0.0298f64).ln();
        let settling_s = kpi.settling_time_s.unwrap();
        assert!((settling_s - expected_s).abs() <= dt + 1e-9);

        assert_eq!(kpi.overshoot_pct, 0.0);
        assert_eq!(kpi.peak_lat_err_m, 1.0);
    }

    #[test]
    fn test_overshoot() {
        let e = vec![1.0, 0.5, -0.2, -0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let t = times(e.len(), 0.1);

        let kpi = evaluate_series(&t, &e, &Params::default()).unwrap();

        assert_eq!(kpi.steady_state_value_m, 0.0);
        assert!((kpi.overshoot_pct - 18.0).abs() < 1e-9);
        assert!((kpi.settling_time_s.unwrap() - 0.4).abs() < 1e-9);

        // Negative initial error overshoots upwards
        let neg: Vec<f64> = e.iter().map(|e| -e).collect();
        let kpi_neg = evaluate_series(&t, &neg, &Params::default()).unwrap();
        assert!((kpi_neg.overshoot_pct - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_error() {
        let t = times(100, 0.05);
        let e = vec![0.0; 100];

        let kpi = evaluate_series(&t, &e, &Params::default()).unwrap();
        assert_eq!(kpi.overshoot_pct, 0.0);
        assert_eq!(kpi.settling_time_s, Some(0.0));
        assert_eq!(kpi.steady_state_err_m, 0.0);
        assert_eq!(kpi.rms_lat_err_m, 0.0);
    }

    #[test]
    fn test_never_settles() {
        let t = times(100, 0.05);
        let e: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();

        let kpi = evaluate_series(&t, &e, &Params::default()).unwrap();
        assert!(!kpi.settled());
        assert_eq!(kpi.to_map()["settling_time_s"], std::f64::INFINITY);
        assert!((kpi.rms_lat_err_m - 1.0).abs() < 1e-12);

        // Saved summaries mark an unsettled run with a null settling time
        let json = serde_json::to_value(&kpi).unwrap();
        assert!(json["settling_time_s"].is_null());
        assert_eq!(json["peak_lat_err_m"], 1.0);
    }

    #[test]
    fn test_short_log() {
        // A single sample is its own tail window
        let kpi = evaluate_series(&[0.0], &[0.3], &Params::default()).unwrap();
        assert_eq!(kpi.steady_state_value_m, 0.3);
        assert_eq!(kpi.settling_time_s, Some(0.0));
    }

    #[test]
    fn test_invalid_series() {
        let p = Params::default();

        assert_eq!(evaluate_series(&[], &[], &p), Err(KpiError::EmptyLog));
        assert_eq!(
            evaluate_series(&[0.0, 0.1], &[1.0], &p),
            Err(KpiError::LengthMismatch {
                times: 2,
                lat_errs: 1
            })
        );
        assert_eq!(
            evaluate_series(&[0.0, 0.1, 0.2], &[1.0, std::f64::NAN, 0.0], &p),
            Err(KpiError::NonFiniteSample { index: 1 })
        );
        assert_eq!(
            evaluate_series(&[0.0, 0.1, 0.1], &[1.0, 0.5, 0.0], &p),
            Err(KpiError::NonMonotonicTime { index: 2 })
        );
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.tail_frac = 0.0;
        assert!(matches!(
            evaluate_series(&[0.0], &[0.0], &p),
            Err(KpiError::InvalidParams(_))
        ));

        let mut p = Params::default();
        p.settling_tol_frac = -0.1;
        assert!(evaluate_series(&[0.0], &[0.0], &p).is_err());
    }
}
