//! Path geometry and projection

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;

// Internal
use super::{Params, PathError, PathShape, RefPoint};
use comms_if::sim::Pose;
use util::maths::{lin_map, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target separation of the coarse samples used to seed the projection of
/// analytic paths.
///
/// Units: meters
const SAMPLE_SEP_M: f64 = 0.05;

/// Minimum number of coarse samples over an analytic path's domain.
const MIN_NUM_SAMPLES: usize = 64;

/// Maximum number of coarse samples over an analytic path's domain. Every
/// projection visits all of them, so this bounds the path length to
/// `MAX_NUM_SAMPLES * SAMPLE_SEP_M`.
const MAX_NUM_SAMPLES: usize = 100_000;

/// Number of Newton iterations used to refine the projection.
const NUM_REFINE_ITERS: usize = 8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The reference path.
#[derive(Debug, Clone)]
pub struct PathRef {
    geometry: Geometry,
}

#[derive(Debug, Clone)]
enum Geometry {
    /// `y = f(x)` for `x` in `[x_start, x_end]`
    Analytic {
        curve: Curve,
        x_start_m: f64,
        x_end_m: f64,
        num_samples: usize,
    },

    /// Polyline through a sequence of distinct points
    Polyline {
        points_m: Vec<Vector2<f64>>,
        /// Unit direction of each segment
        directions: Vec<Vector2<f64>>,
        /// Length of each segment
        lengths_m: Vec<f64>,
        /// Distance along the path at the start of each segment
        cum_lengths_m: Vec<f64>,
        /// Turning curvature at each vertex, zero at the ends
        vertex_curv_m: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Curve {
    Straight,
    Sine { amp: f64, k: f64 },
    Curved { slope: f64, amp: f64, k: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathRef {
    /// Build the path from its parameters, validating them.
    pub fn new(params: &Params) -> Result<Self, PathError> {
        let geometry = match params.shape {
            PathShape::Straight => Self::build_analytic(params, Curve::Straight)?,
            PathShape::Sine {
                amplitude_m,
                wavenumber_radm,
            } => {
                check_finite("amplitude_m", amplitude_m)?;
                check_finite("wavenumber_radm", wavenumber_radm)?;
                Self::build_analytic(
                    params,
                    Curve::Sine {
                        amp: amplitude_m,
                        k: wavenumber_radm,
                    },
                )?
            }
            PathShape::Curved {
                slope,
                amplitude_m,
                wavenumber_radm,
            } => {
                check_finite("slope", slope)?;
                check_finite("amplitude_m", amplitude_m)?;
                check_finite("wavenumber_radm", wavenumber_radm)?;
                Self::build_analytic(
                    params,
                    Curve::Curved {
                        slope,
                        amp: amplitude_m,
                        k: wavenumber_radm,
                    },
                )?
            }
            PathShape::Waypoints { ref points_m } => Self::build_polyline(points_m)?,
        };

        debug!("Built {} path reference", params.shape.type_name());

        Ok(Self { geometry })
    }

    /// Project the pose onto the path.
    ///
    /// Returns the closest point on the path along with the path's heading
    /// and curvature at that point.
    pub fn project(&self, pose: &Pose) -> Result<RefPoint, PathError> {
        let failed = || PathError::ProjectionFailed {
            x_m: pose.x_m,
            y_m: pose.y_m,
        };

        if !(pose.x_m.is_finite() && pose.y_m.is_finite()) {
            return Err(failed());
        }

        let pos_m = Vector2::new(pose.x_m, pose.y_m);

        let ref_point = match self.geometry {
            Geometry::Analytic {
                curve,
                x_start_m,
                x_end_m,
                num_samples,
            } => project_analytic(curve, x_start_m, x_end_m, num_samples, pos_m),
            Geometry::Polyline {
                ref points_m,
                ref directions,
                ref lengths_m,
                ref cum_lengths_m,
                ref vertex_curv_m,
            } => project_polyline(
                points_m,
                directions,
                lengths_m,
                cum_lengths_m,
                vertex_curv_m,
                pos_m,
            ),
        };

        if ref_point.is_finite() {
            Ok(ref_point)
        } else {
            Err(failed())
        }
    }

    /// Sample the path at evenly spaced values of the path parameter.
    ///
    /// Used to export the reference for plotting.
    pub fn sample(&self, num_points: usize) -> Vec<Vector2<f64>> {
        let num_points = num_points.max(2);

        match self.geometry {
            Geometry::Analytic {
                curve,
                x_start_m,
                x_end_m,
                ..
            } => (0..num_points)
                .map(|i| {
                    let x = lin_map(
                        (0.0, (num_points - 1) as f64),
                        (x_start_m, x_end_m),
                        i as f64,
                    );
                    Vector2::new(x, curve.eval(x).0)
                })
                .collect(),
            Geometry::Polyline { ref points_m, .. } => points_m.clone(),
        }
    }

    /// Start and end point of the path.
    pub fn endpoints(&self) -> (Vector2<f64>, Vector2<f64>) {
        match self.geometry {
            Geometry::Analytic {
                curve,
                x_start_m,
                x_end_m,
                ..
            } => (
                Vector2::new(x_start_m, curve.eval(x_start_m).0),
                Vector2::new(x_end_m, curve.eval(x_end_m).0),
            ),
            Geometry::Polyline { ref points_m, .. } => {
                (points_m[0], points_m[points_m.len() - 1])
            }
        }
    }

    fn build_analytic(params: &Params, curve: Curve) -> Result<Geometry, PathError> {
        check_finite("x_start_m", params.x_start_m)?;
        if !(params.length_m.is_finite() && params.length_m > 0.0) {
            return Err(PathError::InvalidParams(format!(
                "length_m must be finite and positive, found {}",
                params.length_m
            )));
        }

        let max_length_m = MAX_NUM_SAMPLES as f64 * SAMPLE_SEP_M;
        if params.length_m > max_length_m {
            return Err(PathError::InvalidParams(format!(
                "length_m must be at most {} m, found {}",
                max_length_m, params.length_m
            )));
        }

        let x_end_m = params.x_start_m + params.length_m;
        check_finite("x_start_m + length_m", x_end_m)?;

        let num_samples = MIN_NUM_SAMPLES
            .max((params.length_m / SAMPLE_SEP_M).ceil() as usize)
            .min(MAX_NUM_SAMPLES);

        Ok(Geometry::Analytic {
            curve,
            x_start_m: params.x_start_m,
            x_end_m,
            num_samples,
        })
    }

    fn build_polyline(raw_points_m: &[[f64; 2]]) -> Result<Geometry, PathError> {
        if raw_points_m
            .iter()
            .any(|p| !(p[0].is_finite() && p[1].is_finite()))
        {
            return Err(PathError::InvalidParams(
                "waypoints must all be finite".into(),
            ));
        }

        // Drop repeated points, which would give zero length segments
        let mut points_m: Vec<Vector2<f64>> = Vec::with_capacity(raw_points_m.len());
        for p in raw_points_m {
            let p = Vector2::new(p[0], p[1]);
            match points_m.last() {
                Some(last) if (p - last).norm() <= std::f64::EPSILON => (),
                _ => points_m.push(p),
            }
        }

        if points_m.len() < 2 {
            return Err(PathError::InvalidParams(format!(
                "a waypoint path needs at least 2 distinct points, found {}",
                points_m.len()
            )));
        }

        let num_segments = points_m.len() - 1;
        let mut directions = Vec::with_capacity(num_segments);
        let mut lengths_m = Vec::with_capacity(num_segments);
        let mut cum_lengths_m = Vec::with_capacity(num_segments);
        let mut total_m = 0.0;

        for w in points_m.windows(2) {
            let diff = w[1] - w[0];
            let length = diff.norm();

            directions.push(diff / length);
            lengths_m.push(length);
            cum_lengths_m.push(total_m);
            total_m += length;
        }

        // The curvature at a vertex is the turning angle over the mean length
        // of the two segments meeting there.
        let mut vertex_curv_m = vec![0.0; points_m.len()];
        for i in 1..num_segments {
            let head_0 = directions[i - 1][1].atan2(directions[i - 1][0]);
            let head_1 = directions[i][1].atan2(directions[i][0]);
            let turn_rad = wrap_pi(head_1 - head_0);

            vertex_curv_m[i] = turn_rad / (0.5 * (lengths_m[i - 1] + lengths_m[i]));
        }

        Ok(Geometry::Polyline {
            points_m,
            directions,
            lengths_m,
            cum_lengths_m,
            vertex_curv_m,
        })
    }
}

impl Curve {
    /// Evaluate `(f(x), f'(x), f''(x))`.
    fn eval(&self, x: f64) -> (f64, f64, f64) {
        match *self {
            Curve::Straight => (0.0, 0.0, 0.0),
            Curve::Sine { amp, k } => {
                let (s, c) = (k * x).sin_cos();
                (amp * s, amp * k * c, -amp * k * k * s)
            }
            Curve::Curved { slope, amp, k } => {
                let (s, c) = (k * x).sin_cos();
                (slope * x + amp * s, slope + amp * k * c, -amp * k * k * s)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(name: &str, value: f64) -> Result<(), PathError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PathError::InvalidParams(format!(
            "{} must be finite, found {}",
            name, value
        )))
    }
}

/// Squared distance from the position to the curve at `x`.
fn dist_sq(curve: Curve, x: f64, pos_m: Vector2<f64>) -> f64 {
    (Vector2::new(x, curve.eval(x).0) - pos_m).norm_squared()
}

fn project_analytic(
    curve: Curve,
    x_start_m: f64,
    x_end_m: f64,
    num_samples: usize,
    pos_m: Vector2<f64>,
) -> RefPoint {
    // Coarse search over evenly spaced samples
    let mut best_x = x_start_m;
    let mut best_d = dist_sq(curve, x_start_m, pos_m);

    for i in 1..=num_samples {
        let x = lin_map((0.0, num_samples as f64), (x_start_m, x_end_m), i as f64);
        let d = dist_sq(curve, x, pos_m);
        if d < best_d {
            best_x = x;
            best_d = d;
        }
    }

    // Newton refinement of the squared distance, clamped to the domain
    let mut x = best_x;
    for _ in 0..NUM_REFINE_ITERS {
        let (f, fp, fpp) = curve.eval(x);
        let grad = (x - pos_m[0]) + (f - pos_m[1]) * fp;
        let hess = 1.0 + fp * fp + (f - pos_m[1]) * fpp;

        // Only step where the distance is locally convex
        if hess <= 0.0 {
            break;
        }

        let next = (x - grad / hess).max(x_start_m).min(x_end_m);
        if (next - x).abs() < 1e-12 {
            x = next;
            break;
        }
        x = next;
    }

    if dist_sq(curve, x, pos_m) > best_d {
        x = best_x;
    }

    let (f, fp, fpp) = curve.eval(x);

    RefPoint {
        param: x,
        point_m: Vector2::new(x, f),
        head_rad: fp.atan(),
        curv_m: fpp / (1.0 + fp * fp).powf(1.5),
    }
}

fn project_polyline(
    points_m: &[Vector2<f64>],
    directions: &[Vector2<f64>],
    lengths_m: &[f64],
    cum_lengths_m: &[f64],
    vertex_curv_m: &[f64],
    pos_m: Vector2<f64>,
) -> RefPoint {
    let mut best_seg = 0;
    let mut best_t = 0.0;
    let mut best_d = std::f64::INFINITY;

    for (i, (dir, length)) in directions.iter().zip(lengths_m.iter()).enumerate() {
        let along_m = (pos_m - points_m[i]).dot(dir);
        let t = (along_m / length).max(0.0).min(1.0);
        let d = (points_m[i] + dir * (t * length) - pos_m).norm_squared();

        if d < best_d {
            best_seg = i;
            best_t = t;
            best_d = d;
        }
    }

    let dir = directions[best_seg];

    RefPoint {
        param: cum_lengths_m[best_seg] + best_t * lengths_m[best_seg],
        point_m: points_m[best_seg] + dir * (best_t * lengths_m[best_seg]),
        head_rad: dir[1].atan2(dir[0]),
        curv_m: lin_map(
            (0.0, 1.0),
            (vertex_curv_m[best_seg], vertex_curv_m[best_seg + 1]),
            best_t,
        ),
    }
}
