//! Polar/cartesian conversion. Angles are degrees on both sides; radians
//! only exist inside the trig calls.

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn polar_to_cartesian(angle_deg: f64, radius: f64) -> (f64, f64) {
    let phi = angle_deg.to_radians();
    (radius * phi.cos(), radius * phi.sin())
}

/// Returns `(angle_deg, radius)` with the angle in `[0, 360)`.
pub fn cartesian_to_polar(x: f64, y: f64) -> (f64, f64) {
    let radius = x.hypot(y);
    let angle = normalize_degrees(y.atan2(x).to_degrees());
    (angle, radius)
}

/// Smallest absolute difference between two angles, in `[0, 180]`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = normalize_degrees(a - b);
    d.min(360.0 - d)
}
