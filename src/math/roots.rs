//! Real polynomial roots used by line-curve intersection.

use std::f64::consts::PI;

/// Real roots of `a·x³ + b·x² + c·x + d = 0`, unsorted.
///
/// Degenerates to the quadratic and linear cases when the leading
/// coefficients vanish. Double roots are reported once.
#[must_use]
pub fn cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a.abs() < 1e-9 * scale {
        return quadratic_roots(b, c, d);
    }

    let bn = b / a;
    let cn = c / a;
    let dn = d / a;

    let q = (3.0 * cn - bn * bn) / 9.0;
    let r = (9.0 * bn * cn - 27.0 * dn - 2.0 * bn * bn * bn) / 54.0;
    let discriminant = q * q * q + r * r;
    let shift = -bn / 3.0;

    let mut roots = if discriminant > 1e-14 {
        let sqrt_disc = discriminant.sqrt();
        let s = (r + sqrt_disc).cbrt();
        let t = (r - sqrt_disc).cbrt();
        vec![shift + s + t]
    } else if discriminant.abs() <= 1e-14 {
        let s = r.cbrt();
        if s.abs() < 1e-12 {
            vec![shift]
        } else {
            vec![shift + 2.0 * s, shift - s]
        }
    } else {
        let theta = (r / (-q * q * q).sqrt()).clamp(-1.0, 1.0).acos();
        let m = 2.0 * (-q).sqrt();
        vec![
            m * (theta / 3.0).cos() + shift,
            m * ((theta + 2.0 * PI) / 3.0).cos() + shift,
            m * ((theta + 4.0 * PI) / 3.0).cos() + shift,
        ]
    };

    for root in &mut roots {
        *root = polish(*root, a, b, c, d);
    }
    roots
}

/// Real roots of `a·x² + b·x + c = 0`.
#[must_use]
pub fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a.abs() < 1e-9 * scale {
        if b.abs() < 1e-12 * scale {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant > 0.0 {
        // Numerically stable form.
        let q = -0.5 * (b + b.signum() * discriminant.sqrt());
        vec![q / a, c / q]
    } else if discriminant.abs() <= 1e-14 * scale * scale {
        vec![-b / (2.0 * a)]
    } else {
        Vec::new()
    }
}

/// A couple of Newton steps to tighten a closed-form root.
fn polish(mut x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    for _ in 0..2 {
        let f = ((a * x + b) * x + c) * x + d;
        let df = (3.0 * a * x + 2.0 * b) * x + c;
        if df.abs() < 1e-14 {
            break;
        }
        x -= f / df;
    }
    x
}
