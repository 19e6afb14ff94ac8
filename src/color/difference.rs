//! Color difference metrics
//!
//! - ΔE76: Euclidean distance in L*a*b*, kept for diagnostics.
//! - ΔE2000 (CIEDE2000): the full CIE formula with unit weighting factors
//!   (kL = kC = kH = 1). This is the metric used to rank calibration patches.

use std::f64::consts::PI;

use super::types::LabColor;

/// 25^7, the chroma pivot of the G and RC terms
const POW25_7: f64 = 6_103_515_625.0;

/// Euclidean color difference (CIE 1976)
pub fn delta_e76(lab1: LabColor, lab2: LabColor) -> f64 {
    let dl = lab1.l - lab2.l;
    let da = lab1.a - lab2.a;
    let db = lab1.b - lab2.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// CIEDE2000 color difference
pub fn delta_e2000(lab1: LabColor, lab2: LabColor) -> f64 {
    // Rotate a* to compensate for the non-uniformity of neutral colors
    let c1 = lab1.chroma();
    let c2 = lab2.chroma();
    let c_bar7 = ((c1 + c2) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * lab1.a;
    let a2p = (1.0 + g) * lab2.a;
    let c1p = a1p.hypot(lab1.b);
    let c2p = a2p.hypot(lab2.b);
    let h1p = hue_angle(lab1.b, a1p);
    let h2p = hue_angle(lab2.b, a2p);

    let chroma_product = c1p * c2p;

    let delta_lp = lab2.l - lab1.l;
    let delta_cp = c2p - c1p;
    let delta_hp = if chroma_product == 0.0 {
        0.0
    } else {
        let dh = h2p - h1p;
        if dh.abs() <= PI {
            dh
        } else if dh > PI {
            dh - 2.0 * PI
        } else {
            dh + 2.0 * PI
        }
    };
    let delta_big_hp = 2.0 * chroma_product.sqrt() * (delta_hp / 2.0).sin();

    let l_bar_p = (lab1.l + lab2.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= PI {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 2.0 * PI {
        (h1p + h2p + 2.0 * PI) / 2.0
    } else {
        (h1p + h2p - 2.0 * PI) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30f64.to_radians()).cos()
        + 0.24 * (2.0 * h_bar_p).cos()
        + 0.32 * (3.0 * h_bar_p + 6f64.to_radians()).cos()
        - 0.20 * (4.0 * h_bar_p - 63f64.to_radians()).cos();

    let delta_theta = 30f64.to_radians()
        * (-((h_bar_p.to_degrees() - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();

    let l_offset = (l_bar_p - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * delta_theta).sin() * r_c;

    let l_term = delta_lp / s_l;
    let c_term = delta_cp / s_c;
    let h_term = delta_big_hp / s_h;

    (l_term * l_term + c_term * c_term + h_term * h_term + r_t * c_term * h_term)
        .max(0.0)
        .sqrt()
}

/// Hue angle in radians, normalised to [0, 2π); zero for achromatic colors
fn hue_angle(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime);
    if h < 0.0 {
        h + 2.0 * PI
    } else {
        h
    }
}
