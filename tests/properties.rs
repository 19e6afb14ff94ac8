//! Property tests for the color metrics, estimator and decision bands

use peroxide_scan::{
    analyze_strip, delta_e2000, delta_e76, estimate_ppm, evaluate_ppm, srgb_to_lab,
    CalibrationPatch, ComplianceStatus, Frame, LabColor, Pixel, QualityStatus, Region,
};
use proptest::prelude::*;

fn lab() -> impl Strategy<Value = LabColor> {
    (0.0f64..100.0, -110.0f64..110.0, -110.0f64..110.0).prop_map(|(l, a, b)| LabColor::new(l, a, b))
}

fn pixel() -> impl Strategy<Value = Pixel> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Pixel::new(r, g, b))
}

fn scale() -> impl Strategy<Value = Vec<CalibrationPatch>> {
    prop::collection::vec((0.0f64..2000.0, lab()), 2..8).prop_map(|patches| {
        patches
            .into_iter()
            .map(|(ppm, lab)| CalibrationPatch::new(ppm, lab))
            .collect()
    })
}

fn band(ppm: u32) -> u8 {
    match evaluate_ppm(ppm).compliance_status {
        ComplianceStatus::LowAlert => 0,
        ComplianceStatus::Compliant => 1,
        ComplianceStatus::HighAlert => 2,
    }
}

proptest! {
    #[test]
    fn delta_e_is_symmetric(a in lab(), b in lab()) {
        prop_assert!((delta_e76(a, b) - delta_e76(b, a)).abs() < 1e-9);
        prop_assert!((delta_e2000(a, b) - delta_e2000(b, a)).abs() < 1e-9);
    }

    #[test]
    fn delta_e_identity(a in lab()) {
        prop_assert_eq!(delta_e76(a, a), 0.0);
        prop_assert!(delta_e2000(a, a).abs() < 1e-12);
    }

    #[test]
    fn conversion_is_deterministic(p in pixel()) {
        prop_assert_eq!(srgb_to_lab(p), srgb_to_lab(p));
        let lab = srgb_to_lab(p);
        prop_assert!((-1e-3..=100.0 + 1e-3).contains(&lab.l));
    }

    #[test]
    fn decision_bands_are_monotonic(ppm in 0u32..100_000) {
        prop_assert!(band(ppm) <= band(ppm + 1));
        let expected = if ppm < 100 { 0 } else if ppm <= 500 { 1 } else { 2 };
        prop_assert_eq!(band(ppm), expected);
    }

    #[test]
    fn estimate_within_interval(sample in lab(), patches in scale()) {
        let estimate = estimate_ppm(sample, &patches).unwrap();
        prop_assert!(estimate.ppm_min <= estimate.ppm_estimate + 1e-9);
        prop_assert!(estimate.ppm_estimate <= estimate.ppm_max + 1e-9);
        prop_assert!((0.0..=1.0).contains(&estimate.interpolation_fraction));
    }

    #[test]
    fn accepted_uniform_strip_yields_bounded_estimate(p in pixel(), patches in scale()) {
        let frame = Frame::uniform(8, 8, p).unwrap();
        let region = Region::new(2, 2, 4, 4).unwrap();
        let outcome = analyze_strip(&frame, &region, &patches).unwrap();

        if outcome.quality.status == QualityStatus::Accepted {
            let estimate = outcome.estimate.unwrap();
            prop_assert!(estimate.ppm_min <= estimate.ppm_estimate + 1e-9);
            prop_assert!(estimate.ppm_estimate <= estimate.ppm_max + 1e-9);
            prop_assert!(outcome.decision.is_some());
        } else {
            prop_assert!(outcome.estimate.is_none());
        }
    }
}
