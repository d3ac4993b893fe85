mod tests {
    use picoled_core::color::{
        BLACK, Calibration, ColorBalance, CorrectionLut, Hsv, Rgb, blend_colors,
        correct_component, fill_gradient, quantize, round_to_interval,
    };

    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };
    const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    #[test]
    fn test_blend_colors() {
        assert_eq!(blend_colors(RED, BLUE, 0.0), RED);
        assert_eq!(blend_colors(RED, BLUE, 1.0), BLUE);
        assert_eq!(
            blend_colors(RED, BLUE, 0.5),
            Rgb {
                r: 128,
                g: 0,
                b: 128
            }
        );
        assert_eq!(blend_colors(BLACK, WHITE, 0.25), Rgb::new(64, 64, 64));
    }

    #[test]
    fn test_blend_colors_clamps_factor() {
        assert_eq!(blend_colors(RED, BLUE, -3.0), RED);
        assert_eq!(blend_colors(RED, BLUE, 7.0), BLUE);
        assert_eq!(blend_colors(RED, BLUE, f32::NAN), RED);
    }

    #[test]
    fn test_hsv_to_rgb() {
        assert_eq!(Hsv::new(0.0, 1.0, 1.0).to_rgb(), RED);
        assert_eq!(Hsv::new(120.0, 1.0, 1.0).to_rgb(), Rgb::new(0, 255, 0));
        assert_eq!(Hsv::new(240.0, 1.0, 1.0).to_rgb(), BLUE);
        assert_eq!(Hsv::new(360.0, 1.0, 1.0).to_rgb(), RED);
        assert_eq!(Hsv::new(-120.0, 1.0, 1.0).to_rgb(), BLUE);
        assert_eq!(Hsv::new(60.0, 1.0, 1.0).to_rgb(), Rgb::new(255, 255, 0));
        assert_eq!(Hsv::new(200.0, 0.0, 0.5).to_rgb(), Rgb::new(128, 128, 128));
        assert_eq!(Hsv::new(90.0, 1.0, 0.0).to_rgb(), BLACK);
    }

    #[test]
    fn test_quantize_saturates() {
        assert_eq!(quantize(-5.0), 0);
        assert_eq!(quantize(127.5), 128);
        assert_eq!(quantize(300.0), 255);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn test_round_to_interval() {
        assert!((round_to_interval(0.44, 0.1) - 0.4).abs() < 1e-6);
        assert!((round_to_interval(0.46, 0.1) - 0.5).abs() < 1e-6);
        assert!((round_to_interval(1.1, 0.1) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_fill_gradient() {
        let mut leds = [BLACK; 5];
        fill_gradient(&mut leds, BLACK, Rgb::new(200, 100, 0));
        assert_eq!(leds[0], BLACK);
        assert_eq!(leds[2], Rgb::new(100, 50, 0));
        assert_eq!(leds[4], Rgb::new(200, 100, 0));

        let mut single = [BLACK; 1];
        fill_gradient(&mut single, RED, BLUE);
        assert_eq!(single, [RED]);

        fill_gradient(&mut [], RED, BLUE);
    }

    #[test]
    fn test_identity_correction_is_exact() {
        let mut lut = CorrectionLut::new();
        lut.prepare(&Calibration::IDENTITY, 1.0);
        for value in 0..=255u8 {
            let pixel = Rgb::new(value, 255 - value, value / 3);
            assert_eq!(lut.apply(pixel), pixel);
            assert_eq!(Calibration::IDENTITY.correct(pixel, 1.0), pixel);
        }
    }

    #[test]
    fn test_correction_curve() {
        assert_eq!(correct_component(255, 1.0, 0.5, 1.0), 128);
        assert_eq!(correct_component(255, 1.0, 0.5, 2.0), 64);
        assert_eq!(correct_component(128, 1.0, 1.0, 2.2), 56);
        // Scaled values above full range saturate before the curve
        assert_eq!(correct_component(200, 3.0, 1.0, 2.2), 255);
        assert_eq!(correct_component(200, 1.0, 0.0, 1.0), 0);
        assert_eq!(correct_component(200, f32::NAN, 1.0, 1.0), 0);
    }

    #[test]
    fn test_lut_matches_direct_correction() {
        let calibration = Calibration::new(ColorBalance::new(1.0, 0.7, 0.4), 2.2);
        let mut lut = CorrectionLut::new();
        lut.prepare(&calibration, 0.8);

        for value in (0..=255u8).step_by(17) {
            let pixel = Rgb::new(value, value, value);
            assert_eq!(lut.apply(pixel), calibration.correct(pixel, 0.8));
        }
    }

    #[test]
    fn test_lut_follows_brightness_changes() {
        let mut lut = CorrectionLut::new();
        lut.prepare(&Calibration::IDENTITY, 1.0);
        assert_eq!(lut.apply(WHITE), WHITE);

        lut.prepare(&Calibration::IDENTITY, 0.0);
        assert_eq!(lut.apply(WHITE), BLACK);
    }
}
