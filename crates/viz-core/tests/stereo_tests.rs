// Host-side tests for the stereo field analyzer.

use viz_core::stereo::{StereoAnalyzer, StereoMetrics};

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 255 / len) as u8).collect()
}

#[test]
fn identical_channels_have_zero_width() {
    let mut st = StereoAnalyzer::new();
    let buf = ramp(512);
    let mut m = StereoMetrics::NEUTRAL;
    for _ in 0..30 {
        m = st.analyze(Some(&buf), Some(&buf));
    }
    assert!(m.stereo_width.abs() < 1e-6);
    assert!(m.panning.abs() < 1e-6);
    assert!(m.side_energy.abs() < 1e-6);
    assert!((m.phase_correlation - 1.0).abs() < 1e-4);
    assert_eq!(m.left, m.right);
}

#[test]
fn complementary_channels_trend_to_full_width() {
    let mut st = StereoAnalyzer::new();
    let left: Vec<u8> = (0..512).map(|i| if i % 2 == 0 { 255 } else { 0 }).collect();
    let right: Vec<u8> = left.iter().map(|v| 255 - v).collect();
    let mut prev = 0.0;
    let mut m = StereoMetrics::NEUTRAL;
    for _ in 0..40 {
        m = st.analyze(Some(&left), Some(&right));
        assert!(m.stereo_width >= prev);
        prev = m.stereo_width;
    }
    assert!(m.stereo_width > 0.99);
    assert!(m.phase_correlation < 0.0);
    assert!(m.mid_side_ratio > 0.4);
}

#[test]
fn right_heavy_signal_pans_right() {
    let mut st = StereoAnalyzer::new();
    let left = vec![20u8; 256];
    let right = vec![200u8; 256];
    let mut m = StereoMetrics::NEUTRAL;
    for _ in 0..30 {
        m = st.analyze(Some(&left), Some(&right));
    }
    assert!(m.panning > 0.7);
    assert!(m.panning <= 1.0);
}

#[test]
fn flat_channels_count_as_in_phase() {
    let mut st = StereoAnalyzer::new();
    let flat = vec![100u8; 128];
    let m = st.analyze(Some(&flat), Some(&flat));
    assert_eq!(m.phase_correlation, 1.0);
}

#[test]
fn missing_or_disabled_input_is_neutral() {
    let mut st = StereoAnalyzer::new();
    let buf = ramp(64);
    assert_eq!(st.analyze(None, Some(&buf)), StereoMetrics::NEUTRAL);
    assert_eq!(st.analyze(Some(&buf), Some(&[])), StereoMetrics::NEUTRAL);
    st.set_enabled(false);
    assert!(!st.is_enabled());
    assert_eq!(st.analyze(Some(&buf), Some(&buf)), StereoMetrics::NEUTRAL);
}

#[test]
fn mismatched_lengths_use_the_shorter_buffer() {
    let mut st = StereoAnalyzer::new();
    let long = vec![100u8; 512];
    let short = vec![100u8; 256];
    let m = st.analyze(Some(&long), Some(&short));
    assert!(m.stereo_width.abs() < 1e-6);
}

#[test]
fn reset_returns_to_neutral_state() {
    let mut st = StereoAnalyzer::new();
    let left = vec![0u8; 64];
    let right = vec![255u8; 64];
    for _ in 0..10 {
        st.analyze(Some(&left), Some(&right));
    }
    st.reset();
    let flat = vec![50u8; 64];
    let m = st.analyze(Some(&flat), Some(&flat));
    assert_eq!(m.stereo_width, 0.0);
    assert_eq!(m.phase_correlation, 1.0);
}
