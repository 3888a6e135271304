// Shared audio/visual tuning constants used by the analyzers, the particle
// field and the overlay. Keeping them here keeps magic numbers out of the
// per-frame code.

// Analysis window
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;
pub const DEFAULT_FFT_SIZE: usize = 2048; // host AnalyserNode fftSize
pub const BYTE_MAX: f32 = 255.0; // 8-bit magnitude ceiling

// Band extraction (indices for a 1024-bin buffer, ~8% / 50%)
pub const BASS_END_INDEX: usize = 82;
pub const MID_END_INDEX: usize = 512;
pub const BASS_FRACTION: f32 = 0.08;
pub const MID_FRACTION: f32 = 0.5;
pub const BAND_SMOOTHING: f32 = 0.7; // smoothed = prev*f + raw*(1-f)

// Spectral features
pub const CENTROID_CEILING_HZ: f32 = 8000.0;
pub const CENTROID_SMOOTHING: f32 = 0.7;
pub const FLUX_SCALE: f32 = 4.0; // flux = sum(rise) * FLUX_SCALE / bins
pub const FLUX_SMOOTHING: f32 = 0.5;
pub const RMS_SMOOTHING: f32 = 0.6;
pub const DEFAULT_ROLLOFF_FRACTION: f32 = 0.85;

// Beat detection
pub const BEAT_HISTORY_LEN: usize = 42; // ~0.7 s at 60 fps
pub const BEAT_HISTORY_SECONDS: f32 = 0.7;
pub const BEAT_THRESHOLD_FLOOR: f32 = 0.15;
pub const BEAT_VARIANCE_COEFF: f32 = 1.5; // divided by sensitivity
pub const BEAT_MIN_INTERVAL_SEC: f64 = 0.2;
pub const BPM_MIN: f32 = 60.0;
pub const BPM_MAX: f32 = 200.0;
pub const BPM_DEFAULT: f32 = 120.0;

// Onset detection
pub const ONSET_HISTORY_LEN: usize = 10;
pub const ONSET_MEDIAN_COEFF: f32 = 1.5; // divided by sensitivity
pub const ONSET_OFFSET: f32 = 0.05;
pub const ONSET_FLOOR: f32 = 0.15;

// Chroma
pub const CHROMA_MIN_HZ: f32 = 60.0;
pub const CHROMA_MAX_HZ: f32 = 5000.0;
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

// Stereo
pub const STEREO_SMOOTHING: f32 = 0.7;
pub const PHASE_SMOOTHING: f32 = 0.5; // faster, phase problems should show quickly

// Particle field
pub const MIN_PARTICLES: usize = 1000;
pub const MAX_PARTICLES: usize = 50_000;
pub const DEFAULT_PARTICLES: usize = 8000;
// Accepted range for the layout expansion factor
pub const MIN_EXPANSION: f32 = 0.01;
pub const MAX_EXPANSION: f32 = 100.0;
// Accepted range for DNA helix turns
pub const MIN_DNA_TURNS: f32 = 0.1;
pub const MAX_DNA_TURNS: f32 = 50.0;
pub const GROUP_RATIOS: [f32; 3] = [0.33, 0.34, 0.33]; // bass, mid, high
pub const TIME_STEP: f32 = 0.016; // per frame, scaled by animation speed
pub const BASS_PULSE_AMPLITUDE: f32 = 0.6;
pub const BASS_PULSE_FREQUENCY: f32 = 3.0;
pub const BASS_WAVE_AMPLITUDE: f32 = 0.25;
pub const BASS_WAVE_NUMBER: f32 = 0.8; // radians per world unit
pub const BASS_WAVE_SPEED: f32 = 4.0;
pub const MID_SWIRL_AMPLITUDE: f32 = 0.45;
pub const MID_SWIRL_FREQUENCY: f32 = 1.5;
pub const MID_BREATH_AMPLITUDE: f32 = 0.12;
pub const HIGH_SPARKLE_AMPLITUDE: f32 = 0.35;
pub const HIGH_SPARKLE_FREQUENCY: f32 = 12.0;
pub const TWINKLE_PROBABILITY: f32 = 0.4; // times high energy
pub const TWINKLE_BOOST: f32 = 2.5;
pub const BRIGHTNESS_BASE: f32 = 0.6;
pub const BRIGHTNESS_SPAN: f32 = 1.4;
pub const SIZE_ENERGY_BONUS: f32 = 1.5;
pub const ROTATION_MID_GAIN: f32 = 2.0;

// Trails
pub const TRAIL_TRACKED_DEFAULT: usize = 200;
pub const TRAIL_UPDATE_INTERVAL: u32 = 2; // frames between history ticks
pub const TRAIL_ALPHA_DECAY: f32 = 0.85;
pub const TRAIL_ALPHA_FLOOR: f32 = 0.05;
pub const TRAIL_MIN_SEGMENT: f32 = 1e-4;

// Connections
pub const CONNECTION_SAMPLE_CAP: usize = 300;
pub const CONNECTION_ENERGY_GAIN: f32 = 0.3;

// Human overlay
pub const CROSSFADE_DURATION_SEC: f32 = 0.5;
pub const EDGE_THRESHOLD_DEG: f32 = 20.0;
pub const OVERLAY_BAND_SMOOTHING: f32 = 0.12;
pub const LAYER_OPACITY_FLOORS: [f32; 4] = [0.05, 0.05, 0.03, 0.05]; // body, veins, brain, heart
