use viz_core::constants::DEFAULT_FFT_SIZE;
use web_sys as web;

// Analyser taps owned by the host audio graph. The mono tap drives the band
// extractor and the advanced analyzer; left/right feed the stereo analyzer.
#[derive(Default)]
pub struct AnalyserTaps {
    mono: Option<web::AnalyserNode>,
    left: Option<web::AnalyserNode>,
    right: Option<web::AnalyserNode>,
    mono_buf: Vec<u8>,
    left_buf: Vec<u8>,
    right_buf: Vec<u8>,
}

pub struct TapData<'a> {
    pub mono: Option<&'a [u8]>,
    pub stereo: Option<(&'a [u8], &'a [u8])>,
}

fn configure(node: &web::AnalyserNode, fft_size: usize) {
    node.set_fft_size(fft_size as u32);
    // Smoothing happens in the analyzers; keep the host's raw.
    node.set_smoothing_time_constant(0.0);
}

// Size the buffer to the node's bin count and fill it with byte magnitudes.
fn read_into(node: &web::AnalyserNode, buf: &mut Vec<u8>) {
    let bins = node.frequency_bin_count() as usize;
    if buf.len() != bins {
        buf.resize(bins, 0);
    }
    node.get_byte_frequency_data(buf);
}

impl AnalyserTaps {
    pub fn attach(
        &mut self,
        mono: Option<web::AnalyserNode>,
        left: Option<web::AnalyserNode>,
        right: Option<web::AnalyserNode>,
        fft_size: usize,
    ) {
        let fft_size = if fft_size.is_power_of_two() {
            fft_size
        } else {
            DEFAULT_FFT_SIZE
        };
        for node in [&mono, &left, &right].into_iter().flatten() {
            configure(node, fft_size);
        }
        log::info!(
            "[audio] analysers attached: mono={} stereo={} fft={}",
            mono.is_some(),
            left.is_some() && right.is_some(),
            fft_size
        );
        self.mono = mono;
        self.left = left;
        self.right = right;
    }

    pub fn has_stereo(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Pull this tick's magnitudes from every attached node.
    pub fn read(&mut self) -> TapData<'_> {
        let mono = match &self.mono {
            Some(node) => {
                read_into(node, &mut self.mono_buf);
                Some(self.mono_buf.as_slice())
            }
            None => None,
        };
        let stereo = match (&self.left, &self.right) {
            (Some(l), Some(r)) => {
                read_into(l, &mut self.left_buf);
                read_into(r, &mut self.right_buf);
                Some((self.left_buf.as_slice(), self.right_buf.as_slice()))
            }
            _ => None,
        };
        TapData { mono, stereo }
    }
}
