use crate::audio::constants::{RING_BUFFER_CAPACITY, SPECTRUM_FLOOR_DB};
use crate::audio::fft_engine::{FftEngine, FftOrder};
use crate::audio::ring_buffer::{Consumer, LockFreeRingBuffer, Producer};

/// One dB-scaled magnitude spectrum, indexed by FFT bin (`size / 2` bins)
#[derive(Debug, PartialEq)]
pub struct AnalysisFrame {
    bins: Vec<f32>,
}

impl Clone for AnalysisFrame {
    fn clone(&self) -> Self {
        Self {
            bins: self.bins.clone(),
        }
    }

    // Reuses the allocation when moving frames through the ring buffer
    fn clone_from(&mut self, source: &Self) {
        self.bins.clone_from(&source.bins);
    }
}

impl AnalysisFrame {
    /// A frame of `num_bins` bins at the analyser floor
    pub fn silent(num_bins: usize) -> Self {
        Self {
            bins: vec![SPECTRUM_FLOOR_DB; num_bins],
        }
    }

    pub fn from_bins(bins: Vec<f32>) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Transform size this frame was computed with
    pub fn fft_size(&self) -> usize {
        self.bins.len() * 2
    }

    /// Centre frequency of bin `index`
    pub fn bin_frequency(&self, index: usize, sample_rate: f32) -> f32 {
        index as f32 * sample_rate / self.fft_size() as f32
    }

    /// Index of the loudest bin, `None` for an empty frame
    pub fn peak_bin(&self) -> Option<usize> {
        self.bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerState {
    /// Fewer than one full window of samples seen since the last reset
    Accumulating,
    /// The rolling window holds a complete window
    Ready,
}

/// Sliding-window spectrum analyser.
///
/// Incoming blocks shift the rolling window left and fill its tail, so frames
/// overlap as much as the block rate allows. Frames are queued in an internal
/// ring buffer and pulled by the display side.
pub struct SpectrumAnalyzer {
    fft_engine: FftEngine,
    rolling_window: Vec<f32>,
    filled: usize,
    scratch_frame: AnalysisFrame,
    frame_producer: Producer<AnalysisFrame>,
    frame_consumer: Consumer<AnalysisFrame>,
}

impl SpectrumAnalyzer {
    pub fn new(order: FftOrder) -> Self {
        let fft_engine = FftEngine::new(order);
        let size = fft_engine.size();
        let scratch_frame = AnalysisFrame::silent(fft_engine.num_bins());
        let (frame_producer, frame_consumer) =
            LockFreeRingBuffer::new(RING_BUFFER_CAPACITY, &scratch_frame).split();

        Self {
            fft_engine,
            rolling_window: vec![0.0; size],
            filled: 0,
            scratch_frame,
            frame_producer,
            frame_consumer,
        }
    }

    pub fn order(&self) -> FftOrder {
        self.fft_engine.order()
    }

    pub fn size(&self) -> usize {
        self.rolling_window.len()
    }

    pub fn state(&self) -> AnalyzerState {
        if self.filled >= self.size() {
            AnalyzerState::Ready
        } else {
            AnalyzerState::Accumulating
        }
    }

    /// Slide `block` into the window. A block longer than the window only
    /// contributes its newest `size` samples.
    pub fn push_block(&mut self, block: &[f32]) {
        let size = self.size();
        let block = &block[block.len().saturating_sub(size)..];
        let n = block.len();

        self.rolling_window.copy_within(n.., 0);
        self.rolling_window[size - n..].copy_from_slice(block);
        self.filled = (self.filled + n).min(size);
    }

    /// Transform the current window and queue the frame.
    ///
    /// Returns `false` when no frame was queued: the window is still
    /// accumulating, the transform failed or the frame queue is full.
    /// Non-finite bins are kept as they are for the display side to skip.
    pub fn produce_frame(&mut self) -> bool {
        if self.state() != AnalyzerState::Ready {
            return false;
        }

        if !self
            .fft_engine
            .process(&self.rolling_window, &mut self.scratch_frame.bins)
        {
            return false;
        }

        self.frame_producer.push(&self.scratch_frame)
    }

    /// Oldest queued frame, if any. Never blocks.
    pub fn pull_frame(&mut self) -> Option<AnalysisFrame> {
        let mut frame = AnalysisFrame::silent(0);
        self.pull_frame_into(&mut frame).then_some(frame)
    }

    /// Like [`pull_frame`](Self::pull_frame) but reuses `frame`'s allocation
    pub fn pull_frame_into(&mut self, frame: &mut AnalysisFrame) -> bool {
        self.frame_consumer.pop(frame)
    }

    pub fn queued_frames(&self) -> usize {
        self.frame_consumer.len()
    }

    /// Rebuild for a new transform size. Buffered samples and queued frames are
    /// discarded.
    pub fn set_order(&mut self, order: FftOrder) {
        nih_plug::nih_debug!(
            "Spectrum analyser reset: FFT order {} -> {}",
            self.order().order(),
            order.order()
        );
        *self = Self::new(order);
    }

    /// Discard buffered samples and queued frames, keeping the transform size
    pub fn reset(&mut self) {
        self.rolling_window.fill(0.0);
        self.filled = 0;
        self.frame_consumer.clear();
    }
}
