use crate::audio::fft_engine::FftOrder;
use crate::audio::filter_chain::ChannelFilterChain;
use crate::audio::response::{self, CurvePoint};
use crate::audio::ring_buffer::Consumer;
use crate::audio::settings::SettingsSource;
use crate::audio::spectrum::{AnalysisFrame, SpectrumAnalyzer};
use crate::params::ChangeFlag;
use atomic_float::AtomicF32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// What one [`DisplayContext::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Blocks drained from the audio queue
    pub blocks: usize,
    /// Analysis frames queued
    pub frames: usize,
    /// The display chain was redesigned
    pub curve_changed: bool,
}

/// Non-realtime side of the EQ.
///
/// Drains sample blocks from the audio thread into the analyser and keeps a
/// private filter chain for response curves. Nothing here is shared with the
/// audio thread except the block queue, the change flag and the sample rate.
pub struct DisplayContext {
    settings: Arc<dyn SettingsSource>,
    changed: ChangeFlag,
    sample_rate: Arc<AtomicF32>,

    block_consumer: Consumer<Vec<f32>>,
    block: Vec<f32>,
    analyzer: SpectrumAnalyzer,

    chain: ChannelFilterChain,
    /// Sample rate the analyser and `chain` were last set up for
    current_sample_rate: f32,
}

impl DisplayContext {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        changed: ChangeFlag,
        sample_rate: Arc<AtomicF32>,
        block_consumer: Consumer<Vec<f32>>,
        order: FftOrder,
    ) -> Self {
        let current_sample_rate = sample_rate.load(Ordering::Relaxed);
        let chain = ChannelFilterChain::from_settings(&settings.snapshot(), current_sample_rate);

        Self {
            settings,
            changed,
            sample_rate,
            block_consumer,
            block: Vec::new(),
            analyzer: SpectrumAnalyzer::new(order),
            chain,
            current_sample_rate,
        }
    }

    /// One polling step: feed every queued block to the analyser, then
    /// redesign the display chain if the parameters changed.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let sample_rate = self.sample_rate.load(Ordering::Relaxed);
        let rate_changed = sample_rate != self.current_sample_rate;
        if rate_changed {
            nih_plug::nih_debug!(
                "Display sample rate {} -> {}, resetting analyser",
                self.current_sample_rate,
                sample_rate
            );
            self.analyzer.reset();
            self.current_sample_rate = sample_rate;
        }

        while self.block_consumer.pop(&mut self.block) {
            report.blocks += 1;
            self.analyzer.push_block(&self.block);
            if self.analyzer.produce_frame() {
                report.frames += 1;
            }
        }

        // Always take the flag so a stale mark does not cause a second redesign
        let flagged = self.changed.take();
        if flagged || rate_changed {
            self.chain.update(&self.settings.snapshot(), sample_rate);
            report.curve_changed = true;
        }

        report
    }

    /// Oldest analysis frame not yet pulled. Never blocks.
    pub fn analysis_frame(&mut self) -> Option<AnalysisFrame> {
        self.analyzer.pull_frame()
    }

    pub fn pull_frame_into(&mut self, frame: &mut AnalysisFrame) -> bool {
        self.analyzer.pull_frame_into(frame)
    }

    pub fn evaluate_response_db(&self, frequency: f32) -> f32 {
        response::evaluate_response_db(&self.chain, frequency, self.current_sample_rate)
    }

    pub fn response_curve(&self, num_points: usize) -> Vec<CurvePoint> {
        response::response_curve(&self.chain, self.current_sample_rate, num_points)
    }

    /// Change the transform size. Buffered samples and frames are discarded.
    pub fn set_fft_order(&mut self, order: FftOrder) {
        self.analyzer.set_order(order);
    }

    pub fn fft_order(&self) -> FftOrder {
        self.analyzer.order()
    }

    pub fn sample_rate(&self) -> f32 {
        self.current_sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::constants::MAX_BLOCK_SIZE;
    use crate::audio::ring_buffer::{LockFreeRingBuffer, Producer};
    use crate::audio::settings::{BandSettings, BandType, ChainSettings, Slope};
    use std::sync::RwLock;

    struct Harness {
        settings: Arc<RwLock<ChainSettings>>,
        changed: ChangeFlag,
        sample_rate: Arc<AtomicF32>,
        producer: Producer<Vec<f32>>,
        context: DisplayContext,
    }

    fn harness() -> Harness {
        let settings = Arc::new(RwLock::new(ChainSettings::default()));
        let changed = ChangeFlag::new();
        let sample_rate = Arc::new(AtomicF32::new(48000.0));
        let (producer, consumer) =
            LockFreeRingBuffer::new(30, &vec![0.0f32; MAX_BLOCK_SIZE]).split();
        let context = DisplayContext::new(
            settings.clone(),
            changed.clone(),
            sample_rate.clone(),
            consumer,
            FftOrder::DEFAULT,
        );

        Harness {
            settings,
            changed,
            sample_rate,
            producer,
            context,
        }
    }

    #[test]
    fn redesigns_only_when_flagged() {
        let mut h = harness();
        assert!(h.context.evaluate_response_db(1000.0).abs() < 1e-3);

        h.settings.write().unwrap().bands[1] =
            BandSettings::new(1000.0, 6.0, Slope::Slope12, BandType::Peak);
        assert!(!h.context.tick().curve_changed);
        assert!(h.context.evaluate_response_db(1000.0).abs() < 1e-3);

        h.changed.mark();
        assert!(h.context.tick().curve_changed);
        assert!((h.context.evaluate_response_db(1000.0) - 6.0).abs() < 0.1);
        assert!(!h.context.tick().curve_changed);
    }

    #[test]
    fn drains_blocks_and_produces_frames_once_ready() {
        let mut h = harness();
        let block = vec![0.25f32; MAX_BLOCK_SIZE / 2];

        assert!(h.producer.push(&block));
        let report = h.context.tick();
        assert_eq!(report.blocks, 1);
        assert_eq!(report.frames, 0);
        assert!(h.context.analysis_frame().is_none());

        for _ in 0..3 {
            assert!(h.producer.push(&block));
        }
        let report = h.context.tick();
        assert_eq!(report.blocks, 3);
        // The window fills with the second block, every block after that adds a frame
        assert_eq!(report.frames, 3);
        for _ in 0..3 {
            assert_eq!(h.context.analysis_frame().map(|f| f.len()), Some(1024));
        }
        assert!(h.context.analysis_frame().is_none());
    }

    #[test]
    fn sample_rate_change_resets_analyser_and_curve() {
        let mut h = harness();
        h.producer.push(&vec![0.1f32; MAX_BLOCK_SIZE]);
        assert_eq!(h.context.tick().frames, 1);

        h.sample_rate.store(96000.0, Ordering::Relaxed);
        let report = h.context.tick();
        assert!(report.curve_changed);
        assert_eq!(h.context.sample_rate(), 96000.0);
        // The queued frame was computed at the old rate and is gone
        assert!(h.context.analysis_frame().is_none());
    }

    #[test]
    fn fft_order_change_discards_buffered_state() {
        let mut h = harness();
        h.producer.push(&vec![0.1f32; MAX_BLOCK_SIZE]);
        h.context.tick();

        h.context.set_fft_order(FftOrder::new(12));
        assert_eq!(h.context.fft_order().size(), 4096);
        assert!(h.context.analysis_frame().is_none());

        h.producer.push(&vec![0.1f32; MAX_BLOCK_SIZE]);
        assert_eq!(h.context.tick().frames, 0);
        h.producer.push(&vec![0.1f32; MAX_BLOCK_SIZE]);
        assert_eq!(h.context.tick().frames, 1);
    }
}
