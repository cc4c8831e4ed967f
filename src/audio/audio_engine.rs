use crate::audio::coefficients::BandDesign;
use crate::audio::filter_chain::ChannelFilterChain;
use crate::audio::ring_buffer::Producer;
use crate::audio::sample_buffer_engine::SampleBufferEngine;
use crate::audio::settings::ChainSettings;

/// Realtime side of the EQ.
///
/// Owns one filter chain per stereo channel and the block collector feeding the
/// analyser. Everything here runs on the audio thread: no allocation, no locks.
pub struct AudioEngine {
    sample_rate: f32,
    left: ChannelFilterChain,
    right: ChannelFilterChain,
    /// Settings the chains were last designed from
    installed: Option<ChainSettings>,
    sample_buffer_engine: SampleBufferEngine,
}

impl AudioEngine {
    pub fn new(sample_rate: f32, block_producer: Producer<Vec<f32>>, block_size: usize) -> Self {
        Self {
            sample_rate,
            left: ChannelFilterChain::default(),
            right: ChannelFilterChain::default(),
            installed: None,
            sample_buffer_engine: SampleBufferEngine::new(block_producer, block_size),
        }
    }

    /// Redesign both channel chains if `snapshot` differs from what is installed.
    /// Each band is designed once and shared by both channels.
    pub fn update_filters(&mut self, snapshot: &ChainSettings) {
        if self.installed.as_ref() == Some(snapshot) {
            return;
        }

        for (index, band) in snapshot.bands.iter().enumerate() {
            let design = BandDesign::for_band(band, self.sample_rate);
            self.left.apply_design(index, &design);
            self.right.apply_design(index, &design);
        }
        self.installed = Some(*snapshot);
    }

    /// Filter one block in place and forward its mono mix to the analyser queue.
    ///
    /// Channel 0 uses the left chain, channel 1 the right chain. Any further
    /// channels pass through unfiltered and are left out of the mix.
    pub fn process(&mut self, channels: &mut [&mut [f32]], snapshot: &ChainSettings) {
        self.update_filters(snapshot);

        let mut filtered = 0;
        for (channel, chain) in channels
            .iter_mut()
            .zip([&mut self.left, &mut self.right])
        {
            chain.process_block(channel);
            filtered += 1;
        }

        match filtered {
            0 => return,
            1 => {
                self.sample_buffer_engine.write_samples(&channels[0][..]);
                return;
            }
            _ => {}
        }

        let num_samples = channels[..filtered]
            .iter()
            .map(|c| c.len())
            .min()
            .unwrap_or(0);
        let scale = 1.0 / filtered as f32;
        for i in 0..num_samples {
            let sum: f32 = channels[..filtered].iter().map(|c| c[i]).sum();
            self.sample_buffer_engine.write_sample(sum * scale);
        }
    }

    /// Clear filter memories and the partial analyser block. Coefficients stay.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.sample_buffer_engine.reset();
    }

    pub fn left_chain(&self) -> &ChannelFilterChain {
        &self.left
    }

    pub fn right_chain(&self) -> &ChannelFilterChain {
        &self.right
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.sample_buffer_engine.dropped_blocks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ring_buffer::LockFreeRingBuffer;
    use crate::audio::settings::{BandSettings, BandType, Slope};

    const SR: f32 = 48000.0;

    fn engine(block_size: usize) -> (AudioEngine, crate::audio::ring_buffer::Consumer<Vec<f32>>) {
        let (producer, consumer) =
            LockFreeRingBuffer::new(8, &vec![0.0f32; block_size]).split();
        (AudioEngine::new(SR, producer, block_size), consumer)
    }

    fn boosted() -> ChainSettings {
        let mut settings = ChainSettings::default();
        settings.bands[1] = BandSettings::new(1000.0, 12.0, Slope::Slope12, BandType::Peak);
        settings.bands[2] = BandSettings::new(5000.0, 0.0, Slope::Slope48, BandType::LowPass);
        settings
    }

    #[test]
    fn both_channels_get_identical_filters() {
        let (mut engine, _consumer) = engine(64);
        let settings = boosted();

        let mut left: Vec<f32> = (0..256).map(|i| (i as f32 * 0.13).sin()).collect();
        let mut right = left.clone();
        engine.process(&mut [&mut left[..], &mut right[..]], &settings);

        assert_eq!(left, right);
        assert_eq!(engine.left_chain().band(2).active_stages(), 4);
        assert_eq!(engine.right_chain().band(2).active_stages(), 4);
    }

    #[test]
    fn forwards_mono_mix_of_filtered_channels() {
        let (mut engine, mut consumer) = engine(4);
        let settings = ChainSettings::default();

        let mut left = vec![1.0f32, 1.0, 1.0, 1.0];
        let mut right = vec![0.0f32, 0.0, 0.0, 0.0];
        engine.process(&mut [&mut left[..], &mut right[..]], &settings);

        let mut block = vec![0.0; 4];
        assert!(consumer.pop(&mut block));
        for (mixed, (l, r)) in block.iter().zip(left.iter().zip(right.iter())) {
            assert!((mixed - (l + r) * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn mono_layout_uses_left_chain_only() {
        let (mut engine, mut consumer) = engine(8);
        let mut mono = vec![0.5f32; 8];
        engine.process(&mut [&mut mono[..]], &ChainSettings::default());

        let mut block = vec![0.0; 8];
        assert!(consumer.pop(&mut block));
        assert_eq!(block, mono);
    }

    #[test]
    fn mono_blocks_span_host_buffers() {
        let (mut engine, mut consumer) = engine(8);
        let settings = ChainSettings::default();

        let mut first = vec![0.25f32; 5];
        engine.process(&mut [&mut first[..]], &settings);
        let mut block = vec![0.0; 8];
        assert!(!consumer.pop(&mut block));

        let mut second = vec![-0.5f32; 5];
        engine.process(&mut [&mut second[..]], &settings);
        assert!(consumer.pop(&mut block));
        assert_eq!(&block[..5], &first[..]);
        assert_eq!(&block[5..], &second[..3]);
        assert!(!consumer.pop(&mut block));
    }

    #[test]
    fn redesigns_only_on_change() {
        let (mut engine, _consumer) = engine(32);
        let mut settings = boosted();
        engine.update_filters(&settings);
        let before: Vec<_> = engine.left_chain().band(1).active_coefficients().copied().collect();

        engine.update_filters(&settings);
        let same: Vec<_> = engine.left_chain().band(1).active_coefficients().copied().collect();
        assert_eq!(before, same);

        settings.bands[1].gain = -12.0;
        engine.update_filters(&settings);
        let after: Vec<_> = engine.left_chain().band(1).active_coefficients().copied().collect();
        assert_ne!(before, after);
    }

    #[test]
    fn reset_keeps_coefficients() {
        let (mut engine, _consumer) = engine(32);
        let settings = boosted();
        let mut a = vec![1.0f32; 64];
        engine.process(&mut [&mut a[..]], &settings);
        engine.reset();

        let mut fresh = ChannelFilterChain::from_settings(&settings, SR);
        let mut expected = vec![0.25f32; 64];
        fresh.process_block(&mut expected);

        let mut b = vec![0.25f32; 64];
        engine.process(&mut [&mut b[..]], &settings);
        assert_eq!(b, expected);
    }
}
