pub mod audio;
pub mod display;
pub mod params;
pub mod state;

use atomic_float::AtomicF32;
use audio::audio_engine::AudioEngine;
use audio::constants::{DISPLAY_POLL_INTERVAL_MS, MAX_BLOCK_SIZE, RING_BUFFER_CAPACITY};
use audio::fft_engine::{FftOrder, SharedFftOrder};
use audio::ring_buffer::LockFreeRingBuffer;
use display::{display_channel, DisplayConsumer, DisplayContext, DisplayPoller, DisplayPublisher};
use nih_plug::prelude::*;
use nih_plug::wrapper::state::PluginState;
use params::EqParams;
use std::sync::{atomic::Ordering, Arc};
use std::time::Duration;

pub struct ParametricEq {
    params: Arc<EqParams>,

    /// Set in `initialize()`, read by the display thread
    sample_rate: Arc<AtomicF32>,

    /// `None` until the host has called `initialize()`
    audio_engine: Option<AudioEngine>,

    display_poller: Option<DisplayPoller>,
    display_publisher: DisplayPublisher,
    display_consumer: DisplayConsumer,
    /// Survives re-initialization, picked up by the running poller
    fft_order: SharedFftOrder,
}

impl Default for ParametricEq {
    fn default() -> Self {
        let (display_publisher, display_consumer) = display_channel();

        Self {
            params: Arc::new(EqParams::default()),
            sample_rate: Arc::new(AtomicF32::new(0.0)),
            audio_engine: None,
            display_poller: None,
            display_publisher,
            display_consumer,
            fft_order: SharedFftOrder::default(),
        }
    }
}

impl ParametricEq {
    /// Reading end for an external renderer. Stays valid across re-initialization.
    pub fn display(&self) -> DisplayConsumer {
        self.display_consumer.clone()
    }

    /// Change the analyser transform size. Takes effect on the display
    /// thread's next tick and discards whatever it had buffered.
    pub fn set_fft_order(&self, order: FftOrder) {
        self.fft_order.store(order);
    }

    pub fn fft_order(&self) -> FftOrder {
        self.fft_order.load()
    }

    fn stop_display(&mut self) {
        if let Some(poller) = self.display_poller.take() {
            poller.stop();
        }
    }
}

impl Plugin for ParametricEq {
    const NAME: &'static str = "Parametric EQ";
    const VENDOR: &'static str = "Cmdv";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "info@cmdv.me";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The first audio IO layout is used as the default
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    // nih_plug applies whatever ids the map holds, so an incomplete or invalid
    // map is emptied to keep every current value
    fn filter_state(state: &mut PluginState) {
        if let Err(err) = crate::state::decode_params(&state.params) {
            nih_plug::nih_warn!("Rejected host state, keeping current parameters: {err}");
            state.params.clear();
        }
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let sample_rate = buffer_config.sample_rate;
        let max_buffer_size = buffer_config.max_buffer_size as usize;
        nih_plug::nih_log!(
            "Plugin initialize called, sample_rate: {}, buffer_size: {}",
            sample_rate,
            max_buffer_size
        );

        if sample_rate.is_nan() || sample_rate <= 0.0 || max_buffer_size == 0 {
            nih_plug::nih_warn!("Refusing to initialize with an invalid buffer config");
            return false;
        }

        // A new sample rate gets brand new chains, queue and analyser
        self.stop_display();
        self.sample_rate.store(sample_rate, Ordering::Relaxed);

        let block_size = max_buffer_size.min(MAX_BLOCK_SIZE);
        let (block_producer, block_consumer) =
            LockFreeRingBuffer::new(RING_BUFFER_CAPACITY, &vec![0.0f32; block_size]).split();
        self.audio_engine = Some(AudioEngine::new(sample_rate, block_producer, block_size));

        let change_flag = self.params.change_flag().clone();
        let context = DisplayContext::new(
            self.params.clone(),
            change_flag.clone(),
            self.sample_rate.clone(),
            block_consumer,
            self.fft_order.load(),
        );
        change_flag.mark();

        match DisplayPoller::spawn(
            context,
            self.display_publisher.clone(),
            self.fft_order.clone(),
            Duration::from_millis(DISPLAY_POLL_INTERVAL_MS),
        ) {
            Ok(poller) => self.display_poller = Some(poller),
            Err(err) => nih_plug::nih_warn!("Could not start display poller: {err}"),
        }

        nih_plug::nih_log!("Plugin initialized successfully");
        true
    }

    fn reset(&mut self) {
        if let Some(engine) = &mut self.audio_engine {
            engine.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        if let Some(engine) = &mut self.audio_engine {
            let snapshot = self.params.snapshot();
            engine.process(buffer.as_slice(), &snapshot);
        }
        ProcessStatus::Normal
    }

    fn deactivate(&mut self) {
        self.stop_display();
    }
}

impl ClapPlugin for ParametricEq {
    const CLAP_ID: &'static str = "me.cmdv.parametric-eq";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Three band parametric EQ with a spectrum analyser");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Equalizer,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for ParametricEq {
    const VST3_CLASS_ID: [u8; 16] = *b"CmdvParametricEq";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Eq];
}

nih_export_clap!(ParametricEq);
nih_export_vst3!(ParametricEq);
