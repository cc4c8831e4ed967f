use crate::audio::constants::RESPONSE_CURVE_POINTS;
use crate::audio::fft_engine::SharedFftOrder;
use crate::audio::response::CurvePoint;
use crate::audio::spectrum::AnalysisFrame;
use crate::audio::spectrum_engine::SpectrumEngine;
use crate::display::context::DisplayContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use triple_buffer::TripleBuffer;

/// Everything the external renderer needs for one repaint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayFrame {
    pub response: Vec<CurvePoint>,
    pub spectrum: Vec<CurvePoint>,
    /// Transform size `spectrum` was computed with, 0 before the first frame
    pub fft_size: usize,
}

/// Writing end of the display triple buffer. Shared so it outlives any one poller.
pub type DisplayPublisher = Arc<Mutex<triple_buffer::Input<DisplayFrame>>>;

/// Cloneable reading end for the renderer
#[derive(Clone)]
pub struct DisplayConsumer {
    output: Arc<Mutex<triple_buffer::Output<DisplayFrame>>>,
}

impl DisplayConsumer {
    /// Latest published frame
    pub fn read(&self) -> DisplayFrame {
        match self.output.lock() {
            Ok(mut output) => output.read().clone(),
            Err(poisoned) => poisoned.into_inner().read().clone(),
        }
    }
}

pub fn display_channel() -> (DisplayPublisher, DisplayConsumer) {
    let (input, output) = TripleBuffer::new(&DisplayFrame::default()).split();
    (
        Arc::new(Mutex::new(input)),
        DisplayConsumer {
            output: Arc::new(Mutex::new(output)),
        },
    )
}

/// Background thread calling [`DisplayContext::tick`] on a fixed period
pub struct DisplayPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<DisplayContext>>,
}

impl DisplayPoller {
    /// Run `context` on a named thread. Changes to `fft_order` are applied
    /// to the analyser on the following tick.
    pub fn spawn(
        context: DisplayContext,
        publisher: DisplayPublisher,
        fft_order: SharedFftOrder,
        period: Duration,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name(String::from("eq-display-poller"))
            .spawn({
                let stop = stop.clone();
                move || poll_loop(context, &publisher, &fft_order, period, &stop)
            })?;

        nih_plug::nih_log!("Display poller started ({} ms period)", period.as_millis());
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it. Returns the context unless the thread panicked.
    pub fn stop(mut self) -> Option<DisplayContext> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<DisplayContext> {
        let handle = self.handle.take()?;
        self.stop.store(true, Ordering::Release);
        handle.thread().unpark();

        match handle.join() {
            Ok(context) => {
                nih_plug::nih_log!("Display poller stopped");
                Some(context)
            }
            Err(_) => {
                nih_plug::nih_warn!("Display poller thread panicked");
                None
            }
        }
    }
}

impl Drop for DisplayPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(
    mut context: DisplayContext,
    publisher: &DisplayPublisher,
    fft_order: &SharedFftOrder,
    period: Duration,
    stop: &AtomicBool,
) -> DisplayContext {
    let mut spectrum_engine = SpectrumEngine::new();
    let mut frame = AnalysisFrame::silent(0);
    let mut display = DisplayFrame {
        response: context.response_curve(RESPONSE_CURVE_POINTS),
        spectrum: Vec::new(),
        fft_size: 0,
    };
    publish(publisher, &display);

    while !stop.load(Ordering::Acquire) {
        let order = fft_order.load();
        if order != context.fft_order() {
            context.set_fft_order(order);
        }

        let report = context.tick();

        // Only the newest frame is drawn
        let mut new_frame = false;
        while context.pull_frame_into(&mut frame) {
            new_frame = true;
        }

        if new_frame {
            display.fft_size = frame.fft_size();
            display.spectrum.clear();
            display
                .spectrum
                .extend_from_slice(spectrum_engine.update(&frame, context.sample_rate()));
        }
        if report.curve_changed {
            display.response = context.response_curve(RESPONSE_CURVE_POINTS);
        }
        if new_frame || report.curve_changed {
            publish(publisher, &display);
        }

        thread::park_timeout(period);
    }

    context
}

fn publish(publisher: &DisplayPublisher, display: &DisplayFrame) {
    let mut input = match publisher.lock() {
        Ok(input) => input,
        Err(poisoned) => poisoned.into_inner(),
    };
    input.write(display.clone());
}
