//! Audio-thread to main-loop bridge example.
//!
//! Demonstrates: a simulated audio callback writes sample blocks into a
//! ring buffer → the main loop drains them once per tick and tracks the
//! level → deferred calls fire on the scheduler clock → another thread
//! posts a fade request → the loop stops itself after a fixed run time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metronome_core::{Identity, Seconds};
use metronome_engine::{Handler, LoopConfig, LoopHandle, MainLoop, TickInfo};
use metronome_queue::{Delivery, QueueConfig};
use metronome_ring::{Consumer, RingBuffer};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK: usize = 256;

/// State shared by every deferred call.
#[derive(Debug, Default)]
struct Mixer {
    gain: f32,
    announcements: u32,
}

fn announce(mixer: &mut Mixer, now: Seconds, _payload: &[u8]) -> Delivery {
    mixer.announcements += 1;
    tracing::info!(now, gain = mixer.gain, "scheduled announcement");
    Delivery::Done
}

fn set_gain(mixer: &mut Mixer, now: Seconds, payload: &[u8]) -> Delivery {
    let Ok(bytes) = <[u8; 4]>::try_from(payload) else {
        return Delivery::Done;
    };
    mixer.gain = f32::from_le_bytes(bytes);
    tracing::info!(now, gain = mixer.gain, "gain changed");
    Delivery::Done
}

/// Reads every available sample block and reports the running RMS level.
struct LevelMeter {
    consumer: Consumer,
    scratch: Vec<u8>,
    rms: f32,
}

impl Handler for LevelMeter {
    fn on_tick(&mut self, info: &TickInfo) {
        // Whole samples only, so the stream never falls out of alignment.
        let want = self.consumer.read_space().min(self.scratch.len()) & !3;
        let n = self.consumer.read(&mut self.scratch[..want]);
        let samples = self.scratch[..n]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        let (sum, count) = samples.fold((0.0f32, 0usize), |(s, k), x| (s + x * x, k + 1));
        if count > 0 {
            self.rms = (sum / count as f32).sqrt();
        }
        if info.tick % 25 == 0 {
            tracing::info!(tick = info.tick, bytes = n, rms = self.rms, cpu = info.cpu, "level");
        }
    }

    fn on_exit(&mut self) {
        tracing::info!(rms = self.rms, "meter closed");
    }
}

/// Stops the loop once scheduler time passes `until`.
struct Timer {
    until: Seconds,
    handle: LoopHandle<Mixer>,
}

impl Handler for Timer {
    fn on_tick(&mut self, info: &TickInfo) {
        if info.now >= self.until {
            self.handle.stop();
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    println!("=== Metronome Audio Bridge Example ===\n");

    let config = LoopConfig {
        interval: Duration::from_millis(10),
        queue: QueueConfig::with_capacity(32),
        ..LoopConfig::default()
    };
    let mut main_loop = MainLoop::with_config(config, Mixer { gain: 1.0, announcements: 0 })
        .expect("example configuration is valid");

    // Audio thread: one 440 Hz block roughly every 5 ms.
    let (mut producer, consumer) = RingBuffer::new(BLOCK * 4 * 16).split();
    let audio_done = Arc::new(AtomicBool::new(false));
    let audio_flag = Arc::clone(&audio_done);
    let audio = thread::spawn(move || {
        let mut phase = 0.0f32;
        let mut dropped = 0usize;
        let mut block = Vec::with_capacity(BLOCK * 4);
        while !audio_flag.load(Ordering::Acquire) {
            block.clear();
            for _ in 0..BLOCK {
                let sample = (phase * std::f32::consts::TAU).sin() * 0.5;
                phase = (phase + 440.0 / SAMPLE_RATE).fract();
                block.extend_from_slice(&sample.to_le_bytes());
            }
            let room = producer.write_space() & !3;
            let take = block.len().min(room);
            dropped += block.len() - producer.write(&block[..take]);
            thread::sleep(Duration::from_millis(5));
        }
        dropped
    });

    main_loop.add(LevelMeter {
        consumer,
        scratch: vec![0u8; BLOCK * 4 * 16],
        rms: 0.0,
    });
    let handle = main_loop.handle();
    main_loop.add(Timer { until: 1.0, handle });

    for at in [0.25, 0.5, 0.75] {
        main_loop
            .schedule(at, announce, Identity::NONE, &[])
            .expect("queue has room");
    }

    // Control thread: fade down halfway through.
    let control = main_loop.handle();
    let controller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        let gain = 0.25f32.to_le_bytes();
        if let Err(err) = control.post(0.5, set_gain, Identity::NONE, &gain) {
            tracing::warn!(%err, "fade request rejected");
        }
    });

    main_loop.start();
    audio_done.store(true, Ordering::Release);
    let dropped = audio.join().expect("audio thread panicked");
    controller.join().expect("control thread panicked");

    let metrics = main_loop.last_metrics();
    println!("\nTicks run:        {}", metrics.tick);
    println!("Scheduler time:   {:.3}s", main_loop.now());
    println!("Announcements:    {}", main_loop.context().announcements);
    println!("Final gain:       {}", main_loop.context().gain);
    println!("Smoothed cpu:     {:.3}", main_loop.cpu());
    println!("Bytes dropped:    {dropped}");
}
