//! Player - wires transport, synth and an output stream together

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, error, info, warn};

use saavy_engine::{
    config::EngineConfig,
    engine::{transport, BlockClock, SchedulerEndpoint, SchedulerEvent, TransportHandle},
    io::converter::midi_to_synth,
    sequencing::Timeline,
    synth::{PolySynth, SynthMessage, VoiceSettings},
    MAX_BLOCK_SIZE,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Grace period for the stop broadcast to reach the synth before exit.
const STOP_GRACE: Duration = Duration::from_millis(200);

pub struct Player {
    config: EngineConfig,
    timeline: Timeline,
    looping: bool,
    shape: f32,
}

impl Player {
    pub fn new(config: EngineConfig, timeline: Timeline) -> Self {
        Self {
            config,
            timeline,
            looping: false,
            shape: 0.0,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn shape(mut self, shape: f32) -> Self {
        self.shape = shape;
        self
    }

    /// Play for at most `seconds`, on a device or a simulated audio thread.
    pub fn run_for(mut self, seconds: f64, dry_run: bool) -> EyreResult<()> {
        if dry_run {
            let engine = self.build_engine()?;
            let running = Arc::new(AtomicBool::new(true));
            let audio = spawn_simulated_device(
                engine.audio,
                self.config.block_size,
                self.config.sample_rate,
                running.clone(),
            );

            let result = control_loop(engine.control, seconds, self.looping);
            running.store(false, Ordering::Relaxed);
            audio
                .join()
                .map_err(|_| eyre!("simulated audio thread panicked"))?;
            return result;
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let stream_config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        self.config.sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;
        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = self.config.sample_rate,
            channels,
            "Opened output device"
        );

        let engine = self.build_engine()?;
        let mut audio = engine.audio;
        let stream = device.build_output_stream(
            &stream_config.into(),
            move |data: &mut [f32], _| audio.render_interleaved(data, channels),
            |err| error!(err = %err, "Audio stream error"),
            None,
        )?;
        stream.play()?;

        control_loop(engine.control, seconds, self.looping)
    }

    fn build_engine(&self) -> EyreResult<Engine> {
        self.config.validate().wrap_err("invalid engine configuration")?;

        let timeline = self
            .timeline
            .flatten(self.config.sample_rate)
            .wrap_err("failed to flatten timeline")?;
        info!(
            bpm = self.timeline.bpm,
            events = timeline.len(),
            duration_samples = timeline.duration_samples(),
            "Timeline ready"
        );

        let (mut handle, endpoint) = transport(self.config.queue_capacity);
        handle.load(timeline)?;
        handle.set_loop(self.looping)?;

        let (synth_tx, synth_rx) = RingBuffer::new(self.config.queue_capacity);
        let settings = VoiceSettings {
            shape: self.shape,
            ..VoiceSettings::default()
        };
        let synth = PolySynth::new(
            self.config.sample_rate,
            self.config.max_voices,
            settings,
            synth_rx,
        );

        Ok(Engine {
            control: Control { handle, synth_tx },
            audio: AudioEngine {
                clock: BlockClock::new(self.config.block_size),
                endpoint,
                synth,
                render_buf: vec![0.0; MAX_BLOCK_SIZE],
            },
        })
    }
}

struct Engine {
    control: Control,
    audio: AudioEngine,
}

/// Control-thread side: the transport handle and the synth's inbox.
struct Control {
    handle: TransportHandle,
    synth_tx: Producer<SynthMessage>,
}

impl Control {
    /// Forward scheduled events to the synth. Returns true once playback ends.
    fn pump(&mut self) -> bool {
        let mut ended = false;
        for event in self.handle.drain() {
            match event {
                SchedulerEvent::Midi {
                    event,
                    scheduled_sample,
                    actual_sample,
                } => {
                    debug!(
                        ?event,
                        scheduled_sample,
                        actual_sample,
                        "Scheduled event"
                    );
                    if let Some(msg) = midi_to_synth(event, None) {
                        if self.synth_tx.push(msg).is_err() {
                            warn!(?msg, "Synth queue full, message dropped");
                        }
                    }
                }
                SchedulerEvent::PlaybackEnded => {
                    info!("Playback ended");
                    ended = true;
                }
            }
        }
        ended
    }
}

fn control_loop(mut control: Control, seconds: f64, looping: bool) -> EyreResult<()> {
    control.handle.play()?;
    info!(seconds, looping, "Playing");

    let deadline = playback_deadline(Instant::now(), seconds)?;
    while Instant::now() < deadline {
        if control.pump() {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    control.handle.stop()?;
    thread::sleep(STOP_GRACE);
    control.pump();
    info!("Stopped");
    Ok(())
}

fn playback_deadline(now: Instant, seconds: f64) -> EyreResult<Instant> {
    let duration = Duration::try_from_secs_f64(seconds.max(0.0))
        .wrap_err_with(|| format!("--seconds {seconds} is not a playable duration"))?;
    now.checked_add(duration)
        .ok_or_else(|| eyre!("--seconds {seconds} is too far in the future"))
}

/// Audio-thread side. Never logs, locks or allocates.
struct AudioEngine {
    clock: BlockClock,
    endpoint: SchedulerEndpoint,
    synth: PolySynth<Consumer<SynthMessage>>,
    render_buf: Vec<f32>,
}

impl AudioEngine {
    /// Fill an interleaved device buffer, mono to every channel.
    fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let total_frames = data.len() / channels;
        let mut frames_written = 0;

        let AudioEngine {
            clock,
            endpoint,
            synth,
            render_buf,
        } = self;

        for (block_start, frames) in clock.quanta(total_frames) {
            endpoint.process_block(block_start, frames);

            let block = &mut render_buf[..frames];
            synth.render_block(block);

            let out_off = frames_written * channels;
            for (i, &s) in block.iter().enumerate() {
                let frame = out_off + i * channels;
                data[frame..frame + channels].fill(s);
            }

            frames_written += frames;
        }
    }
}

/// Render blocks in real time from a plain thread, discarding the audio.
fn spawn_simulated_device(
    mut audio: AudioEngine,
    block_size: usize,
    sample_rate: f32,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    let period = Duration::from_secs_f64(block_size as f64 / sample_rate as f64);

    thread::spawn(move || {
        let mut buffer = vec![0.0; block_size];
        let mut next = Instant::now();
        while running.load(Ordering::Relaxed) {
            audio.render_interleaved(&mut buffer, 1);
            next += period;
            if let Some(wait) = next.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
    })
}
