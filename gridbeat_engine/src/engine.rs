use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;

use gridbeat_shared::{Markers, Pattern, TransportConfig};

use crate::clock::StepClock;
use crate::commands::EngineCommand;
use crate::dispatcher::{SharedSound, StepDispatcher, Transport};
use crate::mixer::MixGainStage;
use crate::sample::SampleInfo;
use crate::sound::SoundEngine;

/// Audio-thread owner of the scheduling core. The cpal callback drains the
/// command channel, rebuilds the dispatcher when a snapshot changed, and
/// advances the step clock by each buffer's frame count. All tick work runs
/// on the device's own thread; nothing here blocks or touches the disk.
pub struct AudioEngine {
    _stream: cpal::Stream,
    current_step: Arc<AtomicU32>,
    pub sample_rate: u32,
}

impl AudioEngine {
    pub fn new(
        command_rx: Receiver<EngineCommand>,
        sound: Box<dyn SoundEngine>,
    ) -> Result<Self, anyhow::Error> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(anyhow::anyhow!("No output device available"))?;
        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        eprintln!("[Engine] Using config: {:?}", stream_config);

        let sound: SharedSound = Arc::new(Mutex::new(sound));
        let sound_cb = sound.clone();

        // Owned state for the audio thread
        let mut transport = Transport::new(StepClock::new(sample_rate as f32));
        let current_step = transport.playhead();
        let defaults = TransportConfig::default();
        let mut bpm = defaults.bpm;
        let mut swing = defaults.swing;
        let mut accent = defaults.accent;
        let mut pattern = Arc::new(Pattern::default());
        let mut markers = Arc::new(Markers::default());
        let mut sample: Option<Arc<SampleInfo>> = None;

        transport.configure(bpm, swing);
        transport.install(
            StepDispatcher::new(pattern.clone(), markers.clone(), accent, sample.clone()),
            sound_cb.clone(),
        );

        let err_fn = |err: cpal::StreamError| {
            let s = err.to_string();
            // Suppress common buffer under/overrun messages to avoid console spam
            if !s.contains("underrun") && !s.contains("overrun") {
                eprintln!("[Engine] stream error: {s}");
            }
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut rebuild = false;
                    while let Ok(cmd) = command_rx.try_recv() {
                        match cmd {
                            EngineCommand::Play => transport.play(),
                            EngineCommand::Stop => transport.stop(),
                            EngineCommand::SetBpm(value) => {
                                bpm = value;
                                transport.configure(bpm, swing);
                            }
                            EngineCommand::SetSwing(value) => {
                                swing = value;
                                transport.configure(bpm, swing);
                            }
                            EngineCommand::SetAccent(value) => {
                                accent = value;
                                rebuild = true;
                            }
                            EngineCommand::SetPattern(snapshot) => {
                                pattern = snapshot;
                                rebuild = true;
                            }
                            EngineCommand::SetMarkers(snapshot) => {
                                markers = snapshot;
                                rebuild = true;
                            }
                            EngineCommand::SampleReady(info) => {
                                sample = Some(info);
                                rebuild = true;
                            }
                            EngineCommand::SampleCleared => {
                                sample = None;
                                rebuild = true;
                            }
                            EngineCommand::SetChannelLevel { channel, db } => {
                                if let Ok(mut engine) = sound_cb.lock() {
                                    MixGainStage::apply_channel(&mut **engine, channel, db);
                                }
                            }
                        }
                    }
                    if rebuild {
                        transport.install(
                            StepDispatcher::new(
                                pattern.clone(),
                                markers.clone(),
                                accent,
                                sample.clone(),
                            ),
                            sound_cb.clone(),
                        );
                    }
                    transport.clock_mut().advance(data.len() / channels);
                    // Output stays silent here; audible sound is the injected
                    // engine's business.
                    data.fill(0.0);
                },
                err_fn,
                None,
            )?,
            other => anyhow::bail!("Unsupported sample format: {other:?}"),
        };
        stream.play()?;

        Ok(Self {
            _stream: stream,
            current_step,
            sample_rate,
        })
    }

    /// Current playhead step (0-15) for UI/follow behavior.
    pub fn playhead(&self) -> u32 {
        self.current_step.load(Ordering::Relaxed)
    }
}
