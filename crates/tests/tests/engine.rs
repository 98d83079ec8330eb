//! Integration tests for the engine, the parameter mailbox and the meter tap

use autoq_core::domain::audio::{ChannelCount, SampleRate};
use autoq_core::domain::dsp::{AutoQ, EffectParameters, FilterAlgorithm, SignalProcessor};
use autoq_infra::audio::{parameter_channel, AutoQEngine};
use autoq_tests::{bursts, interleave, sine, silence, SAMPLE_RATE};
use std::sync::Arc;
use std::thread;

const BLOCK_FRAMES: usize = 256;

fn engine(channels: ChannelCount, params: EffectParameters) -> AutoQEngine {
    AutoQEngine::new(SampleRate::Hz48000, channels, params)
}

#[test]
fn test_engine_matches_single_follower() {
    let params = EffectParameters {
        q: 6.0,
        threshold_db: -20.0,
        ..Default::default()
    };
    let signal = bursts(440.0, 2400, 6);

    let mut reference = AutoQ::with_parameters(params, SAMPLE_RATE);
    let expected: Vec<f32> = signal
        .iter()
        .map(|&x| reference.process_sample(f64::from(x as f32)) as f32)
        .collect();

    let mut engine = engine(ChannelCount::Mono, params);
    let mut buffer = interleave(&[signal]);
    for block in buffer.chunks_mut(BLOCK_FRAMES) {
        engine.process_interleaved(block).unwrap();
    }

    assert_eq!(buffer, expected);
}

#[test]
fn test_block_size_does_not_change_output() {
    let params = EffectParameters::default();
    let input = interleave(&[bursts(220.0, 1200, 8), sine(660.0, 0.5, 9600)]);

    let mut outputs = Vec::new();
    for frames in [1usize, 64, 500, 4096] {
        let mut engine = engine(ChannelCount::Stereo, params);
        let mut buffer = input.clone();
        for block in buffer.chunks_mut(frames * 2) {
            engine.process_interleaved(block).unwrap();
        }
        outputs.push(buffer);
    }

    for output in &outputs[1..] {
        assert_eq!(output, &outputs[0]);
    }
}

#[test]
fn test_control_thread_updates_reach_audio_thread() {
    let (sender, receiver) = parameter_channel(4);
    let mut engine = engine(ChannelCount::Stereo, EffectParameters::default()).with_receiver(receiver);
    let meter = engine.meter();

    let control = thread::spawn(move || {
        for i in 0..200 {
            sender.publish(EffectParameters {
                filter_algorithm: FilterAlgorithm::Bandpass,
                fc: 200.0 + i as f64 * 10.0,
                ..Default::default()
            });
        }
        sender
    });
    let sender = control.join().unwrap();

    let mut buffer = interleave(&[sine(440.0, 0.9, BLOCK_FRAMES), sine(440.0, 0.9, BLOCK_FRAMES)]);
    engine.process_interleaved(&mut buffer).unwrap();

    // Only the newest snapshot survives the burst
    assert_eq!(engine.params().fc, 2190.0);
    assert_eq!(engine.params().filter_algorithm, FilterAlgorithm::Bandpass);
    assert!(sender.overwritten() > 0);
    assert_eq!(meter.reading().sequence, 1);
}

#[test]
fn test_meter_reader_on_separate_thread() {
    let mut engine = engine(ChannelCount::Stereo, EffectParameters::default());
    let meter = engine.meter();

    let loud = interleave(&[sine(220.0, 1.0, 9600), silence(9600)]);
    for block in loud.chunks(BLOCK_FRAMES * 2) {
        let mut block = block.to_vec();
        engine.process_interleaved(&mut block).unwrap();
    }

    let reader = Arc::clone(&meter);
    let reading = thread::spawn(move || reader.reading()).join().unwrap();

    assert!(reading.threshold_exceeded);
    assert!(reading.level_db > -6.0);
    assert!(reading.cutoff > 1000.0);
    assert_eq!(reading.sequence, (9600 / BLOCK_FRAMES) as u64 + 1);
}

#[test]
fn test_bypass_toggle_from_control_thread() {
    let (sender, receiver) = parameter_channel(1);
    let mut engine = engine(ChannelCount::Mono, EffectParameters::default()).with_receiver(receiver);

    let input: Vec<f32> = sine(3000.0, 0.8, BLOCK_FRAMES).iter().map(|&x| x as f32).collect();

    let mut filtered = input.clone();
    engine.process_interleaved(&mut filtered).unwrap();
    assert_ne!(filtered, input);

    sender.set_bypass(true);
    let mut bypassed = input.clone();
    engine.process_interleaved(&mut bypassed).unwrap();
    assert_eq!(bypassed, input);
    assert_eq!(engine.channel(0).unwrap().detector().envelope(), 0.0);

    // Coming back starts from clean state, same as a fresh engine
    sender.set_bypass(false);
    let mut resumed = input.clone();
    engine.process_interleaved(&mut resumed).unwrap();
    assert_eq!(resumed, filtered);
}

#[test]
fn test_surround_channels_are_independent() {
    let channels = ChannelCount::from_count(6).unwrap();
    let mut engine = engine(channels, EffectParameters::default());

    let mut signals = vec![silence(4800); 6];
    signals[3] = sine(220.0, 1.0, 4800);
    let mut buffer = interleave(&signals);
    engine.process_interleaved(&mut buffer).unwrap();

    for ch in 0..6 {
        let follower = engine.channel(ch).unwrap();
        assert_eq!(follower.threshold_exceeded(), ch == 3, "channel {}", ch);
    }
}
