//! Integration tests for the detector -> modulation -> filter pipeline
//!
//! These drive complete [`AutoQ`] followers with long signals and check the
//! timing and steady-state behaviour end to end.

use autoq_core::domain::dsp::{
    params, AutoQ, EffectParameters, FilterAlgorithm, SignalProcessor,
};
use autoq_tests::{bursts, constant, peak, silence, sine, SAMPLE_RATE};
use proptest::prelude::*;

fn default_follower() -> AutoQ {
    AutoQ::with_parameters(EffectParameters::default(), SAMPLE_RATE)
}

// ============================================================================
// STEP RESPONSE
// ============================================================================

#[test]
fn test_step_crosses_threshold_on_schedule() {
    let mut follower = default_follower();

    // RMS of a unit step crosses -6 dB once 1 - a^(n+1) > 10^(-12/20)
    let mut first_exceeded = None;
    for (n, &x) in constant(1.0, 1000).iter().enumerate() {
        follower.process_sample(x);
        if follower.threshold_exceeded() && first_exceeded.is_none() {
            first_exceeded = Some(n);
        }
        if n == 960 {
            // One attack time constant: sqrt(1 - 1/e)
            assert!((follower.level_db() - (-1.989)).abs() < 0.01);
        }
    }

    assert_eq!(first_exceeded, Some(277));
}

#[test]
fn test_step_settles_at_full_scale_cutoff() {
    let mut follower = default_follower();
    let mut last = 0.0;
    for x in constant(1.0, 48000) {
        last = follower.process_sample(x);
    }

    let metering = follower.metering();
    assert!(metering.level_db.abs() < 1e-6);
    assert!((metering.cutoff - 10716.87).abs() < 0.01);
    // Low-pass passes DC at unity
    assert!((last - 1.0).abs() < 1e-6);
}

#[test]
fn test_release_returns_to_base_cutoff() {
    let mut follower = default_follower();
    for x in constant(1.0, 48000) {
        follower.process_sample(x);
    }

    let mut returned_at = None;
    for (n, x) in silence(60000).into_iter().enumerate() {
        follower.process_sample(x);
        if !follower.threshold_exceeded() {
            returned_at = Some(n);
            break;
        }
        assert!(follower.metering().cutoff > 1000.0);
    }

    // 500 ms release: ln(4) time constants in the squared domain
    assert_eq!(returned_at, Some(33157));
    assert_eq!(follower.metering().cutoff, 1000.0);
}

#[test]
fn test_quiet_signal_never_modulates() {
    let mut follower = default_follower();
    for x in sine(440.0, 0.1, 48000) {
        follower.process_sample(x);
        assert!(!follower.threshold_exceeded());
        assert_eq!(follower.metering().cutoff, 1000.0);
    }
}

// ============================================================================
// TOPOLOGIES UNDER MODULATION
// ============================================================================

#[test]
fn test_all_topologies_stay_bounded_under_bursts() {
    let signal = bursts(220.0, 4800, 10);

    for algorithm in [
        FilterAlgorithm::Lowpass,
        FilterAlgorithm::Highpass,
        FilterAlgorithm::Bandpass,
    ] {
        for q in [0.5, 5.0, 20.0] {
            let mut follower = AutoQ::with_parameters(
                EffectParameters {
                    filter_algorithm: algorithm,
                    q,
                    threshold_db: -30.0,
                    sensitivity: 5.0,
                    ..Default::default()
                },
                SAMPLE_RATE,
            );

            let output: Vec<f64> = signal.iter().map(|&x| follower.process_sample(x)).collect();
            assert!(output.iter().all(|y| y.is_finite()), "{:?} Q={}", algorithm, q);
            assert!(peak(&output) < 10.0, "{:?} Q={} peak={}", algorithm, q, peak(&output));
        }
    }
}

#[test]
fn test_bandpass_with_nlp_stays_below_unity() {
    let mut follower = AutoQ::with_parameters(
        EffectParameters {
            filter_algorithm: FilterAlgorithm::Bandpass,
            q: params::Q_MAX,
            sensitivity: params::SENSITIVITY_MAX,
            threshold_db: -40.0,
            ..Default::default()
        },
        SAMPLE_RATE,
    );

    for x in bursts(1000.0, 2400, 8) {
        assert!(follower.process_sample(x).abs() < 1.0);
    }
}

#[test]
fn test_self_oscillation_keeps_ringing_after_input_stops() {
    let mut follower = AutoQ::with_parameters(
        EffectParameters {
            filter_algorithm: FilterAlgorithm::Bandpass,
            self_oscillate: true,
            enable_nlp: false,
            threshold_db: 0.0,
            ..Default::default()
        },
        SAMPLE_RATE,
    );

    follower.process_sample(1.0);
    let mut tail = Vec::new();
    for x in silence(48000) {
        tail.push(follower.process_sample(x));
    }

    // Undamped: the last 10 ms still carry signal
    assert!(peak(&tail[tail.len() - 480..]) > 0.01);
    assert!(tail.iter().all(|y| y.is_finite()));
}

#[test]
fn test_rate_change_via_reset() {
    let mut follower = default_follower();
    for x in sine(440.0, 0.9, 4800) {
        follower.process_sample(x);
    }

    follower.reset(96000.0);
    assert_eq!(follower.detector().sample_rate(), 96000.0);
    assert_eq!(follower.filter().sample_rate(), 96000.0);
    assert_eq!(follower.filter().max_cutoff(), params::MAX_FILTER_FREQUENCY);
    assert_eq!(follower.process_sample(0.0), 0.0);

    follower.reset(32000.0);
    assert_eq!(follower.filter().max_cutoff(), 0.49 * 32000.0);
}

// ============================================================================
// PARAMETER CHANGES MID-STREAM
// ============================================================================

#[test]
fn test_parameter_swap_mid_stream_is_continuous() {
    let signal = sine(330.0, 0.8, 9600);
    let mut follower = default_follower();

    let mut output = Vec::with_capacity(signal.len());
    for (n, &x) in signal.iter().enumerate() {
        if n == 4800 {
            follower.set_parameters(EffectParameters {
                fc: 2000.0,
                q: 3.0,
                ..Default::default()
            });
        }
        output.push(follower.process_sample(x));
    }

    // Integrator state is kept, so no jump larger than the signal itself
    let jump = (output[4800] - output[4799]).abs();
    assert!(jump < 0.5, "jump {}", jump);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_follower_output_is_finite(
        fc in params::MIN_FILTER_FREQUENCY..=params::MAX_FILTER_FREQUENCY,
        q in params::Q_MIN..=params::Q_MAX,
        threshold_db in params::DETECTOR_FLOOR_DB..=params::THRESHOLD_MAX_DB,
        sensitivity in params::SENSITIVITY_MIN..=params::SENSITIVITY_MAX,
        algorithm in prop_oneof![
            Just(FilterAlgorithm::Lowpass),
            Just(FilterAlgorithm::Highpass),
            Just(FilterAlgorithm::Bandpass),
        ],
        nlp in any::<bool>(),
        amplitude in 0.0f64..2.0,
    ) {
        let mut follower = AutoQ::with_parameters(
            EffectParameters {
                filter_algorithm: algorithm,
                fc,
                q,
                threshold_db,
                sensitivity,
                enable_nlp: nlp,
                ..Default::default()
            },
            SAMPLE_RATE,
        );

        for x in sine(1234.0, amplitude, 2400) {
            let y = follower.process_sample(x);
            prop_assert!(y.is_finite());
            let cutoff = follower.metering().cutoff;
            prop_assert!(cutoff >= params::MIN_FILTER_FREQUENCY);
            prop_assert!(cutoff <= params::MAX_FILTER_FREQUENCY);
        }
    }
}
