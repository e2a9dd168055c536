// src/main.rs

use std::f32::consts::TAU;

use beatcut::{CutEvent, CutterConfig, Engine, EventRecorder, HostTime, StrategyKind};

/// ===============================
/// Main
/// ===============================

fn main() {
    let sample_rate = 44_100.0;
    let block_frames = 256;
    let bars = 4;

    let mut time = HostTime {
        bpm: 126.0,
        sample_rate,
        ..HostTime::default()
    };
    let total_frames =
        (bars as f64 * time.numerator * 4.0 / time.denominator / time.quarters_per_sample()) as usize;

    println!("Starting cutter sanity test…");

    for kind in StrategyKind::ALL {
        println!("--- {} ---", kind.name());

        // --------------------------------
        // Engine
        // --------------------------------

        let config = CutterConfig {
            strategy: kind,
            fade_ms: 1.0,
            min_detune: -300.0,
            max_detune: 300.0,
            ..CutterConfig::default()
        };

        let mut engine = match Engine::new(&config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Invalid configuration: {}", e);
                return;
            }
        };

        let (recorder, log) = EventRecorder::new(1 << 16);
        engine.register_listener(Box::new(recorder));

        // --------------------------------
        // Render a test tone
        // --------------------------------

        let mut in_l = vec![0.0; block_frames];
        let mut in_r = vec![0.0; block_frames];
        let mut out_l = vec![0.0; block_frames];
        let mut out_r = vec![0.0; block_frames];

        let mut phase = 0.0f32;
        let step = 220.0 * TAU / sample_rate as f32;
        let mut peak = 0.0f32;
        let mut energy = 0.0f64;

        let mut frame = 0;
        time.ppq_position = 0.0;
        while frame < total_frames {
            let n = block_frames.min(total_frames - frame);

            for (l, r) in in_l[..n].iter_mut().zip(in_r[..n].iter_mut()) {
                *l = phase.sin() * 0.5;
                *r = *l;
                phase = (phase + step) % TAU;
            }

            if let Err(e) = engine.process(&time, &in_l[..n], &in_r[..n], &mut out_l[..n], &mut out_r[..n]) {
                eprintln!("Processing failed: {}", e);
                return;
            }

            for &s in out_l[..n].iter().chain(out_r[..n].iter()) {
                peak = peak.max(s.abs());
                energy += (s as f64) * (s as f64);
            }

            time = time.advanced(n);
            frame += n;
        }

        let events = log.snapshot();
        let count = |f: fn(&CutEvent) -> bool| events.iter().filter(|e| f(e)).count();

        println!(
            "Rendered {} frames: {} phrases, {} blocks, {} units, {} cuts",
            total_frames,
            count(CutEvent::is_phrase),
            count(CutEvent::is_block),
            count(CutEvent::is_unit),
            count(CutEvent::is_cut),
        );
        println!(
            "Output peak {:.3}, rms {:.3}",
            peak,
            (energy / (2 * total_frames) as f64).sqrt()
        );
    }

    println!("Sanity test completed.");
}
