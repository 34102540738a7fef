//! Runs the engine without an audio device.
//!
//! A thread stands in for the device callback, pulling one block at the
//! hardware cadence. Prints a crude level meter per tenth of a second.
//!
//! Run with: cargo run --example offline_render

use std::f32::consts::PI;
use std::thread::sleep;
use std::time::{Duration, Instant};

use keiko::nodes::{LowPass, Oscillator};
use keiko::{Delivery, Engine, EngineConfig};
use tracing::Level;

fn main() -> Result<(), keiko::EngineError> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let config = EngineConfig::new(44100).with_block_length(128).with_channels(2);
    let mut engine = Engine::new(config.clone());

    // a C major triad through a low-pass
    let filter = engine.add(LowPass::new(300.0));
    for freq in [220.0, 261.626, 329.628] {
        let osc = engine.add(Oscillator::new(freq).with_gain(0.2));
        engine.connect(osc, filter)?;
    }
    engine.output(filter)?;
    let mut cutoff = engine.controller(filter)?;

    let (running, mut reader) = engine.start()?;

    let block_time = Duration::from_secs_f64(config.block_length as f64 / config.sample_rate as f64);
    let mut block = vec![0.0f32; config.frame_samples()];
    let blocks_per_line = (config.sample_rate as usize / 10) / config.block_length;

    let start = Instant::now();
    let mut peak = 0.0f32;
    for n in 0..blocks_per_line * 30 {
        // fake device cadence
        let due = start + block_time * n as u32;
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            sleep(wait);
        }

        if reader.fill(&mut block) != Delivery::Fresh {
            println!("underrun at block {n}");
        }
        peak = block.iter().fold(peak, |m, s| m.max(s.abs()));

        if n % blocks_per_line == blocks_per_line - 1 {
            println!("{:<40} {:.3}", "#".repeat((peak * 40.0) as usize), peak);
            peak = 0.0;

            // sweep the filter open over the run
            let t = n as f32 / (blocks_per_line * 30) as f32;
            let _ = cutoff.set(LowPass::CUTOFF, 300.0 + 3000.0 * (t * PI * 0.5).sin());
        }
    }

    let (_engine, stats) = running.stop()?;
    println!(
        "{} blocks, {} full retries, {} underruns",
        stats.blocks,
        stats.full_retries,
        reader.underruns()
    );
    Ok(())
}
