//! Simple example: play a sine wave with configurable output device
//!
//! Run with: cargo run --example simple_sine --features cpal_sink
//!
//! Lists available devices and lets you pick one, then plays a 440Hz sine
//! whose frequency drifts slowly.

use std::io::{self, Write};
use std::thread::sleep;
use std::time::{Duration, Instant};

use keiko::nodes::Oscillator;
use keiko::{CpalDevice, Engine};

fn main() {
    tracing_subscriber::fmt::init();

    // List available output devices
    let devices = CpalDevice::list_outputs();

    if devices.is_empty() {
        eprintln!("No audio output devices found!");
        return;
    }

    println!("Available audio output devices:");
    for (i, device) in devices.iter().enumerate() {
        println!(
            "  [{}] {} ({}Hz, {} ch)",
            i,
            device.name(),
            device.sample_rate(),
            device.channels()
        );
    }

    // Let user pick a device (or default to 0)
    print!("\nSelect device [0]: ");
    io::stdout().flush().unwrap();

    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    let choice: usize = input.trim().parse().unwrap_or(0);

    let device = devices.into_iter().nth(choice).unwrap_or_else(|| {
        println!("Invalid choice, using default device");
        CpalDevice::default_output().expect("No default device")
    });

    println!("\nUsing: {} @ {}Hz", device.name(), device.sample_rate());

    let mut engine = Engine::for_device(&device);
    let osc = engine.add(Oscillator::new(440.0).with_gain(0.2));
    engine.output(osc).unwrap();
    let mut control = engine.controller(osc).unwrap();

    let playback = engine.play(&device).expect("failed to start playback");
    println!("Playing 440Hz sine wave for 10 seconds...");

    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        // Modulate frequency slowly
        let t = start.elapsed().as_secs_f32();
        let freq = 440.0 + 220.0 * (t * 0.5 * std::f32::consts::PI).sin();
        let _ = control.set(Oscillator::FREQUENCY, freq);
        sleep(Duration::from_millis(20));
    }

    let (_engine, stats) = playback.stop().expect("transport failed");
    println!("Done: {} blocks rendered", stats.blocks);
}
