use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keiko::nodes::{LowPass, Oscillator, Output};
use keiko::{AudioGraph, Module, ProcessContext, SampleRing};

const CTX: ProcessContext = ProcessContext { sample_rate: 48000, block_length: 128 };

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Oscillator.process()", |b| {
        let mut source = Oscillator::new(480.0);
        source.init(&CTX);
        let mut output = [0.0; 128];

        b.iter(move || source.process(&CTX, &[], black_box(&mut output)))
    });

    c.bench_function("LowPass.process()", |b| {
        let mut filter = LowPass::new(800.0);
        filter.init(&CTX);
        let input = [0.25; 128];
        let mut output = [0.0; 128];

        b.iter(move || filter.process(&CTX, black_box(&input), &mut output))
    });

    c.bench_function("AudioGraph.process() chord -> filter -> sink", |b| {
        let mut g = AudioGraph::new();
        let filter = g.add_node(LowPass::new(300.0));
        let sink = g.add_node(Output::stereo());
        for freq in [220.0, 261.626, 329.628] {
            let osc = g.add_node(Oscillator::new(freq));
            g.connect(osc, filter).unwrap();
        }
        g.connect(filter, sink).unwrap();
        g.init(48000, 128).unwrap();

        b.iter(move || g.process(black_box(128)))
    });

    c.bench_function("SampleRing write+read 256", |b| {
        let (mut tx, mut rx) = SampleRing::new(1025).unwrap();
        let block = [0.5; 256];
        let mut out = [0.0; 256];

        b.iter(move || {
            tx.write(black_box(&block)).unwrap();
            rx.read(&mut out).unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
