use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gifwerk::{ColorTable, GifDecoder, GifEncoder, Image, Rgb, Screen};
use rand::{prelude::StdRng, Rng, SeedableRng};

const WIDTH: u16 = 512;
const HEIGHT: u16 = 512;

fn screen() -> Screen {
    let entries = (0..128)
        .map(|i| Rgb::new(i as u8, (i * 2) as u8, (255 - i) as u8))
        .collect();
    Screen {
        width: WIDTH,
        height: HEIGHT,
        global_color_table: Some(ColorTable::new(entries).expect("Couldn't build palette")),
        ..Screen::default()
    }
}

fn bench_flat(c: &mut Criterion) {
    let data = vec![3u8; usize::from(WIDTH) * usize::from(HEIGHT)];

    bench(c, "Flat data", data);
}

fn bench_gradient(c: &mut Criterion) {
    let data = (0..usize::from(WIDTH) * usize::from(HEIGHT))
        .map(|n| ((n / 64) % 128) as u8)
        .collect();

    bench(c, "Gradient data", data);
}

fn bench_random(c: &mut Criterion) {
    let mut rand = StdRng::seed_from_u64(42);
    let data = (0..usize::from(WIDTH) * usize::from(HEIGHT))
        .map(|_| rand.gen_range(0..128))
        .collect();

    bench(c, "Random data", data);
}

fn bench(c: &mut Criterion, name: &str, data: Vec<u8>) {
    encoding(c, name, &data);
    decoding(c, name, &data);
}

fn encoding(c: &mut Criterion, name: &str, data: &[u8]) {
    let mut group = c.benchmark_group("Throughput");

    let id = BenchmarkId::new(name, "Encode");
    group.throughput(criterion::Throughput::Bytes(data.len() as u64));
    group.bench_with_input(id, data, |b, data| {
        b.iter(|| {
            let mut encoder = GifEncoder::new(Vec::new(), screen());
            encoder.begin().expect("Error");
            encoder
                .write_image(&Image {
                    data: black_box(data).to_vec(),
                    ..Image::default()
                })
                .expect("Error");
            encoder.end().expect("Error");
            encoder.into_inner()
        })
    });
    group.finish();
}

fn decoding(c: &mut Criterion, name: &str, data: &[u8]) {
    let mut group = c.benchmark_group("Throughput");

    let mut encoder = GifEncoder::new(Vec::new(), screen());
    encoder.begin().expect("Error");
    encoder
        .write_image(&Image {
            data: data.to_vec(),
            ..Image::default()
        })
        .expect("Error");
    encoder.end().expect("Error");
    let encoded = encoder.into_inner();

    let id = BenchmarkId::new(name, "Decode");
    group.throughput(criterion::Throughput::Bytes(encoded.len() as u64));
    group.bench_with_input(id, encoded.as_slice(), |b, encoded| {
        b.iter(|| GifDecoder::new(black_box(encoded)).read_to_end().expect("Error"))
    });
    group.finish();
}

criterion_group!(benches, bench_flat, bench_gradient, bench_random);

criterion_main!(benches);
