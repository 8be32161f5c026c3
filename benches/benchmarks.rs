use bitforge::{
    pack_bits, BitGenerator, BlumBlumShub, PrimeGenerator, QuadraticGenerator, RandomnessBattery,
    SeededEntropy, Yarrow160,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn bench_quadratic(c: &mut Criterion) {
    let mut generator = QuadraticGenerator::new(42);

    c.bench_function("QuadraticGenerator::generate (10000 bits)", |b| {
        b.iter(|| generator.generate(black_box(10_000)))
    });
}

fn bench_prime_search(c: &mut Criterion) {
    let primes = PrimeGenerator::default();
    let mut rng = ChaCha20Rng::seed_from_u64(7);

    c.bench_function("PrimeGenerator::generate (256 bits)", |b| {
        b.iter(|| primes.generate(black_box(256), &mut rng))
    });
}

fn bench_bbs(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let mut bbs = BlumBlumShub::new(160, &PrimeGenerator::default(), &mut rng).unwrap();

    c.bench_function("BlumBlumShub::generate (1024 bits, 160-bit factors)", |b| {
        b.iter(|| bbs.generate(black_box(1024)))
    });
}

fn bench_yarrow(c: &mut Criterion) {
    let yarrow = Yarrow160::default();

    c.bench_function("Yarrow160::generate (10000 bits)", |b| {
        b.iter_with_setup(
            || yarrow.new_state(SeededEntropy::new(b"bench")).unwrap(),
            |mut state| yarrow.generate(black_box(10_000), &mut state),
        )
    });
}

fn bench_battery(c: &mut Criterion) {
    let battery = RandomnessBattery::default();
    let bits = QuadraticGenerator::new(42).generate(10_000).unwrap();

    c.bench_function("RandomnessBattery::run_all (10000 bits)", |b| {
        b.iter(|| battery.run_all(black_box(&bits)))
    });
}

fn bench_pack_bits(c: &mut Criterion) {
    let bits: Vec<u8> = (0..80_000).map(|i| ((i * 37) % 5 % 2) as u8).collect();

    c.bench_function("pack_bits (10000 bytes)", |b| {
        b.iter(|| pack_bits(black_box(&bits)))
    });
}

criterion_group!(
    benches,
    bench_quadratic,
    bench_prime_search,
    bench_bbs,
    bench_yarrow,
    bench_battery,
    bench_pack_bits,
);
criterion_main!(benches);
