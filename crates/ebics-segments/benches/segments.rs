use ebics_crypto::{encode_upload, generate_session_key};
use ebics_segments::{Joiner, Segmenter};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [65536, 1048576, 10485760])]
fn segment_buffer(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let seg = Segmenter::new(divan::black_box(&data));
            seg.segments().map(|(s, _)| s.length).sum::<usize>()
        });
}

#[divan::bench(args = [65536, 1048576, 10485760])]
fn join_and_decode(bencher: divan::Bencher, size: usize) {
    let key = generate_session_key();
    let data = make_data(size);
    let encoded = encode_upload(data.as_slice(), &key).unwrap();
    let seg = Segmenter::new(&encoded.ciphertext);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let mut joiner = Joiner::expecting(seg.num_segments());
            for (_, bytes) in seg.segments() {
                joiner.append(bytes);
            }
            joiner.finish(&key).unwrap()
        });
}

fn main() {
    divan::main();
}
