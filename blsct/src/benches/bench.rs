use criterion::criterion_main;


criterion_main!(
    create_output::benches,
    range_proof::benches,
    verify_tx::benches
);
