use criterion::{black_box, criterion_group, criterion_main, Criterion};
use delay_core::{
    CategoricalEncoders, DelayPredictor, Model, Node, PredictorMetadata, Tree, TripQuery,
    FEATURE_COUNT, SCALE,
};

fn sample_predictor() -> DelayPredictor {
    let encoders = CategoricalEncoders::fit([("16031", "MAS", "AJJ"), ("12622", "AJJ", "MAS")]);

    // A few hundred shallow trees, roughly the size of an early-stopped model.
    let trees = (0..300)
        .map(|i| {
            Tree::new(
                vec![
                    Node::split(0, (i % FEATURE_COUNT) as i32, 3, 1, 2),
                    Node::leaf(1, -SCALE),
                    Node::leaf(2, 2 * SCALE),
                ],
                SCALE / 100,
            )
        })
        .collect();

    DelayPredictor::new(
        Model::new(trees, 12 * SCALE, FEATURE_COUNT),
        encoders,
        PredictorMetadata::default(),
    )
}

fn bench_single_trip(c: &mut Criterion) {
    let predictor = sample_predictor();
    let query = TripQuery {
        date: "2024-03-15".to_string(),
        train_number: "16031".to_string(),
        from_station: "MAS".to_string(),
        to_station: "AJJ".to_string(),
        scheduled_departure: "22:15".to_string(),
        scheduled_arrival: "01:40".to_string(),
        weather_condition: 1,
    };

    c.bench_function("predict_single_trip", |b| {
        b.iter(|| {
            let minutes = predictor.predict(black_box(&query));
            black_box(minutes.ok());
        });
    });
}

criterion_group!(predict_benches, bench_single_trip);
criterion_main!(predict_benches);
