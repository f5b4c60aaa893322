use std::sync::Arc;

use channel_map::standard_channel_map;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use digitizer::{CaloSignal, Digitizer, DigitizerConfig, EventSignals, GeigerSignal};
use tracker_trigger::{HitMatrix, MatrixPool, TickFrame, TrackerMemories, ZoneOutput, ZONES_PER_SIDE};
use trigger_decision::{CaloTriggerConfig, CoincidenceConfig, TriggerEngine};
use trigger_model::Gid;

fn bench_channel_map_roundtrip(c: &mut Criterion) {
    let map = standard_channel_map().unwrap();
    let cells: Vec<Gid> = (0..113u8)
        .flat_map(|row| (0..9u8).map(move |layer| Gid::TrackerCell { side: row % 2, layer, row }))
        .collect();

    c.bench_function("tracker_gid_roundtrip", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for gid in &cells {
                let eid = black_box(map.resolve_gid(gid).unwrap());
                acc += (black_box(map.resolve_eid(&eid).unwrap()) == *gid) as usize;
            }
            acc
        })
    });
}

fn track_cells() -> Vec<Gid> {
    // one straight track per side, plus a short stub near the source foil
    let mut cells: Vec<Gid> = (0..9u8).map(|layer| Gid::TrackerCell { side: 0, layer, row: 40 }).collect();
    cells.extend((0..9u8).map(|layer| Gid::TrackerCell { side: 1, layer, row: 90 + layer / 3 }));
    cells.extend((0..3u8).map(|layer| Gid::TrackerCell { side: 1, layer, row: 10 }));
    cells
}

fn bench_zone_compute(c: &mut Criterion) {
    let memories = TrackerMemories::defaults().unwrap();
    let mut matrix = HitMatrix::new();
    for gid in track_cells() {
        matrix.set_cell(&gid).unwrap();
    }

    c.bench_function("zones_all_sides", |b| {
        b.iter(|| {
            let mut active = 0;
            for side in 0..2 {
                for zone in 0..ZONES_PER_SIDE {
                    active += ZoneOutput::compute(black_box(&matrix), side, zone, &memories).unwrap().is_active() as u32;
                }
            }
            active
        })
    });

    let mut pool = MatrixPool::new(4);
    let cells = track_cells();
    c.bench_function("tick_frame_lifecycle", |b| {
        b.iter(|| {
            let mut frame = TickFrame::new(7, pool.acquire());
            frame.fill(black_box(&cells)).unwrap();
            frame.compute_zones(&memories).unwrap();
            let record = frame.consume().unwrap();
            frame.recycle(&mut pool).unwrap();
            record
        })
    });
}

fn bench_full_event(c: &mut Criterion) {
    let map = Arc::new(standard_channel_map().unwrap());
    let memories = Arc::new(TrackerMemories::defaults().unwrap());
    let digitizer = Digitizer::new(map.clone(), DigitizerConfig::default()).unwrap();
    let engine =
        TriggerEngine::new(map, memories, CaloTriggerConfig::default(), CoincidenceConfig::default()).unwrap();

    let mut event = EventSignals::new(42);
    for (i, column) in [3u8, 4, 15].into_iter().enumerate() {
        event.calo_signals.push(CaloSignal {
            gid: Gid::MainCalo { side: (i % 2) as u8, column, row: 6 },
            time_ns: 1_000.0 + 10.0 * i as f64,
            amplitude: 0.8,
            external_trigger: false,
        });
    }
    for gid in track_cells() {
        event.tracker_signals.push(GeigerSignal { gid, time_ns: 2_500.0 });
    }

    c.bench_function("digitize_event", |b| b.iter(|| digitizer.digitize(black_box(&event)).unwrap()));

    let digitized = digitizer.digitize(&event).unwrap();
    c.bench_function("evaluate_event", |b| {
        b.iter_batched(
            || MatrixPool::new(2),
            |mut pool| engine.evaluate(&digitized.calo_ctws, &digitized.geiger_ctws, &mut pool).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_channel_map_roundtrip, bench_zone_compute, bench_full_event);
criterion_main!(benches);
