use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dance_live::competition::{
    Bracket, BracketStatus, GenderGroup, HeatPlanner, Participant, Phase,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Helper to create a bracket with the given layout
fn bracket(participants: u32, blocks: u32, tracks: u32) -> Bracket {
    let now = Utc::now();
    Bracket {
        id: "Salsa_Adult_Mixed".to_string(),
        event_id: "bench".to_string(),
        modality: "Salsa".to_string(),
        category: "Adult".to_string(),
        gender_group: GenderGroup::Mixed,
        current_phase: Phase::Eliminatoria,
        total_participants: participants,
        blocks_per_heat: blocks,
        tracks_per_block: tracks,
        total_heats: Bracket::total_heats_for(participants, blocks, tracks),
        completed_heats: 0,
        current_heat_index: 0,
        status: BracketStatus::Active,
        created_at: now,
        updated_at: now,
        real_start_time: None,
        real_end_time: None,
    }
}

fn participants(n: usize) -> Vec<Participant> {
    (0..n)
        .map(|i| Participant {
            id: format!("p{}", i),
            competitors: vec![format!("u{}", i), format!("v{}", i)],
            category: "Adult".to_string(),
            modality: "Salsa".to_string(),
            event_id: "bench".to_string(),
            phase: None,
            status: "confirmed".to_string(),
        })
        .collect()
}

/// Benchmark planning heats for growing brackets
fn bench_plan_by_size(c: &mut Criterion) {
    let judges: Vec<String> = (0..5).map(|i| format!("judge{}", i)).collect();
    let mut group = c.benchmark_group("plan_heats");

    for size in [10usize, 100, 1000] {
        let b = bracket(size as u32, 3, 4);
        let input = participants(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            let mut planner = HeatPlanner::with_rng(StdRng::seed_from_u64(1));
            bench.iter(|| planner.plan(&b, &input, &judges));
        });
    }

    group.finish();
}

/// Benchmark the smallest layout (one competitor per heat)
fn bench_plan_solo_heats(c: &mut Criterion) {
    let b = bracket(200, 1, 1);
    let input = participants(200);

    c.bench_function("plan_heats_solo_200", |bench| {
        let mut planner = HeatPlanner::with_rng(StdRng::seed_from_u64(2));
        bench.iter(|| planner.plan(&b, &input, &[]));
    });
}

criterion_group!(heat_planning, bench_plan_by_size, bench_plan_solo_heats);
criterion_main!(heat_planning);
