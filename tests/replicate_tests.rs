use catsim::combat::{FighterConfig, Simulation};
use catsim::optimizer::{
    compute_stat_weights, run_replicates, run_replicates_parallel, simulate, StatWeightOutcome,
    StatWeightRequest, WeightedStat, MIN_REPLICATES_FOR_WEIGHTS,
};
use catsim::parallel::{run_replicates_with_progress, WorkerPool};

fn approx_eq(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "expected {b}, got {a}");
}

fn short_fight() -> Simulation {
    Simulation::builder(FighterConfig::default())
        .fight_length(5.0)
        .build()
        .unwrap()
}

#[test]
fn same_seed_gives_identical_runs_regardless_of_threads() {
    let sim = Simulation::builder(FighterConfig::default())
        .fight_length(60.0)
        .build()
        .unwrap();
    let sequential = run_replicates(&sim, 64, 99);
    let parallel = run_replicates_parallel(&sim, 64, 99);
    assert_eq!(sequential, parallel);

    let pool = WorkerPool::with_workers(3);
    let batched = run_replicates_with_progress(&sim, 64, 99, 5, &pool, |_, _| {});
    assert_eq!(batched, sequential);
}

#[test]
fn different_seeds_give_different_runs() {
    let sim = short_fight();
    assert_ne!(run_replicates(&sim, 8, 1), run_replicates(&sim, 8, 2));
}

#[test]
fn summary_is_reproducible() {
    let sim = short_fight();
    assert_eq!(simulate(&sim, 200, 4), simulate(&sim, 200, 4));
}

#[test]
fn weights_need_the_minimum_replicate_count() {
    let mut sim = short_fight();
    let outcome = compute_stat_weights(&mut sim, StatWeightRequest::new(MIN_REPLICATES_FOR_WEIGHTS - 1, 7));
    assert_eq!(
        outcome,
        StatWeightOutcome::NotComputed {
            requested: MIN_REPLICATES_FOR_WEIGHTS - 1,
            required: MIN_REPLICATES_FOR_WEIGHTS,
        }
    );
}

#[test]
fn weights_are_computed_at_the_minimum_and_restore_the_fighter() {
    let mut sim = short_fight();
    let before = sim.clone();
    let request = StatWeightRequest::new(MIN_REPLICATES_FOR_WEIGHTS, 7).with_mana_stats(true);

    let StatWeightOutcome::Computed(table) = compute_stat_weights(&mut sim, request) else {
        panic!("expected a computed weight table");
    };
    assert_eq!(sim, before);
    assert_eq!(table.replicates, MIN_REPLICATES_FOR_WEIGHTS);
    assert_eq!(
        table.weights.len(),
        WeightedStat::DAMAGE.len() + WeightedStat::MANA.len()
    );

    let ap = table.get(WeightedStat::AttackPower).unwrap();
    assert!(ap.dps_delta > 0.0);
    approx_eq(ap.weight, 1.0, 1e-9);

    // A five second fight never runs dry, so mana is worth nothing.
    for stat in WeightedStat::MANA {
        approx_eq(table.get(stat).unwrap().dps_delta, 0.0, 0.0);
    }
}
