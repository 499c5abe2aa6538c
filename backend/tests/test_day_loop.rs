//! Day loop orchestration: the operator barrier and run determinism

use postal_simulator_core_rs::{
    DayRuleset, MailError, Orchestrator, SimulationConfig, SimulationError,
};

#[test]
fn test_barrier_blocks_until_every_operator_signs_off() {
    let mut sim = Orchestrator::new(SimulationConfig::new(12345)).unwrap();
    let rules = DayRuleset::default();

    // Day zero runs immediately.
    let result = sim.run_day(&rules).unwrap();
    assert_eq!(result.day, 0);
    assert_eq!(sim.current_day(), 1);

    // Review phase is open now.
    let player_zips = sim.world().player_zips();
    let err = sim.run_day(&rules).unwrap_err();
    match err {
        SimulationError::OperatorsPending { remaining } => {
            let mut expected = player_zips.clone();
            expected.sort_unstable();
            assert_eq!(remaining, expected);
        }
        other => panic!("expected OperatorsPending, got {:?}", other),
    }

    // Signing off re-arms the loop; doing it twice is harmless.
    for &zip in &player_zips {
        sim.end_day(zip).unwrap();
        sim.end_day(zip).unwrap();
    }
    let result = sim.run_day(&rules).unwrap();
    assert_eq!(result.day, 1);
}

#[test]
fn test_end_day_rejects_unknown_town() {
    let mut sim = Orchestrator::new(SimulationConfig::new(12345)).unwrap();
    assert_eq!(
        sim.end_day(1).unwrap_err(),
        SimulationError::Mail(MailError::UnknownTown { zip: 1 })
    );
}

#[test]
fn test_same_seed_same_run() {
    let rules = DayRuleset::default();
    let mut sim_a = Orchestrator::new(SimulationConfig::new(0xFEED)).unwrap();
    let mut sim_b = Orchestrator::new(SimulationConfig::new(0xFEED)).unwrap();

    for day in 0..5 {
        let ra = sim_a.run_day(&rules).unwrap();
        let rb = sim_b.run_day(&rules).unwrap();

        assert_eq!(ra.day, day);
        assert_eq!(ra.delivered, rb.delivered);
        assert_eq!(ra.generated, rb.generated);
        assert_eq!(ra.leftovers, rb.leftovers);
        assert_eq!(ra.notifications, rb.notifications);
        assert_eq!(ra.failures, rb.failures);
        assert_eq!(sim_a.state().mail_count(), sim_b.state().mail_count());

        for zip in sim_a.world().player_zips() {
            let qa: Vec<_> = sim_a.list_queue(zip).unwrap().iter().map(|s| s.id).collect();
            let qb: Vec<_> = sim_b.list_queue(zip).unwrap().iter().map(|s| s.id).collect();
            assert_eq!(qa, qb);
            sim_a.end_day(zip).unwrap();
            sim_b.end_day(zip).unwrap();
        }
    }
}

#[test]
fn test_different_seeds_produce_different_worlds() {
    let sim_a = Orchestrator::new(SimulationConfig::new(1)).unwrap();
    let sim_b = Orchestrator::new(SimulationConfig::new(2)).unwrap();

    let zips_a: Vec<_> = sim_a.world().towns().iter().map(|t| t.zip()).collect();
    let zips_b: Vec<_> = sim_b.world().towns().iter().map(|t| t.zip()).collect();
    assert_ne!(zips_a, zips_b);
}

#[test]
fn test_mail_population_stays_bounded() {
    // Every admitted item needs review, every leftover re-enters the
    // flow. The total in flight must not grow without bound when the
    // operator keeps signing off.
    let mut sim = Orchestrator::new(SimulationConfig::new(31337)).unwrap();
    let rules = DayRuleset::default();

    for _ in 0..20 {
        sim.run_day(&rules).unwrap();
        for zip in sim.world().player_zips() {
            sim.end_day(zip).unwrap();
        }
    }
    // Generation is quota-driven, so the steady state is modest.
    assert!(sim.state().mail_count() < 200);
}
