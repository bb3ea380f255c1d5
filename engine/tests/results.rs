use engine::config::{LeachMode, RunOptions, Scenario, SolverDefaults, StageDescriptor, StageTarget};
use engine::grid::Grid;
use engine::results::Results;
use engine::sequencer::Simulation;

fn scenario() -> Scenario {
    let grid = Grid::uniform(3000.0, 4050.0, 101, |_| 100.0).unwrap();
    let stage = StageDescriptor {
        mode: LeachMode::Ordinary,
        injection_depth_ft: 4000.0,
        production_depth_ft: 3100.0,
        injection_rate_bbl_d: 50_000.0,
        injection_sg: 1.0,
        target: StageTarget::Days(1.0),
        dt_days: 0.01,
        save_interval_days: 0.25,
        ..Default::default()
    };
    Scenario { grid, stages: vec![stage], defaults: SolverDefaults::default() }
}

fn run(retain_grids: bool) -> Results {
    let sim = Simulation::new(scenario()).unwrap();
    sim.run(&RunOptions { prefix: "results".to_string(), retain_grids, cancel: None })
}

#[test]
fn scalar_series_share_the_snapshot_length() {
    let r = run(true);
    let n = r.snapshots();
    assert!(n >= 2);
    for name in
        ["time", "cavern_volume", "injected", "produced", "vented", "insoluble_volume", "obi", "insoluble_top", "convergence_error"]
    {
        assert_eq!(r.series(name).unwrap().len(), n, "series {name} length");
    }
    assert_eq!(r.iterations.len(), n);
    assert_eq!(r.degraded.len(), n);
}

#[test]
fn snapshots_are_time_ordered_and_append_only() {
    let r = run(true);
    for w in r.times_d.windows(2) {
        assert!(w[1] > w[0], "snapshots out of order");
    }
    assert_eq!(r.times_d[0], 0.0, "missing the initial snapshot");
    assert_eq!(r.step_indices[0], 0);
}

#[test]
fn grids_index_by_cell_and_saved_step() {
    let r = run(true);
    let cells = 101;
    for name in ["radius", "sg", "plume_radius", "eff_diffusion"] {
        let g = r.grid(name).unwrap();
        assert_eq!(g.len(), r.snapshots(), "grid {name} rows");
        for row in g {
            assert_eq!(row.len(), cells, "grid {name} row width");
        }
    }
    let direct = r.radius_ft[1][40];
    assert_eq!(r.grid_value("radius", 40, 1), Some(direct));
    assert_eq!(r.grid_value("radius", 40, 9999), None);
}

#[test]
fn summary_only_mode_drops_the_grids() {
    let r = run(false);
    assert!(r.snapshots() >= 2);
    assert!(r.grid("radius").unwrap().is_empty());
    assert!(r.grid("sg").unwrap().is_empty());
    // Scalar series are unaffected.
    assert_eq!(r.series("cavern_volume").unwrap().len(), r.snapshots());
}

#[test]
fn results_serialize_for_external_writers() {
    let r = run(true);
    let json = serde_json::to_string(&r).unwrap();
    assert!(json.contains("\"prefix\":\"results\""));
    assert!(json.contains("cavern_volume_bbl"));
}

#[test]
fn prefix_is_echoed() {
    let r = run(false);
    assert_eq!(r.prefix, "results");
}

#[test]
fn time_keyed_lookup_finds_the_last_snapshot_at_or_before() {
    let r = run(false);
    assert_eq!(r.index_at_time(-0.1), None);
    assert_eq!(r.index_at_time(0.0), Some(0));
    assert_eq!(r.index_at_time(0.3), Some(1));
    let t_last = *r.times_d.last().unwrap();
    assert_eq!(r.index_at_time(t_last + 1.0), Some(r.snapshots() - 1));
}
