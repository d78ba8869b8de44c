//! Tests for the bare -> dressed -> lookup pipeline
//!
//! These tests verify that:
//! - A run fills the reserved results with the parameter dimensions
//! - Axes that do not affect a subsystem are solved once and broadcast
//! - Grid points are visited in row-major order
//! - Reordered axes reorder result dimensions and update-function arguments
//! - A failing bare point stops the run before any dressed solve

use std::sync::{Arc, Mutex};

use super::common::{MockSystem, approx_eq, flux_freq_parameters, flux_freq_update};
use crate::dispatch::NotificationChannel;
use crate::error::SweepError;
use crate::parameters::{AxisOrder, Parameters};
use crate::sweep::{BARE_ESYS, DRESSED_ESYS, DRESSED_INDICES, ParameterSweep, SweepBase, SweepConfig};
use crate::system::UpdateFn;

fn default_sweep(config: SweepConfig) -> (ParameterSweep<MockSystem>, Arc<NotificationChannel>) {
    let channel = Arc::new(NotificationChannel::new());
    let system = MockSystem::new(Arc::clone(&channel));
    let sweep = ParameterSweep::new(
        system,
        flux_freq_parameters(),
        flux_freq_update(),
        config,
        Arc::clone(&channel),
    )
    .unwrap();
    (sweep, channel)
}

#[test]
fn test_run_fills_reserved_results() {
    let (sweep, _channel) = default_sweep(SweepConfig::default());
    let data = sweep.data();

    assert_eq!(
        data.names().collect::<Vec<_>>(),
        vec![BARE_ESYS, DRESSED_INDICES, DRESSED_ESYS]
    );

    let bare = data.bare_esys().unwrap();
    assert_eq!(bare.dim_names(), vec!["subsys", "flux", "freq"]);
    assert_eq!(bare.shape(), &[2, 3, 2]);
    assert_eq!(bare.labels("flux"), Some(&[0.0, 0.5, 1.0][..]));

    let dressed = data.dressed_esys().unwrap();
    assert_eq!(dressed.dim_names(), vec!["flux", "freq"]);
    assert_eq!(data.dressed_indices().unwrap().shape(), &[3, 2]);

    // Qubit at flux 0.5, resonator at freq 3.0
    assert_eq!(
        bare.get(&[0, 1, 0]).unwrap().eigenvalues,
        vec![0.0, 1.5, 3.0]
    );
    assert_eq!(bare.get(&[1, 2, 1]).unwrap().eigenvalues, vec![0.0, 3.0]);
    assert_eq!(
        dressed.get(&[1, 1]).unwrap().eigenvalues,
        vec![0.0, 1.5, 3.0, 3.0, 4.5, 6.0]
    );
}

#[test]
fn test_evals_count_truncates_dressed_spectrum() {
    let (sweep, _channel) = default_sweep(SweepConfig::new().evals_count(4));
    assert_eq!(sweep.evals_count(), 4);
    let dressed = sweep.data().dressed_esys().unwrap();
    for (_, esys) in dressed.iter() {
        assert_eq!(esys.len(), 4);
    }
    // Bare spectra always keep the full truncated dimension
    let bare = sweep.data().bare_esys().unwrap();
    assert_eq!(bare.get(&[0, 0, 0]).unwrap().len(), 3);
}

#[test]
fn test_without_update_map_every_point_is_solved() {
    let (sweep, _channel) = default_sweep(SweepConfig::default());
    let system = sweep.hilbertspace();
    assert_eq!(system.bare_solve_count(), 2 * 6);
    assert_eq!(system.dressed_solve_count(), 6);
}

#[test]
fn test_update_map_skips_and_replicates() {
    let config = SweepConfig::new()
        .subsys_update("flux", vec![0])
        .subsys_update("freq", vec![1]);
    let (reduced, _channel) = default_sweep(config);

    // Qubit solved once per flux value, resonator once per freq value
    assert_eq!(reduced.hilbertspace().bare_solve_count(), 3 + 2);
    assert_eq!(reduced.hilbertspace().dressed_solve_count(), 6);

    let bare = reduced.data().bare_esys().unwrap();
    for i in 0..3 {
        assert_eq!(bare.get(&[0, i, 0]), bare.get(&[0, i, 1]));
    }
    for j in 0..2 {
        assert_eq!(bare.get(&[1, 0, j]), bare.get(&[1, 1, j]));
        assert_eq!(bare.get(&[1, 0, j]), bare.get(&[1, 2, j]));
    }
    assert_eq!(bare.labels("freq"), Some(&[2.0, 3.0][..]));

    // The mock qubit ignores freq and the resonator ignores flux, so skipping
    // must not change any value
    let (full, _channel) = default_sweep(SweepConfig::default());
    assert_eq!(reduced.data(), full.data());
}

#[test]
fn test_reordered_axes_drive_result_layout() {
    let channel = Arc::new(NotificationChannel::new());
    let system = MockSystem::new(Arc::clone(&channel));
    let mut parameters = flux_freq_parameters();
    parameters
        .reorder(AxisOrder::Names(vec!["freq".to_string(), "flux".to_string()]))
        .unwrap();
    let update: UpdateFn<MockSystem> = Arc::new(|system: &mut MockSystem, point: &[f64]| {
        system.set_freq(point[0]);
        system.set_flux(point[1]);
        Ok(())
    });
    let config = SweepConfig::new()
        .subsys_update("flux", vec![0])
        .subsys_update("freq", vec![1]);
    let sweep = ParameterSweep::new(system, parameters, update, config, channel).unwrap();
    assert_eq!(sweep.hilbertspace().bare_solve_count(), 3 + 2);

    let bare = sweep.data().bare_esys().unwrap();
    assert_eq!(bare.dim_names(), vec!["subsys", "freq", "flux"]);
    assert_eq!(bare.shape(), &[2, 2, 3]);
    assert_eq!(bare.labels("freq"), Some(&[2.0, 3.0][..]));
    // Qubit at flux 0.5, broadcast along freq
    for f in 0..2 {
        assert_eq!(bare.get(&[0, f, 1]).unwrap().eigenvalues, vec![0.0, 1.5, 3.0]);
    }
    // Resonator at freq 3.0, broadcast along flux
    for k in 0..3 {
        assert_eq!(bare.get(&[1, 1, k]).unwrap().eigenvalues, vec![0.0, 3.0]);
    }

    let dressed = sweep.data().dressed_esys().unwrap();
    assert_eq!(dressed.dim_names(), vec!["freq", "flux"]);
    assert_eq!(dressed.shape(), &[2, 3]);
    let evals = &dressed.get(&[1, 1]).unwrap().eigenvalues;
    assert_eq!(evals.len(), 6);
    for (&found, expected) in evals.iter().zip([0.0, 1.5, 3.0, 3.0, 4.5, 6.0]) {
        assert!(approx_eq(found, expected));
    }
    assert_eq!(sweep.data().dressed_indices().unwrap().shape(), &[2, 3]);
}

#[test]
fn test_axis_affecting_no_subsystem_is_collapsed_everywhere() {
    let channel = Arc::new(NotificationChannel::new());
    let system = MockSystem::new(Arc::clone(&channel));
    let parameters = Parameters::new([
        ("flux", vec![0.0, 0.5, 1.0]),
        ("freq", vec![2.0, 3.0]),
        ("g", vec![0.1, 0.2, 0.3, 0.4]),
    ]);
    let update: UpdateFn<MockSystem> = Arc::new(|system: &mut MockSystem, point: &[f64]| {
        system.set_flux(point[0]);
        system.set_freq(point[1]);
        Ok(())
    });
    let config = SweepConfig::new()
        .subsys_update("flux", vec![0])
        .subsys_update("freq", vec![1])
        .subsys_update("g", vec![]);
    let sweep = ParameterSweep::new(system, parameters, update, config, channel).unwrap();

    assert_eq!(sweep.hilbertspace().bare_solve_count(), 3 + 2);
    assert_eq!(sweep.hilbertspace().dressed_solve_count(), 24);

    let bare = sweep.data().bare_esys().unwrap();
    assert_eq!(bare.shape(), &[2, 3, 2, 4]);
    assert_eq!(bare.labels("g"), Some(&[0.1, 0.2, 0.3, 0.4][..]));
    let reference = bare.get(&[0, 2, 1, 0]).unwrap();
    for k in 1..4 {
        assert_eq!(bare.get(&[0, 2, 1, k]), Some(reference));
    }
}

#[test]
fn test_update_map_is_validated() {
    let channel = Arc::new(NotificationChannel::new());
    let unknown_axis = ParameterSweep::new(
        MockSystem::new(Arc::clone(&channel)),
        flux_freq_parameters(),
        flux_freq_update(),
        SweepConfig::new().subsys_update("phase", vec![0]),
        Arc::clone(&channel),
    );
    assert_eq!(
        unknown_axis.err(),
        Some(SweepError::UnknownAxis("phase".to_string()))
    );

    let bad_subsystem = ParameterSweep::new(
        MockSystem::new(Arc::clone(&channel)),
        flux_freq_parameters(),
        flux_freq_update(),
        SweepConfig::new().subsys_update("flux", vec![2]),
        channel,
    );
    assert!(matches!(bad_subsystem, Err(SweepError::Config(_))));
}

#[test]
fn test_points_are_visited_row_major() {
    let visited: Arc<Mutex<Vec<Vec<f64>>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&visited);
    let update: UpdateFn<MockSystem> = Arc::new(move |system: &mut MockSystem, point: &[f64]| {
        log.lock().unwrap().push(point.to_vec());
        system.set_flux(point[0]);
        system.set_freq(point[1]);
        Ok(())
    });

    let channel = Arc::new(NotificationChannel::new());
    let system = MockSystem::new(Arc::clone(&channel));
    let _sweep = ParameterSweep::new(
        system,
        flux_freq_parameters(),
        update,
        SweepConfig::default(),
        channel,
    )
    .unwrap();

    let visited = visited.lock().unwrap();
    // One dispatch point, two bare grids, one dressed grid
    assert_eq!(visited.len(), 1 + 6 + 6 + 6);
    assert_eq!(visited[0], vec![0.0, 2.0]);
    let expected = vec![
        vec![0.0, 2.0],
        vec![0.0, 3.0],
        vec![0.5, 2.0],
        vec![0.5, 3.0],
        vec![1.0, 2.0],
        vec![1.0, 3.0],
    ];
    assert_eq!(&visited[13..], &expected[..]);
}

#[test]
fn test_failing_bare_point_blocks_dressed_phase() {
    let channel = Arc::new(NotificationChannel::new());
    let mut system = MockSystem::new(Arc::clone(&channel));
    system.fail_flux = Some(1.0);

    let mut sweep = ParameterSweep::new(
        system,
        flux_freq_parameters(),
        flux_freq_update(),
        SweepConfig::new().autorun(false),
        Arc::clone(&channel),
    )
    .unwrap();

    let result = sweep.run();
    assert!(matches!(
        result,
        Err(SweepError::Eigensolve {
            subsystem: Some(0),
            ..
        })
    ));
    assert!(sweep.hilbertspace().bare_solve_count() > 0);
    assert_eq!(sweep.hilbertspace().dressed_solve_count(), 0);
    assert!(sweep.data().is_empty());
    assert!(channel.is_enabled());
}

#[test]
fn test_failed_rerun_keeps_previous_results() {
    let (mut sweep, channel) = default_sweep(SweepConfig::default());
    let before = sweep.data().clone();

    sweep.hilbertspace_mut().fail_flux = Some(0.5);
    assert!(sweep.run().is_err());
    assert_eq!(sweep.data(), &before);
    assert!(channel.is_enabled());
}

#[test]
fn test_zero_axes_is_a_single_point() {
    let channel = Arc::new(NotificationChannel::new());
    let system = MockSystem::new(Arc::clone(&channel));
    let update: UpdateFn<MockSystem> = Arc::new(|_: &mut MockSystem, _: &[f64]| Ok(()));
    let parameters = Parameters::new(Vec::<(&str, Vec<f64>)>::new());
    let sweep =
        ParameterSweep::new(system, parameters, update, SweepConfig::default(), channel).unwrap();

    let bare = sweep.data().bare_esys().unwrap();
    assert_eq!(bare.shape(), &[2]);
    let dressed = sweep.data().dressed_esys().unwrap();
    assert_eq!(dressed.ndim(), 0);
    let ground = &dressed.get(&[]).unwrap().eigenvalues;
    // Default mock: qubit spacing 1.0, resonator spacing 1.0
    assert!(approx_eq(ground[0], 0.0));
    assert!(approx_eq(ground[1], 1.0));
    assert_eq!(sweep.hilbertspace().dressed_solve_count(), 1);
}

#[test]
fn test_empty_axis_produces_empty_results() {
    let channel = Arc::new(NotificationChannel::new());
    let system = MockSystem::new(Arc::clone(&channel));
    let parameters = Parameters::new([("flux", vec![]), ("freq", vec![2.0, 3.0])]);
    let sweep = ParameterSweep::new(
        system,
        parameters,
        flux_freq_update(),
        SweepConfig::default(),
        channel,
    )
    .unwrap();

    assert_eq!(sweep.data().bare_esys().unwrap().shape(), &[2, 0, 2]);
    assert!(sweep.data().dressed_esys().unwrap().is_empty());
    assert_eq!(sweep.hilbertspace().bare_solve_count(), 0);
    assert_eq!(sweep.hilbertspace().updates.load(std::sync::atomic::Ordering::SeqCst), 0);
}
