//! Full runs on a paused tokio clock.

use doorlock_core::{ControlState, Flow, HmiState};
use doorlock_proto::Credential;
use doorlock_sim::{Args, SimError, run};

fn args(stored: Option<[u8; 5]>, keys: &str) -> Args {
    Args {
        keys: keys.to_owned(),
        stored: stored.map(Credential::new),
        tick_ms: 100,
        key_ms: 10,
        ..Args::default()
    }
}

#[tokio::test(start_paused = true)]
async fn first_boot_then_open() {
    let report = run(&args(None, "12345 12345 - 12345")).await.unwrap();

    assert_eq!(report.stored, Some(Credential::new([1, 2, 3, 4, 5])));
    assert_eq!(report.door_cycles, 1);
    assert_eq!(report.alarms, 0);
    assert_eq!(report.hmi_state, HmiState::Menu);
    assert_eq!(report.control_state, ControlState::AwaitingReady);
    assert_eq!(report.hmi_faults + report.control_faults, 0);
}

#[tokio::test(start_paused = true)]
async fn lockout_then_recovery() {
    let report = run(&args(Some([9; 5]), "- 11111 11111 11111 99999")).await.unwrap();

    assert_eq!(report.alarms, 1);
    assert_eq!(report.door_cycles, 1);
    assert!(report.ticks >= 60 + 20, "finished at tick {}", report.ticks);
    assert_eq!(report.hmi_state, HmiState::Menu);
}

#[tokio::test(start_paused = true)]
async fn change_password_persists_through_eeprom() {
    let report = run(&args(Some([1, 2, 3, 4, 5]), "+ 12345 80808 80808")).await.unwrap();

    assert_eq!(report.stored, Some(Credential::new([8, 0, 8, 0, 8])));
    assert_eq!(report.door_cycles, 0);
}

#[tokio::test(start_paused = true)]
async fn script_ending_mid_flow_rests_at_prompt() {
    let report = run(&args(Some([1, 2, 3, 4, 5]), "- 123")).await.unwrap();

    assert_eq!(report.hmi_state, HmiState::EnterPassword(Flow::Door));
    assert_eq!(report.control_state, ControlState::Verifying(Flow::Door));
}

#[tokio::test(start_paused = true)]
async fn tick_limit_stops_a_busy_run() {
    let mut args = args(Some([1, 2, 3, 4, 5]), "- 12345");
    args.max_ticks = 8;

    let err = run(&args).await.unwrap_err();
    assert!(matches!(err, SimError::TickLimit { ticks: 8, pending: 0 }), "{err}");
}
