//! End-to-end runs of the launch sequence over a Unix socket.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;

use crate::process::{ShutdownFlag, run_daemon_with};

use super::support::{
    BusCall, HealthEvent, RecordingBusProvider, RecordingHealthReporter, TestConfigLoader,
};

fn connect_when_ready(path: &Path) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return stream,
            Err(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
            Err(error) => panic!("bridge socket never became ready: {error}"),
        }
    }
}

#[rstest]
fn peer_session_ends_with_teardown() {
    let loader = TestConfigLoader::new();
    let socket = loader.socket_path();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let provider = RecordingBusProvider::default();

    let bridge = {
        let reporter = Arc::clone(&reporter);
        let provider = provider.clone();
        thread::spawn(move || run_daemon_with(&loader, reporter, provider, ShutdownFlag::new()))
    };

    let mut client = connect_when_ready(&socket);
    client
        .write_all(b"[\"open_bus\", 1]\n[\"open_bus\", 2]\n[\"exit\"]\n")
        .expect("write requests");
    let replies: Vec<String> = BufReader::new(client)
        .lines()
        .map(|line| line.expect("read reply"))
        .collect();

    bridge
        .join()
        .expect("bridge thread")
        .expect("bridge exits cleanly");
    assert_eq!(
        replies,
        vec![
            r#"["i2cbridge",["ok",1]]"#,
            r#"["i2cbridge",["ok",2]]"#,
            r#"["i2cbridge",["ok","exiting"]]"#,
        ]
    );
    assert!(provider.calls().contains(&BusCall::Close { bus: 1 }));
    assert!(provider.calls().contains(&BusCall::Close { bus: 2 }));
    assert!(!socket.exists(), "socket removed after the session");
    assert_eq!(
        reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::BootstrapSucceeded,
            HealthEvent::PeerConnected,
            HealthEvent::PeerDisconnected("exit_requested".to_owned()),
            HealthEvent::TeardownCompleted(2),
        ]
    );
}

#[rstest]
fn malformed_framing_still_tears_down() {
    let loader = TestConfigLoader::new();
    let socket = loader.socket_path();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let provider = RecordingBusProvider::default();

    let bridge = {
        let reporter = Arc::clone(&reporter);
        let provider = provider.clone();
        thread::spawn(move || run_daemon_with(&loader, reporter, provider, ShutdownFlag::new()))
    };

    let mut client = connect_when_ready(&socket);
    client
        .write_all(b"[\"open_bus\", 3]\n{not json\n")
        .expect("write requests");

    bridge
        .join()
        .expect("bridge thread")
        .expect("malformed framing is not a launch failure");
    assert!(provider.calls().contains(&BusCall::Close { bus: 3 }));
    assert!(
        reporter
            .events()
            .contains(&HealthEvent::TeardownCompleted(1))
    );
}

#[rstest]
fn shutdown_before_a_peer_exits_cleanly() {
    let loader = TestConfigLoader::new();
    let socket = loader.socket_path();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = ShutdownFlag::new();
    shutdown.request();

    run_daemon_with(
        &loader,
        reporter.clone(),
        RecordingBusProvider::default(),
        shutdown,
    )
    .expect("clean exit");

    assert!(!socket.exists(), "socket removed on shutdown");
    assert!(!reporter.events().contains(&HealthEvent::PeerConnected));
}
