use super::*;

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

#[cfg(unix)]
#[test]
fn collects_stdout_of_successful_run() {
    let out = run(
        Path::new("sh"),
        &sh("printf hello"),
        "echo",
        Duration::from_secs(10),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(out.stdout, b"hello");
}

#[cfg(unix)]
#[test]
fn failure_carries_the_stderr_tail() {
    let err = run(
        Path::new("sh"),
        &sh("i=0; while [ $i -lt 50 ]; do echo line$i >&2; i=$((i+1)); done; exit 3"),
        "noisy",
        Duration::from_secs(10),
        &CancelToken::new(),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, CompositorError::Engine(_)));
    assert!(msg.contains("line49"), "{msg}");
    assert!(!msg.contains("line29\n"), "{msg}");
}

#[cfg(unix)]
#[test]
fn overrunning_process_is_killed() {
    let started = Instant::now();
    let err = run(
        Path::new("sh"),
        &sh("exec sleep 30"),
        "sleepy",
        Duration::from_millis(200),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CompositorError::Timeout { ref operation, .. } if operation == "sleepy"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[cfg(unix)]
#[test]
fn cancellation_kills_in_flight_process() {
    let token = CancelToken::new();
    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        remote.cancel();
    });
    let err = run(
        Path::new("sh"),
        &sh("exec sleep 30"),
        "cancellable",
        Duration::from_secs(60),
        &token,
    )
    .unwrap_err();
    canceller.join().unwrap();
    assert!(matches!(err, CompositorError::Cancelled));
}

#[test]
fn cancelled_token_refuses_to_spawn() {
    let token = CancelToken::new();
    token.cancel();
    let err = run(
        Path::new("definitely-not-a-binary"),
        &[],
        "noop",
        Duration::from_secs(1),
        &token,
    )
    .unwrap_err();
    assert!(matches!(err, CompositorError::Cancelled));
}

#[test]
fn missing_program_is_an_engine_error() {
    let err = run(
        Path::new("/definitely/not/a/binary"),
        &[],
        "noop",
        Duration::from_secs(1),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CompositorError::Engine(_)));
}
