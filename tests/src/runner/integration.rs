#![cfg(unix)]
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use mtscan_core::runner::{CommandSpec, ProcessRunner, RunnerConfig, StreamSource, stream_lines};

use crate::utils::{process_exits, read_pid};

fn quick(retry: u32) -> RunnerConfig {
    RunnerConfig::default()
        .with_retry(retry)
        .with_retry_delay(Duration::from_millis(10))
        .silent(true)
}

#[tokio::test]
async fn failing_command_is_attempted_retry_plus_one_times() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let line = format!("echo x >> '{}'; exit 3", counter.display());

    let ok = ProcessRunner::new(quick(2)).run(&CommandSpec::shell(line)).await;

    assert!(!ok);
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 3);
}

#[tokio::test]
async fn success_stops_retrying() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let line = format!("echo x >> '{}'", counter.display());

    assert!(ProcessRunner::new(quick(5)).run(&CommandSpec::shell(line)).await);
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let line = format!("echo $$ > '{}'; exec sleep 30", pidfile.display());
    let runner = ProcessRunner::new(quick(0).with_timeout(Some(Duration::from_millis(500))));

    let started = Instant::now();
    let ok = runner.run(&CommandSpec::shell(line)).await;

    assert!(!ok);
    assert!(started.elapsed() < Duration::from_secs(10));

    let pid = fs::read_to_string(&pidfile).unwrap();
    let proc_entry = format!("/proc/{}", pid.trim());
    if Path::new("/proc/self").exists() {
        assert!(!Path::new(&proc_entry).exists(), "{proc_entry} still alive");
    }
}

#[tokio::test]
async fn every_timed_out_attempt_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let line = format!("echo x >> '{}'; exec sleep 30", counter.display());
    let runner = ProcessRunner::new(quick(2).with_timeout(Some(Duration::from_millis(300))));

    let started = Instant::now();
    assert!(!runner.run(&CommandSpec::shell(line)).await);

    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 3);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn timeout_kills_the_whole_process_group() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("grandchild");
    let line = format!("sleep 30 & echo $! > '{}'; wait", pidfile.display());
    let runner = ProcessRunner::new(quick(0).with_timeout(Some(Duration::from_millis(500))));

    assert!(!runner.run(&CommandSpec::shell(line)).await);

    let grandchild = read_pid(&pidfile).await;
    assert!(process_exits(&grandchild).await, "grandchild {grandchild} survived the timeout");
}

#[tokio::test]
async fn descendant_holding_the_pipes_cannot_outlast_the_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("background");
    let line = format!("sleep 20 & echo $! > '{}'; exit 1", pidfile.display());
    let runner = ProcessRunner::new(
        quick(0)
            .silent(false)
            .with_timeout(Some(Duration::from_secs(1))),
    );

    let started = Instant::now();
    assert!(!runner.run(&CommandSpec::shell(line)).await);
    assert!(started.elapsed() < Duration::from_secs(5), "run took {:?}", started.elapsed());

    let background = read_pid(&pidfile).await;
    assert!(process_exits(&background).await, "background {background} survived the timeout");
}

#[tokio::test]
async fn streaming_reports_both_pipes() {
    let spec = CommandSpec::shell("echo out; echo err >&2; exit 4");
    let mut seen = Vec::new();

    let status = stream_lines(&spec, |source, line| seen.push((source, line.to_string())))
        .await
        .unwrap();

    assert_eq!(status.code(), Some(4));
    assert!(seen.contains(&(StreamSource::Stdout, "out".to_string())));
    assert!(seen.contains(&(StreamSource::Stderr, "err".to_string())));
}
