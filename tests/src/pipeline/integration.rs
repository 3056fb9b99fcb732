#![cfg(unix)]
use std::fs;

use mtscan_common::session::Session;
use mtscan_common::stage::Stage;
use mtscan_core::locator::Toolbox;
use mtscan_core::pipeline::{Pipeline, ScanOptions, Scope, StageStatus};
use serde_json::Value;

use crate::utils::{fake_tool, quick_config, recorded_args};

const HTTPX_BODY: &str = r#"printf '%s\n' '{"url":"http://127.0.0.1:8080","status_code":200}' '{"url":"http://127.0.0.1:8080","status_code":200}' > "$out""#;

const NUCLEI_BODY: &str = r#"printf '%s\n' '{"template-id":"a","info":{"severity":"critical"}}' '{"template-id":"b","info":{"severity":"low"}}' > "$out""#;

/// A failing port scan must not stop the run: the defaults feed the probe,
/// the probe's URLs feed the vulnerability scan and the summary is written.
#[tokio::test]
async fn full_run_survives_a_failing_port_scan() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    let toolbox = Toolbox {
        naabu: Some(fake_tool(bin.path(), "naabu", "exit 1")),
        httpx: Some(fake_tool(bin.path(), "httpx", HTTPX_BODY)),
        nuclei: Some(fake_tool(bin.path(), "nuclei", NUCLEI_BODY)),
    };
    let session = Session::create(work.path(), "127.0.0.1").unwrap();

    let report = Pipeline::new(
        "127.0.0.1",
        session.clone(),
        toolbox.clone(),
        quick_config(),
        ScanOptions::default(),
    )
    .run()
    .await;

    assert!(!report.is_clean());
    assert_eq!(report.failed_stages(), vec![Stage::PortScan]);
    assert!(report.stages[0].fallback);
    assert_eq!(report.stages[1].status, StageStatus::Succeeded);

    let ports = fs::read_to_string(session.ports_file()).unwrap();
    assert_eq!(ports, "127.0.0.1:80\n127.0.0.1:443\n");

    let urls = fs::read_to_string(session.http_services_file()).unwrap();
    assert_eq!(urls, "http://127.0.0.1:8080\n");

    let httpx_args = recorded_args(toolbox.httpx.as_deref().unwrap());
    assert!(httpx_args[0].contains(&format!("-l {}", session.ports_file().display())));
    let nuclei_args = recorded_args(toolbox.nuclei.as_deref().unwrap());
    assert!(nuclei_args[0].contains(&format!("-l {}", session.http_services_file().display())));

    let errors = fs::read_to_string(session.error_log()).unwrap();
    assert!(errors.contains("port scan failed"), "{errors}");

    // The default ports fed to httpx are not scanner findings.
    let summary = report.summary.expect("summary is always generated");
    assert_eq!(summary.open_ports, 0);
    assert_eq!(summary.http_services, 1);
    assert_eq!(summary.vulnerabilities.critical, 1);
    assert_eq!(summary.vulnerabilities.low, 1);
    assert!(summary.needs_attention());
    assert!(session.summary_file().exists());

    let markdown = fs::read_to_string(session.report_file()).unwrap();
    assert!(markdown.contains("**CRITICAL RISK**"));
    assert!(markdown.contains("| http://127.0.0.1:8080 | 200 |"));
    assert!(!markdown.contains("## Open Ports"));

    let results: Value = serde_json::from_str(&fs::read_to_string(session.results_file()).unwrap()).unwrap();
    assert_eq!(results["summary"]["open_ports"], 0);
    assert_eq!(results["summary"]["vulnerabilities"]["total"], 2);
    assert_eq!(results["ports"], Value::Array(Vec::new()));
    assert_eq!(results["vulnerabilities"][0]["template-id"], "a");
}

#[tokio::test]
async fn missing_tools_fail_their_stages_but_still_summarise() {
    let work = tempfile::tempdir().unwrap();
    let session = Session::create(work.path(), "example.com").unwrap();

    let report = Pipeline::new(
        "example.com",
        session.clone(),
        Toolbox::default(),
        quick_config(),
        ScanOptions::default(),
    )
    .run()
    .await;

    assert_eq!(
        report.failed_stages(),
        vec![Stage::PortScan, Stage::HttpProbe, Stage::VulnScan]
    );
    assert_eq!(
        fs::read_to_string(session.http_services_file()).unwrap(),
        "http://example.com\nhttps://example.com\n"
    );
    assert!(report.summary.is_some());
    assert_eq!(fs::read_to_string(session.error_log()).unwrap().lines().count(), 3);
}

#[tokio::test]
async fn single_stage_runs_against_the_raw_target() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    let nuclei = fake_tool(bin.path(), "nuclei", NUCLEI_BODY);
    let toolbox = Toolbox {
        nuclei: Some(nuclei.clone()),
        ..Toolbox::default()
    };
    let session = Session::create(work.path(), "https://example.com").unwrap();
    let options = ScanOptions {
        scope: Scope::Only(Stage::VulnScan),
        tags: Some("exposure".into()),
        ..ScanOptions::default()
    };

    let report = Pipeline::new("https://example.com", session.clone(), toolbox, quick_config(), options)
        .run()
        .await;

    assert!(report.is_clean());
    assert_eq!(report.stages.len(), 1);

    let args = recorded_args(&nuclei);
    assert_eq!(args.len(), 1);
    assert!(args[0].starts_with("-u https://example.com"), "{}", args[0]);
    assert!(args[0].contains("-tags exposure"));
    assert!(!session.ports_file().exists());
}
