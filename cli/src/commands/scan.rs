use std::time::Duration;

use colored::*;
use mtscan_common::config::Config;
use mtscan_common::session::Session;
use mtscan_common::{success, warn};
use mtscan_core::{connectivity, installer};
use mtscan_core::locator::{ToolLocator, Toolbox};
use mtscan_core::pipeline::{Pipeline, PipelineReport, ScanOptions, Scope, StageStatus};
use mtscan_core::summary::Summary;

use crate::commands::{EXIT_OK, EXIT_PARTIAL, ScanArgs};
use crate::mprint;
use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

pub async fn scan(args: ScanArgs, mut config: Config, verbose: bool) -> anyhow::Result<u8> {
    if let Some(timeout) = args.timeout {
        config.general.timeout = timeout;
    }

    let session = match &args.output_dir {
        Some(dir) => Session::open(dir)?,
        None => Session::create(&config.general.output_dir, &args.target)?,
    };

    let locator = ToolLocator::from_env(config.paths.clone());
    let toolbox = Toolbox::discover(&locator);
    let scope = args.only.map_or(Scope::Full, Scope::Only);

    print_plan(&args, &session, scope);

    for tool in toolbox.missing() {
        warn!("{tool} not found, its stage will fail (run `mtscan install {tool}`)");
    }

    connectivity::note_reachability(&args.target).await;

    if args.update_templates {
        match toolbox.nuclei.as_deref() {
            Some(nuclei) => {
                if !installer::update_templates(nuclei).await {
                    warn!("Template update failed, continuing with installed templates");
                }
            }
            None => warn!("Cannot update templates: nuclei not found"),
        }
    }

    let options = ScanOptions {
        ports: args.ports.clone(),
        templates: args.templates.clone(),
        tags: args.tags.clone(),
        severity: args.severity.clone(),
        scan_mode: args.scan_mode,
        verbose,
        scope,
    };

    mprint!();
    let report = Pipeline::new(args.target.clone(), session, toolbox, config, options)
        .run()
        .await;

    scan_ends(&report);

    Ok(if report.is_clean() { EXIT_OK } else { EXIT_PARTIAL })
}

fn print_plan(args: &ScanArgs, session: &Session, scope: Scope) {
    print::header("starting scan");
    let scope = match scope {
        Scope::Full => "full workflow".to_string(),
        Scope::Only(stage) => format!("{stage} only"),
    };

    print::set_key_width(["Target", "Scope", "Output"]);
    print::aligned_line("Target", args.target.as_str());
    print::aligned_line("Scope", scope);
    print::aligned_line(
        "Output",
        session.root().display().to_string().color(colors::PATH),
    );
}

fn scan_ends(report: &PipelineReport) {
    mprint!();
    print::header("scan results");

    for (idx, outcome) in report.stages.iter().enumerate() {
        print::tree_head(idx, outcome.stage.label());
        let mut details: Vec<Detail> = Vec::new();

        let status = match &outcome.status {
            StageStatus::Succeeded => "completed".green().bold(),
            StageStatus::Failed(reason) => format!("failed ({reason})").red(),
        };
        details.push(("Status".to_string(), status));
        details.push((
            "Time".to_string(),
            format!("{:.2}s", outcome.elapsed.as_secs_f64()).normal(),
        ));
        if outcome.fallback {
            details.push(("Input".to_string(), "defaults used".yellow()));
        }

        print::as_tree_one_level(details);
        mprint!();
    }

    match &report.summary {
        Some(summary) => print_summary(summary),
        None => warn!("No summary could be written for this scan"),
    }

    print_footer(report.elapsed, report.is_clean());
    success!("Results saved in {}", report.session_dir.display());
}

fn print_summary(summary: &Summary) {
    let v = &summary.vulnerabilities;
    print::set_key_width(["HTTP services", "Vulnerabilities"]);
    print::aligned_line("Open ports", summary.open_ports.to_string());
    print::aligned_line("HTTP services", summary.http_services.to_string());
    print::aligned_line("Vulnerabilities", v.total().to_string());

    let breakdown: Vec<Detail> = vec![
        ("Critical".to_string(), v.critical.to_string().color(colors::SEVERITY_CRITICAL).bold()),
        ("High".to_string(), v.high.to_string().color(colors::SEVERITY_HIGH)),
        ("Medium".to_string(), v.medium.to_string().color(colors::SEVERITY_MEDIUM)),
        ("Low".to_string(), v.low.to_string().color(colors::SEVERITY_LOW)),
        ("Info".to_string(), v.info.to_string().normal()),
    ];
    print::as_tree_one_level(breakdown);

    if summary.needs_attention() {
        mprint!();
        warn!("Critical or high severity findings need immediate attention");
    }
}

fn print_footer(elapsed: Duration, clean: bool) {
    let total_time: ColoredString = format!("{:.2}s", elapsed.as_secs_f64()).bold().yellow();
    let state: ColoredString = if clean {
        "Scan Complete".green().bold()
    } else {
        "Scan Completed With Issues".yellow().bold()
    };
    let output: String = format!("{state} in {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    print::fat_separator();
    print::centerln(&output);
}
