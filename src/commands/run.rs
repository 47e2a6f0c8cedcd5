//! `panos-acc run`

use acctest::Runner;
use anyhow::{Context as _, Result, bail};
use panoskit::CancelToken;
use std::sync::Arc;

use crate::Context;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::progress::CaseProgress;
use crate::ui;

const DEFAULT_JOBS: usize = 4;

pub fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    let scenarios = super::select(&config, &args.names, &args.files, args.dir.as_deref())?;
    if scenarios.is_empty() {
        bail!("no scenarios selected");
    }
    let jobs = args.jobs.or(config.jobs).unwrap_or(DEFAULT_JOBS);
    let show_progress = !ctx.quiet && !args.json;

    if show_progress {
        ui::header("Acceptance Run");
        ui::kv("target", &config.target(args.offline));
        ui::kv("cases", &scenarios.len().to_string());
        ui::kv("jobs", &jobs.to_string());
        ui::kv(
            "started",
            &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        println!();
    }

    let cancel = interrupt_token()?;
    let progress = Arc::new(CaseProgress::new(scenarios.len(), !show_progress));
    let mut runner = Runner::new(config.client(args.offline)?)
        .offline(args.offline)
        .with_cancel(cancel.clone())
        .with_observer(progress.clone());
    if let Some(timeout) = config.timeout() {
        runner = runner.with_timeout(timeout);
    }

    let report = runner.run_all(&scenarios, jobs)?;
    progress.finish();

    if let Some(path) = &args.report {
        report.write_json(path)?;
        log::info!("Wrote report to {}", path.display());
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else if !ctx.quiet {
        for case in &report.cases {
            if ctx.verbose > 0 || case.failure().is_some() {
                ui::section(&case.name);
                ui::case_details(case, ctx.verbose);
            }
        }
        ui::summary(&report);
    }

    if cancel.is_cancelled() {
        bail!("run interrupted; {} cases skipped", report.skipped());
    }
    if !report.success() {
        bail!("{} of {} cases failed", report.failed(), report.cases.len());
    }
    Ok(())
}

/// Token cancelled by the first Ctrl-C. Running cases stop at their next
/// device call and still tear down; a second Ctrl-C exits immediately.
fn interrupt_token() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || {
        if handler.is_cancelled() {
            std::process::exit(130);
        }
        log::warn!("Interrupted: cleaning up (press Ctrl-C again to exit now)");
        handler.cancel();
    })
    .context("Failed to install the Ctrl-C handler")?;
    Ok(cancel)
}
