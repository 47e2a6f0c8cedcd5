//! Scenario runner.
//!
//! A scenario is an ordered list of steps. Each step runs its hooks, then
//! refresh, plan, plan checks, apply, the expected-error match, state and
//! device checks, and finally a post-apply refresh whose plan must be empty.
//! The first failure ends the case; teardown always runs.

use crate::config::{Config, Interpolator, Variables};
use crate::controller::{Controller, Plan};
use crate::destroy::{Touched, check_destroyed};
use crate::devicecheck::DeviceCheck;
use crate::hooks::{CreatedEntry, Hook, HookContext};
use crate::plancheck::PlanCheck;
use crate::prefix;
use crate::report::{CaseReport, CaseStatus, RunReport, StepReport};
use crate::statecheck::StateCheck;
use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use declarative::{ExecuteSummary, compute_diffs};
use objects::Value;
use panoskit::{CallContext, CancelToken, Client};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Import the applied entry at `address` into fresh state and compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStep {
    pub address: String,
}

/// One step of a scenario.
#[derive(Debug, Clone, Default)]
pub struct Step {
    pub config: Config,
    pub variables: Variables,
    pub hooks: Vec<Hook>,
    pub plan_checks: Vec<PlanCheck>,
    pub state_checks: Vec<StateCheck>,
    pub device_checks: Vec<DeviceCheck>,
    /// Pattern the apply error must match
    pub expect_error: Option<String>,
    pub expect_non_empty_plan: bool,
    pub import: Option<ImportStep>,
}

impl Step {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn plan_check(mut self, check: PlanCheck) -> Self {
        self.plan_checks.push(check);
        self
    }

    #[must_use]
    pub fn state_check(mut self, check: StateCheck) -> Self {
        self.state_checks.push(check);
        self
    }

    #[must_use]
    pub fn device_check(mut self, check: DeviceCheck) -> Self {
        self.device_checks.push(check);
        self
    }

    #[must_use]
    pub fn expect_error(mut self, pattern: impl Into<String>) -> Self {
        self.expect_error = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn expect_non_empty_plan(mut self) -> Self {
        self.expect_non_empty_plan = true;
        self
    }

    #[must_use]
    pub fn import(mut self, address: impl Into<String>) -> Self {
        self.import = Some(ImportStep {
            address: address.into(),
        });
        self
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    /// Safe to run concurrently with other parallel cases
    pub parallel: bool,
    /// Exercises device behavior the in-process store does not have
    pub requires_device: bool,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    #[must_use]
    pub fn requires_device(mut self) -> Self {
        self.requires_device = true;
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Notified as cases start and finish.
pub trait RunObserver: Send + Sync {
    fn case_started(&self, _name: &str) {}
    fn case_finished(&self, _report: &CaseReport) {}
}

struct StepOutcome {
    plan: String,
    expected_error: Option<String>,
    applied: ExecuteSummary,
}

/// Per-case mutable state.
struct Case<'p> {
    prefix: &'p str,
    controller: Controller,
    touched: Touched,
    created: Vec<CreatedEntry>,
}

/// Runs scenarios against one client.
#[derive(Clone)]
pub struct Runner {
    client: Client,
    call: CallContext,
    offline: bool,
    observer: Option<Arc<dyn RunObserver>>,
}

impl Runner {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            call: CallContext::new(),
            offline: false,
            observer: None,
        }
    }

    /// Deadline for each adapter call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call = self.call.with_timeout(timeout);
        self
    }

    /// Share a cancel token with the caller. Once it fires, running steps
    /// fail and cases not yet started are skipped. Teardown still runs.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.call = self.call.with_cancel(cancel);
        self
    }

    /// Offline runs skip cases that require a device.
    #[must_use]
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run one case with a fresh prefix.
    pub fn run(&self, scenario: &Scenario) -> CaseReport {
        if let Some(observer) = &self.observer {
            observer.case_started(&scenario.name);
        }
        let report = if scenario.requires_device && self.offline {
            log::info!("skipping {}: requires a device", scenario.name);
            CaseReport::skipped(&scenario.name, "requires a device")
        } else if self.call.cancel.is_cancelled() {
            log::info!("skipping {}: run cancelled", scenario.name);
            CaseReport::skipped(&scenario.name, "run cancelled")
        } else {
            self.run_with_prefix(scenario, &prefix::generate())
        };
        if let Some(observer) = &self.observer {
            observer.case_finished(&report);
        }
        report
    }

    /// Run parallel cases on a pool of `jobs` threads, then the rest in
    /// order. Reports keep the input order.
    pub fn run_all(&self, scenarios: &[Scenario], jobs: usize) -> Result<RunReport> {
        let started_at = Utc::now();
        let (parallel, sequential): (Vec<_>, Vec<_>) =
            scenarios.iter().enumerate().partition(|(_, s)| s.parallel);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()
            .context("Failed to create scenario thread pool")?;

        let mut reports: Vec<(usize, CaseReport)> = pool.install(|| {
            parallel
                .par_iter()
                .map(|(index, scenario)| (*index, self.run(scenario)))
                .collect()
        });
        reports.extend(
            sequential
                .iter()
                .map(|(index, scenario)| (*index, self.run(scenario))),
        );
        reports.sort_by_key(|(index, _)| *index);

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            cases: reports.into_iter().map(|(_, report)| report).collect(),
        })
    }

    /// Run one case with a caller-chosen prefix.
    pub fn run_with_prefix(&self, scenario: &Scenario, prefix: &str) -> CaseReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        log::info!("case {} (prefix {prefix})", scenario.name);

        let mut case = self.case(prefix);
        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_clock = Instant::now();
            let report = match self.run_step(step, &mut case) {
                Ok(outcome) => StepReport {
                    index,
                    passed: true,
                    plan: outcome.plan,
                    expected_error: outcome.expected_error,
                    error: None,
                    applied: outcome.applied,
                    duration_ms: elapsed_ms(step_clock),
                },
                Err(e) => {
                    log::warn!("{} step {}: {e:#}", scenario.name, index + 1);
                    StepReport {
                        index,
                        passed: false,
                        plan: String::new(),
                        expected_error: None,
                        error: Some(format!("{e:#}")),
                        applied: ExecuteSummary::default(),
                        duration_ms: elapsed_ms(step_clock),
                    }
                }
            };
            let failed = !report.passed;
            steps.push(report);
            if failed {
                break;
            }
        }

        let teardown_error = self.teardown(&mut case).err().map(|e| {
            log::warn!("{} teardown: {e:#}", scenario.name);
            format!("{e:#}")
        });
        let status = if steps.iter().all(|s| s.passed) && teardown_error.is_none() {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };

        CaseReport {
            name: scenario.name.clone(),
            prefix: prefix.to_string(),
            status,
            reason: None,
            steps,
            teardown_error,
            started_at,
            finished_at: Utc::now(),
            duration_ms: elapsed_ms(clock),
        }
    }

    /// Apply the steps before `index`, then return the plan of step `index`
    /// without applying it. Everything created is torn down.
    pub fn preview(&self, scenario: &Scenario, index: usize) -> Result<Plan> {
        let step = scenario
            .steps
            .get(index)
            .with_context(|| format!("{} has no step {}", scenario.name, index + 1))?;
        let case_prefix = prefix::generate();
        let mut case = self.case(&case_prefix);

        let result = (|| {
            for (i, earlier) in scenario.steps[..index].iter().enumerate() {
                self.run_step(earlier, &mut case)
                    .with_context(|| format!("step {}", i + 1))?;
            }
            let vars = step_variables(step, case.prefix)?;
            let interp = Interpolator::new(&vars)?;
            self.run_hooks(step, &mut case, &interp)?;
            let config = step.config.render(&interp)?;
            case.controller.refresh()?;
            case.controller.plan(&config)
        })();

        let teardown = self.teardown(&mut case);
        let plan = result?;
        teardown?;
        Ok(plan)
    }

    fn case<'p>(&self, prefix: &'p str) -> Case<'p> {
        Case {
            prefix,
            controller: Controller::new(self.client.clone(), self.call.clone()),
            touched: Touched::default(),
            created: Vec::new(),
        }
    }

    fn run_step(&self, step: &Step, case: &mut Case<'_>) -> Result<StepOutcome> {
        let vars = step_variables(step, case.prefix)?;
        let interp = Interpolator::new(&vars)?;

        self.run_hooks(step, case, &interp)?;

        let config = step.config.render(&interp).context("rendering config")?;
        for declared in &config {
            case.touched.record_location(&declared.kind, &declared.location);
        }

        case.controller.refresh().context("refresh")?;
        let plan = match case.controller.plan(&config) {
            Ok(plan) => plan,
            Err(e) => {
                let outcome = StepOutcome {
                    plan: String::new(),
                    expected_error: None,
                    applied: ExecuteSummary::default(),
                };
                return self.expect_failure(step, e, case, &interp, outcome);
            }
        };
        let described = plan.describe();
        for check in &step.plan_checks {
            check
                .check(&plan)
                .map_err(|e| anyhow!("plan check failed: {e}"))?;
        }

        if let Err(e) = case.controller.apply(&config) {
            let outcome = StepOutcome {
                plan: described,
                expected_error: None,
                applied: case.controller.applied().clone(),
            };
            return self.expect_failure(step, e, case, &interp, outcome);
        }
        if let Some(pattern) = &step.expect_error {
            bail!("expected an error matching /{pattern}/, but apply succeeded");
        }
        let applied = case.controller.applied().clone();

        for check in &step.state_checks {
            check
                .interpolate(&interp)?
                .check(case.controller.state())
                .map_err(|e| anyhow!("state check failed: {e}"))?;
        }
        self.device_checks(step, case, &interp)?;
        if let Some(import) = &step.import {
            self.verify_import(import, &config, case)?;
        }

        case.controller.refresh().context("post-apply refresh")?;
        let after = case.controller.plan(&config).context("post-apply plan")?;
        if step.expect_non_empty_plan {
            if after.is_empty() {
                bail!("expected a non-empty plan after apply");
            }
        } else if !after.is_empty() {
            bail!("plan is not empty after apply: {}", after.describe());
        }

        Ok(StepOutcome {
            plan: described,
            expected_error: None,
            applied,
        })
    }

    fn run_hooks(&self, step: &Step, case: &mut Case<'_>, interp: &Interpolator<'_>) -> Result<()> {
        let ctx = HookContext::new(&self.client, &self.call, case.prefix);
        let result = step.hooks.iter().try_for_each(|hook| hook.run(&ctx, interp));
        for entry in ctx.into_created() {
            case.touched.record(&entry.kind, &entry.scope);
            case.created.push(entry);
        }
        result.context("pre-config hook failed")
    }

    fn expect_failure(
        &self,
        step: &Step,
        err: anyhow::Error,
        case: &Case<'_>,
        interp: &Interpolator<'_>,
        outcome: StepOutcome,
    ) -> Result<StepOutcome> {
        let Some(pattern) = &step.expect_error else {
            return Err(err);
        };
        let message = format!("{err:#}");
        let regex = interp.pattern(pattern)?;
        if !regex.is_match(&message) {
            bail!("error '{message}' does not match /{}/", regex.as_str());
        }
        log::info!("got expected error: {message}");
        self.device_checks(step, case, interp)?;
        Ok(StepOutcome {
            expected_error: Some(message),
            ..outcome
        })
    }

    fn device_checks(&self, step: &Step, case: &Case<'_>, interp: &Interpolator<'_>) -> Result<()> {
        for check in &step.device_checks {
            check
                .check(&self.client, &self.call, interp, case.prefix)
                .context("device check failed")?;
        }
        Ok(())
    }

    fn verify_import(
        &self,
        import: &ImportStep,
        config: &[crate::config::RenderedResource],
        case: &Case<'_>,
    ) -> Result<()> {
        let address = &import.address;
        let declared = config
            .iter()
            .find(|r| &r.address == address)
            .with_context(|| format!("import: {address} is not declared"))?;
        let applied = case
            .controller
            .state()
            .get(address)
            .with_context(|| format!("import: {address} is not in state"))?;

        let mut fresh = Controller::new(self.client.clone(), self.call.clone());
        let imported = fresh.import(address, &declared.kind, &declared.location, &applied.name)?;
        if imported.attributes != applied.attributes {
            let paths: Vec<String> = compute_diffs(&applied.attributes, &imported.attributes)
                .into_iter()
                .map(|c| c.path)
                .collect();
            bail!(
                "imported {address} differs from applied state at: {}",
                paths.join(", ")
            );
        }
        Ok(())
    }

    /// The run's deadline without its cancel token.
    fn cleanup_call(&self) -> CallContext {
        match self.call.timeout {
            Some(timeout) => CallContext::new().with_timeout(timeout),
            None => CallContext::new(),
        }
    }

    /// Destroy state, remove hook entries, then verify nothing with the
    /// prefix is left. Runs after a cancelled step too.
    fn teardown(&self, case: &mut Case<'_>) -> Result<()> {
        let call = self.cleanup_call();
        case.controller.set_call(call.clone());
        let mut failures = Vec::new();
        if let Err(e) = case.controller.destroy() {
            failures.push(format!("{e:#}"));
        }
        for entry in case.created.iter().rev() {
            if let Err(e) = self
                .client
                .delete(&call, &entry.scope, &entry.kind, &entry.name)
            {
                failures.push(format!("deleting {} '{}': {e}", entry.kind, entry.name));
            }
        }
        if let Err(e) = check_destroyed(&self.client, &call, &case.touched, case.prefix) {
            failures.push(format!("{e:#}"));
        }
        if !failures.is_empty() {
            bail!(failures.join("; "));
        }
        Ok(())
    }
}

/// Step variables with `prefix` bound. Variable values may reference
/// `${var.prefix}`.
fn step_variables(step: &Step, prefix: &str) -> Result<Variables> {
    let base = Variables::from([("prefix".to_string(), Value::from(prefix))]);
    let interp = Interpolator::new(&base)?;
    let mut vars = base.clone();
    for (name, value) in &step.variables {
        let value = interp
            .value(value)
            .with_context(|| format!("variable '{name}'"))?;
        vars.insert(name.clone(), value);
    }
    Ok(vars)
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
