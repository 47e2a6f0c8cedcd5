//! `panos-acc plan`

use acctest::{Runner, Scenario};
use anyhow::{Context as _, Result, bail};

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::Config;
use crate::ui;

fn load(config: &Config, args: &PlanArgs) -> Result<Scenario> {
    if let Some(path) = &args.file {
        return acctest::file::load_file(path);
    }
    let name = args.name.as_deref().unwrap_or_default();
    if let Some(scenario) = acctest::scenarios::find(name)? {
        return Ok(scenario);
    }
    super::configured(config)?
        .into_iter()
        .find(|s| s.name == name)
        .with_context(|| format!("unknown scenario '{name}' (see `panos-acc list`)"))
}

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    if args.step == 0 {
        bail!("steps are numbered from 1");
    }
    let config = Config::load()?;
    let scenario = load(&config, &args)?;
    if args.step > scenario.steps.len() {
        bail!(
            "{} has {} steps, cannot preview step {}",
            scenario.name,
            scenario.steps.len(),
            args.step
        );
    }

    if !ctx.quiet {
        ui::header(&format!("Plan: {} step {}", scenario.name, args.step));
        ui::kv("target", &config.target(args.offline));
        if args.step > 1 {
            ui::dim(&format!("Steps 1-{} are applied first and torn down after.", args.step - 1));
        }
        println!();
    }

    let mut runner = Runner::new(config.client(args.offline)?).offline(args.offline);
    if let Some(timeout) = config.timeout() {
        runner = runner.with_timeout(timeout);
    }
    let plan = runner.preview(&scenario, args.step - 1)?;
    ui::plan(&plan);
    Ok(())
}
