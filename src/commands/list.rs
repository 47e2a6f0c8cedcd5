//! `panos-acc list`

use acctest::Scenario;
use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::config::Config;
use crate::ui;

fn print_scenarios(scenarios: &[Scenario]) {
    let width = scenarios.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for scenario in scenarios {
        let mut tags = Vec::new();
        if scenario.parallel {
            tags.push("parallel");
        }
        if scenario.requires_device {
            tags.push("device");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!("[{}]", tags.join(", "))
        };
        println!(
            "  {:<width$}  {:>2} steps  {}",
            scenario.name.bold(),
            scenario.steps.len(),
            tags.dimmed(),
        );
        if !scenario.description.is_empty() {
            ui::dim(&format!("  {}", scenario.description));
        }
    }
}

pub fn run(ctx: &Context) -> Result<()> {
    let builtins = acctest::scenarios::builtins()?;
    ui::header("Built-in Scenarios");
    print_scenarios(&builtins);

    let config = Config::load()?;
    let configured = super::configured(&config)?;
    if !configured.is_empty() {
        ui::section("Configured Scenarios");
        print_scenarios(&configured);
    }

    if !ctx.quiet {
        println!();
        ui::dim(&format!(
            "{} scenarios. Run one with `panos-acc run <NAME>`.",
            builtins.len() + configured.len()
        ));
    }
    Ok(())
}
