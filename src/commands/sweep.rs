//! `panos-acc sweep`

use acctest::prefix::{self, PREFIX_BASE};
use anyhow::{Result, bail};
use dialoguer::Confirm;
use panoskit::{CallContext, Location};

use crate::Context;
use crate::cli::SweepArgs;
use crate::config::Config;
use crate::ui;

/// Parse `shared`, `panorama`, `device-group:NAME`, `template:NAME[/VSYS]`
/// or `vsys:NAME`.
pub fn parse_location(text: &str) -> Result<Location> {
    let (variant, name) = match text.split_once(':') {
        Some((variant, name)) => (variant, Some(name)),
        None => (text, None),
    };
    let name = name.filter(|n| !n.is_empty());
    Ok(match (variant, name) {
        ("shared", None) => Location::shared(),
        ("panorama", None) => Location::panorama(),
        ("device-group" | "device_group", Some(name)) => Location::device_group(name),
        ("template", Some(name)) => match name.split_once('/') {
            Some((template, vsys)) if !template.is_empty() && !vsys.is_empty() => {
                Location::template_vsys(template, vsys)
            }
            Some(_) => bail!("invalid template location '{text}'"),
            None => Location::template(name),
        },
        ("vsys", Some(name)) => Location::vsys(name),
        _ => bail!(
            "invalid location '{text}': expected shared, panorama, device-group:NAME, template:NAME[/VSYS] or vsys:NAME"
        ),
    })
}

/// The shared test prefix, or one case's generated prefix.
fn is_test_prefix(text: &str) -> bool {
    text == PREFIX_BASE || prefix::is_generated(text)
}

pub fn run(ctx: &Context, args: SweepArgs) -> Result<()> {
    let location = parse_location(&args.location)?;
    let test_prefix = is_test_prefix(&args.prefix);
    if args.yes && !args.dry_run && !test_prefix {
        bail!(
            "'{}' is not a test prefix; run without --yes to confirm the deletion",
            args.prefix
        );
    }
    let config = Config::load()?;
    let client = config.client(false)?;
    let mut call = CallContext::new();
    if let Some(timeout) = config.timeout() {
        call = call.with_timeout(timeout);
    }

    let names = acctest::sweep(&client, &call, &args.kind, &location, &args.prefix, true)?;
    if names.is_empty() {
        ui::success(&format!(
            "No {} entries starting with '{}' at {}",
            args.kind, args.prefix, args.location
        ));
        return Ok(());
    }

    ui::header(&format!("Leftover {} entries", args.kind));
    for name in &names {
        println!("  {name}");
    }
    println!();
    if args.dry_run {
        ui::info(&format!("Dry run: {} entries would be deleted", names.len()));
        return Ok(());
    }

    if !test_prefix {
        ui::warn(&format!(
            "'{}' is not a test prefix; these entries may not be test leftovers",
            args.prefix
        ));
    }
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} entries?", names.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    let deleted = acctest::sweep(&client, &call, &args.kind, &location, &args.prefix, false)?;
    if !ctx.quiet {
        ui::success(&format!("Deleted {} entries", deleted.len()));
    }
    Ok(())
}
