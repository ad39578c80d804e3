//! `inspect` - show what a parameter bundle froze

use anyhow::{Context, Result};

use crate::cli::args::InspectArgs;
use crate::pipeline::ParameterBundle;
use crate::report::display_bundle;

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let bundle = ParameterBundle::load(&args.bundle)
        .with_context(|| format!("Failed to load bundle {}", args.bundle.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
    } else {
        display_bundle(&bundle);
    }
    Ok(())
}
