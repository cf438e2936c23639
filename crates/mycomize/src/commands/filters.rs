//! Filter preference command handlers.

use mycomize_core::FilterPreferences;

use crate::cli::{FiltersArgs, FiltersCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(prefs: &FilterPreferences) -> String {
    let show = |all: bool, set: &std::collections::BTreeSet<String>| {
        if all || set.is_empty() {
            "all".to_owned()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    [
        format!(
            "Domains:        {}",
            show(prefs.show_all_domains, &prefs.domains)
        ),
        format!(
            "Device classes: {}",
            show(prefs.show_all_device_classes, &prefs.device_classes)
        ),
    ]
    .join("\n")
}

pub fn handle(args: FiltersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::preference_store(&config::active_user(global))?;

    let prefs = match args.command {
        FiltersCommand::Show => store.current(),

        FiltersCommand::Set {
            domains,
            device_classes,
            all_domains,
            all_device_classes,
        } => {
            if domains.is_empty()
                && device_classes.is_empty()
                && !all_domains
                && !all_device_classes
            {
                return Err(CliError::Validation {
                    field: "filters".into(),
                    reason: "give --domain, --device-class, --all-domains or --all-device-classes"
                        .into(),
                });
            }
            // Only the dimensions that were mentioned change.
            store.update(|p| {
                if all_domains {
                    p.show_all_domains = true;
                    p.domains.clear();
                } else if !domains.is_empty() {
                    p.show_all_domains = false;
                    p.domains = domains.into_iter().collect();
                }
                if all_device_classes {
                    p.show_all_device_classes = true;
                    p.device_classes.clear();
                } else if !device_classes.is_empty() {
                    p.show_all_device_classes = false;
                    p.device_classes = device_classes.into_iter().collect();
                }
            })?
        }

        FiltersCommand::ToggleDomain { domain } => store.toggle_domain(&domain)?,
        FiltersCommand::ToggleDeviceClass { class } => store.toggle_device_class(&class)?,
        FiltersCommand::Reset => store.reset()?,
    };

    let out = output::render_single(&global.output, &prefs, detail, |p| {
        p.domains.iter().cloned().collect::<Vec<_>>().join(",")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
