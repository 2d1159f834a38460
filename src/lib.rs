pub mod cli;
pub mod config;
pub mod select;
pub mod stats;
pub mod table;
pub mod view;

use anyhow::Context;
use cli::{Cli, Command, RedirectArgs, SelectArgs, ShowArgs};
use config::{Config, Profile, Redirect};
use select::StdinConfirm;
use stats::nvidia_smi::{FileSmiProvider, NvidiaSmiExecutor, NvidiaSmiProvider};
use stats::ps::{FilePsProvider, ProcessListProvider, PsExecutor};
use std::path::Path;
use std::process;
use table::StyleSpec;
use tracing::info;
use view::{Column, ViewOptions};

/// Dispatch the parsed command line; returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = Config::default_path();
    let mut config = Config::load(&config_path)?;

    match cli.command.unwrap_or(Command::Show(ShowArgs::default())) {
        Command::Show(args) => {
            show(&args, &mut config, &config_path)?;
            Ok(0)
        }
        Command::Select(args) => select_devices(&args, &config),
        Command::Redirect(args) => {
            redirect(&args, &mut config, &config_path)?;
            Ok(0)
        }
    }
}

/// Explicit flags win over the loaded profile, which wins over the
/// built-in defaults.
fn resolve_view_options(args: &ShowArgs, config: &Config) -> anyhow::Result<ViewOptions> {
    let profile = match &args.profile {
        Some(name) => config
            .profiles
            .get(name)
            .cloned()
            .with_context(|| format!("no profile named {name:?}"))?,
        None => Profile::default(),
    };

    let columns = args
        .columns
        .clone()
        .or(profile.columns)
        .unwrap_or_else(Column::default_set);
    let style = args.style.clone().or(profile.style);
    let col_style = style.map(|s| StyleSpec::parse(&s)).transpose()?;
    let limits = match &args.limits {
        Some(spec) => Some(cli::parse_limits(spec)?),
        None => profile.limits,
    };
    let show_command = if args.no_command {
        false
    } else {
        profile.show_command.unwrap_or(true)
    };
    let vertical = args.vertical || profile.vertical.unwrap_or(false);

    Ok(ViewOptions {
        columns,
        col_style,
        limits,
        show_command,
        vertical,
    })
}

fn show(args: &ShowArgs, config: &mut Config, config_path: &Path) -> anyhow::Result<()> {
    let opts = resolve_view_options(args, config)?;

    if let Some(name) = &args.save_profile {
        let profile = Profile {
            columns: Some(opts.columns.clone()),
            style: opts.col_style.as_ref().map(ToString::to_string),
            limits: opts.limits.clone(),
            show_command: Some(opts.show_command),
            vertical: Some(opts.vertical),
        };
        config.profiles.insert(name.clone(), profile);
        config.save(config_path)?;
        info!("Saved profile {:?} to {:?}", name, config_path);
    }

    let smi = smi_provider(config.redirect.as_ref());
    let ps = ps_provider(config.redirect.as_ref());
    let records = stats::collect(smi.as_ref(), ps.as_ref())?;
    println!("{}", view::report(&records, &opts)?);
    Ok(())
}

fn select_devices(args: &SelectArgs, config: &Config) -> anyhow::Result<i32> {
    let smi = smi_provider(config.redirect.as_ref());
    let ps = ps_provider(config.redirect.as_ref());
    let records = stats::collect(smi.as_ref(), ps.as_ref())?;

    let opts = select::SelectOptions {
        allow_nonfree: args.allow_nonfree,
        assume_yes: args.yes,
        blacklist: args.blacklist.clone(),
    };
    let selected = select::auto_select(&records, args.num, &opts, &mut StdinConfirm)?;
    let devices = select::devices_value(&selected);

    if args.command.is_empty() {
        println!("using gpu: {devices}");
        return Ok(0);
    }

    info!("Running {:?} with {}={}", args.command, select::CUDA_VISIBLE_DEVICES, devices);
    let status = process::Command::new(&args.command[0])
        .args(&args.command[1..])
        .env(select::CUDA_VISIBLE_DEVICES, &devices)
        .status()
        .with_context(|| format!("failed to run {:?}", args.command[0]))?;
    Ok(status.code().unwrap_or(1))
}

fn redirect(args: &RedirectArgs, config: &mut Config, config_path: &Path) -> anyhow::Result<()> {
    if args.clear {
        config.redirect = None;
    } else {
        let mut redirect = config.redirect.clone().unwrap_or_default();
        if args.nvsmi.is_some() {
            redirect.nvsmi_src = args.nvsmi.clone();
        }
        if args.apps.is_some() {
            redirect.apps_src = args.apps.clone();
        }
        if args.ps.is_some() {
            redirect.ps_src = args.ps.clone();
        }
        config.redirect = if redirect.is_empty() {
            None
        } else {
            Some(redirect)
        };
    }
    config.save(config_path)?;
    info!("Updated replay sources in {:?}", config_path);
    Ok(())
}

fn smi_provider(redirect: Option<&Redirect>) -> Box<dyn NvidiaSmiProvider> {
    match redirect {
        Some(r) if r.nvsmi_src.is_some() || r.apps_src.is_some() => {
            Box::new(FileSmiProvider {
                devices: r.nvsmi_src.clone(),
                apps: r.apps_src.clone(),
            })
        }
        _ => Box::new(NvidiaSmiExecutor::new()),
    }
}

fn ps_provider(redirect: Option<&Redirect>) -> Box<dyn ProcessListProvider> {
    match redirect.and_then(|r| r.ps_src.clone()) {
        Some(source) => Box::new(FilePsProvider { source }),
        None => Box::new(PsExecutor),
    }
}
