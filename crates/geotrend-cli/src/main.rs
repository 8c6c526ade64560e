//! `geotrend` binary

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use geotrend_cli::{describe_view, load, replay, CommonArgs, LoadArgs, OutputFormat, ReplayArgs, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("config")
            .long("config")
            .default_value(DEFAULT_CONFIG_PATH)
            .value_parser(value_parser!(PathBuf))
            .help("Pipeline configuration (TOML)"),
    )
    .arg(
        Arg::new("fixture")
            .long("fixture")
            .value_parser(value_parser!(PathBuf))
            .help("Serve records from a JSON fixture instead of the remote service"),
    )
    .arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Write charts as JSON lines"),
    )
}

fn cli() -> Command {
    Command::new("geotrend")
        .version(geotrend_core::VERSION)
        .about("Compare an entity's yearly values against its group and region averages")
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(common_args(
            Command::new("load")
                .about("Load and print one entity's chart")
                .arg(
                    Arg::new("entity")
                        .long("entity")
                        .required(true)
                        .help("Entity identifier"),
                )
                .arg(
                    Arg::new("variable")
                        .long("variable")
                        .required(true)
                        .help("Variable field name from the config"),
                ),
        ))
        .subcommand(common_args(
            Command::new("replay")
                .about("Replay a timed hover script through the chart pipeline")
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Replay script (TOML)"),
                ),
        ))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn common(args: &ArgMatches) -> CommonArgs {
    CommonArgs {
        config: args
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        fixture: args.get_one::<PathBuf>("fixture").cloned(),
        format: OutputFormat::from_json_flag(args.get_flag("json")),
    }
}

fn required(args: &ArgMatches, name: &str) -> Result<String> {
    args.get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("load", args)) => {
            let load_args = LoadArgs {
                common: common(args),
                entity: required(args, "entity")?,
                variable: required(args, "variable")?,
            };
            load(&load_args, std::io::stdout()).await?;
        }
        Some(("replay", args)) => {
            let replay_args = ReplayArgs {
                common: common(args),
                script: args
                    .get_one::<PathBuf>("script")
                    .cloned()
                    .context("missing --script")?,
            };
            let format = replay_args.common.format;
            let view = replay(&replay_args, std::io::stdout(), ctrl_c()).await?;
            match format {
                OutputFormat::Table => println!("{}", describe_view(&view)),
                OutputFormat::Json => println!("{}", serde_json::to_string(&view)?),
            }
        }
        _ => {
            cli().print_help()?;
        }
    }

    Ok(())
}
