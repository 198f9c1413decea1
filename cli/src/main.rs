use std::io::Write;

use clap::{Parser, Subcommand};
use raidscope_cli::{CliContext, commands, logging, readline};
use raidscope_core::{BreakdownQuery, BreakdownSource, HealMode, ViewerConfig, ViewerConfigExt};

/// Startup flags; each overrides the stored configuration
#[derive(Parser)]
#[command(version, about = "Live combat-log instance viewer")]
struct Args {
    /// Base URL of the export API
    #[arg(long)]
    base_url: Option<String>,
    /// Instance to open on startup
    #[arg(long)]
    instance: Option<u64>,
    /// Seconds between polls
    #[arg(long)]
    poll_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();
    let args = Args::parse();

    let mut config = ViewerConfig::load();
    if let Some(url) = args.base_url {
        config.export_base_url = url;
    }
    if let Some(secs) = args.poll_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(id) = args.instance {
        config.instance_id = Some(id);
    }
    config.validate().map_err(|e| e.to_string())?;

    let startup_instance = config.instance_id;
    let ctx = CliContext::new(config);
    if let Some(id) = startup_instance {
        commands::open(id, &ctx).await?;
    }

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    ctx.close().await;
    Ok(())
}

#[derive(Parser)]
#[command(about = "raidscope commands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an instance and start polling it
    Open { instance: u64 },
    /// Stop polling and drop the open instance
    Close,
    /// Poll now instead of waiting for the timer
    Refresh,
    Meta,
    Participants,
    Attempts,
    /// Show the filtered view of an event kind (name or wire code)
    View {
        kind: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    Sources,
    Targets,
    Abilities,
    /// Select the attempts whose time windows are active
    Intervals {
        ids: Vec<u64>,
        #[arg(long)]
        all: bool,
    },
    FilterSources {
        ids: Vec<u64>,
        #[arg(long)]
        all: bool,
    },
    FilterTargets {
        ids: Vec<u64>,
        #[arg(long)]
        all: bool,
    },
    FilterAbilities {
        ids: Vec<u32>,
        #[arg(long)]
        all: bool,
    },
    /// Per-ability totals over the filtered damage (or heal) views, split by hit mask
    Breakdown {
        #[arg(long)]
        heal: bool,
        /// Damage or healing taken by the selected sources
        #[arg(long)]
        inverse: bool,
        /// Heal amount to show: total, effective or overheal
        #[arg(long, default_value = "total")]
        heal_mode: HealMode,
    },
    Config,
    SaveConfig,
    Exit,
}

fn breakdown_query(heal: bool, inverse: bool, heal_mode: HealMode) -> BreakdownQuery {
    BreakdownQuery {
        source: if heal {
            BreakdownSource::Heal
        } else {
            BreakdownSource::Damage
        },
        inverse,
        heal_mode,
    }
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "raidscope".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Open { instance }) => commands::open(*instance, ctx).await?,
        Some(Commands::Close) => commands::close(ctx).await?,
        Some(Commands::Refresh) => commands::refresh(ctx).await?,
        Some(Commands::Meta) => commands::show_meta(ctx).await?,
        Some(Commands::Participants) => commands::show_participants(ctx).await?,
        Some(Commands::Attempts) => commands::show_attempts(ctx).await?,
        Some(Commands::View { kind, limit }) => commands::view(kind, *limit, ctx).await?,
        Some(Commands::Sources) => commands::show_sources(ctx).await?,
        Some(Commands::Targets) => commands::show_targets(ctx).await?,
        Some(Commands::Abilities) => commands::show_abilities(ctx).await?,
        Some(Commands::Intervals { ids, all }) => commands::set_intervals(ids, *all, ctx).await?,
        Some(Commands::FilterSources { ids, all }) => {
            commands::filter_sources(ids, *all, ctx).await?
        }
        Some(Commands::FilterTargets { ids, all }) => {
            commands::filter_targets(ids, *all, ctx).await?
        }
        Some(Commands::FilterAbilities { ids, all }) => {
            commands::filter_abilities(ids, *all, ctx).await?
        }
        Some(Commands::Breakdown {
            heal,
            inverse,
            heal_mode,
        }) => {
            commands::breakdown(breakdown_query(*heal, *inverse, *heal_mode), ctx).await?
        }
        Some(Commands::Config) => commands::show_config(ctx).await?,
        Some(Commands::SaveConfig) => commands::save_config(ctx).await?,
        Some(Commands::Exit) => {
            commands::exit()?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_breakdown(line: &str) -> BreakdownQuery {
        let mut args = shlex::split(line).unwrap();
        args.insert(0, "raidscope".to_string());
        match Cli::try_parse_from(args).unwrap().command {
            Some(Commands::Breakdown {
                heal,
                inverse,
                heal_mode,
            }) => breakdown_query(heal, inverse, heal_mode),
            _ => panic!("not a breakdown command: {line}"),
        }
    }

    #[test]
    fn breakdown_defaults_to_damage_done() {
        assert_eq!(parse_breakdown("breakdown"), BreakdownQuery::default());
    }

    #[test]
    fn breakdown_flags_select_heal_mode_and_inverse() {
        let query = parse_breakdown("breakdown --heal --inverse --heal-mode overheal");
        assert_eq!(
            query,
            BreakdownQuery {
                source: BreakdownSource::Heal,
                inverse: true,
                heal_mode: HealMode::Overheal,
            }
        );
    }

    #[test]
    fn breakdown_rejects_unknown_heal_mode() {
        let args = ["raidscope", "breakdown", "--heal-mode", "absorbed"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
