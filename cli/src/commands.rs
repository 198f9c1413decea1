use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use raidscope_core::{
    AbilityBreakdown, AttemptInterval, BreakdownQuery, BreakdownSource, EventKind, HealMode,
    SharedSession, StoreState, ViewRow, ViewerConfigExt, ability_breakdown,
};

use crate::CliContext;

const LOAD_TIMEOUT: Duration = Duration::from_secs(15);

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn open_session(ctx: &CliContext) -> Result<SharedSession, String> {
    ctx.session()
        .await
        .ok_or_else(|| "No instance open, use `open <instance-id>`".to_string())
}

fn format_ts(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_abilities(abilities: &[Option<u32>]) -> String {
    if abilities.is_empty() {
        return "-".to_string();
    }
    abilities
        .iter()
        .map(|ability| match ability {
            Some(id) => id.to_string(),
            None => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn print_row(row: &ViewRow) {
    let target = row
        .attribution
        .target
        .map(|unit| unit.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<14} {:>10}  {:<28} {:<28} {}",
        format_ts(row.event.timestamp),
        row.event.id,
        row.attribution.source.to_string(),
        target,
        format_abilities(&row.attribution.abilities)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Instance lifecycle
// ─────────────────────────────────────────────────────────────────────────────

pub async fn open(instance_id: u64, ctx: &CliContext) -> Result<(), String> {
    ctx.open(instance_id).await;
    println!("Opened instance {instance_id}");
    Ok(())
}

pub async fn close(ctx: &CliContext) -> Result<(), String> {
    if ctx.close().await {
        println!("Instance closed");
    } else {
        println!("No instance open");
    }
    Ok(())
}

pub async fn refresh(ctx: &CliContext) -> Result<(), String> {
    if !ctx.refresh().await {
        return Err("Poller is not running".to_string());
    }
    println!("Refresh requested");
    Ok(())
}

pub async fn show_meta(ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    let Some(meta) = session.meta() else {
        println!("Metadata not loaded yet");
        return Ok(());
    };
    println!("Instance:   {}", meta.instance_meta_id);
    println!("Map:        {}", meta.map_id);
    println!("Start:      {}", format_ts(meta.start_ts));
    match meta.end_ts {
        Some(end) => println!("End:        {}", format_ts(end)),
        None => println!("End:        (ongoing)"),
    }
    println!("Expired:    {}", meta.expired);
    println!("Polling:    {}", ctx.is_polling().await);
    Ok(())
}

pub async fn show_participants(ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    if session.participants().is_empty() {
        println!("No participants");
        return Ok(());
    }
    println!("{:<14} {:<30} Class", "Character", "Name");
    println!("{}", "-".repeat(52));
    for participant in session.participants() {
        println!(
            "{:<14} {:<30} {}",
            participant.character_id, participant.name, participant.hero_class_id
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

pub async fn view(kind: &str, limit: usize, ctx: &CliContext) -> Result<(), String> {
    let kind = EventKind::parse(kind).ok_or_else(|| format!("Unknown event kind '{kind}'"))?;
    let session = open_session(ctx).await?;

    let (mut snapshot, mut watch, was_loaded) = {
        let mut session = session.write().await;
        let was_loaded = session.state(kind) == StoreState::Ready;
        let (snapshot, watch) = session.watch(kind);
        (snapshot, watch, was_loaded)
    };

    if !was_loaded {
        if !ctx.load(kind).await {
            return Err("Poller is not running".to_string());
        }
        match tokio::time::timeout(LOAD_TIMEOUT, watch.changed()).await {
            Ok(true) => snapshot = session.write().await.view(kind),
            Ok(false) => return Err("Instance was closed".to_string()),
            Err(_) => {
                println!("{kind} is still loading, try again shortly");
                return Ok(());
            }
        }
    }

    println!(
        "{:<14} {:>10}  {:<28} {:<28} Abilities",
        "Time", "Id", "Source", "Target"
    );
    println!("{}", "-".repeat(96));
    let start = snapshot.len().saturating_sub(limit);
    for row in &snapshot.rows[start..] {
        print_row(row);
    }
    println!("{} of {} {kind} events shown", snapshot.len().min(limit), snapshot.len());
    Ok(())
}

pub async fn show_sources(ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    for unit in session.sources() {
        let marker = if session.filter().sources().contains(&unit.unit_id) { "*" } else { " " };
        println!("{marker} {unit}");
    }
    println!("{} sources (* = selected)", session.sources().len());
    Ok(())
}

pub async fn show_targets(ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    for unit in session.targets() {
        let marker = if session.filter().targets().contains(&unit.unit_id) { "*" } else { " " };
        println!("{marker} {unit}");
    }
    println!("{} targets (* = selected)", session.targets().len());
    Ok(())
}

pub async fn show_abilities(ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    for ability in session.abilities() {
        let marker = if session.filter().abilities().contains(ability) { "*" } else { " " };
        println!("{marker} {ability}");
    }
    println!("{} abilities (* = selected)", session.abilities().len());
    Ok(())
}

pub async fn show_attempts(ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    if session.attempts().is_empty() {
        println!("No attempts");
        return Ok(());
    }
    println!(
        "{:<10} {:<10} {:<14} {:<14} {:>8} Kill",
        "Attempt", "Encounter", "Start", "End", "Secs"
    );
    println!("{}", "-".repeat(66));
    for attempt in session.attempts() {
        let interval = AttemptInterval::from(attempt);
        let active = session.filter().intervals().contains(&interval);
        println!(
            "{:<10} {:<10} {:<14} {:<14} {:>8} {}{}",
            attempt.attempt_id,
            attempt.encounter_id,
            format_ts(attempt.start_ts),
            format_ts(attempt.end_ts),
            interval.duration() / 1000,
            if attempt.is_kill { "yes" } else { "no" },
            if active { "  (active)" } else { "" }
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Filters
// ─────────────────────────────────────────────────────────────────────────────

pub async fn set_intervals(ids: &[u64], all: bool, ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let mut session = session.write().await;

    let mut intervals = Vec::new();
    for attempt in session.attempts() {
        if all || ids.contains(&attempt.attempt_id) {
            intervals.push(AttemptInterval::from(attempt));
        }
    }
    if !all && intervals.len() != ids.len() {
        return Err("Unknown attempt id, see `attempts`".to_string());
    }

    session.set_attempt_intervals(intervals);
    let published = session.publish_pending();
    println!(
        "{} attempts active, {}s total, {} views refreshed",
        session.filter().intervals().len(),
        session.attempt_total_duration() / 1000,
        published.len()
    );
    Ok(())
}

pub async fn filter_sources(ids: &[u64], all: bool, ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let mut session = session.write().await;
    let selection: Vec<u64> = if all {
        session.sources().iter().map(|unit| unit.unit_id).collect()
    } else {
        ids.to_vec()
    };
    session.set_source_filter(selection);
    session.publish_pending();
    println!("{} sources selected", session.filter().sources().len());
    Ok(())
}

pub async fn filter_targets(ids: &[u64], all: bool, ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let mut session = session.write().await;
    let selection: Vec<u64> = if all {
        session.targets().iter().map(|unit| unit.unit_id).collect()
    } else {
        ids.to_vec()
    };
    session.set_target_filter(selection);
    session.publish_pending();
    println!("{} targets selected", session.filter().targets().len());
    Ok(())
}

pub async fn filter_abilities(ids: &[u32], all: bool, ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let mut session = session.write().await;
    let selection: Vec<u32> = if all {
        session.abilities().iter().copied().collect()
    } else {
        ids.to_vec()
    };
    session.set_ability_filter(selection);
    session.publish_pending();
    println!("{} abilities selected", session.filter().abilities().len());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Breakdown
// ─────────────────────────────────────────────────────────────────────────────

fn amount_label(query: &BreakdownQuery) -> &'static str {
    match (query.source, query.heal_mode) {
        (BreakdownSource::Damage, _) => BreakdownSource::Damage.amount_label(),
        (BreakdownSource::Heal, HealMode::Total) => BreakdownSource::Heal.amount_label(),
        (BreakdownSource::Heal, HealMode::Effective) => "Effective",
        (BreakdownSource::Heal, HealMode::Overheal) => "Overheal",
    }
}

pub async fn breakdown(query: BreakdownQuery, ctx: &CliContext) -> Result<(), String> {
    let session = open_session(ctx).await?;
    let session = session.read().await;
    let rows: Vec<AbilityBreakdown> = ability_breakdown(&session, &query);
    if rows.is_empty() {
        println!("Nothing to show, load the views and select filters first");
        return Ok(());
    }

    if query.inverse {
        println!("Taken by the selected sources");
    }
    let seconds = (session.attempt_total_duration() as f64 / 1000.0).max(1.0);
    println!(
        "{:<10} {:>8} {:>14} {:>14} {:>10} {:>10}",
        "Ability",
        "Hits",
        amount_label(&query),
        "Effective",
        "Avg",
        "Per sec"
    );
    println!("{}", "-".repeat(72));
    for row in &rows {
        println!(
            "{:<10} {:>8} {:>14} {:>14} {:>10.1} {:>10.1}",
            row.ability_id,
            row.hits,
            row.amount,
            row.effective,
            row.average(),
            row.amount as f64 / seconds
        );
        if row.by_hit.len() > 1 {
            for hit in &row.by_hit {
                println!(
                    "  {:<8} {:>8} {:>14} {:>14} {:>10.1}",
                    format!("{:#06x}", hit.hit_mask),
                    hit.hits,
                    hit.amount,
                    hit.effective,
                    hit.average()
                );
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

pub async fn show_config(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.config.read().await;
    println!("export_base_url    = {}", config.export_base_url);
    println!("poll_interval_secs = {}", config.poll_interval_secs);
    match config.instance_id {
        Some(id) => println!("instance_id        = {id}"),
        None => println!("instance_id        = (none)"),
    }
    Ok(())
}

pub async fn save_config(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.config.read().await;
    config.validate().map_err(|e| e.to_string())?;
    config.save().map_err(|e| e.to_string())?;
    println!("Configuration saved");
    Ok(())
}

pub fn exit() -> Result<(), String> {
    writeln!(std::io::stdout(), "quitting...").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())
}
