use std::time::Duration;

use chrono::{DateTime, Utc};
use schoolsync_core::{Outcome, AUTO_BACKUP_SLOT};
use schoolsync_domain::{Snapshot, SNAPSHOT_FORMAT_VERSION};

use crate::cli::{
    output,
    registry::{CommandEntry, CommandRegistry},
    shell_context::{CommandResult, ShellContext},
};
use crate::CommandError;

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    for entry in definitions() {
        registry.register(entry);
    }
}

fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("help", "Show available commands", "help [command]", cmd_help),
        CommandEntry::new("version", "Show version information", "version", cmd_version),
        CommandEntry::new(
            "status",
            "Show backend, auto-save and sync state",
            "status",
            cmd_status,
        ),
        CommandEntry::new(
            "save",
            "Save a backup to a chosen file",
            "save [path]",
            cmd_save,
        ),
        CommandEntry::new(
            "restore",
            "Restore a backup file into the remote store",
            "restore [path]",
            cmd_restore,
        ),
        CommandEntry::new(
            "auto-save",
            "Write the auto-backup slot now",
            "auto-save",
            cmd_auto_save,
        ),
        CommandEntry::new(
            "load-auto",
            "Show the contents of the auto-backup slot",
            "load-auto",
            cmd_load_auto,
        ),
        CommandEntry::new(
            "sync",
            "Compare the last backup with the remote store",
            "sync",
            cmd_sync,
        ),
        CommandEntry::new(
            "toggle-auto-save",
            "Turn periodic auto-save on or off",
            "toggle-auto-save [on|off]",
            cmd_toggle_auto_save,
        ),
        CommandEntry::new(
            "watch",
            "Keep running so the auto-save timer fires (Ctrl-C to stop)",
            "watch [seconds]",
            cmd_watch,
        ),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.command(&name.to_ascii_lowercase()) {
            Some(entry) => {
                output::section(format!("Help: {}", entry.name));
                output::info(format!("  Description: {}", entry.description));
                output::info(format!("  Usage: {}", entry.usage));
            }
            None => context.suggest_command(name),
        }
        return Ok(());
    }

    output::section("Available commands");
    for entry in context.registry.list() {
        output::info(format!("  {:<18} {}", entry.name, entry.description));
    }
    output::info("Use `help <command>` for details.");
    Ok(())
}

fn cmd_version(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::section(format!("schoolsync {}", env!("CARGO_PKG_VERSION")));
    output::info(format!("  Snapshot format: v{SNAPSHOT_FORMAT_VERSION}"));
    output::info(format!("  Backend        : {}", context.session.backend_kind));
    Ok(())
}

fn cmd_status(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let session = &context.session;
    let backup = &session.backup;
    let now = session.clock.now();

    output::section("Backup status");
    output::info(format!(
        "  Data directory : {}",
        session.config_manager.base_dir().display()
    ));
    output::info(format!("  Backend        : {}", session.backend_kind));
    let auto_save = if backup.auto_save_enabled() {
        format!("on (every {} min)", backup.interval().as_secs() / 60)
    } else {
        "off".to_string()
    };
    output::info(format!("  Auto-save      : {auto_save}"));
    output::info(format!(
        "  Last backup    : {}",
        describe_last_backup(backup.last_backup(), now)
    ));
    match backup.sync_status() {
        Some(status) => output::info(format!("  Sync           : {}", status.summary)),
        None => output::info("  Sync           : unknown"),
    }

    if let Some(filesystem) = &session.filesystem {
        let archives = context
            .runtime
            .block_on(filesystem.list_archives(AUTO_BACKUP_SLOT))?;
        output::info(format!(
            "  Archives       : {} kept in {}",
            archives.len(),
            filesystem.backup_dir().display()
        ));
        if let Some(newest) = archives.first() {
            output::info(format!("  Newest archive : {}", newest.file_name));
        }
    }
    Ok(())
}

fn cmd_save(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(path) = args.first() {
        context.dialog.queue(*path);
    }
    let runtime = &context.runtime;
    runtime.block_on(context.session.backup.save_now());
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(path) = args.first() {
        context.dialog.queue(*path);
    }
    let runtime = &context.runtime;
    let _ = runtime.block_on(context.session.backup.restore());
    Ok(())
}

fn cmd_auto_save(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let runtime = &context.runtime;
    let _ = runtime.block_on(context.session.backup.auto_save_now());
    Ok(())
}

fn cmd_load_auto(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let service = context.session.backup.service();
    match context.runtime.block_on(service.load_auto_save()) {
        Outcome::Success(snapshot) => {
            print_snapshot(&snapshot);
            Ok(())
        }
        Outcome::Absent(_) => {
            output::info("No auto-backup found.");
            Ok(())
        }
        Outcome::Failed(err) => Err(err.into()),
    }
}

fn cmd_sync(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let runtime = &context.runtime;
    if let Some(status) = runtime.block_on(context.session.backup.check_sync()) {
        for change in &status.changes {
            output::info(format!(
                "  {:<20} {} → {}",
                change.table, change.previous, change.current
            ));
        }
    }
    Ok(())
}

fn cmd_toggle_auto_save(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let enabled = match args.first().map(|value| value.to_ascii_lowercase()) {
        None => !context.session.backup.auto_save_enabled(),
        Some(value) => parse_switch(&value).ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "Expected `on` or `off`, got `{value}`. Usage: toggle-auto-save [on|off]"
            ))
        })?,
    };
    let runtime = &context.runtime;
    runtime.block_on(context.session.backup.set_auto_save_enabled(enabled));
    Ok(())
}

fn cmd_watch(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let limit = match args.first() {
        Some(value) => Some(value.parse::<u64>().map_err(|_| {
            CommandError::InvalidArguments(format!("Invalid number of seconds: `{value}`"))
        })?),
        None => None,
    };
    if !context.session.backup.auto_save_enabled() {
        output::warning("Auto-save is off; nothing will be written while watching.");
    }
    output::info(match limit {
        Some(secs) => format!("Watching for {secs} s."),
        None => "Watching; press Ctrl-C to stop.".to_string(),
    });

    context.runtime.block_on(async {
        match limit {
            Some(secs) => {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok(())
            }
            None => tokio::signal::ctrl_c().await,
        }
    })?;

    output::info(format!(
        "Stopped watching. Last backup: {}",
        describe_last_backup(
            context.session.backup.last_backup(),
            context.session.clock.now()
        )
    ));
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    output::section(format!(
        "Auto-backup from {}",
        snapshot.timestamp().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (table, count) in snapshot.row_counts() {
        output::info(format!("  {:<20} {count}", table));
    }
    output::info(format!("  {:<20} {}", "total", snapshot.total_rows()));
}

fn describe_last_backup(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last {
        None => "never".to_string(),
        Some(at) => {
            let minutes = (now - at).num_minutes().max(0);
            format!("{} ({minutes} min ago)", at.format("%Y-%m-%d %H:%M:%S UTC"))
        }
    }
}
