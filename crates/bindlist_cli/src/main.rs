//! Snapshot replay tool.
//!
//! # Responsibility
//! - Verify `bindlist_core` linkage with a version line.
//! - Replay JSON snapshot files through a grouped collection and print the
//!   change events each file produces.
//!
//! Usage: `bindlist_cli [--log-level L] [--log-dir DIR] <snapshot.json>...`

use bindlist_core::{
    core_version, default_log_level, init_logging, CollectionChange, GroupedCollection,
    Identified, ReconcilePolicy, Subscription,
};
use clap::Parser;
use log::info;
use serde::Deserialize;
use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Debug, Clone, Deserialize)]
struct Record {
    id: u64,
    group: String,
    title: String,
}

impl Identified for Record {
    type Id = u64;

    fn identity(&self) -> &u64 {
        &self.id
    }
}

#[derive(Debug, Parser)]
#[command(name = "bindlist_cli")]
#[command(about = "Replay JSON snapshots through a grouped collection", long_about = None)]
struct Args {
    /// One of trace|debug|info|warn|error; defaults by build mode.
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "BINDLIST_LOG_DIR")]
    log_dir: Option<String>,

    /// Snapshot files, applied in order.
    files: Vec<String>,
}

fn run(args: Args) -> Result<(), String> {
    println!("bindlist_core version={}", core_version());

    if let Some(log_dir) = args.log_dir {
        let level = args
            .log_level
            .unwrap_or_else(|| default_log_level().to_string());
        init_logging(&level, &log_dir)?;
    }

    if args.files.is_empty() {
        return Ok(());
    }

    let grouped = GroupedCollection::named(
        "cli",
        Vec::new(),
        |record: &Record| record.group.clone(),
        ReconcilePolicy::by_identity().with_merge(|existing: &mut Record, incoming: &Record| {
            if existing.title == incoming.title {
                return false;
            }
            existing.title = incoming.title.clone();
            true
        }),
    );

    let events: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let group_events = Rc::clone(&events);
    let _groups_subscription = grouped.subscribe(move |change| {
        if let CollectionChange::Added { items, start_index } = change {
            let keys = items
                .iter()
                .map(|group| group.key().as_str())
                .collect::<Vec<_>>()
                .join(",");
            group_events
                .borrow_mut()
                .push(format!("groups added at {start_index}: [{keys}]"));
        }
    });

    let mut member_subscriptions: Vec<(String, Subscription)> = Vec::new();
    for path in &args.files {
        let json = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read `{path}`: {err}"))?;

        // Subscribe to groups that exist before this snapshot so member
        // merges and appends are reported.
        for group in grouped.groups() {
            if member_subscriptions.iter().any(|(key, _)| key == group.key()) {
                continue;
            }
            let member_events = Rc::clone(&events);
            let key = group.key().clone();
            let label = key.clone();
            let subscription = group.members().subscribe(move |change: &CollectionChange<Record>| {
                member_events
                    .borrow_mut()
                    .push(describe_member_change(&label, change));
            });
            member_subscriptions.push((key, subscription));
        }

        let report = grouped
            .update_items_from_json(&json)
            .map_err(|err| format!("failed to apply `{path}`: {err}"))?;
        info!(
            "event=snapshot_applied module=cli status=ok path={} created_groups={} added_members={}",
            path, report.created_groups, report.added_members
        );

        println!("{path}:");
        for event in events.borrow_mut().drain(..) {
            println!("  {event}");
        }
    }

    for group in grouped.groups() {
        let titles = group.members().with_items(|records| {
            records
                .iter()
                .map(|record| record.title.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        });
        println!("[{}] {}", group.key(), titles);
    }
    Ok(())
}

fn describe_member_change(key: &str, change: &CollectionChange<Record>) -> String {
    match change {
        CollectionChange::Added { items, start_index } => {
            let ids = items
                .iter()
                .map(|record| record.id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            format!("{key}: added at {start_index}: [{ids}]")
        }
        CollectionChange::Merged { indices } => format!("{key}: merged {indices:?}"),
        CollectionChange::OrderChanged => format!("{key}: order changed"),
    }
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bindlist_cli: {err}");
            ExitCode::FAILURE
        }
    }
}
