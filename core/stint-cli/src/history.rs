//! `stint history` subcommands.
//!
//! Works on the store directly; no engines or background threads are started.

use std::io::{self, Write};

use chrono::Local;
use clap::Subcommand;
use stint_core::{
    format_duration, load_config, DisplayMode, RecordStore, SessionRecord, StorageConfig,
};

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List sessions, newest first
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,

        /// Show at most this many sessions
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Only sessions carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one session in full
    Show { id: String },

    /// Rename a session
    Rename { id: String, name: String },

    /// Replace a session's notes
    Notes { id: String, notes: String },

    /// Add a tag to a session
    Tag { id: String, tag: String },

    /// Remove a tag from a session
    Untag { id: String, tag: String },

    /// Delete a session
    Delete { id: String },

    /// Delete every session
    Clear {
        /// Required; clearing cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(storage: &StorageConfig, command: HistoryCommand) -> Result<(), String> {
    let config = load_config(storage);
    let store = RecordStore::new(storage.history_file()).with_max_records(config.max_records);
    let mut out = io::stdout().lock();
    execute(&store, command, &mut out)
}

fn execute(
    store: &RecordStore,
    command: HistoryCommand,
    out: &mut impl Write,
) -> Result<(), String> {
    match command {
        HistoryCommand::List { json, limit, tag } => {
            let records: Vec<SessionRecord> = store
                .list()
                .into_iter()
                .filter(|r| tag.as_deref().map_or(true, |t| r.has_tag(t)))
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            if json {
                let text = serde_json::to_string_pretty(&records).map_err(|e| e.to_string())?;
                writeln!(out, "{text}").map_err(|e| e.to_string())?;
            } else if records.is_empty() {
                writeln!(out, "No sessions yet").map_err(|e| e.to_string())?;
            } else {
                for record in &records {
                    writeln!(out, "{}", summary_line(record)).map_err(|e| e.to_string())?;
                }
            }
        }
        HistoryCommand::Show { id } => {
            let record = store
                .get(&id)
                .ok_or_else(|| format!("Session record not found: {id}"))?;
            write_details(out, &record).map_err(|e| e.to_string())?;
        }
        HistoryCommand::Rename { id, name } => {
            let record = store.update(&id, |r| r.set_name(name))?;
            writeln!(out, "Renamed to \"{}\"", record.name).map_err(|e| e.to_string())?;
        }
        HistoryCommand::Notes { id, notes } => {
            store.update(&id, |r| r.set_notes(notes))?;
            writeln!(out, "Notes updated").map_err(|e| e.to_string())?;
        }
        HistoryCommand::Tag { id, tag } => {
            let record = store.update(&id, |r| {
                r.add_tag(&tag);
                Ok(())
            })?;
            writeln!(out, "Tags: {}", record.tags.join(", ")).map_err(|e| e.to_string())?;
        }
        HistoryCommand::Untag { id, tag } => {
            let record = store.update(&id, |r| {
                r.remove_tag(&tag);
                Ok(())
            })?;
            writeln!(out, "Tags: {}", record.tags.join(", ")).map_err(|e| e.to_string())?;
        }
        HistoryCommand::Delete { id } => {
            let message = if store.delete(&id)? {
                "Deleted"
            } else {
                "No session with that id"
            };
            writeln!(out, "{message}").map_err(|e| e.to_string())?;
        }
        HistoryCommand::Clear { yes } => {
            if !yes {
                return Err("refusing to clear history without --yes".to_string());
            }
            store.clear()?;
            writeln!(out, "History cleared").map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn summary_line(record: &SessionRecord) -> String {
    let kind = if record.is_countdown { "countdown" } else { "stopwatch" };
    format!(
        "{}  {}  {:>9}  {:<9}  {}",
        record.id,
        record.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        format_duration(record.duration, DisplayMode::HourMinSec),
        kind,
        record.name
    )
}

fn write_details(out: &mut impl Write, record: &SessionRecord) -> io::Result<()> {
    writeln!(out, "id:       {}", record.id)?;
    writeln!(out, "name:     {}", record.name)?;
    writeln!(
        out,
        "started:  {}",
        record.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        out,
        "ended:    {}",
        record.end_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        out,
        "duration: {}",
        format_duration(record.duration, DisplayMode::HourMinSec)
    )?;
    if let Some(target) = record.countdown_target {
        writeln!(
            out,
            "target:   {}",
            format_duration(target, DisplayMode::HourMinSec)
        )?;
    }
    if !record.category.is_empty() {
        writeln!(out, "category: {}", record.category)?;
    }
    if !record.tags.is_empty() {
        writeln!(out, "tags:     {}", record.tags.join(", "))?;
    }
    if !record.notes.is_empty() {
        writeln!(out, "notes:    {}", record.notes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tempfile::tempdir;

    fn seeded(dir: &std::path::Path) -> (RecordStore, String) {
        let store = RecordStore::new(dir.join("history.json"));
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let saved = store
            .save(SessionRecord::stopwatch(
                "Timer 1",
                start,
                start + chrono::Duration::seconds(95),
                Duration::from_secs(95),
            ))
            .unwrap();
        (store, saved.id)
    }

    fn output(store: &RecordStore, command: HistoryCommand) -> Result<String, String> {
        let mut buf = Vec::new();
        execute(store, command, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_list_prints_one_line_per_session() {
        let temp = tempdir().unwrap();
        let (store, id) = seeded(temp.path());

        let text = output(
            &store,
            HistoryCommand::List {
                json: false,
                limit: None,
                tag: None,
            },
        )
        .unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.contains(&id));
        assert!(text.contains("00:01:35"));
        assert!(text.contains("Timer 1"));
    }

    #[test]
    fn test_list_json_uses_file_field_names() {
        let temp = tempdir().unwrap();
        let (store, _id) = seeded(temp.path());

        let text = output(
            &store,
            HistoryCommand::List {
                json: true,
                limit: None,
                tag: None,
            },
        )
        .unwrap();

        assert!(text.contains("\"isCountdown\": false"));
        assert!(text.contains("\"duration\": \"00:01:35\""));
    }

    #[test]
    fn test_tag_then_filter() {
        let temp = tempdir().unwrap();
        let (store, id) = seeded(temp.path());

        output(
            &store,
            HistoryCommand::Tag {
                id: id.clone(),
                tag: "Focus".into(),
            },
        )
        .unwrap();
        let tagged = output(
            &store,
            HistoryCommand::List {
                json: false,
                limit: None,
                tag: Some("focus".into()),
            },
        )
        .unwrap();
        let untagged = output(
            &store,
            HistoryCommand::List {
                json: false,
                limit: None,
                tag: Some("other".into()),
            },
        )
        .unwrap();

        assert!(tagged.contains(&id));
        assert_eq!(untagged.trim(), "No sessions yet");
    }

    #[test]
    fn test_rename_rejects_empty_name() {
        let temp = tempdir().unwrap();
        let (store, id) = seeded(temp.path());

        let result = output(
            &store,
            HistoryCommand::Rename {
                id: id.clone(),
                name: String::new(),
            },
        );

        assert!(result.is_err());
        assert_eq!(store.get(&id).unwrap().name, "Timer 1");
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let temp = tempdir().unwrap();
        let (store, _id) = seeded(temp.path());

        assert!(output(&store, HistoryCommand::Clear { yes: false }).is_err());
        assert_eq!(store.len(), 1);

        output(&store, HistoryCommand::Clear { yes: true }).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_unknown_id_succeeds() {
        let temp = tempdir().unwrap();
        let (store, _id) = seeded(temp.path());

        let text = output(
            &store,
            HistoryCommand::Delete {
                id: "missing".into(),
            },
        )
        .unwrap();

        assert_eq!(text.trim(), "No session with that id");
        assert_eq!(store.len(), 1);
    }
}
