#![forbid(unsafe_code)]

use crate::CliError;
use crate::args::{Args, parse_ids};
use reg_core::{FilterParams, FilterSpec};
use reg_storage::{
    BatchReport, OfficeTarget, RecordInput, RecordPatch, SqliteStore, SubmitRecordRequest,
};
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) const USAGE: &str = "\
usage: registros [--storage-dir DIR] [--log-json] <group> <command> [args]

  office list | create NAME | rename KEY DISPLAY | delete KEY
  record submit --name N [--tax-id T] [--office LABEL] [field options]
  record get ID
  record update ID [field options] [--office-key KEY | --office LABEL]
  record list [--office S] [--text-field F --text V]
              [--date-field F --from D --to D] [--page N] [--page-size N]
  record delete ID...
  record migrate OFFICE ID...
  quarantine list | restore ID... | purge ID...

field options: --action-type --closing-date --pending-notes --process-number
               --filing-date --remarks --referrer";

pub(crate) fn dispatch(store: &SqliteStore, args: &Args) -> Result<Value, CliError> {
    let positional = args.positional();
    let (group, rest) = match positional {
        [group, rest @ ..] => (group.as_str(), rest),
        [] => return Err(CliError::Usage(USAGE.to_string())),
    };
    let (command, operands) = match rest {
        [command, operands @ ..] => (command.as_str(), operands),
        [] => return Err(CliError::Usage(format!("missing command for `{group}`"))),
    };

    match (group, command) {
        ("office", "list") => to_value(store.office_list()?),
        ("office", "create") => {
            let [name] = operands else {
                return Err(usage("office create NAME"));
            };
            to_value(store.office_create(name)?)
        }
        ("office", "rename") => {
            let [key, display] = operands else {
                return Err(usage("office rename KEY DISPLAY"));
            };
            to_value(store.office_rename(key, display)?)
        }
        ("office", "delete") => {
            let [key] = operands else {
                return Err(usage("office delete KEY"));
            };
            let orphaned = store.office_record_count(key)?;
            store.office_delete(key)?;
            Ok(json!({ "deleted": key, "orphaned_records": orphaned }))
        }

        ("record", "submit") => {
            let request = SubmitRecordRequest {
                office_label: args.option_or_empty("office"),
                input: record_input(args),
            };
            to_value(store.submit_record(request)?)
        }
        ("record", "get") => {
            let ids = parse_ids(operands)?;
            let [id] = ids[..] else {
                return Err(usage("record get ID"));
            };
            to_value(store.record_get(id)?)
        }
        ("record", "update") => {
            let ids = parse_ids(operands)?;
            let [id] = ids[..] else {
                return Err(usage("record update ID [options]"));
            };
            let patch = record_patch(args)?;
            if patch.is_empty() {
                return Err(CliError::Usage("nothing to update".to_string()));
            }
            to_value(store.record_update(id, patch)?)
        }
        ("record", "list") => {
            let spec = FilterSpec::from_params(&FilterParams {
                office: args.option("office"),
                text_field: args.option("text-field"),
                text_value: args.option("text"),
                date_field: args.option("date-field"),
                date_from: args.option("from"),
                date_to: args.option("to"),
                page: args.option_parsed("page")?,
                page_size: args.option_parsed("page-size")?,
            })?;
            to_value(store.record_list(&spec)?)
        }
        ("record", "delete") => Ok(report_json(&store.soft_delete_many(&parse_ids(operands)?))),
        ("record", "migrate") => {
            let [target, ids @ ..] = operands else {
                return Err(usage("record migrate OFFICE ID..."));
            };
            Ok(report_json(&store.migrate_many(&parse_ids(ids)?, target)))
        }

        ("quarantine", "list") => to_value(store.quarantine_list()?),
        ("quarantine", "restore") => Ok(report_json(&store.restore_many(&parse_ids(operands)?))),
        ("quarantine", "purge") => Ok(report_json(&store.purge_many(&parse_ids(operands)?))),

        _ => Err(CliError::Usage(format!(
            "unknown command `{group} {command}`\n\n{USAGE}"
        ))),
    }
}

fn usage(form: &str) -> CliError {
    CliError::Usage(format!("usage: registros {form}"))
}

fn to_value(value: impl Serialize) -> Result<Value, CliError> {
    Ok(serde_json::to_value(value)?)
}

fn record_input(args: &Args) -> RecordInput {
    RecordInput {
        name: args.option_or_empty("name"),
        tax_id: args.option_or_empty("tax-id"),
        action_type: args.option_or_empty("action-type"),
        closing_date: args.option_or_empty("closing-date"),
        pending_notes: args.option_or_empty("pending-notes"),
        process_number: args.option_or_empty("process-number"),
        filing_date: args.option_or_empty("filing-date"),
        remarks: args.option_or_empty("remarks"),
        referrer: args.option_or_empty("referrer"),
    }
}

fn record_patch(args: &Args) -> Result<RecordPatch, CliError> {
    let owned = |name: &str| args.option(name).map(str::to_string);
    let office = match (args.option("office-key"), args.option("office")) {
        (Some(_), Some(_)) => {
            return Err(CliError::Usage(
                "--office-key and --office are mutually exclusive".to_string(),
            ));
        }
        (Some(key), None) => Some(OfficeTarget::Key(key.to_string())),
        (None, Some(label)) => Some(OfficeTarget::Label(label.to_string())),
        (None, None) => None,
    };
    Ok(RecordPatch {
        name: owned("name"),
        tax_id: owned("tax-id"),
        action_type: owned("action-type"),
        closing_date: owned("closing-date"),
        pending_notes: owned("pending-notes"),
        process_number: owned("process-number"),
        filing_date: owned("filing-date"),
        remarks: owned("remarks"),
        referrer: owned("referrer"),
        office,
    })
}

fn report_json<T: Serialize>(report: &BatchReport<T>) -> Value {
    let outcomes: Vec<Value> = report
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(value) => json!({
                "id": outcome.id,
                "ok": true,
                "result": value,
            }),
            Err(err) => json!({
                "id": outcome.id,
                "ok": false,
                "code": err.code(),
                "error": err.to_string(),
            }),
        })
        .collect();
    json!({
        "succeeded": report.succeeded(),
        "failed": report.failed(),
        "outcomes": outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Args {
        Args::parse(raw.iter().map(|s| s.to_string())).expect("parse args")
    }

    #[test]
    fn record_input_reads_every_field_option() {
        let input = record_input(&args(&[
            "record",
            "submit",
            "--name",
            "Ana",
            "--tax-id",
            "123",
            "--closing-date",
            "2024-01-02",
            "--referrer",
            "Joana",
        ]));
        assert_eq!(input.name, "Ana");
        assert_eq!(input.tax_id, "123");
        assert_eq!(input.closing_date, "2024-01-02");
        assert_eq!(input.referrer, "Joana");
        assert_eq!(input.remarks, "");
    }

    #[test]
    fn record_patch_only_sets_given_options() {
        let patch = record_patch(&args(&["--remarks", "", "--office", "Rio"])).expect("patch");
        assert_eq!(patch.remarks.as_deref(), Some(""));
        assert_eq!(patch.name, None);
        assert_eq!(patch.office, Some(OfficeTarget::Label("Rio".to_string())));
        assert!(record_patch(&args(&[])).expect("empty").is_empty());
    }

    #[test]
    fn record_patch_rejects_two_office_targets() {
        let err = record_patch(&args(&["--office", "Rio", "--office-key", "RIO"]))
            .expect_err("ambiguous office");
        assert!(matches!(err, CliError::Usage(_)));
    }
}
