//! Execution engine - runs planned commands against the device

use crate::context::ApplyContext;
use crate::error::Result;
use crate::types::{Command, ExecuteSummary};
use panoskit::{Client, Scope};

/// Execute commands in order, stopping at the first failure.
///
/// In dry-run mode nothing is sent and every command counts as skipped.
pub fn execute(
    client: &Client,
    ctx: &mut ApplyContext<'_>,
    scope: &Scope,
    kind: &str,
    commands: &[Command],
) -> Result<ExecuteSummary> {
    let mut summary = ExecuteSummary::default();

    if ctx.dry_run {
        for command in commands {
            log::debug!("[dry-run] {kind} {command} at {scope}");
        }
        summary.skipped = commands.len();
        return Ok(summary);
    }

    for command in commands {
        ctx.notify_start(kind, command);
        let result = run_command(client, ctx, scope, kind, command);
        match result {
            Ok(()) => {
                log::info!("{kind} {command} at {scope}");
                ctx.notify_complete(kind, command, None);
                summary.add_command(command);
            }
            Err(e) => {
                let message = e.to_string();
                ctx.notify_complete(kind, command, Some(&message));
                return Err(e.into());
            }
        }
    }

    Ok(summary)
}

fn run_command(
    client: &Client,
    ctx: &ApplyContext<'_>,
    scope: &Scope,
    kind: &str,
    command: &Command,
) -> panoskit::Result<()> {
    let call = &ctx.call;
    match command {
        Command::Create { entry } => client.create(call, scope, kind, entry).map(drop),
        Command::Update { name, entry } => client.update(call, scope, kind, name, entry).map(drop),
        Command::Rename { from, to } => client.rename(call, scope, kind, from, to),
        Command::Delete { name } => client.delete(call, scope, kind, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RecordProgress;
    use panoskit::{CallContext, MemoryBackend, Operation, WireEntry};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryBackend>, Client) {
        let backend = Arc::new(MemoryBackend::new());
        let client = Client::new(backend.clone());
        (backend, client)
    }

    #[test]
    fn test_execute_in_order() {
        let (backend, client) = setup();
        let commands = vec![
            Command::Create {
                entry: WireEntry::new("a"),
            },
            Command::Rename {
                from: "a".into(),
                to: "b".into(),
            },
        ];
        let mut progress = RecordProgress::default();
        let mut ctx = ApplyContext::default().with_progress(&mut progress);
        let summary = execute(&client, &mut ctx, &Scope::Shared, "address", &commands).unwrap();
        drop(ctx);

        assert_eq!(summary.created, 1);
        assert_eq!(summary.renamed, 1);
        assert_eq!(progress.completed.len(), 2);
        let ops: Vec<Operation> = backend
            .journal()
            .unwrap()
            .into_iter()
            .map(|j| j.operation)
            .collect();
        assert_eq!(ops, vec![Operation::Create, Operation::Rename]);
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        let (backend, client) = setup();
        let commands = vec![Command::Delete { name: "a".into() }];
        let mut ctx = ApplyContext::default().with_dry_run(true);
        let summary = execute(&client, &mut ctx, &Scope::Shared, "address", &commands).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(backend.journal().unwrap().is_empty());
    }

    #[test]
    fn test_stops_at_first_failure() {
        let (backend, client) = setup();
        let commands = vec![
            Command::Update {
                name: "missing".into(),
                entry: WireEntry::new("missing"),
            },
            Command::Create {
                entry: WireEntry::new("never"),
            },
        ];
        let mut progress = RecordProgress::default();
        let mut ctx = ApplyContext::default().with_progress(&mut progress);
        let err = execute(&client, &mut ctx, &Scope::Shared, "address", &commands).unwrap_err();
        drop(ctx);

        assert!(err.to_string().contains("not found"));
        assert_eq!(progress.failed.len(), 1);
        assert_eq!(backend.journal().unwrap().len(), 1);
    }

    #[test]
    fn test_cancelled_before_first_call() {
        let (backend, client) = setup();
        let call = CallContext::new();
        call.cancel.cancel();
        let mut ctx = ApplyContext::new(call);
        let commands = vec![Command::Delete { name: "a".into() }];
        let err = execute(&client, &mut ctx, &Scope::Shared, "address", &commands).unwrap_err();
        assert!(err.is_cancelled());
        assert!(backend.journal().unwrap().is_empty());
    }
}
