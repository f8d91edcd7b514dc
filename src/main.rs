use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Parser;

use hearth::cli::{Cli, Command, ScopeArg, VerifyArg};
use hearth::config::HearthConfig;
use hearth::engine::{Engine, NewTask};
use hearth::notify::TracingSink;
use hearth::recurrence::Schedule;
use hearth::roster::StaticRoster;
use hearth::scheduler::Scheduler;
use hearth::state_machine::{Task, TaskScope, VerificationMode};
use hearth::store::TaskStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = HearthConfig::load()?;
    let store = TaskStore::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path))?;
    let roster = Arc::new(StaticRoster::new(config.roster_members()));
    let engine = Arc::new(
        Engine::new(store, roster, Arc::new(TracingSink))
            .with_policies(config.swap_policy(), config.verify_policy()),
    );

    match cli.command {
        Command::Add {
            title,
            assignee,
            scope,
            verify,
            partner,
            every,
            cron,
            deadline,
        } => {
            let schedule = match (every, cron) {
                (Some(days), None) => Some(Schedule::every_days(days)?),
                (None, Some(expr)) => Some(Schedule::cron(&expr)?),
                _ => None,
            };
            let task = engine.create_task(NewTask {
                title,
                created_by: actor(&cli.actor)?,
                assignee,
                scope: match scope {
                    ScopeArg::Shared => TaskScope::Shared,
                    ScopeArg::Personal => TaskScope::Personal,
                },
                verification: match verify {
                    VerifyArg::None => VerificationMode::None,
                    VerifyArg::Peer => VerificationMode::Peer,
                    VerifyArg::Partner => VerificationMode::Partner,
                },
                partner,
                schedule,
                deadline: deadline.as_deref().map(parse_deadline).transpose()?,
            })?;
            print_task(&task);
        }
        Command::Claim { task_id } => {
            print_task(&engine.claim(&task_id, &actor(&cli.actor)?)?);
        }
        Command::SwapClaim { task_id } => {
            print_task(&engine.swap_claim(&task_id, &actor(&cli.actor)?)?);
        }
        Command::Approve { task_id } => {
            print_task(&engine.approve(&task_id, &actor(&cli.actor)?)?);
        }
        Command::Reject { task_id, reason } => {
            print_task(&engine.reject(&task_id, &actor(&cli.actor)?, &reason)?);
        }
        Command::Vote { task_id, decision } => {
            print_task(&engine.cast_vote(&task_id, &actor(&cli.actor)?, decision.accept())?);
        }
        Command::Resolve { task_id, decision } => {
            print_task(&engine.resolve_deadlock(&task_id, &actor(&cli.actor)?, decision.accept())?);
        }
        Command::Archive { task_id } => {
            print_task(&engine.archive(&task_id, &actor(&cli.actor)?)?);
        }
        Command::Show { task_id } => {
            let task = engine.get_task(&task_id)?;
            print_task(&task);
            for log in engine.task_history(&task_id)? {
                let detail = match (&log.note, log.decision) {
                    (Some(note), _) => format!(" ({note})"),
                    (None, Some(d)) => format!(" ({})", if d { "yes" } else { "no" }),
                    _ => String::new(),
                };
                println!("  {} {} by {}{}", log.at.to_rfc3339(), log.action, log.actor, detail);
            }
        }
        Command::Overdue => {
            for task in engine.list_overdue(Utc::now())? {
                print_task(&task);
            }
        }
        Command::Pending => {
            for task in engine.list_pending_for_actor(&actor(&cli.actor)?)? {
                print_task(&task);
            }
        }
        Command::Run => {
            tracing::info!(
                interval_secs = config.sweep_interval_secs,
                "scheduler starting"
            );
            Scheduler::new(engine, Duration::from_secs(config.sweep_interval_secs))
                .run()
                .await;
        }
    }

    Ok(())
}

fn actor(actor: &Option<String>) -> Result<String> {
    actor
        .clone()
        .ok_or_else(|| anyhow!("this command needs --actor <member>"))
}

fn parse_deadline(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid RFC 3339 deadline: {s}"))?
        .with_timezone(&Utc))
}

fn print_task(task: &Task) {
    let deadline = task
        .deadline
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}  [{}]  {}  assignee={}  due={}",
        task.id,
        task.state,
        task.title,
        task.assignee.as_deref().unwrap_or("pool"),
        deadline
    );
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "hearth=debug" } else { "hearth=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}
