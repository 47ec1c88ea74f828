use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use rota::audit::{AuditSink, JsonlAuditSink, TracingAuditSink};
use rota::auth::{Actor, Role, ScopeGate};
use rota::config::Config;
use rota::models::{Person, PersonId, PhaseType, Slot, UnitRef};
use rota::scheduler::{DayEntry, ExchangeKind, ExchangeMode, NewExchange};
use rota::service::RotaService;
use rota::storage::{DocumentStore, JsonFileBackend};

#[derive(Parser)]
#[command(
    name = "rota",
    version,
    about = "Organist rota maintenance: units, schedules and exchanges",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured one
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(flatten)]
    actor: ActorArgs,
}

#[derive(Args)]
struct ActorArgs {
    /// Identity of the person running the command
    #[arg(long, global = true, default_value = "admin")]
    actor_id: String,

    /// Display name of the person running the command
    #[arg(long, global = true, default_value = "Administrator")]
    actor_name: String,

    /// Role (master, regional_admin, sub_regional_lead, unit_lead, organist, viewer)
    #[arg(long, global = true, default_value = "master")]
    role: Role,

    /// Region, sub-region or unit id the role applies to
    #[arg(long, global = true)]
    scope: Option<String>,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        let actor = Actor::new(self.actor_id.as_str(), self.actor_name.as_str(), self.role);
        match &self.scope {
            Some(scope) => actor.with_scope(scope.as_str()),
            None => actor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create, show or list units
    Unit {
        #[command(subcommand)]
        command: UnitCommand,
    },

    /// Configure the scheduling period
    Period {
        #[command(subcommand)]
        command: PeriodCommand,
    },

    /// Manage the roster
    Person {
        #[command(subcommand)]
        command: PersonCommand,
    },

    /// Manage unavailability marks
    Unavailable {
        #[command(subcommand)]
        command: UnavailableCommand,
    },

    /// Generate, publish and adjust the main schedule
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Manage the RJM schedule
    Rjm {
        #[command(subcommand)]
        command: RjmCommand,
    },

    /// Exchange request workflow
    Exchange {
        #[command(subcommand)]
        command: ExchangeCommand,
    },
}

#[derive(Subcommand)]
enum UnitCommand {
    /// Create an empty unit
    Create {
        /// Unit reference as region/sub-region/unit
        unit: UnitRef,
    },
    /// Print the stored unit document
    Show { unit: UnitRef },
    /// List stored unit ids
    List,
}

#[derive(Subcommand)]
enum PeriodCommand {
    Set {
        unit: UnitRef,
        start: NaiveDate,
        end: NaiveDate,
    },
}

#[derive(Subcommand)]
enum PersonCommand {
    Add {
        unit: UnitRef,
        id: String,
        name: String,

        /// Weekdays the person plays on
        #[arg(long, value_delimiter = ',')]
        weekdays: Vec<Weekday>,

        /// Phase types the person may play (prelude, service)
        #[arg(long, value_delimiter = ',')]
        phases: Vec<PhaseType>,
    },
    Remove {
        unit: UnitRef,
        id: String,
    },
}

#[derive(Subcommand)]
enum UnavailableCommand {
    Add {
        unit: UnitRef,
        person: String,
        date: NaiveDate,
        #[arg(long)]
        reason: Option<String>,
    },
    Remove {
        unit: UnitRef,
        person: String,
        date: NaiveDate,
    },
    List {
        unit: UnitRef,
    },
}

#[derive(Subcommand)]
enum ScheduleCommand {
    /// Generate a draft from the stored roster and period
    Generate {
        unit: UnitRef,

        /// Publish the draft right away
        #[arg(long)]
        publish: bool,
    },
    /// Publish day entries read from a JSON file
    Publish {
        unit: UnitRef,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Overwrite slots of one day
    Edit {
        unit: UnitRef,
        date: NaiveDate,

        /// slot=person, or slot= to clear (repeatable)
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, Option<PersonId>)>,
    },
    Delete {
        unit: UnitRef,
    },
    Show {
        unit: UnitRef,
    },
    Stats {
        unit: UnitRef,
    },
}

#[derive(Subcommand)]
enum RjmCommand {
    Create {
        unit: UnitRef,
    },
    /// Assign entries in one batch
    Assign {
        unit: UnitRef,

        /// entry=person, or entry= to clear (repeatable)
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, Option<PersonId>)>,
    },
    Delete {
        unit: UnitRef,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Substitution,
    Swap,
}

impl From<ModeArg> for ExchangeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Substitution => ExchangeMode::Substitution,
            ModeArg::Swap => ExchangeMode::Swap,
        }
    }
}

#[derive(Subcommand)]
enum ExchangeCommand {
    Create {
        unit: UnitRef,

        /// Which schedule (main, rjm)
        #[arg(long)]
        kind: ExchangeKind,

        #[arg(long)]
        date: NaiveDate,

        /// Slot to hand over (prelude, service, single)
        #[arg(long)]
        slot: Option<Slot>,

        #[arg(long, value_enum, default_value = "substitution")]
        mode: ModeArg,

        /// Person asked to take the slot; open to anyone when omitted
        #[arg(long)]
        target: Option<String>,

        #[arg(long, default_value = "")]
        reason: String,
    },
    Accept {
        unit: UnitRef,
        id: Uuid,
    },
    Refuse {
        unit: UnitRef,
        id: Uuid,
    },
    Cancel {
        unit: UnitRef,
        id: Uuid,
    },
    Approve {
        unit: UnitRef,
        id: Uuid,
    },
    Reject {
        unit: UnitRef,
        id: Uuid,
    },
    List {
        unit: UnitRef,
    },
    Stats {
        unit: UnitRef,
    },
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, Option<PersonId>), String> {
    let (key, person) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=person, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let person = person.trim();
    let person = (!person.is_empty()).then(|| PersonId::new(person));
    Ok((key.to_string(), person))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    let service = build_service(&config)?;
    let actor = cli.actor.actor();
    tracing::debug!(actor = %actor, data_dir = %config.storage.data_dir.display(), "rota starting");

    match cli.command {
        Commands::Unit { command } => run_unit(&service, &actor, command).await,
        Commands::Period { command } => run_period(&service, &actor, command).await,
        Commands::Person { command } => run_person(&service, &actor, command).await,
        Commands::Unavailable { command } => run_unavailable(&service, &actor, command).await,
        Commands::Schedule { command } => run_schedule(&service, &actor, command).await,
        Commands::Rjm { command } => run_rjm(&service, &actor, command).await,
        Commands::Exchange { command } => run_exchange(&service, &actor, command).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env().context("Failed to read configuration from environment")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("rota=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("rota={level},warn")))
    };

    // Logs go to stderr; stdout carries the JSON result
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn build_service(config: &Config) -> Result<RotaService> {
    let backend = JsonFileBackend::new(&config.storage.data_dir);
    let store = DocumentStore::new(Arc::new(backend));

    let audit: Arc<dyn AuditSink> = match &config.storage.audit_log {
        Some(path) => Arc::new(JsonlAuditSink::new(path)),
        None => Arc::new(TracingAuditSink),
    };

    let patterns = config.day_patterns()?;
    Ok(RotaService::new(store, Arc::new(ScopeGate), audit)
        .with_patterns(patterns)
        .with_rjm_day(config.schedule.rjm_day))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

async fn run_unit(service: &RotaService, actor: &Actor, command: UnitCommand) -> Result<()> {
    match command {
        UnitCommand::Create { unit } => {
            let doc = service.create_unit(actor, &unit).await?;
            print_json(&doc)
        }
        UnitCommand::Show { unit } => print_json(&service.get_unit(actor, &unit).await?),
        UnitCommand::List => print_json(&service.list_units().await?),
    }
}

async fn run_period(service: &RotaService, actor: &Actor, command: PeriodCommand) -> Result<()> {
    match command {
        PeriodCommand::Set { unit, start, end } => {
            print_json(&service.set_period(actor, &unit, start, end).await?)
        }
    }
}

async fn run_person(service: &RotaService, actor: &Actor, command: PersonCommand) -> Result<()> {
    match command {
        PersonCommand::Add {
            unit,
            id,
            name,
            weekdays,
            phases,
        } => {
            let person = Person::new(id, name)
                .with_weekdays(weekdays)
                .with_phases(phases);
            print_json(&service.add_person(actor, &unit, person).await?)
        }
        PersonCommand::Remove { unit, id } => {
            let removed = service.remove_person(actor, &unit, &PersonId::new(id)).await?;
            print_json(&removed)
        }
    }
}

async fn run_unavailable(
    service: &RotaService,
    actor: &Actor,
    command: UnavailableCommand,
) -> Result<()> {
    match command {
        UnavailableCommand::Add {
            unit,
            person,
            date,
            reason,
        } => {
            let mark = service
                .add_unavailability(actor, &unit, &PersonId::new(person), date, reason)
                .await?;
            print_json(&mark)
        }
        UnavailableCommand::Remove { unit, person, date } => {
            let mark = service
                .remove_unavailability(actor, &unit, &PersonId::new(person), date)
                .await?;
            print_json(&mark)
        }
        UnavailableCommand::List { unit } => {
            print_json(&service.list_unavailability(actor, &unit).await?)
        }
    }
}

async fn run_schedule(
    service: &RotaService,
    actor: &Actor,
    command: ScheduleCommand,
) -> Result<()> {
    match command {
        ScheduleCommand::Generate { unit, publish } => {
            let draft = service.generate_draft(actor, &unit).await?;
            for line in draft.log_lines() {
                tracing::info!(unit = %unit, "{line}");
            }
            if publish {
                let published = service.publish(actor, &unit, draft.days.clone()).await?;
                tracing::info!(unit = %unit, days = published.days.len(), "Draft published");
            }
            print_json(&draft)
        }
        ScheduleCommand::Publish { unit, file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let days: Vec<DayEntry> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse day entries in {}", file.display()))?;
            print_json(&service.publish(actor, &unit, days).await?)
        }
        ScheduleCommand::Edit {
            unit,
            date,
            assignments,
        } => {
            let mut updates = BTreeMap::new();
            for (slot, person) in assignments {
                let slot: Slot = slot.parse()?;
                updates.insert(slot, person);
            }
            print_json(&service.edit_day(actor, &unit, date, updates).await?)
        }
        ScheduleCommand::Delete { unit } => {
            print_json(&service.delete_schedule(actor, &unit).await?)
        }
        ScheduleCommand::Show { unit } => print_json(&service.schedule_view(&unit).await?),
        ScheduleCommand::Stats { unit } => print_json(&service.schedule_stats(&unit).await?),
    }
}

async fn run_rjm(service: &RotaService, actor: &Actor, command: RjmCommand) -> Result<()> {
    match command {
        RjmCommand::Create { unit } => {
            let count = service.create_rjm_schedule(actor, &unit).await?;
            print_json(&serde_json::json!({ "created": count }))
        }
        RjmCommand::Assign { unit, assignments } => {
            let changes: BTreeMap<String, Option<PersonId>> = assignments.into_iter().collect();
            let count = service.update_rjm_entries(actor, &unit, changes).await?;
            print_json(&serde_json::json!({ "updated": count }))
        }
        RjmCommand::Delete { unit } => {
            let count = service.delete_rjm_schedule(actor, &unit).await?;
            print_json(&serde_json::json!({ "deleted": count }))
        }
    }
}

async fn run_exchange(
    service: &RotaService,
    actor: &Actor,
    command: ExchangeCommand,
) -> Result<()> {
    match command {
        ExchangeCommand::Create {
            unit,
            kind,
            date,
            slot,
            mode,
            target,
            reason,
        } => {
            let input = NewExchange {
                kind: Some(kind),
                date: Some(date),
                slot,
                mode: mode.into(),
                target_id: target.map(PersonId::new),
                reason,
            };
            print_json(&service.create_exchange(actor, &unit, input).await?)
        }
        ExchangeCommand::Accept { unit, id } => {
            print_json(&service.accept_exchange(actor, &unit, id).await?)
        }
        ExchangeCommand::Refuse { unit, id } => {
            print_json(&service.refuse_exchange(actor, &unit, id).await?)
        }
        ExchangeCommand::Cancel { unit, id } => {
            print_json(&service.cancel_exchange(actor, &unit, id).await?)
        }
        ExchangeCommand::Approve { unit, id } => {
            print_json(&service.approve_exchange(actor, &unit, id).await?)
        }
        ExchangeCommand::Reject { unit, id } => {
            print_json(&service.reject_exchange(actor, &unit, id).await?)
        }
        ExchangeCommand::List { unit } => print_json(&service.list_exchanges(actor, &unit).await?),
        ExchangeCommand::Stats { unit } => print_json(&service.exchange_stats(&unit).await?),
    }
}
