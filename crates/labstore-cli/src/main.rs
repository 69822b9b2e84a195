use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use labstore_api::{
    ApiError, CanDeleteResponse, CanMoveResponse, CascadeDeleteSummary, DeviceKind as WireDeviceKind,
    DevicePayload, ErrorBody, Flag, LooseText, NodeId as WireId, NodePayload, NodeRecord,
    NodeType as WireNodeType, ParentRef, RackPayload, RoomPayload, ShelfPayload,
};
use labstore_app::{
    ConsoleSettings, DeletionSession, DeletionState, EditorError, EditorView, ImpactCheckPolicy,
    ImpactStatus, MutationCoordinator, SubmitGate,
};
use labstore_client::{HttpBackend, StorageBackend};
use labstore_core::{Field, NodeId, NodeRef, NodeType, Occupancy, describe_occupancy};
use labstore_events::{Event, EventBus, EventListener};
use specta::TypeCollection;
use specta_typescript::Typescript;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(author, version, about = "Maintain the sample storage hierarchy")]
struct Args {
    /// Base URL of the LIMS server; overrides the settings file
    #[arg(long, global = true)]
    server: Option<String>,

    /// CSRF token forwarded on mutating requests
    #[arg(long, global = true)]
    csrf_token: Option<String>,

    /// Allow parent changes when the impact check cannot be completed
    #[arg(long, global = true)]
    fail_open: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a location record
    Show {
        node_type: NodeType,
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing location
    Edit {
        node_type: NodeType,
        id: i64,
        /// Field assignment, e.g. `name=Freezer B` or `temperatureSetting=-80`
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
        /// Move the location under another parent
        #[arg(long)]
        parent: Option<i64>,
        /// Accept that a code change invalidates printed labels
        #[arg(long)]
        ack_code: bool,
        /// Accept that moving changes the path of assigned samples
        #[arg(long)]
        ack_impact: bool,
        /// Run every check but do not write
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a location
    Create {
        node_type: NodeType,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Delete a location that has no children and no samples
    Delete {
        node_type: NodeType,
        id: i64,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Print occupancy against capacity
    Occupancy { node_type: NodeType, id: i64 },
    /// Print the effective settings
    Config {
        /// Store them as the defaults for later runs
        #[arg(long)]
        save: bool,
    },
    /// Export TypeScript bindings for the wire types
    Types {
        #[arg(long, default_value = "labstore-ui/src/generated/api.ts")]
        out: PathBuf,
    },
}

/// Mirrors editor and deletion events into the log.
struct EventLog;

impl EventListener for EventLog {
    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::NodeSaved {
                node,
                created,
                reconciled,
                ..
            } => info!(%node, created, reconciled, "saved"),
            Event::NodeDeleted { node } => info!(%node, "deleted"),
            Event::DataIntegrityViolation { message, .. } => {
                tracing::error!("data integrity: {message}")
            }
            other => debug!(?other, "event"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if let Command::Types { out } = &args.command {
        write_typescript_bindings(out)?;
        println!("Wrote TypeScript bindings to {}", out.display());
        return Ok(());
    }

    let settings = resolve_settings(&args);
    if let Command::Config { save } = &args.command {
        print_row("server", Some(settings.server_url.clone()));
        print_row(
            "csrf token",
            Some(if settings.csrf_token.is_some() { "set" } else { "not set" }.to_string()),
        );
        print_row("impact check", Some(format!("{:?}", settings.impact_check_policy)));
        print_row(
            "capacity warn",
            Some(format!("{}%", settings.capacity_warning_percent)),
        );
        if *save {
            let path = settings.save().context("Failed to save settings")?;
            println!("Saved settings to {}", path.display());
        }
        return Ok(());
    }
    let backend = Arc::new(
        HttpBackend::connect(&settings.server_url, settings.csrf_token.clone())
            .context("Failed to configure the HTTP client")?,
    );
    info!(server = backend.api_url(), "using storage API");
    let events = EventBus::new();

    let result = match args.command {
        Command::Show {
            node_type,
            id,
            json,
        } => show(backend.as_ref(), NodeRef::new(node_type, NodeId(id)), json).await,
        Command::Occupancy { node_type, id } => {
            occupancy(
                backend.as_ref(),
                NodeRef::new(node_type, NodeId(id)),
                settings.capacity_warning_percent,
            )
            .await
        }
        Command::Edit {
            node_type,
            id,
            assignments,
            parent,
            ack_code,
            ack_impact,
            dry_run,
        } => {
            let editor =
                MutationCoordinator::new(backend, events.clone(), settings.impact_check_policy);
            let target = NodeRef::new(node_type, NodeId(id));
            editor
                .open_existing(target, None)
                .await
                .with_context(|| format!("Failed to open {target}"))?;
            let edits = Edits {
                assignments,
                parent,
                ack_code,
                ack_impact,
            };
            let outcome = apply_and_save(&editor, edits, dry_run).await;
            editor.close();
            outcome
        }
        Command::Create {
            node_type,
            parent,
            assignments,
        } => {
            let editor =
                MutationCoordinator::new(backend, events.clone(), settings.impact_check_policy);
            editor
                .open_new(node_type, parent.map(NodeId))
                .await
                .with_context(|| format!("Failed to start a new {node_type}"))?;
            let edits = Edits {
                assignments,
                parent: None,
                ack_code: false,
                ack_impact: false,
            };
            let outcome = apply_and_save(&editor, edits, false).await;
            editor.close();
            outcome
        }
        Command::Delete { node_type, id, yes } => {
            delete(backend, events.clone(), NodeRef::new(node_type, NodeId(id)), yes).await
        }
        Command::Config { .. } | Command::Types { .. } => Ok(()),
    };

    events.dispatch_to(&mut EventLog);
    result
}

fn resolve_settings(args: &Args) -> ConsoleSettings {
    let mut settings = ConsoleSettings::load();
    if let Some(server) = &args.server {
        settings.server_url = server.clone();
    }
    if let Some(token) = &args.csrf_token {
        settings.csrf_token = Some(token.clone());
    }
    if args.fail_open {
        settings.impact_check_policy = ImpactCheckPolicy::FailOpen;
    }
    settings
}

async fn show<B: StorageBackend>(backend: &B, node: NodeRef, json: bool) -> Result<()> {
    let record = backend
        .get_node(node)
        .await
        .with_context(|| format!("Failed to load {node}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let node_type = node.node_type;
    println!("{} {}", node_type.display_name(), record.display_name(node_type));
    print_row("id", Some(record.id.to_string()));
    print_row("code", record.code.clone());
    print_row("active", record.active.map(|flag| flag.0.to_string()));
    print_row("type", record.device_type.clone());
    print_row("description", record.description.clone());
    print_row(
        "temperature",
        record.temperature_setting.map(|t| format!("{t} °C")),
    );
    if node_type.has_capacity() {
        print_row(
            "occupancy",
            Some(describe_occupancy(
                record.occupied_count.unwrap_or(0),
                record.capacity_limit,
            )),
        );
    }
    print_row("position schema", record.position_schema_hint.clone());
    if let Some(parent_type) = node_type.parent() {
        let parent = match (
            record.parent_display_name(node_type),
            record.parent_id(node_type),
        ) {
            (Some(name), Some(id)) => Some(format!("{name} (#{id})")),
            (None, Some(id)) => Some(format!("#{id}")),
            (Some(name), None) => Some(name.to_string()),
            (None, None) => None,
        };
        print_row(parent_type.key(), parent);
    }
    print_row("created", audit(&record.created_date, &record.created_by));
    print_row(
        "modified",
        audit(&record.last_modified_date, &record.last_modified_by),
    );
    Ok(())
}

fn print_row(key: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        println!("  {key:<16} {value}");
    }
}

fn audit(date: &Option<LooseText>, by: &Option<LooseText>) -> Option<String> {
    match (date, by) {
        (Some(date), Some(by)) => Some(format!("{date} by {by}")),
        (Some(date), None) => Some(date.to_string()),
        (None, Some(by)) => Some(format!("by {by}")),
        (None, None) => None,
    }
}

async fn occupancy<B: StorageBackend>(backend: &B, node: NodeRef, warn_at: u32) -> Result<()> {
    if !node.node_type.has_capacity() {
        bail!("{} locations have no capacity", node.node_type.display_name());
    }
    let record = backend
        .get_node(node)
        .await
        .with_context(|| format!("Failed to load {node}"))?;
    let occupied = record.occupied_count.unwrap_or(0);
    match Occupancy::compute(occupied, record.capacity_limit) {
        Some(occ) => {
            println!("{}: {occ}", record.display_name(node.node_type));
            if occ.is_over_capacity() {
                println!("Over capacity");
            } else if occ.exceeds(warn_at) {
                println!("Above the {warn_at}% warning threshold");
            }
        }
        None => println!("{}: N/A (no capacity limit)", record.display_name(node.node_type)),
    }
    Ok(())
}

struct Edits {
    assignments: Vec<String>,
    parent: Option<i64>,
    ack_code: bool,
    ack_impact: bool,
}

async fn apply_and_save<B: StorageBackend>(
    editor: &MutationCoordinator<B>,
    edits: Edits,
    dry_run: bool,
) -> Result<()> {
    let node_type = editor.view().context("The editor is not open")?.node_type;
    for raw in &edits.assignments {
        let (field, value) = parse_assignment(raw, node_type)?;
        match field {
            Field::Active => {
                let active = value
                    .trim()
                    .parse::<bool>()
                    .with_context(|| format!("active must be true or false, got '{value}'"))?;
                editor.set_active(active)?;
            }
            Field::Parent => editor.change_parent(&value).await?,
            field => editor.set_field(field, value)?,
        }
    }
    if let Some(parent) = edits.parent {
        editor.change_parent(&parent.to_string()).await?;
    }
    if edits.ack_code {
        editor.acknowledge_code_change(true)?;
    }
    if edits.ack_impact {
        editor.acknowledge_parent_impact(true)?;
    }

    let view = editor.view().context("The editor was closed")?;
    report_warnings(&view);
    if let SubmitGate::Blocked(reasons) = &view.gate {
        for (field, message) in view.field_errors.iter() {
            eprintln!("  {field}: {message}");
        }
        let reasons: Vec<String> = reasons.iter().map(ToString::to_string).collect();
        bail!("Cannot save: {}", reasons.join("; "));
    }
    if dry_run {
        let changed: Vec<String> = view.changed.iter().map(ToString::to_string).collect();
        if changed.is_empty() {
            println!("No changes");
        } else {
            println!("Would change: {}", changed.join(", "));
        }
        println!("Checks passed; nothing was written");
        return Ok(());
    }

    let outcome = match editor.save().await {
        Ok(outcome) => outcome,
        Err(EditorError::Rejected {
            message,
            field_errors,
            ..
        }) => {
            for (field, message) in field_errors.iter() {
                eprintln!("  {field}: {message}");
            }
            bail!(message);
        }
        Err(err) => return Err(err.into()),
    };
    match (&outcome.node, &outcome.record) {
        (Some(node), Some(record)) => println!(
            "Saved {node}: {}",
            record.display_name(node.node_type)
        ),
        (Some(node), None) => println!("Saved {node}; reload to see the server's copy"),
        (None, _) => println!("Saved"),
    }
    Ok(())
}

fn report_warnings(view: &EditorView) {
    if let Some(warning) = &view.code_warning {
        let state = if view.code_acknowledged {
            "acknowledged"
        } else {
            "pass --ack-code to accept"
        };
        println!("Warning: {warning} ({state})");
    }
    match &view.impact {
        ImpactStatus::Warning {
            result,
            acknowledged,
        } => {
            let state = if *acknowledged {
                "acknowledged"
            } else {
                "pass --ack-impact to accept"
            };
            println!("Warning: {} ({state})", result.message);
        }
        ImpactStatus::Failed(message) => println!("Impact check failed: {message}"),
        ImpactStatus::Refused(message) => println!("Move refused: {message}"),
        ImpactStatus::NotNeeded | ImpactStatus::Pending | ImpactStatus::Clear => {}
    }
}

/// `FIELD=VALUE`, where FIELD is the JSON key (`temperatureSetting`) or `parent`.
fn parse_assignment(raw: &str, node_type: NodeType) -> Result<(Field, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected FIELD=VALUE, got '{raw}'"))?;
    let key = key.trim();
    let field = if key.eq_ignore_ascii_case("parent") {
        Some(Field::Parent).filter(|_| node_type.parent().is_some())
    } else {
        Field::from_wire(key, node_type)
    };
    match field {
        Some(field) => Ok((field, value.to_string())),
        None => bail!("'{key}' is not an editable field of a {node_type}"),
    }
}

async fn delete(
    backend: Arc<HttpBackend>,
    events: EventBus,
    node: NodeRef,
    yes: bool,
) -> Result<()> {
    let mut session = DeletionSession::open(backend, events, node).await;
    match session.state() {
        DeletionState::Blocked { reason, summary } => {
            println!("{reason}");
            if let Some(summary) = summary {
                print_summary(summary);
            }
            bail!("{node} cannot be deleted");
        }
        DeletionState::CheckFailed(message) => {
            bail!("Could not check whether {node} can be deleted: {message}")
        }
        _ => {}
    }
    if !yes {
        println!("{node} can be deleted. Re-run with --yes to delete it.");
        session.cancel();
        return Ok(());
    }
    session.set_confirmed(true);
    session.confirm().await?;
    println!("Deleted {node}");
    Ok(())
}

fn print_summary(summary: &CascadeDeleteSummary) {
    for (plural, count) in &summary.child_locations {
        println!("  {count} {plural}");
    }
    if summary.sample_count > 0 {
        println!("  {} sample(s) assigned", summary.sample_count);
    }
}

fn collect_types() -> TypeCollection {
    let mut types = TypeCollection::default();

    types
        .register::<ApiError>()
        .register::<WireId>()
        .register::<Flag>()
        .register::<LooseText>()
        .register::<WireNodeType>()
        .register::<WireDeviceKind>()
        .register::<ParentRef>()
        .register::<NodeRecord>()
        .register::<RoomPayload>()
        .register::<DevicePayload>()
        .register::<ShelfPayload>()
        .register::<RackPayload>()
        .register::<NodePayload>()
        .register::<CanMoveResponse>()
        .register::<CanDeleteResponse>()
        .register::<CascadeDeleteSummary>()
        .register::<ErrorBody>();

    types
}

fn write_typescript_bindings(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "Failed to create type output directory: {}",
                parent.display()
            )
        })?;
    }

    let types = collect_types();
    Typescript::default()
        .export_to(path, &types)
        .with_context(|| format!("Failed to write TypeScript bindings to {}", path.display()))
}
