//! rot CLI - Roadmap, OKR and feature request tracker.

use chrono::NaiveDate;
use clap::Parser;
use roteiro::action_log::{self, ActionLog};
use roteiro::cli::{
    Cli, Commands, ConfigCommands, ItemArgs, ItemCommands, OkrCommands, RequestCommands,
    RoadmapArgs, SprintCommands, SystemCommands, UserCommands,
};
use roteiro::commands::{self, Context, ItemFields, Output, RoadmapQuery, SprintFields};
use roteiro::roadmap::Quarter;
use roteiro::storage::parse_date;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "ROT_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing();

    // Determine workspace: --workspace flag > ROT_WORKSPACE env > cwd
    let workspace = resolve_workspace(cli.workspace, cli.human_readable);
    let ctx = Context::new(workspace).with_actor(cli.actor);
    let human = cli.human_readable || configured_human(&ctx);

    let (cmd_name, args_json) = serialize_command(&cli.command);
    let start = Instant::now();
    let result = run_command(cli.command, &ctx, human);
    let duration = start.elapsed().as_millis() as u64;

    record_action(&ctx, &cmd_name, &args_json, &result, duration);

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Install the stderr subscriber, filtered by `ROT_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the workspace directory from an explicit path or the current directory.
fn resolve_workspace(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let msg = format!("Specified workspace does not exist: {}", path.display());
                if human {
                    eprintln!("Error: {}", msg);
                } else {
                    eprintln!("{}", serde_json::json!({ "error": msg }));
                }
                process::exit(1);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Whether config.kdl asks for human output. Uninitialized workspaces use JSON.
fn configured_human(ctx: &Context) -> bool {
    if !matches!(ctx.storage_exists(), Ok(true)) {
        return false;
    }
    ctx.open_storage()
        .and_then(|storage| ctx.config(&storage))
        .map(|config| config.is_human())
        .unwrap_or(false)
}

/// Append the command to the workspace action log when enabled.
fn record_action(
    ctx: &Context,
    command: &str,
    args: &serde_json::Value,
    result: &Result<(), roteiro::Error>,
    duration_ms: u64,
) {
    if !matches!(ctx.storage_exists(), Ok(true)) {
        return;
    }
    let Ok(storage) = ctx.open_storage() else {
        return;
    };
    let config = match ctx.config(&storage) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "could not resolve config for action log");
            return;
        }
    };
    if !config.action_log_enabled.value {
        return;
    }
    let error = result.as_ref().err().map(|e| e.to_string());
    let entry = ActionLog::new(&ctx.workspace, command, args, config.user())
        .finish(error, duration_ms);
    action_log::log_action(storage.root(), &entry);
}

fn parse_quarter(quarter: Option<&str>) -> Result<Option<Quarter>, roteiro::Error> {
    quarter.map(str::parse::<Quarter>).transpose()
}

fn parse_at(at: Option<&str>) -> Result<Option<NaiveDate>, roteiro::Error> {
    at.map(parse_date).transpose()
}

fn roadmap_query(view: RoadmapArgs) -> Result<RoadmapQuery, roteiro::Error> {
    Ok(RoadmapQuery {
        quarter: parse_quarter(view.quarter.as_deref())?,
        year: view.year,
        search: view.search,
        product: view.product,
        sub_product: view.sub_product,
    })
}

fn item_fields(name: Option<String>, args: ItemArgs) -> ItemFields {
    ItemFields {
        name,
        status: args.status,
        start: args.start,
        months: args.months,
        metric: args.metric,
        thesis: args.thesis,
        product: args.product,
        sub_product: args.sub_product,
        objective: args.objective,
    }
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<(), roteiro::Error> {
    match command {
        Commands::Roadmap { view, at } => {
            let query = roadmap_query(view)?;
            let result = commands::roadmap_view(ctx, &query, parse_at(at.as_deref())?)?;
            output(&result, human);
        }
        Commands::Item { command } => match command {
            ItemCommands::Create { name, fields } => {
                let result = commands::item_create(ctx, item_fields(Some(name), fields))?;
                output(&result, human);
            }
            ItemCommands::List { product, status } => {
                let result = commands::item_list(ctx, product.as_deref(), status.as_deref())?;
                output(&result, human);
            }
            ItemCommands::Show { id } => {
                let result = commands::item_show(ctx, &id)?;
                output(&result, human);
            }
            ItemCommands::Update {
                id,
                name,
                fields,
                undated,
            } => {
                let result = commands::item_update(ctx, &id, item_fields(name, fields), undated)?;
                output(&result, human);
            }
            ItemCommands::Delete { id } => {
                let result = commands::item_delete(ctx, &id)?;
                output(&result, human);
            }
            ItemCommands::BulkDelete { ids, visible, view } => {
                let query = roadmap_query(view)?;
                let result = commands::item_bulk_delete(ctx, &ids, visible, &query, None)?;
                output(&result, human);
            }
        },
        Commands::Okr { command } => match command {
            OkrCommands::Create {
                title,
                quarter,
                year,
                description,
                owner,
            } => {
                let quarter: Quarter = quarter.parse()?;
                let result = commands::okr_create(ctx, &title, quarter, year, description, owner)?;
                output(&result, human);
            }
            OkrCommands::List { quarter, year } => {
                let result = commands::okr_list(ctx, parse_quarter(quarter.as_deref())?, year)?;
                output(&result, human);
            }
            OkrCommands::Show { id } => {
                let result = commands::okr_show(ctx, &id)?;
                output(&result, human);
            }
            OkrCommands::Delete { id } => {
                let result = commands::okr_delete(ctx, &id)?;
                output(&result, human);
            }
            OkrCommands::KrAdd {
                objective,
                title,
                target,
                start,
                unit,
            } => {
                let result = commands::okr_kr_add(ctx, &objective, &title, target, start, unit)?;
                output(&result, human);
            }
            OkrCommands::KrUpdate { id, current } => {
                let result = commands::okr_kr_update(ctx, &id, current)?;
                output(&result, human);
            }
        },
        Commands::Request { command } => match command {
            RequestCommands::Create {
                title,
                description,
                product,
            } => {
                let result = commands::request_create(ctx, &title, description, product)?;
                output(&result, human);
            }
            RequestCommands::List { product, status } => {
                let result = commands::request_list(ctx, product.as_deref(), status.as_deref())?;
                output(&result, human);
            }
            RequestCommands::Vote { id } => {
                let result = commands::request_vote(ctx, &id)?;
                output(&result, human);
            }
            RequestCommands::Unvote { id } => {
                let result = commands::request_unvote(ctx, &id)?;
                output(&result, human);
            }
            RequestCommands::Status { id, status } => {
                let result = commands::request_status(ctx, &id, &status)?;
                output(&result, human);
            }
        },
        Commands::User { command } => match command {
            UserCommands::Add { email, name, role } => {
                let result = commands::user_add(ctx, &email, name, &role)?;
                output(&result, human);
            }
            UserCommands::List => {
                let result = commands::user_list(ctx)?;
                output(&result, human);
            }
            UserCommands::Role { email, role } => {
                let result = commands::user_role(ctx, &email, &role)?;
                output(&result, human);
            }
        },
        Commands::Sprint { command } => match command {
            SprintCommands::Add {
                name,
                start,
                end,
                planned,
                delivered,
            } => {
                let fields = SprintFields {
                    name,
                    start,
                    end,
                    planned,
                    delivered,
                };
                let result = commands::sprint_add(ctx, fields)?;
                output(&result, human);
            }
            SprintCommands::List => {
                let result = commands::sprint_list(ctx)?;
                output(&result, human);
            }
            SprintCommands::Performance => {
                let result = commands::sprint_performance(ctx)?;
                output(&result, human);
            }
            SprintCommands::Delete { id } => {
                let result = commands::sprint_delete(ctx, &id)?;
                output(&result, human);
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(ctx, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(ctx, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config_list(ctx)?;
                output(&result, human);
            }
        },
        Commands::System { command } => match command {
            SystemCommands::Init { admin } => {
                let result = commands::system_init(ctx, admin.as_deref())?;
                output(&result, human);
            }
            SystemCommands::Info => {
                let result = commands::system_info(ctx)?;
                output(&result, human);
            }
        },
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Command name and arguments as recorded in the action log.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    use serde_json::json;

    let view_json = |view: &RoadmapArgs| {
        json!({
            "quarter": view.quarter,
            "year": view.year,
            "search": view.search,
            "product": view.product,
            "sub_product": view.sub_product,
        })
    };
    let item_json = |fields: &ItemArgs| {
        json!({
            "status": fields.status,
            "start": fields.start,
            "months": fields.months,
            "metric": fields.metric,
            "thesis": fields.thesis,
            "product": fields.product,
            "sub_product": fields.sub_product,
            "objective": fields.objective,
        })
    };

    match command {
        Commands::Roadmap { view, at } => (
            "roadmap".to_string(),
            json!({ "view": view_json(view), "at": at }),
        ),
        Commands::Item { command } => match command {
            ItemCommands::Create { name, fields } => (
                "item create".to_string(),
                json!({ "name": name, "fields": item_json(fields) }),
            ),
            ItemCommands::List { product, status } => (
                "item list".to_string(),
                json!({ "product": product, "status": status }),
            ),
            ItemCommands::Show { id } => ("item show".to_string(), json!({ "id": id })),
            ItemCommands::Update {
                id,
                name,
                fields,
                undated,
            } => (
                "item update".to_string(),
                json!({ "id": id, "name": name, "fields": item_json(fields), "undated": undated }),
            ),
            ItemCommands::Delete { id } => ("item delete".to_string(), json!({ "id": id })),
            ItemCommands::BulkDelete { ids, visible, view } => (
                "item bulk-delete".to_string(),
                json!({ "ids": ids, "visible": visible, "view": view_json(view) }),
            ),
        },
        Commands::Okr { command } => match command {
            OkrCommands::Create {
                title,
                quarter,
                year,
                description,
                owner,
            } => (
                "okr create".to_string(),
                json!({
                    "title": title,
                    "quarter": quarter,
                    "year": year,
                    "description": description,
                    "owner": owner,
                }),
            ),
            OkrCommands::List { quarter, year } => (
                "okr list".to_string(),
                json!({ "quarter": quarter, "year": year }),
            ),
            OkrCommands::Show { id } => ("okr show".to_string(), json!({ "id": id })),
            OkrCommands::Delete { id } => ("okr delete".to_string(), json!({ "id": id })),
            OkrCommands::KrAdd {
                objective,
                title,
                target,
                start,
                unit,
            } => (
                "okr kr-add".to_string(),
                json!({
                    "objective": objective,
                    "title": title,
                    "target": target,
                    "start": start,
                    "unit": unit,
                }),
            ),
            OkrCommands::KrUpdate { id, current } => (
                "okr kr-update".to_string(),
                json!({ "id": id, "current": current }),
            ),
        },
        Commands::Request { command } => match command {
            RequestCommands::Create {
                title,
                description,
                product,
            } => (
                "request create".to_string(),
                json!({ "title": title, "description": description, "product": product }),
            ),
            RequestCommands::List { product, status } => (
                "request list".to_string(),
                json!({ "product": product, "status": status }),
            ),
            RequestCommands::Vote { id } => ("request vote".to_string(), json!({ "id": id })),
            RequestCommands::Unvote { id } => ("request unvote".to_string(), json!({ "id": id })),
            RequestCommands::Status { id, status } => (
                "request status".to_string(),
                json!({ "id": id, "status": status }),
            ),
        },
        Commands::User { command } => match command {
            UserCommands::Add { email, name, role } => (
                "user add".to_string(),
                json!({ "email": email, "name": name, "role": role }),
            ),
            UserCommands::List => ("user list".to_string(), json!({})),
            UserCommands::Role { email, role } => (
                "user role".to_string(),
                json!({ "email": email, "role": role }),
            ),
        },
        Commands::Sprint { command } => match command {
            SprintCommands::Add {
                name,
                start,
                end,
                planned,
                delivered,
            } => (
                "sprint add".to_string(),
                json!({
                    "name": name,
                    "start": start,
                    "end": end,
                    "planned": planned,
                    "delivered": delivered,
                }),
            ),
            SprintCommands::List => ("sprint list".to_string(), json!({})),
            SprintCommands::Performance => ("sprint performance".to_string(), json!({})),
            SprintCommands::Delete { id } => ("sprint delete".to_string(), json!({ "id": id })),
        },
        Commands::Config { command } => match command {
            // "setting" rather than "key" so the name survives redaction
            ConfigCommands::Get { key } => ("config get".to_string(), json!({ "setting": key })),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                json!({ "setting": key, "value": value }),
            ),
            ConfigCommands::List => ("config list".to_string(), json!({})),
        },
        Commands::System { command } => match command {
            SystemCommands::Init { admin } => {
                ("system init".to_string(), json!({ "admin": admin }))
            }
            SystemCommands::Info => ("system info".to_string(), json!({})),
        },
    }
}
