use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use gridwatch_cells::{age::now_epoch, dispatch, query_params_for, RenderSpec, RowContext};
use gridwatch_core::columns::{builtin_projector_for, columns_for};
use gridwatch_core::{ResourceKind, Scope, Snapshot};
use gridwatch_store::{spawn_session, LiveTable, SessionCommand, SessionConfig};
use gridwatch_table::{FilterState, SortDirection, SortDirective, TableContext, TableModel, TableView};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "gridwatch", version, about = "Live resource tables: replay snapshot streams and render them")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the column set used for a resource kind
    Columns {
        /// Resource kind endpoint, e.g. "pods" or "deployments"
        kind: String,
    },
    /// Feed a recorded snapshot stream (JSON lines) through a session and print the table
    Replay {
        /// File with one `{"subscribe": ..}` or `{"scope": .., "rows": [..]}` object per line
        file: PathBuf,
        /// Subscribe to this scope first (`config/cluster/kind[@namespace]`)
        #[arg(long = "scope")]
        scope: Option<Scope>,
        /// Free-text fuzzy filter
        #[arg(long = "query", default_value = "")]
        query: String,
        /// Sort key, most significant first; append `:desc` to reverse
        #[arg(long = "sort", value_parser = parse_sort)]
        sort: Vec<SortDirective>,
        /// Keep only rows whose column equals the value (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filter: Vec<(String, String)>,
        /// Hide a column
        #[arg(long = "hide")]
        hide: Vec<String>,
        /// Treat the table as an event stream
        #[arg(long = "events", action = ArgAction::SetTrue)]
        events: bool,
        /// Rows are raw Kubernetes objects; flatten them with the built-in projector
        #[arg(long = "project", action = ArgAction::SetTrue)]
        project: bool,
    },
}

/// One line of a replay file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Subscribe { subscribe: Scope },
    Snapshot(Snapshot),
}

fn parse_sort(s: &str) -> Result<SortDirective, String> {
    let (key, direction) = match s.rsplit_once(':') {
        Some((k, "desc")) => (k, SortDirection::Desc),
        Some((k, "asc")) => (k, SortDirection::Asc),
        Some((_, other)) => return Err(format!("unknown sort direction `{}`", other)),
        None => (s, SortDirection::Asc),
    };
    if key.is_empty() {
        return Err("empty sort key".to_string());
    }
    Ok(SortDirective { key: key.to_string(), direction })
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}

fn init_tracing() {
    let env = std::env::var("GRIDWATCH_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("GRIDWATCH_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid GRIDWATCH_METRICS_ADDR; expected host:port");
        }
    }
}

fn read_replay(path: &Path, project: bool) -> Result<Vec<SessionCommand>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed: ReplayLine =
            serde_json::from_str(line).with_context(|| format!("{}:{}: not a subscribe or snapshot line", path.display(), n + 1))?;
        counter!("replay_lines_total").increment(1);
        out.push(match parsed {
            ReplayLine::Subscribe { subscribe } => SessionCommand::Subscribe(subscribe),
            ReplayLine::Snapshot(mut snap) => {
                if project {
                    match builtin_projector_for(&snap.scope.kind) {
                        Some(p) => snap.rows = snap.rows.iter().map(|raw| serde_json::Value::Object(p.project(raw).into_iter().collect())).collect(),
                        None => warn!(kind = %snap.scope.kind, "no built-in projector; rows used as-is"),
                    }
                }
                SessionCommand::Snapshot(snap)
            }
        });
    }
    Ok(out)
}

/// Run `commands` through a fresh session and return the final table.
async fn replay(commands: Vec<SessionCommand>, scope: Option<Scope>) -> Result<Arc<LiveTable>> {
    let (tx, handle) = spawn_session(SessionConfig::from_env());
    let mut done = handle.subscribe_epoch();

    let explicit = scope.is_some() || commands.iter().any(|c| matches!(c, SessionCommand::Subscribe(_)));
    let implicit = if explicit {
        None
    } else {
        commands.iter().find_map(|c| match c {
            SessionCommand::Snapshot(s) => Some(s.scope.clone()),
            SessionCommand::Subscribe(_) => None,
        })
    };
    for scope in scope.into_iter().chain(implicit) {
        debug!(scope = %scope, "subscribing");
        tx.send(SessionCommand::Subscribe(scope)).await.context("session stopped")?;
    }
    for cmd in commands {
        tx.send(cmd).await.context("session stopped")?;
    }
    drop(tx);
    // The session drops its epoch sender once it has drained the queue.
    while done.changed().await.is_ok() {}
    Ok(handle.current())
}

fn filter_state(query: String, sort: Vec<SortDirective>, filter: Vec<(String, String)>, hide: Vec<String>) -> FilterState {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in filter {
        grouped.entry(k).or_default().push(v);
    }
    let mut state = FilterState::default().with_query(&query);
    for (k, values) in grouped {
        state = state.with_column_filter(&k, values);
    }
    for d in sort {
        state = state.then_sort(&d.key, d.direction);
    }
    for key in hide {
        state = state.with_visibility(&key, false);
    }
    state
}

fn render_cells(view: &TableView, scope: &Scope) -> Vec<BTreeMap<String, RenderSpec>> {
    view.rows
        .iter()
        .map(|row| {
            let ctx = RowContext {
                loading: false,
                config_name: scope.config.clone(),
                cluster_name: scope.cluster.clone(),
                namespace: row.namespace.clone(),
                query_params: if scope.kind == ResourceKind::CustomResources { query_params_for(&row.fields) } else { None },
            };
            view.visible_columns
                .iter()
                .map(|c| (c.key.clone(), dispatch(&c.declared, &scope.kind, row.get(&c.key), &ctx)))
                .collect()
        })
        .collect()
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    epoch: u64,
    scope: &'a Scope,
    view: &'a TableView,
    cells: Vec<BTreeMap<String, RenderSpec>>,
}

fn print_human(view: &TableView, cells: &[BTreeMap<String, RenderSpec>]) {
    let now = now_epoch();
    let texts: Vec<Vec<String>> = cells
        .iter()
        .map(|row| view.visible_columns.iter().map(|c| row.get(&c.key).map(|s| s.text(now)).unwrap_or_default()).collect())
        .collect();
    let widths: Vec<usize> = view
        .visible_columns
        .iter()
        .enumerate()
        .map(|(i, c)| texts.iter().map(|r| r[i].chars().count()).chain(std::iter::once(c.label.len())).max().unwrap_or(0))
        .collect();

    let header: Vec<String> = view.visible_columns.iter().zip(&widths).map(|(c, w)| format!("{:<w$}", c.label.to_uppercase(), w = *w)).collect();
    println!("  {}", header.join("  ").trim_end());
    for (row, line) in view.rows.iter().zip(&texts) {
        let mark = if row.has_updated { '*' } else { ' ' };
        let cols: Vec<String> = line.iter().zip(&widths).map(|(t, w)| format!("{:<w$}", t, w = *w)).collect();
        println!("{} {}", mark, cols.join("  ").trim_end());
    }
    if let Some(empty) = view.empty {
        println!("  {}", empty.message());
    }
    println!("({} of {} rows)", view.rows.len(), view.total);
    for (key, facet) in &view.facets {
        if facet.is_empty() {
            continue;
        }
        let counts: Vec<String> = facet.iter().map(|(v, n)| format!("{}={}", if v.is_empty() { "<empty>" } else { v }, n)).collect();
        println!("facet {}: {}", key, counts.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Columns { kind } => {
            let kind = ResourceKind::from(kind.as_str());
            let cols = columns_for(&kind);
            match cli.output {
                Output::Human => {
                    for c in &cols {
                        let mut flags = Vec::new();
                        if c.sortable {
                            flags.push("sortable");
                        }
                        if !c.visible {
                            flags.push("hidden");
                        }
                        let declared = format!("{:?}", c.declared);
                        println!("{:<18} {:<18} {:<16} {}", c.key, c.label, declared, flags.join(","));
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&cols)?),
            }
        }
        Commands::Replay { file, scope, query, sort, filter, hide, events, project } => {
            let commands = read_replay(&file, project)?;
            info!(file = %file.display(), lines = commands.len(), "replaying snapshot stream");
            let live = replay(commands, scope).await?;
            let Some(scope) = live.scope.as_ref() else {
                bail!("{}: stream has no subscription and no snapshot", file.display());
            };

            let mut model = TableModel::for_kind(scope.kind.clone());
            if events {
                model = TableModel::new(scope.kind.clone(), model.columns().to_vec(), TableContext::Events);
            }
            let filter = Arc::new(filter_state(query, sort, filter, hide));
            let view = model.view(&live.rows, &filter);
            let cells = render_cells(&view, scope);
            match cli.output {
                Output::Human => {
                    println!("{} (epoch {})", scope, live.epoch);
                    print_human(&view, &cells);
                }
                Output::Json => {
                    let report = ReplayReport { epoch: live.epoch, scope, view: &view, cells };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
    }

    Ok(())
}
