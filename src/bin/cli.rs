//! Binary entry point for the `bv` robot-mode CLI.
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::json;

use beadview::analysis::{Baseline, TriageOptions};
use beadview::filter::IssueFilter;
use beadview::history;
use beadview::pipeline::{Pipeline, PipelineConfig};
use beadview::robot::{
    self, export_graph, run_export_hook, ExportHook, GraphFormat, HookEnv,
};
use beadview::snapshot::{Snapshot, TreeView};
use beadview::treestate::TreeState;
use beadview::workspace::{self, find_log, WorkspaceConfig};
use beadview::{Result, Status, ViewerError};

const EXIT_USAGE: i32 = 64;
const EXIT_SOFTWARE: i32 = 70;
const EXIT_IO: i32 = 74;
const EXIT_CONFIG: i32 = 78;

#[derive(Parser, Debug)]
#[command(
    name = "bv",
    version,
    about = "Robot-mode CLI for the beads issue viewer core",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TargetArgs {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Repository root holding .beads/"
    )]
    repo: PathBuf,

    #[arg(long, global = true, help = "Issue log path override")]
    log: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Workspace config; aggregates the configured repos"
    )]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List issues, optionally filtered
    List(ListCmd),

    /// Emit the flattened issue hierarchy
    Tree,

    /// Emit the execution plan as tracks of sequential work
    Plan,

    /// Partition open issues and recommend what to pick up
    Triage(TriageCmd),

    /// Recommend the single best issue to start now
    Next,

    /// Graph health: cycles, bottlenecks, staleness
    Insights,

    /// Suggest priority changes from impact scores
    Priority,

    /// Compare the current graph against a saved baseline
    Drift(DriftCmd),

    /// Export the dependency graph
    Graph(GraphCmd),

    /// Diff the issue graph between two revisions
    Diff(DiffCmd),

    /// Export issues to a file, running any configured hook
    Export(ExportCmd),

    /// Run the snapshot pipeline and stream events (debugging aid)
    Watch(WatchCmd),
}

#[derive(Args, Debug)]
struct ListCmd {
    #[arg(long, value_delimiter = ',', help = "Statuses to keep (e.g. open,review)")]
    status: Vec<String>,

    #[arg(long = "type", value_delimiter = ',', help = "Issue types to keep")]
    issue_type: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Labels the issue must all carry")]
    label: Vec<String>,

    #[arg(long, help = "Exact assignee match")]
    assignee: Option<String>,

    #[arg(long, help = "Substring over id, title, and description")]
    text: Option<String>,

    #[arg(long, action = ArgAction::SetTrue, help = "Only actionable issues")]
    actionable: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Drop closed and tombstoned issues")]
    open: bool,
}

#[derive(Args, Debug)]
struct TriageCmd {
    #[arg(long, action = ArgAction::SetTrue, help = "Group actionable work into tracks")]
    by_track: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Partition open issues by label")]
    by_label: bool,

    #[arg(long, default_value_t = 5, help = "Number of recommendations")]
    top: usize,
}

#[derive(Args, Debug)]
struct DriftCmd {
    #[arg(long, action = ArgAction::SetTrue, help = "Capture the current metrics as the new baseline")]
    save_baseline: bool,

    #[arg(long, default_value = "", help = "Revision annotation stored with the baseline")]
    revision: String,

    #[arg(long, help = "Baseline file override (default <repo>/.bv/baseline.json)")]
    baseline: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum GraphFormatArg {
    Json,
    Dot,
    Mermaid,
}

impl From<GraphFormatArg> for GraphFormat {
    fn from(arg: GraphFormatArg) -> Self {
        match arg {
            GraphFormatArg::Json => GraphFormat::Json,
            GraphFormatArg::Dot => GraphFormat::Dot,
            GraphFormatArg::Mermaid => GraphFormat::Mermaid,
        }
    }
}

#[derive(Args, Debug)]
struct GraphCmd {
    #[arg(long, value_enum, default_value_t = GraphFormatArg::Json)]
    format: GraphFormatArg,
}

#[derive(Args, Debug)]
struct DiffCmd {
    #[arg(value_name = "FROM", help = "Earlier revision (SHA, branch, tag, or YYYY-MM-DD)")]
    from: String,

    #[arg(value_name = "TO", help = "Later revision; defaults to the working tree")]
    to: Option<String>,
}

#[derive(Args, Debug)]
struct ExportCmd {
    #[arg(value_name = "OUT")]
    out: PathBuf,

    #[arg(long, default_value = "jsonl", help = "Export format tag passed to hooks")]
    format: String,

    #[arg(long, help = "Hook command run after the export (sh -c)")]
    hook: Option<String>,

    #[arg(long, default_value_t = 30, help = "Hook timeout in seconds")]
    hook_timeout_secs: u64,
}

#[derive(Args, Debug)]
struct WatchCmd {
    #[arg(long, default_value_t = 200, help = "Debounce interval in milliseconds")]
    debounce_ms: u64,
}

fn main() {
    beadview::logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { EXIT_USAGE } else { 0 });
        }
    };
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(phase = %err.phase(), error = %err, "command failed");
            eprintln!("bv: {err}");
            std::process::exit(match &err {
                ViewerError::Io(_) | ViewerError::LogRead { .. } | ViewerError::NotFound(_) => {
                    EXIT_IO
                }
                ViewerError::Config(_) => EXIT_CONFIG,
                ViewerError::History(_) => EXIT_IO,
                _ => EXIT_SOFTWARE,
            });
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::List(cmd) => {
            let snapshot = load_snapshot(&cli.target)?;
            let filter = build_filter(&cmd)?;
            let issues: Vec<&beadview::Issue> = filter.apply(&snapshot).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "generated_at": Utc::now().to_rfc3339(),
                    "data_hash": snapshot.hash_string(),
                    "total": issues.len(),
                    "issues": issues,
                }))?
            );
            Ok(0)
        }
        Command::Tree => {
            let snapshot = load_snapshot(&cli.target)?;
            let state = TreeState::load(&cli.target.repo.join(".beads/tree-state.json"))?;
            let view = TreeView::build(&snapshot, &state, true);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "generated_at": Utc::now().to_rfc3339(),
                    "data_hash": snapshot.hash_string(),
                    "roots": view.roots,
                    "rows": view.rows,
                }))?
            );
            Ok(0)
        }
        Command::Plan => {
            let snapshot = load_snapshot(&cli.target)?;
            emit(&robot::plan_report(&snapshot, Utc::now()))?;
            Ok(0)
        }
        Command::Triage(cmd) => {
            let snapshot = load_snapshot(&cli.target)?;
            let options = TriageOptions {
                top: cmd.top,
                by_track: cmd.by_track,
                by_label: cmd.by_label,
            };
            emit(&robot::triage_report(&snapshot, Utc::now(), options))?;
            Ok(0)
        }
        Command::Next => {
            let snapshot = load_snapshot(&cli.target)?;
            emit(&robot::next_report(&snapshot, Utc::now()))?;
            Ok(0)
        }
        Command::Insights => {
            let snapshot = load_snapshot(&cli.target)?;
            emit(&robot::insights_report(&snapshot, Utc::now()))?;
            Ok(0)
        }
        Command::Priority => {
            let snapshot = load_snapshot(&cli.target)?;
            emit(&robot::priority_report(&snapshot, Utc::now()))?;
            Ok(0)
        }
        Command::Drift(cmd) => run_drift(&cli.target, &cmd),
        Command::Graph(cmd) => {
            let snapshot = load_snapshot(&cli.target)?;
            let mut value = export_graph(&snapshot, cmd.format.into());
            if let Some(object) = value.as_object_mut() {
                object.insert("generated_at".into(), json!(Utc::now().to_rfc3339()));
                object.insert("data_hash".into(), json!(snapshot.hash_string()));
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        Command::Diff(cmd) => run_diff(&cli.target, &cmd),
        Command::Export(cmd) => run_export(&cli.target, &cmd),
        Command::Watch(cmd) => run_watch(&cli.target, &cmd),
    }
}

fn run_drift(target: &TargetArgs, cmd: &DriftCmd) -> Result<i32> {
    let snapshot = load_snapshot(target)?;
    let baseline_path = cmd
        .baseline
        .clone()
        .unwrap_or_else(|| Baseline::default_path(&target.repo));

    if cmd.save_baseline {
        let baseline = Baseline::capture(&snapshot, cmd.revision.clone());
        baseline.save(&baseline_path)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "generated_at": Utc::now().to_rfc3339(),
                "data_hash": snapshot.hash_string(),
                "saved": true,
                "path": baseline_path,
                "revision": baseline.revision,
            }))?
        );
        return Ok(0);
    }

    let baseline = Baseline::load(&baseline_path)?;
    let report = robot::drift_report(&snapshot, &baseline);
    let code = report.data.severity.exit_code();
    emit(&report)?;
    Ok(code)
}

fn run_diff(target: &TargetArgs, cmd: &DiffCmd) -> Result<i32> {
    let earlier = history::snapshot_at(&target.repo, &cmd.from)?;
    let later = match &cmd.to {
        Some(revision) => history::snapshot_at(&target.repo, revision)?,
        None => load_snapshot(target)?,
    };
    let diff = history::graph_diff(&earlier, &later);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "generated_at": Utc::now().to_rfc3339(),
            "data_hash": later.hash_string(),
            "from": cmd.from,
            "to": cmd.to.clone().unwrap_or_else(|| "working-tree".into()),
            "diff": diff,
        }))?
    );
    Ok(0)
}

fn run_export(target: &TargetArgs, cmd: &ExportCmd) -> Result<i32> {
    let snapshot = load_snapshot(target)?;
    let mut out = String::new();
    for issue in snapshot.issues() {
        out.push_str(&serde_json::to_string(issue)?);
        out.push('\n');
    }
    std::fs::write(&cmd.out, out)?;

    if let Some(command) = &cmd.hook {
        let hook = ExportHook {
            command: command.clone(),
            timeout: Duration::from_secs(cmd.hook_timeout_secs),
        };
        run_export_hook(
            &hook,
            &HookEnv {
                export_path: &cmd.out,
                format: &cmd.format,
                issue_count: snapshot.len(),
                timestamp: Utc::now(),
            },
        )?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "generated_at": Utc::now().to_rfc3339(),
            "data_hash": snapshot.hash_string(),
            "exported": snapshot.len(),
            "path": cmd.out,
        }))?
    );
    Ok(0)
}

fn run_watch(target: &TargetArgs, cmd: &WatchCmd) -> Result<i32> {
    let log = resolve_log(target)?;
    let mut config = PipelineConfig::new(&log);
    config.debounce = Duration::from_millis(cmd.debounce_ms);
    let (pipeline, events) = Pipeline::spawn(config)?;
    pipeline.trigger();

    for event in events {
        let line = match event {
            beadview::PipelineEvent::SnapshotReady { hash } => json!({
                "event": "snapshot_ready",
                "data_hash": format!("{hash:016x}"),
                "issues": pipeline.current().map(|s| s.len()),
            }),
            beadview::PipelineEvent::BuildFailed { phase } => json!({
                "event": "build_failed",
                "phase": phase.as_str(),
                "consecutive_errors": pipeline.error_count(),
            }),
        };
        println!("{line}");
    }
    Ok(0)
}

fn build_filter(cmd: &ListCmd) -> Result<IssueFilter> {
    let mut statuses = Vec::with_capacity(cmd.status.len());
    for raw in &cmd.status {
        let status: Status = serde_json::from_value(json!(raw)).map_err(|_| {
            ViewerError::InvalidArgument(format!("unknown status {raw:?}"))
        })?;
        statuses.push(status);
    }
    Ok(IssueFilter {
        statuses,
        types: cmd.issue_type.clone(),
        labels: cmd.label.clone(),
        assignee: cmd.assignee.clone(),
        text: cmd.text.clone(),
        actionable_only: cmd.actionable,
        open_only: cmd.open,
    })
}

fn resolve_log(target: &TargetArgs) -> Result<PathBuf> {
    if let Some(log) = &target.log {
        return Ok(log.clone());
    }
    find_log(&target.repo.join(".beads")).ok_or(ViewerError::NotFound("issue log"))
}

fn load_snapshot(target: &TargetArgs) -> Result<Arc<Snapshot>> {
    if let Some(config_path) = &target.workspace {
        let config = WorkspaceConfig::load(config_path)?;
        let base = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let repos = workspace::resolve_repos(&config, &base)?;
        return workspace::load_aggregate(&repos);
    }
    Snapshot::load(&resolve_log(target)?)
}

fn emit<T: serde::Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
