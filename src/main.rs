use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use scheduler_console::api::{Backend, HttpBackend};
use scheduler_console::config::{ConsoleConfig, LoggingConfig};
use scheduler_console::filters::{RunFilters, RUN_ID, RUN_STATUS_OPTIONS, SCHEDULE_ID, TARGET_ID};
use scheduler_console::forms::{ScheduleKind, TargetDraft};
use scheduler_console::list::ErrorBanner;
use scheduler_console::pages::{Page, RunsPage, SchedulesPage, TargetsPage};
use scheduler_console::query::{Location, QueryParams, QueryStore};
use scheduler_console::{render, status};

#[derive(Parser)]
#[command(
    name = "scheduler-console",
    about = "Console for an HTTP request scheduler: targets, schedules and runs",
    version,
    long_about = None
)]
struct Cli {
    /// Scheduler API base URL (overrides config and SCHEDULER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage HTTP request targets
    Targets {
        #[command(subcommand)]
        action: TargetAction,
    },

    /// Manage schedules
    Schedules {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Inspect runs
    Runs {
        #[command(subcommand)]
        action: RunAction,
    },

    /// Restore a deep-linked page view, e.g. `open runs "?schedule_id=X&run_id=Y"`
    Open {
        page: PageArg,

        /// Query string of the view
        query: Option<String>,
    },

    /// Print the severity class of run status strings
    Classify {
        #[arg(required = true)]
        statuses: Vec<String>,
    },
}

#[derive(Subcommand)]
enum TargetAction {
    /// List all targets
    List,

    /// Show one target
    Show { id: String },

    /// Create a target
    Create(TargetArgs),

    /// Update a target; unspecified fields keep their current values
    Update {
        id: Uuid,

        #[command(flatten)]
        fields: TargetUpdateArgs,
    },

    /// Delete a target
    Delete {
        id: Uuid,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct TargetArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    url: String,

    #[arg(long, default_value = "GET")]
    method: String,

    /// JSON object of request headers
    #[arg(long, default_value = "{}")]
    headers: String,

    /// JSON request body
    #[arg(long)]
    body: Option<String>,

    #[arg(long, default_value = "30")]
    timeout: String,

    #[arg(long, default_value = "0")]
    retries: String,

    #[arg(long, default_value = "1")]
    retry_delay: String,

    /// Do not follow redirects
    #[arg(long)]
    no_follow_redirects: bool,
}

#[derive(Args)]
struct TargetUpdateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    method: Option<String>,
    #[arg(long)]
    headers: Option<String>,
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    timeout: Option<String>,
    #[arg(long)]
    retries: Option<String>,
    #[arg(long)]
    retry_delay: Option<String>,
    #[arg(long)]
    follow_redirects: Option<bool>,
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// List all schedules
    List,

    /// Show one schedule
    Show { id: String },

    /// Create a schedule
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        target_id: String,

        /// Seconds between runs
        #[arg(long, default_value = "60")]
        interval: String,

        /// Run only for this many seconds (window mode)
        #[arg(long)]
        duration: Option<String>,
    },

    /// Pause a schedule
    Pause { id: Uuid },

    /// Resume a paused schedule
    Resume { id: Uuid },

    /// Delete a schedule and its runs
    Delete {
        id: Uuid,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// List the runs of one schedule
    Runs {
        id: Uuid,

        #[command(flatten)]
        filters: RunFilterArgs,
    },
}

#[derive(Subcommand)]
enum RunAction {
    /// List runs
    List {
        #[command(flatten)]
        filters: RunFilterArgs,
    },

    /// Show one run
    Show { id: String },
}

#[derive(Args)]
struct RunFilterArgs {
    #[arg(long)]
    schedule_id: Option<String>,

    /// One of: success, timeout, dns_error, connection_error, http_4xx, http_5xx, error
    #[arg(long)]
    status: Option<String>,

    /// Local datetime, e.g. 2025-03-01T10:00
    #[arg(long)]
    start_time: Option<String>,

    #[arg(long)]
    end_time: Option<String>,
}

impl From<RunFilterArgs> for RunFilters {
    fn from(args: RunFilterArgs) -> Self {
        RunFilters {
            schedule_id: args.schedule_id,
            status: args.status,
            start_time: args.start_time,
            end_time: args.end_time,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PageArg {
    Targets,
    Schedules,
    Runs,
}

fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Fail with the page's banner message, if one was raised.
fn check(banner: &ErrorBanner) -> Result<()> {
    match banner.get() {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

fn store_at(path: &str, query: QueryParams) -> Arc<QueryStore> {
    Arc::new(QueryStore::new(Location::new(path, query)))
}

fn selecting(key: &str, id: &str) -> QueryParams {
    QueryParams::from([(key.to_string(), id.to_string())])
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = ConsoleConfig::load(path)?;
            config.apply_env();
            config
        }
        None => ConsoleConfig::load_or_default(),
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    init_tracing(&config.logging);

    if let Commands::Classify { statuses } = &cli.command {
        for s in statuses {
            println!("{:<30} | {}", s, status::classify(s));
        }
        return Ok(());
    }

    let http = HttpBackend::new(&config.api).context("failed to build HTTP client")?;
    tracing::debug!(base_url = http.base_url(), "using scheduler API");
    let backend: Arc<dyn Backend> = Arc::new(http);

    match cli.command {
        Commands::Targets { action } => targets(backend, action).await?,
        Commands::Schedules { action } => schedules(backend, action).await?,
        Commands::Runs { action } => runs(backend, action).await?,
        Commands::Open { page, query } => open(backend, page, query.as_deref()).await?,
        Commands::Classify { .. } => {}
    }

    Ok(())
}

async fn targets(backend: Arc<dyn Backend>, action: TargetAction) -> Result<()> {
    match action {
        TargetAction::List => {
            let page = TargetsPage::new(backend, store_at(TargetsPage::PATH, QueryParams::new()));
            page.mount().await;
            check(page.banner())?;
            println!("{}", render::targets_table(&page.list.items().await));
        }
        TargetAction::Show { id } => {
            let store = store_at(TargetsPage::PATH, selecting(TARGET_ID, &id));
            let page = TargetsPage::new(backend, store);
            page.mount().await;
            check(page.banner())?;
            match page.detail.current().await {
                Some(target) => println!("{}", render::target_detail(&target)),
                None => bail!("target {id} not found"),
            }
        }
        TargetAction::Create(args) => {
            let page = TargetsPage::new(backend, store_at(TargetsPage::PATH, QueryParams::new()));
            page.open_create();
            page.update_draft(|d| {
                *d = TargetDraft {
                    name: args.name,
                    url: args.url,
                    method: args.method,
                    headers: args.headers,
                    body: args.body.unwrap_or_default(),
                    timeout_seconds: args.timeout,
                    retry_count: args.retries,
                    retry_delay_seconds: args.retry_delay,
                    follow_redirects: !args.no_follow_redirects,
                }
            });
            let target = page.submit().await?;
            println!("Target '{}' created ({}).", target.name, target.id);
        }
        TargetAction::Update { id, fields } => {
            let store = store_at(TargetsPage::PATH, QueryParams::new());
            let page = TargetsPage::new(Arc::clone(&backend), store);
            page.mount().await;
            check(page.banner())?;
            let existing = match page.list.find(id).await {
                Some(target) => target,
                None => backend.get_target(id).await?,
            };
            page.edit(&existing);
            page.update_draft(|d| {
                let TargetUpdateArgs {
                    name,
                    url,
                    method,
                    headers,
                    body,
                    timeout,
                    retries,
                    retry_delay,
                    follow_redirects,
                } = fields;
                if let Some(v) = name {
                    d.name = v;
                }
                if let Some(v) = url {
                    d.url = v;
                }
                if let Some(v) = method {
                    d.method = v;
                }
                if let Some(v) = headers {
                    d.headers = v;
                }
                if let Some(v) = body {
                    d.body = v;
                }
                if let Some(v) = timeout {
                    d.timeout_seconds = v;
                }
                if let Some(v) = retries {
                    d.retry_count = v;
                }
                if let Some(v) = retry_delay {
                    d.retry_delay_seconds = v;
                }
                if let Some(v) = follow_redirects {
                    d.follow_redirects = v;
                }
            });
            let target = page.submit().await?;
            println!("Target '{}' updated.", target.name);
        }
        TargetAction::Delete { id, yes } => {
            if !yes {
                bail!("refusing to delete target {id} without --yes");
            }
            let page = TargetsPage::new(backend, store_at(TargetsPage::PATH, QueryParams::new()));
            page.delete(id).await?;
            println!("Target {id} deleted.");
        }
    }
    Ok(())
}

async fn schedules(backend: Arc<dyn Backend>, action: ScheduleAction) -> Result<()> {
    let blank = || store_at(SchedulesPage::PATH, QueryParams::new());
    match action {
        ScheduleAction::List => {
            let page = SchedulesPage::new(backend, blank());
            page.mount().await;
            check(page.banner())?;
            println!(
                "{}",
                render::schedules_table(&page.list.items().await, &page.targets.items().await)
            );
        }
        ScheduleAction::Show { id } => {
            let store = store_at(SchedulesPage::PATH, selecting(SCHEDULE_ID, &id));
            let page = SchedulesPage::new(backend, store);
            page.mount().await;
            check(page.banner())?;
            match page.detail.current().await {
                Some(schedule) => println!(
                    "{}",
                    render::schedule_detail(&schedule, &page.targets.items().await)
                ),
                None => bail!("schedule {id} not found"),
            }
        }
        ScheduleAction::Create {
            name,
            target_id,
            interval,
            duration,
        } => {
            let page = SchedulesPage::new(backend, blank());
            page.open_create();
            page.update_draft(|d| {
                d.name = name;
                d.target_id = target_id;
                d.interval_seconds = interval;
                if let Some(duration) = duration {
                    d.kind = ScheduleKind::Window;
                    d.duration_seconds = duration;
                }
            });
            let schedule = page.submit().await?;
            println!(
                "Schedule '{}' created ({}, {}).",
                schedule.name, schedule.mode, schedule.id
            );
        }
        ScheduleAction::Pause { id } => {
            let page = SchedulesPage::new(backend, blank());
            let schedule = page.pause(id).await?;
            println!("Schedule '{}' paused.", schedule.name);
        }
        ScheduleAction::Resume { id } => {
            let page = SchedulesPage::new(backend, blank());
            let schedule = page.resume(id).await?;
            println!("Schedule '{}' resumed.", schedule.name);
        }
        ScheduleAction::Delete { id, yes } => {
            if !yes {
                bail!("refusing to delete schedule {id} without --yes");
            }
            let page = SchedulesPage::new(backend, blank());
            page.delete(id).await?;
            println!("Schedule {id} deleted.");
        }
        ScheduleAction::Runs { id, filters } => {
            let page = SchedulesPage::new(backend, blank());
            page.mount().await;
            let runs = page.runs(id, &filters.into()).await?;
            println!("{}", render::runs_table(&runs, &page.list.items().await));
        }
    }
    Ok(())
}

async fn runs(backend: Arc<dyn Backend>, action: RunAction) -> Result<()> {
    match action {
        RunAction::List { filters } => {
            if let Some(status) = &filters.status {
                if !RUN_STATUS_OPTIONS.iter().any(|(value, _)| *value == status.as_str()) {
                    tracing::warn!(%status, "status is not one of the standard run statuses");
                }
            }
            let filters = RunFilters::from(filters);
            let query = filters.to_patch().apply(&QueryParams::new());
            let page = RunsPage::new(backend, store_at(RunsPage::PATH, query));
            page.mount().await;
            check(page.banner())?;
            println!(
                "{}",
                render::runs_table(&page.list.items().await, &page.schedules.items().await)
            );
        }
        RunAction::Show { id } => {
            let page = RunsPage::new(backend, store_at(RunsPage::PATH, selecting(RUN_ID, &id)));
            page.mount().await;
            check(page.banner())?;
            match page.detail.current().await {
                Some(run) => println!(
                    "{}",
                    render::run_detail(&run, &page.schedules.items().await)
                ),
                None => bail!("run {id} not found"),
            }
        }
    }
    Ok(())
}

async fn open(backend: Arc<dyn Backend>, page: PageArg, query: Option<&str>) -> Result<()> {
    let path = match page {
        PageArg::Targets => TargetsPage::PATH,
        PageArg::Schedules => SchedulesPage::PATH,
        PageArg::Runs => RunsPage::PATH,
    };
    let query = query.unwrap_or_default();
    let url = if query.is_empty() || query.starts_with('?') {
        format!("{path}{query}")
    } else {
        format!("{path}?{query}")
    };
    let store = Arc::new(QueryStore::from_url(&url));
    println!("=== {} ===", store.location());

    match page {
        PageArg::Targets => {
            let page = TargetsPage::new(backend, store);
            page.mount().await;
            println!("{}", render::targets_table(&page.list.items().await));
            if let Some(target) = page.detail.current().await {
                println!("\n{}", render::target_detail(&target));
            }
            if page.form().visible {
                println!("\n[create form open]");
            }
            check(page.banner())?;
        }
        PageArg::Schedules => {
            let page = SchedulesPage::new(backend, store);
            page.mount().await;
            let targets = page.targets.items().await;
            println!("{}", render::schedules_table(&page.list.items().await, &targets));
            if let Some(schedule) = page.detail.current().await {
                println!("\n{}", render::schedule_detail(&schedule, &targets));
            }
            if page.form().visible {
                println!("\n[create form open]");
            }
            check(page.banner())?;
        }
        PageArg::Runs => {
            let page = RunsPage::new(backend, store);
            page.mount().await;
            let schedules = page.schedules.items().await;
            if let Some(filters) = page.list.filters().filter(|f| !f.is_empty()) {
                println!("Filters: {}", render::filter_summary(&filters));
            }
            println!("{}", render::runs_table(&page.list.items().await, &schedules));
            if let Some(run) = page.detail.current().await {
                println!("\n{}", render::run_detail(&run, &schedules));
            }
            check(page.banner())?;
        }
    }
    Ok(())
}
