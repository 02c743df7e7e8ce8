//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use htmlpage_core::{
    HtmlPageIndexer, IndexProgress, IndexReport, IndexSink, Indexer, IndexerRegistry,
    JsonLinesSink,
};
use htmlpage_shared::{
    AppConfig, RESOURCE_TYPE, SharedConfig, init_config, load_config, load_config_from,
    validate_config,
};
use htmlpage_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// htmlpage-indexer: feed HTML pages to the site search index.
#[derive(Parser)]
#[command(
    name = "htmlpage-indexer",
    version,
    about = "Index enabled HTML pages as search documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.htmlpage-indexer/htmlpage-indexer.toml.
    #[arg(long, global = true, env = "HTMLPAGE_INDEXER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show the indexer's name, version, switch and resource types.
    Info,

    /// Run a full indexing pass over every enabled page.
    Index {
        /// Write documents as JSON lines to this file instead of the database index.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Build the document for a single page and print it as JSON.
    Fetch {
        /// Page id.
        id: i32,

        /// Also write the document to the database index.
        #[arg(long)]
        write: bool,
    },

    /// Print the uid a resource is indexed under.
    Uid {
        /// Resource id.
        id: String,

        /// Resource type tag.
        #[arg(long = "type", default_value = RESOURCE_TYPE)]
        resource_type: String,
    },

    /// Manage stored HTML pages.
    Page {
        #[command(subcommand)]
        action: PageAction,
    },

    /// Full-text search over indexed documents.
    Search {
        /// FTS5 query.
        query: String,

        /// Maximum number of hits.
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Page management subcommands.
#[derive(Subcommand)]
pub(crate) enum PageAction {
    /// Store a new page.
    Add {
        /// Page title.
        #[arg(short, long)]
        description: String,

        /// Inline HTML body.
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        html: Option<String>,

        /// Read the HTML body from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Store the page disabled.
        #[arg(long)]
        disabled: bool,
    },
    /// List stored pages.
    List,
    /// Enable a page.
    Enable { id: i32 },
    /// Disable a page.
    Disable { id: i32 },
    /// Delete a page.
    Remove { id: i32 },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so JSON output
/// on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "htmlpage=info",
        1 => "htmlpage=debug",
        _ => "htmlpage=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Info => cmd_info(config_path).await,
        Command::Index { out } => cmd_index(config_path, out.as_deref()).await,
        Command::Fetch { id, write } => cmd_fetch(config_path, id, write).await,
        Command::Uid { id, resource_type } => cmd_uid(config_path, &id, &resource_type).await,
        Command::Page { action } => match action {
            PageAction::Add {
                description,
                html,
                file,
                disabled,
            } => cmd_page_add(config_path, &description, html, file.as_deref(), !disabled).await,
            PageAction::List => cmd_page_list(config_path).await,
            PageAction::Enable { id } => cmd_page_set_enabled(config_path, id, true).await,
            PageAction::Disable { id } => cmd_page_set_enabled(config_path, id, false).await,
            PageAction::Remove { id } => cmd_page_remove(config_path, id).await,
        },
        Command::Search { query, limit } => cmd_search(config_path, &query, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Load and validate the config from `path`, or from the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    validate_config(&config)?;
    Ok(config)
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let path = PathBuf::from(&config.storage.database);
    Storage::open(&path)
        .await
        .wrap_err_with(|| format!("cannot open database at {}", path.display()))
}

/// Open the database and wire the HtmlPage indexer to it.
async fn open_indexer(config_path: Option<&Path>) -> Result<HtmlPageIndexer<Storage>> {
    let config = resolve_config(config_path)?;
    let storage = open_storage(&config).await?;
    Ok(HtmlPageIndexer::new(storage, SharedConfig::new(config)))
}

/// Register the HtmlPage indexer with a fresh host registry.
fn registry_with(indexer: Arc<HtmlPageIndexer<Storage>>) -> Result<IndexerRegistry> {
    let mut registry = IndexerRegistry::new();
    registry.register(indexer)?;
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Indexer commands
// ---------------------------------------------------------------------------

async fn cmd_info(config_path: Option<&Path>) -> Result<()> {
    let registry = registry_with(Arc::new(open_indexer(config_path).await?))?;

    for indexer in registry.iter() {
        let tags: Vec<&str> = indexer.resource_type_tags().iter().copied().collect();
        println!();
        println!("  Name:        {}", indexer.name());
        println!("  Description: {}", indexer.description());
        println!("  Version:     {}", indexer.version());
        println!("  Enabled:     {}", indexer.is_enabled());
        println!("  Resources:   {}", tags.join(", "));
    }
    println!();
    Ok(())
}

async fn cmd_index(config_path: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let indexer = open_indexer(config_path).await?;

    if !indexer.is_enabled() {
        return Err(eyre!(
            "indexer '{}' is disabled: set [indexer] enable = true in the config",
            indexer.name()
        ));
    }

    let indexer = indexer.with_progress(Arc::new(CliProgress::new()));

    let report = match out {
        Some(path) => {
            let sink = JsonLinesSink::create(path)?;
            info!(path = %sink.path().display(), "writing documents as JSON lines");
            indexer.index_all(&sink).await?
        }
        None => indexer.index_all(indexer.store()).await?,
    };

    print_report(&report);

    if report.is_complete() {
        Ok(())
    } else {
        Err(eyre!("{} page(s) could not be indexed", report.failures.len()))
    }
}

fn print_report(report: &IndexReport) {
    println!();
    println!("  Indexing pass complete");
    println!("  Run:     {}", report.run_id);
    println!("  Pages:   {}", report.total);
    println!("  Indexed: {}", report.indexed);
    println!("  Failed:  {}", report.failures.len());
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    for failure in &report.failures {
        println!("    page {}: {}", failure.record_id, failure.error);
    }
    println!();
}

async fn cmd_fetch(config_path: Option<&Path>, id: i32, write: bool) -> Result<()> {
    let indexer = open_indexer(config_path).await?;

    let Some(doc) = indexer.fetch_one(id).await? else {
        return Err(eyre!("page {id} does not exist or is disabled"));
    };

    println!("{}", serde_json::to_string_pretty(&doc)?);

    if write {
        indexer.store().write(&doc).await?;
        info!(uid = %doc.uid, "document written to index");
    }
    Ok(())
}

async fn cmd_uid(config_path: Option<&Path>, id: &str, resource_type: &str) -> Result<()> {
    let registry = registry_with(Arc::new(open_indexer(config_path).await?))?;

    let uid = registry
        .compute_uid(id, resource_type)
        .ok_or_else(|| eyre!("no indexer handles resource type '{resource_type}'"))?;
    println!("{uid}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl IndexProgress for CliProgress {
    fn started(&self, total: usize) {
        self.spinner.set_message(format!("Indexing {total} page(s)"));
    }

    fn record_processed(&self, record_id: i32, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Indexing [{current}/{total}] page {record_id}"));
    }

    fn finished(&self, _report: &IndexReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Page commands
// ---------------------------------------------------------------------------

async fn cmd_page_add(
    config_path: Option<&Path>,
    description: &str,
    html: Option<String>,
    file: Option<&Path>,
    enabled: bool,
) -> Result<()> {
    let html = match (html, file) {
        (Some(html), _) => html,
        (None, Some(path)) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read {}", path.display()))?,
        (None, None) => return Err(eyre!("either --html or --file is required")),
    };

    let config = resolve_config(config_path)?;
    let storage = open_storage(&config).await?;
    let id = storage.insert_page(description, &html, enabled).await?;

    info!(id, enabled, "page stored");
    println!("{id}");
    Ok(())
}

async fn cmd_page_list(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let storage = open_storage(&config).await?;
    let pages = storage.list_pages().await?;

    if pages.is_empty() {
        println!("No pages stored.");
        return Ok(());
    }

    println!("{:>6}  {:<8}  {}", "ID", "STATUS", "DESCRIPTION");
    for page in pages {
        let status = if page.enabled { "enabled" } else { "disabled" };
        println!("{:>6}  {:<8}  {}", page.id, status, page.description);
    }
    Ok(())
}

async fn cmd_page_set_enabled(config_path: Option<&Path>, id: i32, enabled: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let storage = open_storage(&config).await?;

    if !storage.set_page_enabled(id, enabled).await? {
        return Err(eyre!("page {id} does not exist"));
    }
    info!(id, enabled, "page updated");
    Ok(())
}

async fn cmd_page_remove(config_path: Option<&Path>, id: i32) -> Result<()> {
    let config = resolve_config(config_path)?;
    let storage = open_storage(&config).await?;

    if !storage.delete_page(id).await? {
        return Err(eyre!("page {id} does not exist"));
    }
    info!(id, "page removed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Search & config
// ---------------------------------------------------------------------------

async fn cmd_search(config_path: Option<&Path>, query: &str, limit: u32) -> Result<()> {
    let config = resolve_config(config_path)?;
    let path = PathBuf::from(&config.storage.database);
    if !path.exists() {
        return Err(eyre!(
            "no database at {}: run `htmlpage-indexer index` first",
            path.display()
        ));
    }

    let storage = Storage::open_readonly(&path).await?;
    let hits = storage.search_documents(query, limit).await?;

    if hits.is_empty() {
        println!("No matches for '{query}'.");
        return Ok(());
    }
    for hit in hits {
        println!("{:<12} {}", hit.uid, hit.title);
        println!("{:<12} {}", "", hit.url);
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
