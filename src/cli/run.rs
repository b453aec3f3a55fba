use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use casefill_cli::attachments::AttachmentLocator;
use casefill_cli::record::columns;
use casefill_cli::{
    BrowserSession, Config, ReportSummary, ResultReporter, RowRange, RowRunner, RowWorkflow,
    Workbook, XlsxArtifact,
};
use clap::Args;
use control_resolvers::ResolverBuilder;
use tracing::{info, warn};

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Workbook to process (overrides workbook.path)
    #[arg(short, long, value_name = "PATH")]
    pub workbook: Option<PathBuf>,

    /// Sheet name (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Run Chrome without a window
    #[arg(long)]
    pub headless: bool,

    /// Attach to a running Chrome through its DevTools websocket
    #[arg(long, value_name = "URL")]
    pub ws_url: Option<String>,

    /// Do not open the workbook when rows failed
    #[arg(long)]
    pub no_open: bool,

    /// How long to wait for login, e.g. `3m` or `180s`
    #[arg(long, value_name = "DURATION")]
    pub login_timeout: Option<humantime::Duration>,

    /// Data rows to process: `N`, `N-M` or `N-` (1-based)
    #[arg(long, value_name = "RANGE")]
    pub rows: Option<RowRange>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.workbook {
            config.workbook.path = path.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.workbook.sheet = Some(sheet.clone());
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(ws_url) = &self.ws_url {
            config.browser.ws_url = Some(ws_url.clone());
        }
        if self.no_open {
            config.workbook.open_on_failure = false;
        }
        if let Some(timeout) = self.login_timeout {
            config.site.login_timeout_secs = timeout.as_secs();
        }
    }
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let workbook = Workbook::load(&config.workbook.path, config.workbook.sheet.as_deref())
        .context("Failed to load the workbook")?;
    let missing = workbook.sheet.missing_columns(&columns::expected());
    if !missing.is_empty() {
        warn!(columns = ?missing, "Workbook is missing expected columns; those fields stay empty");
    }

    let session = BrowserSession::launch(&config.browser, config.timeouts)
        .await
        .context("Failed to start the browser session")?;
    let outcome = process(&config, &session, workbook, args.rows).await;
    session.shutdown().await;

    let summary = outcome?;
    print_summary(&summary);
    if let Some(reason) = summary.aborted {
        bail!("Run aborted: {reason}");
    }
    Ok(())
}

async fn process(
    config: &Config,
    session: &BrowserSession,
    mut workbook: Workbook,
    rows: Option<RowRange>,
) -> Result<ReportSummary> {
    session
        .open_site(&config.site)
        .await
        .context("Could not reach the logged-in home page")?;

    let resolvers = ResolverBuilder::new(session.primitives())
        .with_tiers(config.timeouts)
        .with_tempo(config.tempo)
        .build();
    let workflow = RowWorkflow::new(
        resolvers,
        config.controls.clone(),
        AttachmentLocator::from_config(&config.attachments),
    )
    .with_save_confirmation(config.save_confirmation.clone());
    let runner = RowRunner::new(workflow).with_range(rows);

    let results = runner.run(session.ctx(), &workbook.sheet).await;

    let reporter = ResultReporter::new(&config.workbook.status_column, config.workbook.open_on_failure);
    let sink = XlsxArtifact::new(&workbook.path);
    let summary = reporter
        .finish(&mut workbook.sheet, &results, &sink)
        .await
        .context("Failed to write the results")?;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "Run complete"
    );
    Ok(summary)
}

fn print_summary(summary: &ReportSummary) {
    println!("Results written to {}", summary.artifact.display());
    println!(
        "  succeeded: {}  failed: {}  skipped: {}",
        summary.succeeded, summary.failed, summary.skipped
    );
    if !summary.highlighted.is_empty() {
        let rows: Vec<String> = summary
            .highlighted
            .iter()
            .map(|row| (row + 2).to_string())
            .collect();
        println!("  highlighted rows: {}", rows.join(", "));
    }
}
