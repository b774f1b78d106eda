use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jobscout_common::{Config, RolesFile};
use judge_client::ClaudeJudge;

use jobscout_pipeline::blocklist::Blocklist;
use jobscout_pipeline::cycle::CycleRunner;
use jobscout_pipeline::filter::fit::FitScorer;
use jobscout_pipeline::filter::hr::HrDetector;
use jobscout_pipeline::filter::sponsorship::SponsorshipGate;
use jobscout_pipeline::filter::FilterChain;
use jobscout_pipeline::notify::{NoopNotifier, NotifyBackend, WebhookNotifier};
use jobscout_pipeline::outreach::OutreachCoordinator;
use jobscout_pipeline::resume::load_profile;
use jobscout_pipeline::scheduler::CycleScheduler;
use jobscout_pipeline::session::{AgentSession, BoardSession};
use jobscout_pipeline::store::{CsvStore, JobStore};

#[derive(Parser)]
#[command(name = "jobscout", about = "Unattended job discovery and outreach pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single cycle and exit.
    Scrape,
    /// Run continuously on the configured interval.
    Loop {
        /// Minutes between cycles (overrides SCRAPE_INTERVAL_MINUTES).
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("Jobscout starting...");

    let config = Config::from_env();
    config.log_redacted();

    let validation_errors = config.validate();
    if !validation_errors.is_empty() {
        for error in &validation_errors {
            warn!(error = error.as_str(), "Configuration problem");
        }
        anyhow::bail!("Configuration invalid ({} problems)", validation_errors.len());
    }

    let roles = RolesFile::load(&config.roles_path)?;
    info!(
        roles = roles.enabled_roles().len(),
        path = %config.roles_path.display(),
        "Roles loaded"
    );

    let profile = load_profile(&config.resume_path, &config.preferences_path)?;

    // Collaborators.
    let session: Arc<dyn BoardSession> = Arc::new(AgentSession::new(
        &config.session_agent_url,
        config.session_agent_token.as_deref(),
    ));
    let store: Arc<dyn JobStore> = Arc::new(CsvStore::open(
        &config.data_dir,
        config.blocklist_path.clone(),
    )?);
    let notifier: Arc<dyn NotifyBackend> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Webhook notifications enabled");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("No NOTIFY_WEBHOOK_URL set, notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    // Judges: one baseline tier shared by the cheap gates, one rerank tier.
    let base_judge = Arc::new(ClaudeJudge::new(
        &config.anthropic_api_key,
        &config.judge_model,
    ));
    let rerank_judge = Arc::new(ClaudeJudge::new(
        &config.anthropic_api_key,
        &config.rerank_model,
    ));

    let blocklist = Arc::new(Blocklist::load(Arc::clone(&store)).await?);
    let chain = FilterChain::new(
        blocklist,
        HrDetector::new(
            Arc::clone(&base_judge) as Arc<dyn judge_client::Judge>,
            config.reject_hr_companies,
        ),
        SponsorshipGate::new(
            Arc::clone(&base_judge) as Arc<dyn judge_client::Judge>,
            config.reject_unpaid_roles,
            config.reject_volunteer_roles,
            config.min_required_experience_years,
            config.allow_phd_required,
        ),
        FitScorer::new(
            base_judge as Arc<dyn judge_client::Judge>,
            rerank_judge as Arc<dyn judge_client::Judge>,
            profile.resume_text,
            profile.preferences_text,
            config.match_threshold,
            config.rerank_trigger,
        ),
    );
    let outreach = OutreachCoordinator::new(
        Arc::clone(&session),
        config.max_people_pages,
        (config.request_delay_min_ms, config.request_delay_max_ms),
    );

    // Operator shutdown: observed between postings, never mid-judge-call.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received; finishing current posting then stopping");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    let interval_minutes = config.scrape_interval_minutes;
    let runner = CycleRunner::new(
        session,
        chain,
        outreach,
        store,
        notifier,
        roles,
        config,
        Arc::clone(&shutdown),
    );

    match cli.command {
        Command::Scrape => {
            let stats = runner.run_one_cycle().await?;
            info!(accepted = stats.accepted, "Single cycle complete");
        }
        Command::Loop { interval } => {
            let scheduler =
                CycleScheduler::new(interval.unwrap_or(interval_minutes), shutdown);
            scheduler.run_forever(&runner).await;
        }
    }

    Ok(())
}
