mod config;
mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use courier_core::{Clock, ScanPlan};
use courier_engine::{
    decode_snapshot, mutation_batch_between, Dispatcher, FileStore, InProcessTransport,
    MessageTransport, PageSession, PageSnapshot, Prompt, ReqwestAttachmentFetcher,
    ReqwestBackend, Request, Response, Scanner, SystemClock, PDF_MIME_TYPE,
};
use log::{info, warn};

use crate::config::{config_file_path, load_config, save_config, AppConfig};

#[derive(Parser)]
#[command(name = "courier", version, about = "Send webmail PDF attachments to the ledger")]
struct Cli {
    /// Configuration file (RON). Defaults to $COURIER_CONFIG or the platform config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a saved page snapshot once and print the affordances it would get
    Scan {
        snapshot: PathBuf,
        /// Address the snapshot was taken from
        #[arg(long)]
        url: String,
        /// Click the upload button of this attachment after scanning
        #[arg(long)]
        click: Option<String>,
    },
    /// Follow a snapshot file that is rewritten as the page changes
    Watch {
        snapshot: PathBuf,
        #[arg(long)]
        url: String,
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Refresh the cached remote file names
    Sync,
    /// Check the configured credentials against the backend
    TestConnection,
    /// Show or edit the local transfer history
    History {
        /// Forget the record for this email identity
        #[arg(long)]
        remove: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Store API credentials
    Configure {
        #[arg(long, env = "COURIER_API_TOKEN", hide_env_values = true)]
        token: Option<String>,
        #[arg(long)]
        org: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Upload a local PDF as if it came from an email
    Upload {
        file: PathBuf,
        #[arg(long)]
        email_id: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Record a transfer done by other means
    Mark { email_id: String, file_name: String },
    /// List the cached remote file names
    Remote,
    /// Attach an uploaded file to a transaction
    Connect { transaction_id: String, file_id: String },
    /// Write the default configuration file, unless one exists
    InitConfig,
    /// Transfer counters
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(config_file_path);
    let config = load_config(config_path.as_deref())?;

    let level = logging::raised_level(logging::parse_level(&config.log.level), cli.verbose);
    logging::initialize(config.log.destination, level, &config.log_file());
    info!(
        "courier {} starting, store {}",
        env!("CARGO_PKG_VERSION"),
        config.store_path().display()
    );

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(FileStore::new(config.store_path())),
        Arc::new(ReqwestBackend::new()),
    ));
    let transport = Arc::new(InProcessTransport::new(dispatcher));

    match cli.command {
        Commands::Scan {
            snapshot,
            url,
            click,
        } => scan_once(&config, transport, &snapshot, url, click).await,
        Commands::Watch {
            snapshot,
            url,
            duration,
        } => watch(&config, transport, &snapshot, url, duration).await,
        Commands::Sync => {
            let response = transport.send(Request::SyncRemoteFiles).await?;
            print_remote(response)
        }
        Commands::Remote => {
            let response = transport.send(Request::GetCachedRemoteFiles).await?;
            print_remote(response)
        }
        Commands::TestConnection => {
            expect_ack(transport.send(Request::TestConnection).await?)?;
            println!("Connection OK");
            Ok(())
        }
        Commands::History { remove, json } => history(transport.as_ref(), remove, json).await,
        Commands::Configure {
            token,
            org,
            base_url,
        } => {
            let request = Request::SaveSettings {
                api_token: token,
                organization_id: org,
                api_base_url: base_url,
            };
            expect_ack(transport.send(request).await?)?;
            match transport.send(Request::GetSettings).await? {
                Response::Settings { settings } if settings.is_configured() => {
                    println!("Credentials saved");
                }
                _ => println!("Saved; token and organization are still incomplete"),
            }
            Ok(())
        }
        Commands::Upload {
            file,
            email_id,
            subject,
        } => {
            let file_data =
                fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("upload path has no file name")?;
            let request = Request::UploadAttachment {
                email_id,
                file_name: file_name.clone(),
                subject,
                mime_type: PDF_MIME_TYPE.to_string(),
                file_data,
            };
            match transport.send(request).await? {
                Response::Uploaded { file_id } => {
                    println!("Uploaded {file_name} as {file_id}");
                    Ok(())
                }
                other => bail!(describe_failure(&other)),
            }
        }
        Commands::Mark { email_id, file_name } => {
            let request = Request::MarkTransferred {
                email_id,
                file_name,
                file_id: None,
                subject: None,
            };
            expect_ack(transport.send(request).await?)
        }
        Commands::Connect {
            transaction_id,
            file_id,
        } => {
            let request = Request::ConnectTransaction {
                transaction_id,
                file_id,
            };
            expect_ack(transport.send(request).await?)
        }
        Commands::InitConfig => {
            let path = config_path.context("no config directory on this platform")?;
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            save_config(&path, &AppConfig::default())?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Stats { json } => match transport.send(Request::GetStats).await? {
            Response::Stats { stats } if json => {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                Ok(())
            }
            Response::Stats { stats } => {
                println!("Transfers:        {}", stats.total_transfers);
                println!("This month:       {}", stats.transfers_this_month);
                if let Some(name) = stats.latest_file_name {
                    let at = stats.latest_transfer_at.unwrap_or_default();
                    println!("Latest:           {name} ({at})");
                }
                println!("Remote names:     {}", stats.known_remote_files);
                if let Some(at) = stats.last_sync {
                    println!("Last sync:        {at}");
                }
                Ok(())
            }
            other => bail!(describe_failure(&other)),
        },
    }
}

fn build_session(
    config: &AppConfig,
    transport: Arc<InProcessTransport>,
) -> PageSession<SystemClock> {
    let fetcher = Arc::new(ReqwestAttachmentFetcher::new(config.fetch.clone()));
    PageSession::new(SystemClock::default(), transport, fetcher)
        .with_scanner(Scanner::new(&config.profile))
        .with_schedule(config.schedule.clone(), config.classifier.clone())
}

fn read_snapshot(path: &Path, url: &str) -> anyhow::Result<PageSnapshot> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let decoded = decode_snapshot(&bytes, None)?;
    log::debug!("{} decoded as {}", path.display(), decoded.encoding_label);
    Ok(PageSnapshot::new(url, decoded.html))
}

async fn scan_once(
    config: &AppConfig,
    transport: Arc<InProcessTransport>,
    snapshot_path: &Path,
    url: String,
    click: Option<String>,
) -> anyhow::Result<()> {
    let snapshot = read_snapshot(snapshot_path, &url)?;
    let mut session = build_session(config, transport);
    session.start(snapshot).await;

    let report = session
        .run_scans(ScanPlan {
            attachments: true,
            list_view: true,
            navigated: false,
        })
        .await;
    info!(
        "{:?}: {} candidates, {} list badges",
        report.view_mode, report.candidates, report.list_badges
    );

    if let Some(file_name) = click {
        if !session.click_file(&file_name).await {
            bail!("no attachment named {file_name} on this page");
        }
    }
    report_prompts(&mut session);
    print_overlay(&session);
    Ok(())
}

async fn watch(
    config: &AppConfig,
    transport: Arc<InProcessTransport>,
    snapshot_path: &Path,
    url: String,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let mut current = read_snapshot(snapshot_path, &url)?;
    let mut session = build_session(config, transport);
    session.start(current.clone()).await;
    let stop_at = duration.map(|secs| session.clock().now_ms() + secs * 1_000);
    let poll = config.watch_poll_ms.max(10);

    loop {
        let now = session.clock().now_ms();
        if stop_at.is_some_and(|stop| now >= stop) {
            break;
        }

        let mut changed = None;
        match read_snapshot(snapshot_path, &url) {
            Ok(next) if next != current => {
                let batch = mutation_batch_between(&current.parse(), &next.parse());
                session.on_mutations(&batch);
                current = next.clone();
                changed = Some(next);
            }
            Ok(_) => {}
            Err(err) => warn!("snapshot unreadable, keeping the previous one: {err:#}"),
        }

        if let Some(report) = session.tick(changed).await {
            info!(
                "pass {}: {} candidates, {} list badges",
                report.pass, report.candidates, report.list_badges
            );
            print_overlay(&session);
        }
        report_prompts(&mut session);

        let wait = session
            .next_deadline()
            .saturating_sub(session.clock().now_ms())
            .clamp(1, poll);
        tokio::time::sleep(Duration::from_millis(wait)).await;
    }
    Ok(())
}

async fn history(
    transport: &dyn MessageTransport,
    remove: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(email_id) = remove {
        expect_ack(
            transport
                .send(Request::RemoveTransferred { email_id })
                .await?,
        )?;
    }
    let records = match transport.send(Request::GetTransferred).await? {
        Response::Transferred { records } => records,
        other => bail!(describe_failure(&other)),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No transfers recorded");
    }
    for record in records {
        let subject = record.subject.unwrap_or_default();
        println!(
            "{}  {}  {}  {}",
            record.transferred_at, record.email_identity, record.file_name, subject
        );
    }
    Ok(())
}

fn print_overlay(session: &PageSession<SystemClock>) {
    for node in session.overlay().nodes() {
        println!("{}", node.to_html());
    }
}

fn report_prompts(session: &mut PageSession<SystemClock>) {
    for prompt in session.take_prompts() {
        match prompt {
            Prompt::Configure => {
                eprintln!("Credentials missing. Run `courier configure --token ... --org ...`.")
            }
            Prompt::Reload => eprintln!("Connection to the courier was lost. Restart the session."),
        }
    }
}

fn print_remote(response: Response) -> anyhow::Result<()> {
    match response {
        Response::RemoteFiles { names, last_sync } => {
            for name in &names {
                println!("{name}");
            }
            eprintln!(
                "{} names, last sync {}",
                names.len(),
                last_sync.as_deref().unwrap_or("never")
            );
            Ok(())
        }
        other => bail!(describe_failure(&other)),
    }
}

fn expect_ack(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Ack { success: true, .. } => Ok(()),
        other => bail!(describe_failure(&other)),
    }
}

fn describe_failure(response: &Response) -> String {
    match response {
        Response::Failed { code, error } => format!("{code:?}: {error}"),
        Response::Ack {
            error: Some(error), ..
        } => error.clone(),
        other => format!("unexpected response: {other:?}"),
    }
}
