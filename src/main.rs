use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use carrossel::cli::{AssetAction, ClientAction, Cli, Command, ProjectAction, WorkerEvent};
use carrossel::config::CarrosselConfig;
use carrossel::copy::CopyGenerator;
use carrossel::dispatch::JobDispatcher;
use carrossel::llm::ChatClient;
use carrossel::queue::{HttpJobQueue, QueueBackend};
use carrossel::service::{CreateCarousel, SlideDraft};
use carrossel::store::SqliteStore;
use carrossel::{CarouselError, CarouselService, ui};

type Service = CarouselService<SqliteStore, QueueBackend, ChatClient>;

fn init_tracing(verbose: bool) {
    let default = if verbose { "carrossel=debug" } else { "carrossel=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_service(cli: &Cli, config: &CarrosselConfig) -> Result<Service> {
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store {}", store_path.display()))?;

    let queue = match &config.queue_url {
        Some(url) => QueueBackend::Http(HttpJobQueue::new(url, config.queue_timeout())?),
        None => {
            warn!("QUEUE_URL not set, approve and generate will fail");
            QueueBackend::Unconfigured
        }
    };

    let client = if config.text_generation_enabled() {
        let client = match &config.llm_base_url {
            Some(base) => ChatClient::with_base_url(
                config.api_key.clone(),
                config.model.clone(),
                base.clone(),
                config.llm_timeout(),
            )?,
            None => ChatClient::new(config.api_key.clone(), config.model.clone())?,
        };
        info!(model = %config.model, "text generation enabled");
        Some(client)
    } else {
        info!("no API key configured, copy uses the deterministic fallback");
        None
    };

    Ok(CarouselService::new(
        store,
        JobDispatcher::new(queue),
        CopyGenerator::new(client, config.copy_settings()),
    ))
}

async fn run(service: &Service, command: Command, json: bool) -> Result<(), CarouselError> {
    match command {
        Command::Create(args) => {
            let progress = Spinner::start(json, "Generating copy...");
            let result = service
                .create_carousel(CreateCarousel {
                    brief: args.brief(),
                    project_id: args.project,
                    style_preset: args.style.clone(),
                })
                .await;
            let created = progress.settle(result, "Carousel created")?;
            output(json, &created, ui::print_carousel_with_slides);
        }
        Command::Blank {
            project,
            title,
            slides,
        } => {
            let drafts = slides
                .into_iter()
                .map(|headline| SlideDraft {
                    headline: Some(headline),
                    ..Default::default()
                })
                .collect();
            let created = service.create_blank_carousel(project, &title, drafts).await?;
            output(json, &created, ui::print_carousel_with_slides);
        }
        Command::Copy { id, overrides } => {
            let progress = Spinner::start(json, "Generating copy...");
            let result = service.request_copy(id, &overrides.into()).await;
            let updated = progress.settle(result, "Copy applied")?;
            output(json, &updated, ui::print_carousel_with_slides);
        }
        Command::Approve { id } => {
            let carousel = service.approve(id).await?;
            output(json, &carousel, ui::print_carousel);
        }
        Command::Generate { id } => {
            let accepted = service.request_generate(id).await?;
            if json {
                ui::print_json(&accepted);
            } else {
                println!("job {} queued for {}", accepted.job_id, accepted.carousel_id);
            }
        }
        Command::Show { id } => {
            let item = service.show(id).await?;
            output(json, &item, ui::print_carousel_with_slides);
        }
        Command::List { project } => {
            let carousels = service.list(project).await?;
            output(json, &carousels, |c| ui::print_carousels(c));
        }
        Command::Worker { event } => {
            let carousel = match event {
                WorkerEvent::Generated { id } => service.mark_generated(id).await?,
                WorkerEvent::HiresReady { id } => service.mark_hires_ready(id).await?,
            };
            output(json, &carousel, ui::print_carousel);
        }
        Command::ResetStuck { to } => {
            let reset = service.reset_stuck(to.into()).await?;
            if json {
                ui::print_json(&reset);
            } else {
                println!("{} carousel(s) reset", reset.len());
            }
        }
        Command::Client { action } => match action {
            ClientAction::Add { name, instagram } => {
                let client = service.create_client(&name, instagram).await?;
                output(json, &client, |c| ui::print_clients(std::slice::from_ref(c)));
            }
            ClientAction::List => {
                let clients = service.list_clients().await?;
                output(json, &clients, |c| ui::print_clients(c));
            }
        },
        Command::Project { action } => match action {
            ProjectAction::Add {
                client,
                name,
                description,
            } => {
                let project = service.create_project(client, &name, description).await?;
                output(json, &project, |p| ui::print_projects(std::slice::from_ref(p)));
            }
            ProjectAction::List { client } => {
                let projects = service.list_projects(client).await?;
                output(json, &projects, |p| ui::print_projects(p));
            }
        },
        Command::Asset { action } => match action {
            AssetAction::Add {
                client,
                kind,
                filename,
                storage_url,
                mime,
            } => {
                let asset = service
                    .register_asset(client, kind.into(), &filename, &storage_url, mime)
                    .await?;
                output(json, &asset, |a| ui::print_assets(std::slice::from_ref(a)));
            }
            AssetAction::List { client } => {
                let assets = service.list_assets(client).await?;
                output(json, &assets, |a| ui::print_assets(a));
            }
        },
    }
    Ok(())
}

fn output<T: serde::Serialize>(json: bool, value: &T, human: impl Fn(&T)) {
    if json {
        ui::print_json(value);
    } else {
        human(value);
    }
}

/// Spinner that stays quiet in JSON mode.
struct Spinner(Option<ui::Progress>);

impl Spinner {
    fn start(json: bool, message: &str) -> Self {
        Self((!json).then(|| ui::Progress::start(message)))
    }

    fn settle<T>(self, result: Result<T, CarouselError>, done: &str) -> Result<T, CarouselError> {
        if let Some(progress) = &self.0 {
            match &result {
                Ok(_) => progress.finish(done),
                Err(_) => progress.abandon(),
            }
        }
        result
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let built = match CarrosselConfig::load() {
        Ok(config) => build_service(&cli, &config).await,
        Err(e) => Err(e),
    };
    let service = match built {
        Ok(service) => service,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&service, cli.command, cli.json).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::print_error(&e);
            ExitCode::from(ui::exit_code(e.kind()))
        }
    }
}
