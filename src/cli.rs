//! Interface de linha de comando do carrossel baseada em clap.
//!
//! Cada subcomando corresponde a um handler de [`CarouselService`](crate::service::CarouselService);
//! `worker` expõe os callbacks que o worker de renderização chamaria.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::brief::{
    BriefOverrides, CopyInput, DEFAULT_CTA, DEFAULT_NICHE, DEFAULT_OBJECTIVE, DEFAULT_SLIDES_COUNT,
    DEFAULT_TONE,
};
use crate::lifecycle::CarouselStatus;
use crate::model::AssetType;

/// carrossel: ciclo de vida e orquestração de carrosséis para redes sociais.
#[derive(Debug, Parser)]
#[command(name = "carrossel", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo SQLite do store (sobrescreve a configuração).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Imprime o resultado como JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cria um carrossel a partir de um briefing, já com copy.
    Create(CreateArgs),

    /// Cria um carrossel em rascunho com lâminas de exemplo.
    Blank {
        project: Uuid,
        title: String,
        /// Headlines das lâminas, na ordem. Sem nenhuma, cria 5 lâminas.
        #[arg(long = "slide")]
        slides: Vec<String>,
    },

    /// Gera (ou regera) a copy de um carrossel.
    Copy {
        id: Uuid,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Aprova a copy e envia o carrossel para renderização.
    Approve { id: Uuid },

    /// Inicia (ou reinicia) a renderização.
    Generate { id: Uuid },

    /// Mostra um carrossel e suas lâminas.
    Show { id: Uuid },

    /// Lista carrosséis, do mais novo para o mais antigo.
    List {
        #[arg(long)]
        project: Option<Uuid>,
    },

    /// Callbacks do worker de renderização.
    Worker {
        #[command(subcommand)]
        event: WorkerEvent,
    },

    /// Devolve carrosséis presos em "generating" para outro status.
    ResetStuck {
        #[arg(long, value_enum, default_value_t = ResetTarget::Approved)]
        to: ResetTarget,
    },

    /// Clientes da agência.
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },

    /// Projetos de um cliente.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Assets de marca já enviados.
    Asset {
        #[command(subcommand)]
        action: AssetAction,
    },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Tema do carrossel; também vira o título.
    #[arg(long)]
    pub theme: String,

    #[arg(long, default_value_t = DEFAULT_SLIDES_COUNT)]
    pub slides: u32,

    #[arg(long, default_value = DEFAULT_NICHE)]
    pub niche: String,

    #[arg(long, default_value = DEFAULT_OBJECTIVE)]
    pub objective: String,

    #[arg(long, default_value = DEFAULT_TONE)]
    pub tone: String,

    #[arg(long, default_value = DEFAULT_CTA)]
    pub cta: String,

    /// Projeto de destino. Sem ele, usa o projeto padrão.
    #[arg(long)]
    pub project: Option<Uuid>,

    #[arg(long)]
    pub style: Option<String>,
}

impl CreateArgs {
    pub fn brief(&self) -> CopyInput {
        CopyInput {
            slides_count: self.slides,
            niche: self.niche.clone(),
            theme: self.theme.clone(),
            objective: self.objective.clone(),
            tone: self.tone.clone(),
            cta: self.cta.clone(),
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct OverrideArgs {
    #[arg(long)]
    pub niche: Option<String>,
    #[arg(long)]
    pub theme: Option<String>,
    #[arg(long)]
    pub objective: Option<String>,
    #[arg(long)]
    pub tone: Option<String>,
    #[arg(long)]
    pub cta: Option<String>,
}

impl From<OverrideArgs> for BriefOverrides {
    fn from(args: OverrideArgs) -> Self {
        BriefOverrides {
            niche: args.niche,
            theme: args.theme,
            objective: args.objective,
            tone: args.tone,
            cta: args.cta,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum WorkerEvent {
    /// Previews renderizados.
    Generated { id: Uuid },
    /// Exportações em alta resolução prontas.
    HiresReady { id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResetTarget {
    Approved,
    DraftWithCopy,
}

impl From<ResetTarget> for CarouselStatus {
    fn from(target: ResetTarget) -> Self {
        match target {
            ResetTarget::Approved => CarouselStatus::Approved,
            ResetTarget::DraftWithCopy => CarouselStatus::DraftWithCopy,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ClientAction {
    Add {
        name: String,
        #[arg(long)]
        instagram: Option<String>,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ProjectAction {
    Add {
        client: Uuid,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List { client: Uuid },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AssetKind {
    Logo,
    Icon,
    Pattern,
    Photo,
}

impl From<AssetKind> for AssetType {
    fn from(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Logo => AssetType::Logo,
            AssetKind::Icon => AssetType::Icon,
            AssetKind::Pattern => AssetType::Pattern,
            AssetKind::Photo => AssetType::Photo,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum AssetAction {
    Add {
        client: Uuid,
        #[arg(value_enum)]
        kind: AssetKind,
        filename: String,
        storage_url: String,
        #[arg(long)]
        mime: Option<String>,
    },
    List { client: Uuid },
}
