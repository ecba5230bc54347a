//! Saída de terminal: spinner durante chamadas longas e impressão colorida
//! de carrosséis, clientes e projetos.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::error::{CarouselError, ErrorKind};
use crate::lifecycle::CarouselStatus;
use crate::model::{Asset, Carousel, CarouselWithSlides, Client, Project};

/// Spinner shown while a handler waits on the text-generation service or
/// the queue.
pub struct Progress {
    pb: ProgressBar,
    green: Style,
}

impl Progress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
        }
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    /// Clear the spinner; the caller reports the error.
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}

fn status_style(status: CarouselStatus) -> Style {
    match status {
        CarouselStatus::Draft => Style::new().dim(),
        CarouselStatus::DraftWithCopy => Style::new().cyan(),
        CarouselStatus::Approved => Style::new().blue().bold(),
        CarouselStatus::Generating => Style::new().yellow(),
        CarouselStatus::Generated => Style::new().green(),
        CarouselStatus::HiresReady => Style::new().green().bold(),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn carousel_line(carousel: &Carousel) -> String {
    format!(
        "{}  {:<16} {}  ({} slides)",
        carousel.id,
        status_style(carousel.status).apply_to(carousel.status.as_str()),
        carousel.title,
        carousel.slides_count
    )
}

pub fn print_carousel(carousel: &Carousel) {
    println!("{}", carousel_line(carousel));
}

pub fn print_carousel_with_slides(item: &CarouselWithSlides) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    print_carousel(&item.carousel);
    for slide in &item.slides {
        println!("  {:>2}. {}", slide.position, bold.apply_to(&slide.headline));
        if let Some(sub) = &slide.subheadline {
            println!("      {}", dim.apply_to(sub));
        }
        for bullet in &slide.bullets {
            println!("      • {bullet}");
        }
        if let Some(cta) = &slide.cta_text {
            println!("      → {cta}");
        }
    }
}

pub fn print_carousels(carousels: &[Carousel]) {
    if carousels.is_empty() {
        println!("{}", Style::new().dim().apply_to("no carousels"));
    }
    for carousel in carousels {
        print_carousel(carousel);
    }
}

pub fn print_clients(clients: &[Client]) {
    for client in clients {
        println!("{}  {}  ({})", client.id, client.name, client.slug);
    }
}

pub fn print_projects(projects: &[Project]) {
    for project in projects {
        println!("{}  {}", project.id, project.name);
    }
}

pub fn print_assets(assets: &[Asset]) {
    for asset in assets {
        println!("{}  {:?}  {}  {}", asset.id, asset.asset_type, asset.filename, asset.storage_url);
    }
}

/// Print a handler error to stderr, prefixed with its kind.
pub fn print_error(err: &CarouselError) {
    let style = match err.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => Style::new().yellow().bold(),
        _ => Style::new().red().bold(),
    };
    eprintln!("{} {err}", style.apply_to(format!("✗ {}:", err.kind())));
}

/// Process exit code for a handler error.
pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::StateConflict => 4,
        ErrorKind::QueueUnavailable => 5,
        ErrorKind::Store => 6,
    }
}
