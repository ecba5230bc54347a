//! Núcleo de ciclo de vida e orquestração de carrosséis.
//!
//! Um carrossel passa por `draft → draft_with_copy → approved → generating →
//! generated → hires_ready`. Os handlers de [`service::CarouselService`]
//! validam cada transição em [`lifecycle`], geram copy via [`copy`] e
//! submetem o job de orquestração via [`dispatch`], revertendo o status se a
//! fila estiver fora do ar.

pub mod brief;
pub mod cli;
pub mod config;
pub mod copy;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod llm;
pub mod model;
pub mod queue;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod ui;

pub use error::{CarouselError, ErrorKind};
pub use lifecycle::{CarouselStatus, LifecycleStateMachine, Operation};
pub use service::CarouselService;
