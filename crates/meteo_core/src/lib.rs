//! # Meteo Core
//!
//! Crate compartilhada do receiver da estação meteorológica: frames de
//! telemetria em JSON, mapeamento de sensores para cômodos, cálculo de
//! métricas derivadas e o loop de recepção com reconexão.
//!
//! ## Módulos
//! - [`types`] – Frames de telemetria e métricas enriquecidas
//! - [`protocol`] – Decodificação das linhas JSON do dispositivo
//! - [`rooms`] – Mapeamento sensor → cômodo por padrões
//! - [`physics`] – Ponto de orvalho, umidade absoluta, parede
//! - [`enrich`] – Enriquecimento com estado do sensor externo
//! - [`receiver`] – Loop de recepção, transportes e handlers
//! - [`config`] – Configuração unificada via TOML
//! - [`error`] – Erros de transporte, decodificação e destinos

pub mod types;
pub mod protocol;
pub mod rooms;
pub mod physics;
pub mod enrich;
pub mod receiver;
pub mod config;
pub mod error;

// Re-exports convenientes
pub use types::{EnrichedMetrics, SensorReading, TelemetryFrame};
pub use protocol::decode_line;
pub use rooms::{OUTDOOR_ROOM, RoomMapping};
pub use enrich::{MetricsEnricher, SharedEnricher};
pub use receiver::{Receiver, ReceiverConfig, ReceiverState, Transport};
pub use config::AppConfig;
