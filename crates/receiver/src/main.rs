//! # Meteo Receiver
//!
//! Recebe os frames JSON da estação meteorológica pela serial e/ou UDP,
//! imprime cada linha no console e envia as métricas enriquecidas para o
//! Graphite.
//!
//! ## Uso
//! ```bash
//! meteo_receiver --serial --serial-port /dev/ttyACM0 --reconnect-timeout 5
//! meteo_receiver --udp --graphite --room-mapping 'study:*, garden:rf433_1'
//! ```

mod cli;
mod graphite;
mod handlers;
mod serial;
mod udp;

use clap::Parser;
use cli::Args;
use crossbeam_channel::unbounded;
use graphite::GraphiteClient;
use handlers::{ConsoleHandler, GraphiteHandler};
use meteo_core::receiver::ReceiverThread;
use meteo_core::{
    AppConfig, MetricsEnricher, Receiver, ReceiverConfig, RoomMapping, SharedEnricher, Transport,
};
use serial::SerialTransport;
use std::process::ExitCode;
use tracing::{error, info, warn};
use udp::UdpTransport;

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    // ── Carregar config ──
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    args.apply(&mut config);

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        return ExitCode::FAILURE;
    }

    let mapping = match RoomMapping::parse(&config.room_mapping) {
        Ok(mapping) => mapping,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    // Um único enricher: o sensor do jardim pode chegar por qualquer transporte
    let enricher = MetricsEnricher::new(mapping).shared();

    let receiver_config = match config.receiver_config() {
        Ok(receiver_config) => receiver_config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let graphite = match config.graphite.enabled.then(|| GraphiteClient::new(&config.graphite)) {
        None => None,
        Some(Ok(client)) => Some(client),
        Some(Err(e)) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ☁ METEO RECEIVER – ATIVO");
    println!("══════════════════════════════════════════════");
    if config.serial.enabled {
        println!("  Serial:    {} ({} baud)", config.serial.port, config.serial.baud_rate);
    }
    if config.udp.enabled {
        println!("  UDP:       {}:{}", config.udp.bind_ip, config.udp.port);
    }
    if config.graphite.enabled {
        println!("  Graphite:  {}:{}", config.graphite.server, config.graphite.port);
    }
    println!("  Reconexão: {}", match receiver_config.reconnect_delay {
        Some(delay) => format!("{:.1}s", delay.as_secs_f64()),
        None => "desabilitada".into(),
    });
    println!("══════════════════════════════════════════════");
    println!();

    // ── Receivers ──
    let (done_tx, done_rx) = unbounded();
    let mut threads = Vec::new();
    let sinks = Sinks {
        console: config.console.enabled,
        graphite,
        enricher,
        receiver_config,
    };

    if config.serial.enabled {
        match SerialTransport::new(&config.serial) {
            Ok(transport) => match sinks.start("serial-receiver", transport, done_tx.clone()) {
                Ok(thread) => threads.push(thread),
                Err(e) => error!("Falha ao criar thread serial: {e}"),
            },
            Err(e) => error!("{e}"),
        }
    }
    if config.udp.enabled {
        match UdpTransport::new(&config.udp) {
            Ok(transport) => match sinks.start("udp-receiver", transport, done_tx.clone()) {
                Ok(thread) => threads.push(thread),
                Err(e) => error!("Falha ao criar thread UDP: {e}"),
            },
            Err(e) => error!("{e}"),
        }
    }
    drop(done_tx);

    if threads.is_empty() {
        return ExitCode::FAILURE;
    }

    // Mantém o processo vivo enquanto houver algum receiver ativo
    for _ in 0..threads.len() {
        match done_rx.recv() {
            Ok(name) => info!("Receiver {name} finalizado"),
            Err(_) => break,
        }
    }
    for thread in threads {
        thread.join();
    }

    info!("Todos os receivers finalizados");
    ExitCode::SUCCESS
}

/// Handlers e política compartilhados por todos os receivers.
struct Sinks {
    console: bool,
    graphite: Option<GraphiteClient>,
    enricher: SharedEnricher,
    receiver_config: ReceiverConfig,
}

impl Sinks {
    /// Registra os handlers habilitados e inicia o receiver numa thread.
    fn start<T: Transport + 'static>(
        &self,
        name: &'static str,
        transport: T,
        done: crossbeam_channel::Sender<&'static str>,
    ) -> std::io::Result<ReceiverThread> {
        let mut receiver = Receiver::new(transport, self.receiver_config.clone());

        if self.console {
            receiver.add_handler(ConsoleHandler::stdout());
        }
        if let Some(client) = &self.graphite {
            receiver.add_handler(GraphiteHandler::new(self.enricher.clone(), client.clone()));
        }

        receiver.spawn(name, move |_| {
            let _ = done.send(name);
        })
    }
}
