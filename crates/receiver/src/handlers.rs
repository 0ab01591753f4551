//! Handlers registrados nos receivers.

use crate::graphite::GraphiteClient;
use chrono::Local;
use meteo_core::enrich::{SharedEnricher, enrich_shared};
use meteo_core::error::HandlerError;
use meteo_core::receiver::{LineHandler, ReceivedLine};
use std::io::{self, Write};
use tracing::{debug, info};

/// Imprime cada linha recebida: `<timestamp>: <origem>: <linha>`.
pub struct ConsoleHandler<W> {
    out: W,
}

impl ConsoleHandler<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleHandler<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> LineHandler for ConsoleHandler<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn handle(&mut self, received: &ReceivedLine<'_>) -> Result<(), HandlerError> {
        writeln!(
            self.out,
            "{}: {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            received.source,
            received.line
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Enriquece a linha e envia as métricas ao Graphite.
pub struct GraphiteHandler {
    enricher: SharedEnricher,
    client: GraphiteClient,
}

impl GraphiteHandler {
    pub fn new(enricher: SharedEnricher, client: GraphiteClient) -> Self {
        Self { enricher, client }
    }
}

impl LineHandler for GraphiteHandler {
    fn name(&self) -> &str {
        "graphite"
    }

    fn handle(&mut self, received: &ReceivedLine<'_>) -> Result<(), HandlerError> {
        let metrics = enrich_shared(&self.enricher, received.line);
        if metrics.is_empty() {
            debug!("Nenhuma métrica para enviar de {}", received.source);
            return Ok(());
        }

        info!("Enviando dados para o graphite: {metrics:?}");
        let sent = self.client.send(&metrics)?;
        debug!("→ {sent} bytes para {}", self.client.addr());
        Ok(())
    }
}
