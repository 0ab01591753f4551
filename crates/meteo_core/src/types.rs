//! Tipos de dados da telemetria da estação.
//!
//! Um [`TelemetryFrame`] é uma linha JSON decodificada no formato
//! `{sensor: {metrica: valor, ...}, ...}`. A ordem dos sensores é a mesma
//! da linha recebida, o que importa para o estado externo do enricher.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Leitura de um único sensor dentro de um frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Identificador como enviado pelo dispositivo (ex: `rf433_1`)
    pub sensor: String,
    /// Métricas brutas na ordem original
    pub values: Map<String, Value>,
}

impl SensorReading {
    pub fn new(sensor: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            sensor: sensor.into(),
            values,
        }
    }

    /// Valor numérico de uma métrica, se presente e numérico.
    pub fn number(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).and_then(Value::as_f64)
    }

    /// Temperatura (°C)
    pub fn temperature(&self) -> Option<f64> {
        self.number("temperature")
    }

    /// Umidade relativa (%)
    pub fn humidity(&self) -> Option<f64> {
        self.number("humidity")
    }
}

/// Frame completo de um ciclo de leitura do dispositivo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryFrame {
    pub readings: Vec<SensorReading>,
}

impl TelemetryFrame {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }
}

/// Métricas enriquecidas, chave pontilhada → valor.
///
/// Ex: `study.indoor.temperature` → `21.5`.
pub type EnrichedMetrics = BTreeMap<String, f64>;

/// Junta segmentos não vazios com `.`.
pub fn metric_key(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
