//! Protocolo de linha do dispositivo.
//!
//! Cada linha terminada em `\n` é um objeto JSON:
//!
//! ```text
//! {"indoor": {"temperature": 21.5, "humidity": 45}, "rf433_1": {...}}
//! ```
//!
//! Linhas vazias nunca chegam aqui (o receiver as descarta).

use crate::error::DecodeError;
use crate::types::{SensorReading, TelemetryFrame};
use serde_json::Value;

/// Baud rate usado pelo firmware na serial.
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// Tamanho máximo de um datagrama UDP enviado pelo firmware.
pub const MAX_DATAGRAM: usize = 1024;

/// Decodifica uma linha recebida em [`TelemetryFrame`].
///
/// Exige um objeto cujos valores também sejam objetos. Valores das
/// métricas não são validados aqui; o enricher decide o que é numérico.
pub fn decode_line(line: &str) -> Result<TelemetryFrame, DecodeError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(sensors) = value else {
        return Err(DecodeError::Shape(format!(
            "esperado objeto de sensores, recebido {}",
            kind(&value)
        )));
    };

    let mut readings = Vec::with_capacity(sensors.len());
    for (sensor, data) in sensors {
        match data {
            Value::Object(values) => readings.push(SensorReading::new(sensor, values)),
            other => {
                return Err(DecodeError::Shape(format!(
                    "sensor '{sensor}' deveria ser objeto, recebido {}",
                    kind(&other)
                )));
            }
        }
    }

    Ok(TelemetryFrame { readings })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "número",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "objeto",
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
