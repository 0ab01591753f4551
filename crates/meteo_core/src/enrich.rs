//! Enriquecimento de métricas.
//!
//! Converte um frame bruto em métricas planas `comodo.sensor.metrica`,
//! acrescentando `count`, ponto de orvalho, umidade absoluta e, para
//! sensores internos, temperatura/umidade simuladas da parede a partir da
//! última leitura do jardim.

use crate::physics;
use crate::protocol::decode_line;
use crate::rooms::{OUTDOOR_ROOM, RoomMapping};
use crate::types::{EnrichedMetrics, SensorReading, TelemetryFrame, metric_key};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, warn};

/// Enricher compartilhado entre receivers que precisam do mesmo estado
/// externo (ex: serial + UDP alimentando o mesmo Graphite).
pub type SharedEnricher = Arc<Mutex<MetricsEnricher>>;

/// Mapeia sensores para cômodos e calcula métricas derivadas.
///
/// Guarda a última leitura do cômodo externo ([`OUTDOOR_ROOM`]); ela só é
/// substituída por outra leitura externa e nunca expira.
#[derive(Debug)]
pub struct MetricsEnricher {
    mapping: RoomMapping,
    outdoor: Option<SensorReading>,
}

impl MetricsEnricher {
    pub fn new(mapping: RoomMapping) -> Self {
        Self {
            mapping,
            outdoor: None,
        }
    }

    /// Envolve o enricher para uso entre threads.
    pub fn shared(self) -> SharedEnricher {
        Arc::new(Mutex::new(self))
    }

    /// Última leitura externa observada.
    pub fn outdoor(&self) -> Option<&SensorReading> {
        self.outdoor.as_ref()
    }

    /// Decodifica e enriquece uma linha recebida.
    ///
    /// Linha inválida é registrada e resulta em mapa vazio.
    pub fn enrich_line(&mut self, line: &str) -> EnrichedMetrics {
        match decode_line(line) {
            Ok(frame) => self.enrich(&frame),
            Err(e) => {
                error!("Erro ao parsear linha: {line} ({e})");
                EnrichedMetrics::new()
            }
        }
    }

    /// Enriquece um frame já decodificado, sensor a sensor na ordem recebida.
    pub fn enrich(&mut self, frame: &TelemetryFrame) -> EnrichedMetrics {
        let mut result = EnrichedMetrics::new();
        for reading in &frame.readings {
            self.enrich_reading(reading, &mut result);
        }
        result
    }

    fn enrich_reading(&mut self, reading: &SensorReading, result: &mut EnrichedMetrics) {
        let room = self.mapping.get_room(&reading.sensor).to_string();
        let sensor = strip_index(&reading.sensor);
        let mut emit = |metric: &str, value: f64| {
            result.insert(metric_key(&[room.as_str(), sensor, metric]), value);
        };

        for (metric, value) in &reading.values {
            match value.as_f64() {
                Some(v) => emit(metric.as_str(), v),
                None => debug!("Ignorando {}.{metric} não numérico: {value}", reading.sensor),
            }
        }

        emit("count", 1.0);

        if let (Some(t), Some(rh)) = (reading.temperature(), reading.humidity()) {
            match physics::dew_point(t, rh) {
                Some(v) => emit("dewpoint", v),
                None => warn!("Ponto de orvalho indefinido para {} (T={t}, RH={rh})", reading.sensor),
            }
            match physics::absolute_humidity(t, rh) {
                Some(v) => emit("humidity_abs", v),
                None => warn!("Umidade absoluta indefinida para {} (T={t}, RH={rh})", reading.sensor),
            }
        }

        if room == OUTDOOR_ROOM {
            self.outdoor = Some(reading.clone());
            return;
        }

        let Some(outdoor) = &self.outdoor else {
            return;
        };
        let (Some(t_in), Some(rh_in), Some(t_out)) =
            (reading.temperature(), reading.humidity(), outdoor.temperature())
        else {
            return;
        };

        let wall = physics::raw_wall_temperature(t_in, t_out);
        match (
            physics::wall_temperature(t_in, t_out),
            physics::wall_humidity(t_in, rh_in, wall),
        ) {
            (Some(temperature), Some(humidity)) => {
                emit("wall_temperature", temperature);
                emit("wall_humidity", humidity);
            }
            _ => warn!(
                "Métricas de parede indefinidas para {} (T={t_in}, RH={rh_in}, T_ext={t_out})",
                reading.sensor
            ),
        }
    }
}

/// Enriquece uma linha num enricher compartilhado.
///
/// Um lock envenenado não impede o processamento: o estado externo é só
/// uma leitura e continua utilizável.
pub fn enrich_shared(enricher: &SharedEnricher, line: &str) -> EnrichedMetrics {
    enricher
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .enrich_line(line)
}

/// Remove um sufixo `_<dígitos>` do identificador (`rf433_1` → `rf433`).
pub fn strip_index(sensor: &str) -> &str {
    match sensor.rsplit_once('_') {
        Some((base, digits))
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => sensor,
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn enricher(mapping: &str) -> MetricsEnricher {
        MetricsEnricher::new(RoomMapping::parse(mapping).unwrap())
    }

    #[test]
    fn strips_numeric_suffix_only() {
        assert_eq!(strip_index("rf433_1"), "rf433");
        assert_eq!(strip_index("rf433_12"), "rf433");
        assert_eq!(strip_index("rf433"), "rf433");
        assert_eq!(strip_index("rf433_"), "rf433_");
        assert_eq!(strip_index("rf433_a1"), "rf433_a1");
        assert_eq!(strip_index("my_sensor_2"), "my_sensor");
    }

    #[test]
    fn copies_metrics_under_room_and_sensor() {
        let mut e = enricher("study:*");
        let m = e.enrich_line(r#"{"indoor": {"temperature": 21.5, "pressure": 1013}}"#);
        assert_eq!(m.get("study.indoor.temperature"), Some(&21.5));
        assert_eq!(m.get("study.indoor.pressure"), Some(&1013.0));
        assert_eq!(m.get("study.indoor.count"), Some(&1.0));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn empty_room_is_omitted_from_key() {
        let mut e = enricher("");
        let m = e.enrich_line(r#"{"rf433_1": {"temperature": 4.0}}"#);
        assert_eq!(m.get("rf433.temperature"), Some(&4.0));
        assert_eq!(m.get("rf433.count"), Some(&1.0));
    }

    #[test]
    fn frame_is_not_mutated_by_stripping() {
        let mut e = enricher("");
        let frame = decode_line(r#"{"rf433_1": {"temperature": 4.0}}"#).unwrap();
        let m = e.enrich(&frame);
        assert_eq!(frame.readings[0].sensor, "rf433_1");
        assert!(m.contains_key("rf433.temperature"));
    }

    #[test]
    fn count_is_one_per_sensor() {
        let mut e = enricher("");
        let m = e.enrich_line(
            r#"{"a": {}, "b": {"temperature": 1, "humidity": 50, "pressure": 1000}}"#,
        );
        assert_eq!(m.get("a.count"), Some(&1.0));
        assert_eq!(m.get("b.count"), Some(&1.0));
        assert_eq!(m.keys().filter(|k| k.ends_with(".count")).count(), 2);
    }

    #[test]
    fn dewpoint_and_absolute_humidity() {
        let mut e = enricher("study:*");
        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0, "humidity": 50.0}}"#);
        assert_eq!(m.get("study.indoor.dewpoint"), Some(&9.25));
        assert_eq!(m.get("study.indoor.humidity_abs"), Some(&8.64));
    }

    #[test]
    fn missing_humidity_skips_derived_only() {
        let mut e = enricher("study:*");
        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0}}"#);
        assert!(!m.contains_key("study.indoor.dewpoint"));
        assert!(!m.contains_key("study.indoor.humidity_abs"));
        assert_eq!(m.get("study.indoor.temperature"), Some(&20.0));
        assert_eq!(m.get("study.indoor.count"), Some(&1.0));
    }

    #[test]
    fn non_numeric_humidity_skips_derived_only() {
        let mut e = enricher("");
        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0, "humidity": "n/a"}}"#);
        assert!(!m.contains_key("indoor.dewpoint"));
        assert!(!m.contains_key("indoor.humidity"));
        assert_eq!(m.get("indoor.temperature"), Some(&20.0));
    }

    #[test]
    fn zero_humidity_skips_dewpoint_keeps_absolute() {
        let mut e = enricher("");
        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0, "humidity": 0}}"#);
        assert!(!m.contains_key("indoor.dewpoint"));
        assert_eq!(m.get("indoor.humidity_abs"), Some(&0.0));
    }

    #[test]
    fn wall_metrics_after_garden_reading() {
        let mut e = enricher("study:*, garden:rf433*");
        let garden = e.enrich_line(r#"{"rf433_1": {"temperature": -3.2, "humidity": 90.0}}"#);
        assert!(!garden.contains_key("garden.rf433.wall_temperature"));
        assert_eq!(garden.get("garden.rf433.dewpoint"), Some(&-4.6));

        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0, "humidity": 50.0}}"#);
        assert_eq!(m.get("study.indoor.wall_temperature"), Some(&13.74));
        assert_eq!(m.get("study.indoor.wall_humidity"), Some(&73.62));
    }

    #[test]
    fn no_wall_metrics_without_garden_reading() {
        let mut e = enricher("study:*, garden:rf433*");
        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0, "humidity": 50.0}}"#);
        assert!(!m.contains_key("study.indoor.wall_temperature"));
        assert!(!m.contains_key("study.indoor.wall_humidity"));
        assert!(e.outdoor().is_none());
    }

    #[test]
    fn garden_in_same_frame_applies_in_order() {
        let mut e = enricher("study:*, garden:rf433*");
        let m = e.enrich_line(
            r#"{"rf433_1": {"temperature": 10.0, "humidity": 80}, "indoor": {"temperature": 22.0, "humidity": 55.0}}"#,
        );
        assert_eq!(m.get("study.indoor.wall_temperature"), Some(&18.76));
        assert_eq!(m.get("study.indoor.wall_humidity"), Some(&66.8));

        let mut e = enricher("study:*, garden:rf433*");
        let m = e.enrich_line(
            r#"{"indoor": {"temperature": 22.0, "humidity": 55.0}, "rf433_1": {"temperature": 10.0}}"#,
        );
        assert!(!m.contains_key("study.indoor.wall_temperature"));
        assert!(e.outdoor().is_some());
    }

    #[test]
    fn latest_garden_reading_replaces_previous() {
        let mut e = enricher("study:*, garden:rf433*");
        e.enrich_line(r#"{"rf433_1": {"temperature": 30.0}}"#);
        e.enrich_line(r#"{"rf433_1": {"temperature": 10.0}}"#);
        assert_eq!(e.outdoor().and_then(SensorReading::temperature), Some(10.0));

        let m = e.enrich_line(r#"{"indoor": {"temperature": 22.0, "humidity": 55.0}}"#);
        assert_eq!(m.get("study.indoor.wall_temperature"), Some(&18.76));
    }

    #[test]
    fn garden_without_temperature_skips_wall_metrics() {
        let mut e = enricher("study:*, garden:rf433*");
        e.enrich_line(r#"{"rf433_1": {"humidity": 90.0}}"#);
        let m = e.enrich_line(r#"{"indoor": {"temperature": 20.0, "humidity": 50.0}}"#);
        assert!(!m.contains_key("study.indoor.wall_temperature"));
        assert_eq!(m.get("study.indoor.dewpoint"), Some(&9.25));
    }

    #[test]
    fn malformed_line_yields_empty_metrics() {
        let mut e = enricher("study:*");
        assert!(e.enrich_line("not json").is_empty());
        assert!(e.enrich_line("[1, 2, 3]").is_empty());
        assert!(e.enrich_line(r#"{"indoor": 5}"#).is_empty());
    }

    #[test]
    fn shared_enricher_keeps_outdoor_state_across_callers() {
        let shared = enricher("study:*, garden:rf433*").shared();
        let other = Arc::clone(&shared);

        std::thread::spawn(move || {
            enrich_shared(&other, r#"{"rf433_1": {"temperature": -3.2}}"#);
        })
        .join()
        .unwrap();

        let m = enrich_shared(&shared, r#"{"indoor": {"temperature": 20.0, "humidity": 50.0}}"#);
        assert_eq!(m.get("study.indoor.wall_temperature"), Some(&13.74));
    }
}
