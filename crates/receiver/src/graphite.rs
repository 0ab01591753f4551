//! Cliente Graphite (protocolo plaintext na porta 2003).
//!
//! Formato de cada registro:
//!
//! ```text
//! <prefix>.<system_name>.<metrica> <valor> <unix_ts>\n
//! ```
//!
//! A conexão é aberta e fechada a cada envio.

use meteo_core::config::GraphiteConfig;
use meteo_core::error::{ConfigError, SinkError};
use meteo_core::types::EnrichedMetrics;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct GraphiteClient {
    server: String,
    port: u16,
    prefix: String,
    timeout: Duration,
}

impl GraphiteClient {
    pub fn new(config: &GraphiteConfig) -> Result<Self, ConfigError> {
        let prefix = [config.prefix.as_str(), config.system_name.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".");
        Ok(Self {
            server: config.server.clone(),
            port: config.port,
            prefix,
            timeout: config.timeout()?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// Envia todas as métricas numa única conexão. Retorna bytes enviados.
    pub fn send(&self, metrics: &EnrichedMetrics) -> Result<usize, SinkError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let payload = format_records(&self.prefix, metrics, timestamp);

        let mut stream = self.connect()?;
        let write_error = |source| SinkError::Write {
            addr: self.addr(),
            source,
        };
        stream.set_write_timeout(Some(self.timeout)).map_err(write_error)?;
        stream.write_all(payload.as_bytes()).map_err(write_error)?;
        stream.flush().map_err(write_error)?;
        // Servidor pode já ter fechado; os dados foram entregues
        let _ = stream.shutdown(Shutdown::Both);

        Ok(payload.len())
    }

    fn connect(&self) -> Result<TcpStream, SinkError> {
        let connect_error = |source| SinkError::Connect {
            addr: self.addr(),
            source,
        };
        let addrs = (self.server.as_str(), self.port)
            .to_socket_addrs()
            .map_err(connect_error)?;

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "nenhum endereço resolvido");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = e,
            }
        }
        Err(connect_error(last_error))
    }
}

/// Monta os registros plaintext, um por linha.
pub fn format_records(prefix: &str, metrics: &EnrichedMetrics, timestamp: u64) -> String {
    let mut out = String::new();
    for (key, value) in metrics {
        if !prefix.is_empty() {
            out.push_str(prefix);
            out.push('.');
        }
        out.push_str(&format!("{key} {value} {timestamp}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    fn metrics() -> EnrichedMetrics {
        EnrichedMetrics::from([
            ("study.indoor.temperature".to_string(), 21.5),
            ("study.indoor.count".to_string(), 1.0),
        ])
    }

    fn config(port: u16) -> GraphiteConfig {
        GraphiteConfig {
            enabled: true,
            server: "127.0.0.1".into(),
            port,
            timeout_secs: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn formats_plaintext_records() {
        let out = format_records("weather.weather", &metrics(), 1_700_000_000);
        assert_eq!(
            out,
            "weather.weather.study.indoor.count 1 1700000000\n\
             weather.weather.study.indoor.temperature 21.5 1700000000\n"
        );
    }

    #[test]
    fn empty_prefix_segments_are_skipped() {
        let client = GraphiteClient::new(&GraphiteConfig {
            prefix: String::new(),
            system_name: "station".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.prefix, "station");
        assert_eq!(format_records("", &metrics(), 1).lines().count(), 2);
    }

    #[test]
    fn sends_over_tcp_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = String::new();
            conn.read_to_string(&mut received).unwrap();
            received
        });

        let client = GraphiteClient::new(&config(port)).unwrap();
        let sent = client.send(&metrics()).unwrap();

        let received = server.join().unwrap();
        assert_eq!(received.len(), sent);
        assert!(received.starts_with("weather.weather.study.indoor.count 1 "));
        assert_eq!(received.lines().count(), 2);
    }

    #[test]
    fn unreachable_server_is_connect_error() {
        // Porta liberada logo após o bind: nada escutando
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = GraphiteClient::new(&config(port)).unwrap();
        assert!(matches!(
            client.send(&metrics()),
            Err(SinkError::Connect { .. })
        ));
    }
}
