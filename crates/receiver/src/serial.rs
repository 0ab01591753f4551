//! Transporte serial: linhas terminadas em `\n` vindas do dispositivo USB.

use meteo_core::config::SerialConfig;
use meteo_core::error::{ConfigError, TransportError};
use meteo_core::receiver::{Chunk, Transport};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use tracing::info;

pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<BufReader<Box<dyn SerialPort>>>,
    /// Bytes de uma linha ainda incompleta (sobrevive a timeouts)
    pending: Vec<u8>,
}

impl SerialTransport {
    pub fn new(config: &SerialConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            path: config.port.clone(),
            baud_rate: config.baud_rate,
            read_timeout: config.read_timeout()?,
            port: None,
            pending: Vec::new(),
        })
    }
}

impl Transport for SerialTransport {
    fn target(&self) -> String {
        self.path.clone()
    }

    fn initialize(&mut self) -> Result<(), TransportError> {
        let port = serialport::new(&self.path, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| TransportError::Connect {
                target: self.target(),
                source: e.into(),
            })?;

        info!("Porta serial {} aberta ({} baud)", self.path, self.baud_rate);
        self.port = Some(BufReader::new(port));
        self.pending.clear();
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Chunk>, TransportError> {
        let result = match self.port.as_mut() {
            Some(port) => read_line(port, &mut self.pending),
            None => Err(io::ErrorKind::NotConnected.into()),
        };

        match result {
            Ok(Some(data)) => Ok(Some(Chunk {
                source: self.path.clone(),
                data,
            })),
            Ok(None) => Ok(None),
            Err(source) => Err(TransportError::Read {
                target: self.target(),
                source,
            }),
        }
    }

    fn close(&mut self) {
        self.port = None;
        self.pending.clear();
    }
}

/// Lê até `\n`, acumulando em `pending` entre timeouts.
///
/// `Ok(None)` em timeout. Fim de stream com linha vazia significa que o
/// dispositivo sumiu e vira erro.
fn read_line<R: BufRead>(reader: &mut R, pending: &mut Vec<u8>) -> io::Result<Option<String>> {
    match reader.read_until(b'\n', pending) {
        Ok(0) if pending.is_empty() => Err(io::ErrorKind::UnexpectedEof.into()),
        Ok(_) => {
            let line = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            Ok(Some(line))
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
