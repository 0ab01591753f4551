//! Transporte UDP: cada datagrama do dispositivo traz uma ou mais linhas.

use meteo_core::config::UdpConfig;
use meteo_core::error::{ConfigError, TransportError};
use meteo_core::receiver::{Chunk, Transport};
use std::io;
use std::net::UdpSocket;
use std::time::Duration;
use tracing::info;

pub struct UdpTransport {
    bind_ip: String,
    port: u16,
    read_timeout: Duration,
    buf: Vec<u8>,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new(config: &UdpConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_ip: config.bind_ip.clone(),
            port: config.port,
            read_timeout: config.read_timeout()?,
            buf: vec![0u8; config.max_datagram],
            socket: None,
        })
    }

    /// Porta local efetiva (porta 0 nos testes).
    #[cfg(test)]
    fn local_port(&self) -> Option<u16> {
        self.socket
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .map(|addr| addr.port())
    }

    fn read_error(&self, source: io::Error) -> TransportError {
        TransportError::Read {
            target: self.target(),
            source,
        }
    }
}

impl Transport for UdpTransport {
    fn target(&self) -> String {
        format!("udp://{}:{}", self.bind_ip, self.port)
    }

    fn initialize(&mut self) -> Result<(), TransportError> {
        let connect_error = |source| TransportError::Connect {
            target: self.target(),
            source,
        };
        let sock = UdpSocket::bind((self.bind_ip.as_str(), self.port)).map_err(connect_error)?;
        sock.set_read_timeout(Some(self.read_timeout))
            .map_err(connect_error)?;

        info!("Escutando em {}", self.target());
        self.socket = Some(sock);
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Chunk>, TransportError> {
        let Some(sock) = &self.socket else {
            return Err(self.read_error(io::ErrorKind::NotConnected.into()));
        };

        match sock.recv_from(&mut self.buf) {
            Ok((size, addr)) => Ok(Some(Chunk {
                source: addr.ip().to_string(),
                data: String::from_utf8_lossy(&self.buf[..size]).into_owned(),
            })),
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                // Timeout normal, continua
                Ok(None)
            }
            Err(e) => Err(self.read_error(e)),
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}
