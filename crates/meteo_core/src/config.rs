//! Configuração unificada via TOML.
//!
//! Os valores padrão são os mesmos da linha de comando do receiver; flags
//! passadas na execução sobrescrevem o arquivo.

use crate::error::ConfigError;
use crate::protocol::{MAX_DATAGRAM, SERIAL_BAUD_RATE};
use crate::receiver::ReceiverConfig;
use crate::rooms::RoomMapping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Porta serial conectada ao dispositivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: bool,
    /// Caminho da porta (ex: "/dev/ttyACM0", "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// Timeout de leitura em segundos
    pub read_timeout_secs: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "/dev/ttyACM0".into(),
            baud_rate: SERIAL_BAUD_RATE,
            read_timeout_secs: 3.0,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs("serial.read_timeout_secs", self.read_timeout_secs)
    }
}

/// Socket UDP onde o dispositivo envia os frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    pub enabled: bool,
    /// IP local para bind
    pub bind_ip: String,
    pub port: u16,
    /// Timeout de leitura em segundos
    pub read_timeout_secs: f64,
    /// Tamanho máximo do datagrama (bytes)
    pub max_datagram: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_ip: "0.0.0.0".into(),
            port: 8600,
            read_timeout_secs: 3.0,
            max_datagram: MAX_DATAGRAM,
        }
    }
}

impl UdpConfig {
    pub fn read_timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs("udp.read_timeout_secs", self.read_timeout_secs)
    }
}

/// Saída no console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Envio para o servidor Graphite (protocolo plaintext).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphiteConfig {
    pub enabled: bool,
    pub server: String,
    pub port: u16,
    /// Prefixo raiz das métricas
    pub prefix: String,
    /// Nome do sistema, segundo nível das métricas
    pub system_name: String,
    /// Timeout de conexão/escrita em segundos
    pub timeout_secs: f64,
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "localhost".into(),
            port: 2003,
            prefix: "weather".into(),
            system_name: "weather".into(),
            timeout_secs: 5.0,
        }
    }
}

impl GraphiteConfig {
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs("graphite.timeout_secs", self.timeout_secs)
    }
}

/// Converte segundos num timeout positivo e representável.
fn positive_secs(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(ConfigError::InvalidDuration { field, value: secs }),
    }
}

/// Configuração raiz do receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Espera antes de reconectar (segundos); negativo desabilita
    pub reconnect_timeout_secs: f64,
    /// Mapeamento de cômodos (ex: "study:*, garden:rf433_1")
    pub room_mapping: String,
    pub serial: SerialConfig,
    pub udp: UdpConfig,
    pub console: ConsoleConfig,
    pub graphite: GraphiteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reconnect_timeout_secs: -1.0,
            room_mapping: String::new(),
            serial: SerialConfig::default(),
            udp: UdpConfig::default(),
            console: ConsoleConfig::default(),
            graphite: GraphiteConfig::default(),
        }
    }
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Carrega configuração; arquivo ausente ou inválido usa os padrões.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match Self::try_load(path) {
                Ok(config) => {
                    info!("Configuração carregada de {}", path.display());
                    return config;
                }
                Err(e) => warn!("{e}"),
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Política de reconexão compartilhada por todos os receivers.
    pub fn receiver_config(&self) -> Result<ReceiverConfig, ConfigError> {
        ReceiverConfig::from_reconnect_secs(self.reconnect_timeout_secs).map_err(|_| {
            ConfigError::InvalidDuration {
                field: "reconnect_timeout_secs",
                value: self.reconnect_timeout_secs,
            }
        })
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.serial.enabled && !self.udp.enabled {
            errors.push("Nenhum transporte habilitado (serial ou udp)".into());
        }
        if self.serial.enabled {
            if self.serial.port.is_empty() {
                errors.push("Porta serial não pode ser vazia".into());
            }
            if self.serial.baud_rate == 0 {
                errors.push("Baud rate não pode ser 0".into());
            }
            if let Err(e) = self.serial.read_timeout() {
                errors.push(e.to_string());
            }
        }
        if self.udp.enabled {
            if self.udp.port == 0 {
                errors.push("Porta UDP não pode ser 0".into());
            }
            if let Err(e) = self.udp.read_timeout() {
                errors.push(e.to_string());
            }
            if self.udp.max_datagram == 0 {
                errors.push("Tamanho máximo de datagrama não pode ser 0".into());
            }
        }
        if let Err(e) = self.receiver_config() {
            errors.push(e.to_string());
        }
        if let Err(e) = RoomMapping::parse(&self.room_mapping) {
            errors.push(format!("Mapeamento de cômodos inválido: {e}"));
        }
        if self.graphite.enabled {
            if self.graphite.server.is_empty() {
                errors.push("Servidor Graphite não pode ser vazio".into());
            }
            if self.graphite.port == 0 {
                errors.push("Porta do Graphite não pode ser 0".into());
            }
            if let Err(e) = self.graphite.timeout() {
                errors.push(e.to_string());
            }
        }

        errors
    }
}
