//! Argumentos de linha de comando; sobrescrevem o `config.toml`.

use clap::Parser;
use meteo_core::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "meteo_receiver", version, about = "Recebe métricas da estação meteorológica")]
pub struct Args {
    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Recebe métricas pela porta serial
    #[arg(long)]
    pub serial: bool,

    /// Porta serial conectada ao dispositivo
    #[arg(long)]
    pub serial_port: Option<String>,

    /// Espera antes de reconectar em segundos (negativo desabilita)
    #[arg(long, allow_negative_numbers = true)]
    pub reconnect_timeout: Option<f64>,

    /// Recebe métricas pela porta UDP
    #[arg(long)]
    pub udp: bool,

    /// Porta UDP para bind
    #[arg(long)]
    pub udp_port: Option<u16>,

    /// Envia métricas para o servidor Graphite
    #[arg(long)]
    pub graphite: bool,

    /// Servidor Graphite
    #[arg(long)]
    pub graphite_server: Option<String>,

    /// Prefixo e nome do sistema no Graphite
    #[arg(long)]
    pub graphite_name: Option<String>,

    /// Mapeamento de cômodos (ex: 'study:*, garden:rf433_1')
    #[arg(long)]
    pub room_mapping: Option<String>,

    /// Não imprime as linhas recebidas
    #[arg(long)]
    pub no_console: bool,
}

impl Args {
    /// Aplica as flags sobre a configuração carregada.
    pub fn apply(&self, config: &mut AppConfig) {
        if self.serial {
            config.serial.enabled = true;
        }
        if let Some(port) = &self.serial_port {
            config.serial.port = port.clone();
        }
        if let Some(secs) = self.reconnect_timeout {
            config.reconnect_timeout_secs = secs;
        }
        if self.udp {
            config.udp.enabled = true;
        }
        if let Some(port) = self.udp_port {
            config.udp.port = port;
        }
        if self.graphite {
            config.graphite.enabled = true;
        }
        if let Some(server) = &self.graphite_server {
            config.graphite.server = server.clone();
        }
        if let Some(name) = &self.graphite_name {
            config.graphite.prefix = name.clone();
            config.graphite.system_name = name.clone();
        }
        if let Some(mapping) = &self.room_mapping {
            config.room_mapping = mapping.clone();
        }
        if self.no_console {
            config.console.enabled = false;
        }
    }
}
