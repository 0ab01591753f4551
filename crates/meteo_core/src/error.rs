//! Taxonomia de erros do pipeline de telemetria.
//!
//! Só [`TransportError`] pode encerrar o loop de um receiver, e apenas
//! quando a reconexão está desabilitada. Os demais são registrados via
//! `tracing` e o processamento continua.

use std::path::PathBuf;

/// Falha de conexão ou leitura no transporte (serial/UDP).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Falha ao conectar em {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Falha de leitura em {target}: {source}")]
    Read {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Descrição do alvo (porta serial ou porta UDP) que falhou.
    pub fn target(&self) -> &str {
        match self {
            Self::Connect { target, .. } | Self::Read { target, .. } => target,
        }
    }
}

/// Linha recebida que não é um frame de telemetria válido.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Formato inesperado: {0}")]
    Shape(String),
}

/// Regra de mapeamento de cômodo que não pôde ser compilada.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Padrão inválido '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Falha ao entregar métricas para um destino (ex: Graphite).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Falha ao conectar em {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Falha ao enviar para {addr}: {source}")]
    Write {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Erros de leitura/gravação do `config.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Erro ao parsear {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Erro de serialização: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Duração inválida em {field}: {value}s")]
    InvalidDuration { field: &'static str, value: f64 },

    #[error("Erro ao gravar {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Erro devolvido por um handler de linhas recebidas.
///
/// O receiver apenas registra o erro; nunca o propaga para o loop.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
