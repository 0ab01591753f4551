//! Mapeamento de sensores para cômodos.
//!
//! A string de mapeamento tem o formato `"study:*, garden:rf433*"`:
//! pares `comodo:padrao` separados por vírgula. `*` casa qualquer
//! sequência de caracteres; todo o resto (inclusive `:` extras) é literal.
//!
//! Regras declaradas **depois** têm prioridade maior. Um `*` declarado por
//! último portanto esconde qualquer regra específica anterior.

use crate::error::MappingError;
use regex::Regex;

/// Cômodo externo cujas leituras alimentam as métricas de parede.
pub const OUTDOOR_ROOM: &str = "garden";

/// Padrão que casa qualquer sensor.
const CATCH_ALL: &str = "*";

/// Uma regra compilada: padrão ancorado + prefixo do cômodo.
#[derive(Debug, Clone)]
pub struct RoomRule {
    regex: Regex,
    room: String,
}

impl RoomRule {
    fn compile(room: &str, pattern: &str) -> Result<Self, MappingError> {
        let pattern = if pattern.is_empty() { CATCH_ALL } else { pattern };
        let source = format!(
            "^{}$",
            pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        );
        let regex = Regex::new(&source).map_err(|source| MappingError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            room: room.to_string(),
        })
    }

    /// Expressão regular ancorada (ex: `^rf433.*$`).
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    fn is_catch_all(&self) -> bool {
        self.pattern() == "^.*$"
    }

    fn matches(&self, sensor: &str) -> bool {
        self.regex.is_match(sensor)
    }
}

/// Tabela de regras em ordem de prioridade (imutável após construção).
#[derive(Debug, Clone)]
pub struct RoomMapping {
    rules: Vec<RoomRule>,
}

impl RoomMapping {
    /// Compila uma string de mapeamento.
    ///
    /// String vazia resulta numa única regra `*` com cômodo vazio. Se
    /// nenhuma regra for `*`, uma regra `("", *)` é adicionada com a menor
    /// prioridade, então todo sensor sempre resolve para algum cômodo.
    pub fn parse(mapping: &str) -> Result<Self, MappingError> {
        let mut rules = mapping
            .split(',')
            .rev()
            .map(|entry| {
                let (room, pattern) = entry.trim().split_once(':').unwrap_or((entry.trim(), ""));
                RoomRule::compile(room, pattern)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !rules.iter().any(RoomRule::is_catch_all) {
            rules.push(RoomRule::compile("", CATCH_ALL)?);
        }

        Ok(Self { rules })
    }

    /// Regras na ordem em que são avaliadas.
    pub fn rules(&self) -> &[RoomRule] {
        &self.rules
    }

    /// Cômodo do primeiro padrão que casa com o sensor.
    pub fn get_room(&self, sensor: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(sensor))
            .map(RoomRule::room)
            .unwrap_or_default()
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
