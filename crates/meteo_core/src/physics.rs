//! Grandezas físicas derivadas das leituras de temperatura e umidade.
//!
//! Todas as funções devolvem `None` quando o resultado não é finito
//! (ex: umidade 0% no ponto de orvalho). Os valores já saem arredondados
//! com [`round2`].
//!
//! Referências:
//! - Ponto de orvalho (Magnus): <https://en.wikipedia.org/wiki/Dew_point>
//! - Umidade absoluta: <https://www.wetterochs.de/wetter/feuchte.html>
//! - Temperatura/umidade de parede: <https://forum.fhem.de/index.php?topic=29773.0>

/// Coeficientes de Magnus usados no ponto de orvalho.
const DEW_A: f64 = 17.27;
const DEW_B: f64 = 237.7;

/// Coeficientes da pressão de vapor saturado (hPa).
const SVP_BASE: f64 = 6.112;
const SVP_A: f64 = 17.67;
const SVP_B: f64 = 243.5;

/// Massa molar da água (kg/kmol) e constante universal dos gases (J/(kmol·K)).
const MW_WATER: f64 = 18.016;
const R_GAS: f64 = 8314.3;

const KELVIN: f64 = 273.15;

/// Peso da temperatura interna na temperatura simulada da parede.
pub const WALL_FACTOR: f64 = 0.73;

/// Coeficientes da fórmula de saturação usada na umidade de parede.
const WALL_A: f64 = 7.62;
const WALL_B: f64 = 234.175;

/// Arredonda para 2 casas decimais (empate vai para o par).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then(|| round2(value))
}

/// Ponto de orvalho (°C).
pub fn dew_point(temperature: f64, humidity: f64) -> Option<f64> {
    let gamma = (DEW_A * temperature) / (DEW_B + temperature) + (humidity / 100.0).ln();
    finite((DEW_B * gamma) / (DEW_A - gamma))
}

/// Umidade absoluta (g/m³).
pub fn absolute_humidity(temperature: f64, humidity: f64) -> Option<f64> {
    let svp = SVP_BASE * ((SVP_A * temperature) / (SVP_B + temperature)).exp();
    let avp = humidity / 100.0 * svp;
    finite(1e5 * MW_WATER / R_GAS * avp / (temperature + KELVIN))
}

/// Temperatura simulada da parede (°C): média ponderada interna/externa.
pub fn wall_temperature(indoor: f64, outdoor: f64) -> Option<f64> {
    finite(raw_wall_temperature(indoor, outdoor))
}

/// Umidade relativa simulada junto à parede (%).
///
/// `wall` é a temperatura da parede sem arredondamento.
pub fn wall_humidity(indoor: f64, humidity: f64, wall: f64) -> Option<f64> {
    let saturation = |t: f64| 10f64.powf((WALL_A * t) / (WALL_B + t));
    finite(
        (humidity * saturation(indoor) * (KELVIN + wall))
            / (saturation(wall) * (KELVIN + indoor)),
    )
}

/// Temperatura da parede sem arredondamento, base para [`wall_humidity`].
pub(crate) fn raw_wall_temperature(indoor: f64, outdoor: f64) -> f64 {
    WALL_FACTOR * indoor + (1.0 - WALL_FACTOR) * outdoor
}
