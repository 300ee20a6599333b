//! Data models for the MBL API
//!
//! Records stored by the server, request payloads posted by the dashboard forms
//! and the analytics documents returned by the `/analytics` endpoints. Field
//! names follow the JSON wire format, so the same types are used on both sides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered client as stored in the `clientes` table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cliente {
    pub id: u64,
    pub nombre: String,

    /// National document id, unique across clients and immutable after creation
    pub cedula: String,

    pub telefono: Option<String>,
    pub email: Option<String>,

    /// Point balance, never negative
    #[serde(default)]
    pub puntos: u64,

    pub fecha_registro: DateTime<Utc>,
}

/// A voucher ("canje") issued to a client
///
/// Client name and document id are copied at issue time so the voucher list
/// renders without a join.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Canje {
    pub id: u64,
    pub cliente_id: u64,
    pub cliente_nombre: String,
    pub cliente_cedula: String,

    /// Amount in pesos, always greater than zero
    pub monto: f64,

    pub descripcion: Option<String>,
    pub usuario_registro: String,
    pub fecha_canje: DateTime<Utc>,
}

/// A value posted by an HTML form: either a JSON number or the raw input text
///
/// The dashboard forms send `"150"` where a script might send `150`; both are
/// accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) => Some(*n),
            FormValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|n| n.is_finite())
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FormValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            FormValue::Number(_) => None,
            FormValue::Text(s) => s.trim().parse::<u64>().ok(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

/// Request payload for creating or updating a client
///
/// # Example
/// ```json
/// {
///   "nombre": "Juan Perez",
///   "cedula": "1020304050",
///   "telefono": "3001234567",
///   "email": ""
/// }
/// ```
///
/// Empty strings are treated as absent. `cedula` is ignored on update.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ClienteRequest {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub cedula: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Request payload for issuing a voucher
///
/// # Example
/// ```json
/// {
///   "cliente_id": "3",
///   "monto": "25000",
///   "descripcion": "Bono bienvenida"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CanjeRequest {
    #[serde(default)]
    pub cliente_id: Option<FormValue>,
    #[serde(default)]
    pub monto: Option<FormValue>,
    #[serde(default)]
    pub descripcion: Option<String>,
}

/// Query parameters for `GET /analytics/daily-sales`
#[derive(Deserialize, Debug, Default)]
pub struct DailySalesParams {
    /// Number of days ending today, clamped to 1..=365 (default 30)
    pub days: Option<u32>,
}

/// Query parameters for `GET /analytics/top-clients`
#[derive(Deserialize, Debug, Default)]
pub struct TopClientsParams {
    /// Number of clients to return, clamped to 1..=50 (default 10)
    pub limit: Option<usize>,
}

/// Today's voucher figures
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TodayKpis {
    pub canjes: u64,
    pub monto: f64,
    pub promedio: f64,
}

/// Current calendar month figures
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MonthKpis {
    pub canjes: u64,
    pub monto: f64,

    /// Amount change against the previous month, in percent
    pub growth_monto: f64,

    /// Distinct clients with at least one voucher this month
    pub clientes_activos: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TopClient {
    pub cliente_id: u64,
    pub nombre: String,
    pub total_canjes: u64,
    pub total_monto: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Kpis {
    pub today: TodayKpis,
    pub month: MonthKpis,
    pub top_client: Option<TopClient>,
}

/// One series of a chart
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(
        rename = "backgroundColor",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub background_color: Vec<String>,
}

/// Labels plus one or more datasets, the shape the charting layer consumes
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PeriodTotals {
    pub canjes: u64,
    pub monto: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PeriodChanges {
    pub canjes_percent: f64,
    pub monto_percent: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WeeklyComparison {
    pub current_week: PeriodTotals,
    pub previous_week: PeriodTotals,
    pub changes: PeriodChanges,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeekdayStat {
    pub dia_semana: String,
    pub total_canjes: u64,
    pub promedio_monto: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HourlyPattern {
    pub labels: Vec<String>,
    pub canjes: Vec<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Trends {
    pub weekly_comparison: WeeklyComparison,
    pub weekday_ranking: Vec<WeekdayStat>,
    pub hourly_pattern: HourlyPattern,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AdminStats {
    pub total_clientes: u64,
    pub total_canjes: u64,
    pub total_monto: f64,
    pub canjes_hoy: u64,
}
