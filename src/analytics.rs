//! Voucher analytics
//!
//! Pure aggregations over the voucher list. Every function takes the reference
//! instant explicitly so handlers pass `Utc::now()` and tests pass a fixed date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{
    AdminStats, Canje, ChartData, Cliente, Dataset, HourlyPattern, Kpis, MonthKpis,
    PeriodChanges, PeriodTotals, TodayKpis, TopClient, Trends, WeekdayStat, WeeklyComparison,
};

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;
pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 50;

/// Bar colours for the top-clients chart, cycled when the limit exceeds them
pub const TOP_CLIENT_COLORS: [&str; 10] = [
    "#8B5CF6", "#10B981", "#F59E0B", "#EF4444", "#3B82F6", "#EC4899", "#14B8A6", "#F97316",
    "#6366F1", "#84CC16",
];

/// Weekday names indexed by `num_days_from_monday`
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

/// Rounds to `1 / factor`; sums past `f64::MAX` saturate so they still serialize as numbers
fn round_to(value: f64, factor: f64) -> f64 {
    let value = value.clamp(f64::MIN, f64::MAX);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

fn round1(value: f64) -> f64 {
    round_to(value, 10.0)
}

fn round2(value: f64) -> f64 {
    round_to(value, 100.0)
}

fn average(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(total / count as f64)
    }
}

/// Relative change from `previous` to `current`, in percent with one decimal
///
/// A move from nothing to something counts as 100%.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        round1((current - previous) / previous * 100.0)
    }
}

fn totals<'a>(canjes: impl Iterator<Item = &'a Canje>) -> PeriodTotals {
    let (count, amount) = canjes.fold((0u64, 0.0f64), |(c, m), canje| (c + 1, m + canje.monto));
    PeriodTotals {
        canjes: count,
        monto: round2(amount),
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Clients ranked by total voucher amount, ties broken by voucher count then name
pub fn rank_clients(canjes: &[Canje]) -> Vec<TopClient> {
    let mut by_client: HashMap<u64, TopClient> = HashMap::new();
    for canje in canjes {
        let entry = by_client.entry(canje.cliente_id).or_insert_with(|| TopClient {
            cliente_id: canje.cliente_id,
            nombre: canje.cliente_nombre.clone(),
            total_canjes: 0,
            total_monto: 0.0,
        });
        entry.total_canjes += 1;
        entry.total_monto += canje.monto;
    }

    let mut ranked: Vec<TopClient> = by_client
        .into_values()
        .map(|mut client| {
            client.total_monto = round2(client.total_monto);
            client
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_monto
            .total_cmp(&a.total_monto)
            .then(b.total_canjes.cmp(&a.total_canjes))
            .then_with(|| a.nombre.cmp(&b.nombre))
    });
    ranked
}

/// Headline figures for today and the current month
pub fn kpis(canjes: &[Canje], now: DateTime<Utc>) -> Kpis {
    let today = now.date_naive();
    let (year, month) = (today.year(), today.month());
    let (prev_year, prev_month) = previous_month(year, month);

    let today_totals = totals(canjes.iter().filter(|c| c.fecha_canje.date_naive() == today));

    let in_month = |c: &&Canje, y: i32, m: u32| {
        let date = c.fecha_canje.date_naive();
        date.year() == y && date.month() == m
    };
    let month_totals = totals(canjes.iter().filter(|c| in_month(c, year, month)));
    let previous_totals = totals(canjes.iter().filter(|c| in_month(c, prev_year, prev_month)));

    let active: HashSet<u64> = canjes
        .iter()
        .filter(|c| in_month(c, year, month))
        .map(|c| c.cliente_id)
        .collect();

    Kpis {
        today: TodayKpis {
            canjes: today_totals.canjes,
            monto: today_totals.monto,
            promedio: average(today_totals.monto, today_totals.canjes),
        },
        month: MonthKpis {
            canjes: month_totals.canjes,
            monto: month_totals.monto,
            growth_monto: percent_change(month_totals.monto, previous_totals.monto),
            clientes_activos: active.len() as u64,
        },
        top_client: rank_clients(canjes).into_iter().next(),
    }
}

/// Voucher count and amount per day for the `days` days ending today
pub fn daily_sales(canjes: &[Canje], now: DateTime<Utc>, days: Option<u32>) -> ChartData {
    let days = days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let today = now.date_naive();
    let start = today - Duration::days(i64::from(days) - 1);

    let mut per_day: BTreeMap<NaiveDate, (u64, f64)> = BTreeMap::new();
    for canje in canjes {
        let date = canje.fecha_canje.date_naive();
        if date >= start && date <= today {
            let slot = per_day.entry(date).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 += canje.monto;
        }
    }

    let mut labels = Vec::with_capacity(days as usize);
    let mut counts = Vec::with_capacity(days as usize);
    let mut amounts = Vec::with_capacity(days as usize);
    for date in start.iter_days().take(days as usize) {
        let (count, amount) = per_day.get(&date).copied().unwrap_or((0, 0.0));
        labels.push(date.format("%d/%m").to_string());
        counts.push(count as f64);
        amounts.push(round2(amount));
    }

    ChartData {
        labels,
        datasets: vec![
            Dataset {
                label: "Canjes Diarios".to_string(),
                data: counts,
                background_color: Vec::new(),
            },
            Dataset {
                label: "Monto Diario ($)".to_string(),
                data: amounts,
                background_color: Vec::new(),
            },
        ],
    }
}

/// Horizontal bar data of the clients with the largest total amount
pub fn top_clients(canjes: &[Canje], limit: Option<usize>) -> ChartData {
    let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);
    let ranked: Vec<TopClient> = rank_clients(canjes).into_iter().take(limit).collect();

    ChartData {
        labels: ranked.iter().map(|c| c.nombre.clone()).collect(),
        datasets: vec![Dataset {
            label: "Monto Total Canjeado".to_string(),
            data: ranked.iter().map(|c| c.total_monto).collect(),
            background_color: (0..ranked.len())
                .map(|i| TOP_CLIENT_COLORS[i % TOP_CLIENT_COLORS.len()].to_string())
                .collect(),
        }],
    }
}

/// Week-over-week comparison, weekday ranking and hour-of-day pattern
///
/// The current week is the seven days ending today; the previous week is the
/// seven days before that.
pub fn trends(canjes: &[Canje], now: DateTime<Utc>) -> Trends {
    let today = now.date_naive();
    let current_start = today - Duration::days(6);
    let previous_start = today - Duration::days(13);

    let current = totals(canjes.iter().filter(|c| {
        let date = c.fecha_canje.date_naive();
        date >= current_start && date <= today
    }));
    let previous = totals(canjes.iter().filter(|c| {
        let date = c.fecha_canje.date_naive();
        date >= previous_start && date < current_start
    }));

    let mut weekdays = [(0u64, 0.0f64); 7];
    let mut hours = [0u64; 24];
    for canje in canjes {
        let slot = &mut weekdays[canje.fecha_canje.weekday().num_days_from_monday() as usize];
        slot.0 += 1;
        slot.1 += canje.monto;
        hours[canje.fecha_canje.hour() as usize] += 1;
    }

    let mut weekday_ranking: Vec<WeekdayStat> = weekdays
        .iter()
        .enumerate()
        .filter(|(_, (count, _))| *count > 0)
        .map(|(day, (count, amount))| WeekdayStat {
            dia_semana: WEEKDAY_NAMES[day].to_string(),
            total_canjes: *count,
            promedio_monto: average(*amount, *count),
        })
        .collect();
    // stable: ties keep Monday-first order
    weekday_ranking.sort_by(|a, b| b.total_canjes.cmp(&a.total_canjes));

    Trends {
        weekly_comparison: WeeklyComparison {
            changes: PeriodChanges {
                canjes_percent: percent_change(current.canjes as f64, previous.canjes as f64),
                monto_percent: percent_change(current.monto, previous.monto),
            },
            current_week: current,
            previous_week: previous,
        },
        weekday_ranking,
        hourly_pattern: HourlyPattern {
            labels: (0..24).map(|h| format!("{:02}:00", h)).collect(),
            canjes: hours.to_vec(),
        },
    }
}

/// Totals for the admin tab
pub fn admin_stats(clientes: &[Cliente], canjes: &[Canje], now: DateTime<Utc>) -> AdminStats {
    let today = now.date_naive();
    let all = totals(canjes.iter());

    AdminStats {
        total_clientes: clientes.len() as u64,
        total_canjes: all.canjes,
        total_monto: all.monto,
        canjes_hoy: canjes
            .iter()
            .filter(|c| c.fecha_canje.date_naive() == today)
            .count() as u64,
    }
}
