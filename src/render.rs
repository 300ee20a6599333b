//! HTML fragments for the list views and the dashboard regions
//!
//! Every table body goes through [`table_rows`], so an empty list always
//! renders a single placeholder row spanning the whole table.

use crate::casino::{Client, PointsHistoryEntry, Prize, Redemption, Voucher};
use crate::format::{escape_html, format_date, format_money, format_number, or_dash, truncate};
use crate::model::{AdminStats, Canje, Cliente, Kpis, Trends, WeekdayStat};

pub const NO_CLIENTES: &str = "No hay clientes registrados";
pub const NO_CANJES: &str = "No hay canjes registrados";
pub const NO_SEARCH_MATCH: &str = "Ningún cliente coincide con la búsqueda";

/// Rows for `items`, or the `no-data` placeholder when there are none
pub fn table_rows<T>(
    items: &[T],
    colspan: usize,
    empty_message: &str,
    row: impl Fn(&T) -> String,
) -> String {
    if items.is_empty() {
        return format!(
            "<tr><td colspan=\"{}\" class=\"no-data\">{}</td></tr>",
            colspan,
            escape_html(empty_message)
        );
    }
    items.iter().map(row).collect()
}

fn client_name(clients: &[Client], id: u64) -> String {
    clients
        .iter()
        .find(|c| c.id == id)
        .map(|c| escape_html(&c.name))
        .unwrap_or_else(|| format!("#{}", id))
}

// dashboard tables

pub fn clientes_table(clientes: &[Cliente], empty_message: &str) -> String {
    table_rows(clientes, 6, empty_message, |cliente| {
        format!(
            "<tr data-id=\"{id}\"><td>{nombre}</td><td>{cedula}</td><td>{telefono}</td><td>{email}</td><td>{fecha}</td>\
             <td class=\"actions\"><button class=\"btn-icon edit-btn\" data-action=\"edit-client\" data-id=\"{id}\" title=\"Editar\"><i class=\"fas fa-edit\"></i></button>\
             <button class=\"btn-icon delete-btn\" data-action=\"delete-client\" data-id=\"{id}\" title=\"Eliminar\"><i class=\"fas fa-trash\"></i></button></td></tr>",
            id = cliente.id,
            nombre = escape_html(&cliente.nombre),
            cedula = escape_html(&cliente.cedula),
            telefono = or_dash(cliente.telefono.as_deref()),
            email = or_dash(cliente.email.as_deref()),
            fecha = format_date(Some(&cliente.fecha_registro)),
        )
    })
}

pub fn canjes_table(canjes: &[Canje]) -> String {
    table_rows(canjes, 6, NO_CANJES, |canje| {
        format!(
            "<tr data-id=\"{id}\"><td>{fecha}</td><td>{nombre} ({cedula})</td><td class=\"amount\">{monto}</td><td>{descripcion}</td><td>{usuario}</td>\
             <td class=\"actions\"><button class=\"btn-icon delete-btn\" data-action=\"delete-canje\" data-id=\"{id}\" title=\"Eliminar\"><i class=\"fas fa-trash\"></i></button></td></tr>",
            id = canje.id,
            fecha = format_date(Some(&canje.fecha_canje)),
            nombre = escape_html(&canje.cliente_nombre),
            cedula = escape_html(&canje.cliente_cedula),
            monto = format_money(canje.monto),
            descripcion = or_dash(canje.descripcion.as_deref()),
            usuario = escape_html(&canje.usuario_registro),
        )
    })
}

/// `<option>` list of the voucher form's client selector
pub fn cliente_options(clientes: &[Cliente]) -> String {
    let mut out = String::from("<option value=\"\">Seleccionar cliente...</option>");
    for cliente in clientes {
        out.push_str(&format!(
            "<option value=\"{}\">{} - {}</option>",
            cliente.id,
            escape_html(&cliente.nombre),
            escape_html(&cliente.cedula)
        ));
    }
    out
}

/// Plain text a row is matched against by the client search box
pub fn cliente_search_text(cliente: &Cliente) -> String {
    format!(
        "{} {} {} {} {}",
        cliente.nombre,
        cliente.cedula,
        cliente.telefono.as_deref().unwrap_or("-"),
        cliente.email.as_deref().unwrap_or("-"),
        format_date(Some(&cliente.fecha_registro))
    )
    .to_lowercase()
}

// dashboard regions

/// Arrow and absolute percentage, with a `positive`/`negative` class
pub fn change_indicator(percent: f64, label: &str, base_class: &str) -> String {
    let (icon, class) = if percent >= 0.0 {
        ("fa-arrow-up", "positive")
    } else {
        ("fa-arrow-down", "negative")
    };
    let label = if label.is_empty() {
        String::new()
    } else {
        format!(" {}", escape_html(label))
    };
    format!(
        "<span class=\"{} {}\"><i class=\"fas {}\"></i> {}%{}</span>",
        base_class,
        class,
        icon,
        format_number(percent.abs()),
        label
    )
}

/// Region id and content of every KPI card
pub fn kpi_regions(kpis: &Kpis) -> Vec<(&'static str, String)> {
    let mut regions = vec![
        ("canjes-hoy", kpis.today.canjes.to_string()),
        ("monto-hoy", format_money(kpis.today.monto)),
        ("canjes-mes", kpis.month.canjes.to_string()),
        ("monto-mes", format_money(kpis.month.monto)),
        (
            "growth-mes",
            change_indicator(kpis.month.growth_monto, "", "kpi-growth"),
        ),
        ("clientes-activos", kpis.month.clientes_activos.to_string()),
        (
            "promedio-canje",
            format!("{} promedio", format_money(kpis.today.promedio)),
        ),
    ];

    match &kpis.top_client {
        Some(top) => {
            regions.push(("top-cliente-nombre", escape_html(&truncate(&top.nombre, 20))));
            regions.push(("top-cliente-canjes", format!("{} canjes", top.total_canjes)));
            regions.push(("top-cliente-monto", format_money(top.total_monto)));
        }
        None => {
            regions.push(("top-cliente-nombre", "-".to_string()));
            regions.push(("top-cliente-canjes", "0 canjes".to_string()));
            regions.push(("top-cliente-monto", format_money(0.0)));
        }
    }
    regions
}

pub fn weekday_ranking(days: &[WeekdayStat]) -> String {
    if days.is_empty() {
        return "<div class=\"no-data\">Sin datos</div>".to_string();
    }
    days.iter()
        .enumerate()
        .map(|(index, day)| {
            format!(
                "<div class=\"weekday-item\"><div class=\"weekday-rank\">{}</div><div class=\"weekday-name\">{}</div>\
                 <div class=\"weekday-stats\"><span class=\"weekday-canjes\">{} canjes</span><span class=\"weekday-avg\">{} promedio</span></div></div>",
                index + 1,
                escape_html(&day.dia_semana),
                day.total_canjes,
                format_money(day.promedio_monto)
            )
        })
        .collect()
}

/// Region id and content of the weekly comparison block
pub fn trend_regions(trends: &Trends) -> Vec<(&'static str, String)> {
    let weekly = &trends.weekly_comparison;
    vec![
        (
            "current-week-canjes",
            format!("{} canjes", weekly.current_week.canjes),
        ),
        ("current-week-monto", format_money(weekly.current_week.monto)),
        (
            "previous-week-canjes",
            format!("{} canjes", weekly.previous_week.canjes),
        ),
        ("previous-week-monto", format_money(weekly.previous_week.monto)),
        (
            "canjes-change",
            change_indicator(weekly.changes.canjes_percent, "Canjes", "change-item"),
        ),
        (
            "monto-change",
            change_indicator(weekly.changes.monto_percent, "Monto", "change-item"),
        ),
        ("weekday-ranking", weekday_ranking(&trends.weekday_ranking)),
    ]
}

pub fn admin_regions(stats: &AdminStats) -> Vec<(&'static str, String)> {
    vec![
        ("admin-total-clientes", stats.total_clientes.to_string()),
        ("admin-total-canjes", stats.total_canjes.to_string()),
        ("admin-total-monto", format_number(stats.total_monto)),
        ("admin-canjes-hoy", stats.canjes_hoy.to_string()),
    ]
}

// in-memory store tables

pub fn clients_table(clients: &[Client]) -> String {
    table_rows(clients, 6, NO_CLIENTES, |client| {
        format!(
            "<tr data-id=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"points\">{}</td><td>{}</td></tr>",
            client.id,
            escape_html(&client.name),
            escape_html(&client.document_id),
            or_dash(client.phone.as_deref()),
            or_dash(client.email.as_deref()),
            format_number(client.points as f64),
            format_date(Some(&client.created_at)),
        )
    })
}

pub fn vouchers_table(vouchers: &[Voucher], clients: &[Client]) -> String {
    table_rows(vouchers, 5, NO_CANJES, |voucher| {
        format!(
            "<tr data-id=\"{}\"><td>{}</td><td>{}</td><td class=\"amount\">{}</td><td>{}</td><td>{}</td></tr>",
            voucher.id,
            format_date(Some(&voucher.created_at)),
            client_name(clients, voucher.client_id),
            format_money(voucher.amount),
            or_dash(voucher.description.as_deref()),
            escape_html(&voucher.user),
        )
    })
}

pub fn prizes_table(prizes: &[Prize]) -> String {
    table_rows(prizes, 3, "No hay premios registrados", |prize| {
        format!(
            "<tr data-id=\"{}\"><td>{}</td><td class=\"points\">{}</td><td>{}</td></tr>",
            prize.id,
            escape_html(&prize.name),
            format_number(prize.points_required as f64),
            or_dash(prize.description.as_deref()),
        )
    })
}

pub fn history_table(entries: &[PointsHistoryEntry], clients: &[Client]) -> String {
    table_rows(entries, 5, "No hay movimientos de puntos", |entry| {
        let class = if entry.points >= 0 { "positive" } else { "negative" };
        format!(
            "<tr data-id=\"{}\"><td>{}</td><td>{}</td><td class=\"{}\">{:+}</td><td>{}: {}</td><td>{}</td></tr>",
            entry.id,
            format_date(Some(&entry.created_at)),
            client_name(clients, entry.client_id),
            class,
            entry.points,
            entry.action,
            escape_html(&entry.reason),
            escape_html(&entry.user),
        )
    })
}

pub fn redemptions_table(redemptions: &[Redemption], clients: &[Client]) -> String {
    table_rows(redemptions, 5, "No hay premios canjeados", |redemption| {
        format!(
            "<tr data-id=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td class=\"points\">{}</td><td>{}</td></tr>",
            redemption.id,
            format_date(Some(&redemption.created_at)),
            client_name(clients, redemption.client_id),
            escape_html(&redemption.prize_name),
            format_number(redemption.points_used as f64),
            escape_html(&redemption.user),
        )
    })
}
