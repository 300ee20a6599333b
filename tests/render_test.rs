use chrono::{TimeZone, Utc};

use mbl::format::{escape_html, format_date, format_money, format_number, or_dash, truncate};
use mbl::model::{Cliente, Kpis, MonthKpis, TodayKpis, TopClient};
use mbl::render::{
    canjes_table, change_indicator, cliente_options, clientes_table, kpi_regions, prizes_table,
    NO_CANJES, NO_CLIENTES,
};

fn cliente(id: u64, nombre: &str) -> Cliente {
    Cliente {
        id,
        nombre: nombre.to_string(),
        cedula: format!("{}", 1000 + id),
        telefono: None,
        email: Some("a@b.co".to_string()),
        puntos: 0,
        fecha_registro: Utc.with_ymd_and_hms(2026, 3, 5, 9, 7, 0).unwrap(),
    }
}

#[test]
fn test_format_number() {
    assert_eq!(format_number(1234567.5), "1.234.567,5");
    assert_eq!(format_number(1000.0), "1.000");
    assert_eq!(format_number(0.05), "0,05");
    assert_eq!(format_number(0.0), "0");
    assert_eq!(format_number(999.0), "999");
    assert_eq!(format_number(-2500.25), "-2.500,25");
    assert_eq!(format_number(f64::NAN), "0");
    assert_eq!(format_money(25000.0), "$25.000");
}

#[test]
fn test_text_helpers() {
    let date = Utc.with_ymd_and_hms(2026, 1, 2, 8, 5, 0).unwrap();
    assert_eq!(format_date(Some(&date)), "02/01/2026 08:05");
    assert_eq!(format_date(None), "-");

    assert_eq!(or_dash(None), "-");
    assert_eq!(or_dash(Some("  ")), "-");
    assert_eq!(or_dash(Some("<b>")), "&lt;b&gt;");

    assert_eq!(truncate("corto", 20), "corto");
    assert_eq!(truncate("Maximiliano Hernández", 11), "Maximiliano...");

    assert_eq!(
        escape_html(r#"<a href="x">O'Neil & co</a>"#),
        "&lt;a href=&quot;x&quot;&gt;O&#39;Neil &amp; co&lt;/a&gt;"
    );
}

#[test]
fn test_empty_tables_render_placeholder() {
    assert_eq!(
        clientes_table(&[], NO_CLIENTES),
        "<tr><td colspan=\"6\" class=\"no-data\">No hay clientes registrados</td></tr>"
    );
    assert_eq!(
        canjes_table(&[]),
        format!("<tr><td colspan=\"6\" class=\"no-data\">{}</td></tr>", NO_CANJES)
    );
    assert!(prizes_table(&[]).contains("colspan=\"3\""));
}

#[test]
fn test_clientes_table_rows() {
    let html = clientes_table(&[cliente(1, "Ana <Admin>"), cliente(2, "Luis")], NO_CLIENTES);

    assert_eq!(html.matches("<tr").count(), 2);
    assert!(html.contains("Ana &lt;Admin&gt;"));
    assert!(html.contains("<td>-</td>"));
    assert!(html.contains("05/03/2026 09:07"));
    assert!(html.contains("data-action=\"delete-client\" data-id=\"2\""));
    assert!(!html.contains("no-data"));
}

#[test]
fn test_cliente_options() {
    let html = cliente_options(&[cliente(3, "Carlos")]);

    assert!(html.starts_with("<option value=\"\">Seleccionar cliente...</option>"));
    assert!(html.contains("<option value=\"3\">Carlos - 1003</option>"));
}

#[test]
fn test_change_indicator() {
    let up = change_indicator(12.5, "Monto", "change-item");
    assert!(up.contains("positive"));
    assert!(up.contains("fa-arrow-up"));
    assert!(up.contains("12,5% Monto"));

    let down = change_indicator(-40.0, "", "kpi-growth");
    assert!(down.contains("negative"));
    assert!(down.contains("40%</span>"));
}

#[test]
fn test_kpi_regions() {
    let kpis = Kpis {
        today: TodayKpis {
            canjes: 2,
            monto: 4000.0,
            promedio: 2000.0,
        },
        month: MonthKpis {
            canjes: 4,
            monto: 6500.0,
            clientes_activos: 3,
            growth_monto: 225.0,
        },
        top_client: Some(TopClient {
            cliente_id: 2,
            nombre: "Maria Fernanda Lopez Ortiz".to_string(),
            total_canjes: 2,
            total_monto: 5000.0,
        }),
    };

    let regions = kpi_regions(&kpis);
    let get = |id: &str| {
        regions
            .iter()
            .find(|(region, _)| *region == id)
            .map(|(_, html)| html.clone())
            .unwrap()
    };

    assert_eq!(get("canjes-hoy"), "2");
    assert_eq!(get("monto-mes"), "$6.500");
    assert_eq!(get("promedio-canje"), "$2.000 promedio");
    assert_eq!(get("top-cliente-nombre"), "Maria Fernanda Lopez...");
    assert_eq!(get("top-cliente-canjes"), "2 canjes");
    assert!(get("growth-mes").contains("225%"));
}

#[test]
fn test_kpi_regions_without_top_client() {
    let kpis = Kpis {
        today: TodayKpis::default(),
        month: MonthKpis::default(),
        top_client: None,
    };

    let regions = kpi_regions(&kpis);

    assert!(regions.contains(&("top-cliente-nombre", "-".to_string())));
    assert!(regions.contains(&("top-cliente-monto", "$0".to_string())));
}
