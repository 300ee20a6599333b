//! Route definitions for the MBL API
//!
//! Every endpoint lives under `/api/mbl` and sits behind the token check.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    admin_stats, analytics_daily_sales, analytics_kpis, analytics_top_clients, analytics_trends,
    create_canje, create_cliente, delete_canje, delete_cliente, list_canjes, list_clientes,
    logout, update_cliente,
};

use crate::middleware::auth_middleware;
use axum::middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET|POST /api/mbl/clientes` - list / create clients
/// - `PUT|DELETE /api/mbl/clientes/{id}` - update / delete a client
/// - `GET|POST /api/mbl/canjes` - list / issue vouchers
/// - `DELETE /api/mbl/canjes/{id}` - delete a voucher
/// - `GET /api/mbl/analytics/{kpis,daily-sales,top-clients,trends}` - dashboard data
/// - `GET /api/mbl/admin/stats` - admin totals
/// - `POST /api/mbl/logout` - logout acknowledgement
///
/// # Example Usage
///
/// ```no_run
/// # use mbl::database::{init_db, AppState};
/// # use mbl::route::create_app;
/// # let db = init_db("mbl.db").unwrap();
/// let app = create_app(AppState::new(db));
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/clientes", get(list_clientes).post(create_cliente))
        .route("/clientes/{id}", put(update_cliente).delete(delete_cliente))
        .route("/canjes", get(list_canjes).post(create_canje))
        .route("/canjes/{id}", delete(delete_canje))
        .route("/analytics/kpis", get(analytics_kpis))
        .route("/analytics/daily-sales", get(analytics_daily_sales))
        .route("/analytics/top-clients", get(analytics_top_clients))
        .route("/analytics/trends", get(analytics_trends))
        .route("/admin/stats", get(admin_stats))
        .route("/logout", post(logout))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/mbl", api_routes)
        .with_state(state)
}
