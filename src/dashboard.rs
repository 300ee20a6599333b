//! Remote-backed dashboard controller
//!
//! [`Dashboard`] owns the view state of the admin UI: the active tab, the
//! rendered content of every named region, chart specifications, the open modal
//! and transient notifications. Each operation fetches from the API through
//! [`ApiClient`] and replaces the affected regions. Failures are handled where
//! they happen: logged, turned into a notification, never retried.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::client::ApiClient;
use crate::config::DashboardConfig;
use crate::model::{CanjeRequest, ChartData, Cliente, ClienteRequest, Dataset, FormValue};
use crate::render;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The request never produced a readable answer
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with `success: false`
    #[error("{0}")]
    Rejected(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Unexpected(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Dashboard,
    Clientes,
    Canjes,
    Admin,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Clientes => "clientes",
            Tab::Canjes => "canjes",
            Tab::Admin => "admin",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Tab::Dashboard),
            "clientes" => Ok(Tab::Clientes),
            "canjes" => Ok(Tab::Canjes),
            "admin" => Ok(Tab::Admin),
            other => Err(DashboardError::Unexpected(format!("unknown tab `{}`", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
}

/// Fields of the client form; `id` is set when editing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientForm {
    pub id: Option<u64>,
    pub nombre: String,
    pub cedula: String,
    pub telefono: String,
    pub email: String,
}

impl ClientForm {
    fn from_cliente(cliente: &Cliente) -> Self {
        Self {
            id: Some(cliente.id),
            nombre: cliente.nombre.clone(),
            cedula: cliente.cedula.clone(),
            telefono: cliente.telefono.clone().unwrap_or_default(),
            email: cliente.email.clone().unwrap_or_default(),
        }
    }

    fn to_request(&self) -> ClienteRequest {
        ClienteRequest {
            nombre: self.nombre.clone(),
            cedula: Some(self.cedula.clone()),
            telefono: Some(self.telefono.clone()),
            email: Some(self.email.clone()),
        }
    }
}

/// Raw input of the voucher form, sent as typed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanjeForm {
    pub cliente_id: String,
    pub monto: String,
    pub descripcion: String,
}

impl CanjeForm {
    fn to_request(&self) -> CanjeRequest {
        CanjeRequest {
            cliente_id: Some(FormValue::from(self.cliente_id.as_str())),
            monto: Some(FormValue::from(self.monto.as_str())),
            descripcion: Some(self.descripcion.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    /// Client form; the document id field is locked while editing
    Client { form: ClientForm, cedula_locked: bool },
    Canje(CanjeForm),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartId {
    DailySales,
    TopClients,
    HourlyPattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

/// What the charting layer needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub data: ChartData,
    /// Bars run horizontally
    pub horizontal: bool,
}

/// A user event
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SwitchTab(Tab),
    RefreshAnalytics,
    ChangePeriod(u32),
    ChangeTopClientsLimit(usize),
    NewClient,
    EditClient(u64),
    SearchClients(String),
    SaveClient(ClientForm),
    DeleteClient(u64),
    NewCanje,
    SaveCanje(CanjeForm),
    DeleteCanje(u64),
    CloseModal,
    Logout,
}

const UNEXPECTED_ERROR: &str = "Ha ocurrido un error inesperado";

/// Shortest period accepted by [`spawn_auto_refresh`]
pub const MIN_AUTO_REFRESH: Duration = Duration::from_millis(10);

type Confirm = Box<dyn Fn(&str) -> bool + Send + Sync>;

pub struct Dashboard {
    api: ApiClient,
    session: Session,
    config: DashboardConfig,
    active_tab: Tab,
    admin_tab_visible: bool,
    regions: HashMap<String, String>,
    charts: HashMap<ChartId, ChartSpec>,
    clientes: Vec<Cliente>,
    modal: Option<Modal>,
    loading: Option<String>,
    notifications: Vec<Notification>,
    period_days: u32,
    top_clients_limit: usize,
    confirm: Confirm,
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("base_url", &self.api.base_url())
            .field("active_tab", &self.active_tab)
            .field("regions", &self.regions.len())
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

impl Dashboard {
    /// Starts the controller for a logged-in session
    ///
    /// Only the user data is filled in here; call [`Dashboard::start`] for the
    /// initial analytics load. Without a token there is nothing to show: the
    /// caller must send the user to the login page.
    pub fn new(config: DashboardConfig, session: Session) -> Result<Self, DashboardError> {
        let token = session.token().ok_or(DashboardError::NotAuthenticated)?;
        let api = ApiClient::new(&config.base_url).with_credentials(Some(token), session.username());

        let mut dashboard = Self {
            api,
            admin_tab_visible: false,
            active_tab: Tab::Dashboard,
            regions: HashMap::new(),
            charts: HashMap::new(),
            clientes: Vec::new(),
            modal: None,
            loading: None,
            notifications: Vec::new(),
            period_days: config.analytics_days,
            top_clients_limit: config.top_clients_limit,
            confirm: Box::new(|_| true),
            session,
            config,
        };
        dashboard.load_user_data();
        Ok(dashboard)
    }

    /// Replaces the confirmation prompt asked before every deletion
    pub fn with_confirm(mut self, confirm: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    /// Initial load of the dashboard tab
    pub async fn start(&mut self) {
        self.active_tab = Tab::Dashboard;
        self.load_dashboard_data().await;
    }

    fn load_user_data(&mut self) {
        if let Some(username) = self.session.username() {
            let username = username.to_string();
            self.set_region("username-display", username);
            self.admin_tab_visible = self.session.is_admin();
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn admin_tab_visible(&self) -> bool {
        self.admin_tab_visible
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.token().is_some()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        self.config.auto_refresh
    }

    /// Current content of the region with element id `id`
    pub fn region(&self, id: &str) -> Option<&str> {
        self.regions.get(id).map(String::as_str)
    }

    pub fn chart(&self, id: ChartId) -> Option<&ChartSpec> {
        self.charts.get(&id)
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    /// Notifications still within their display time
    pub fn notifications(&self) -> Vec<&Notification> {
        let ttl = self.config.notification_ttl;
        self.notifications
            .iter()
            .filter(|n| n.created_at.elapsed() < ttl)
            .collect()
    }

    /// Drops expired notifications
    pub fn prune_notifications(&mut self) {
        let ttl = self.config.notification_ttl;
        self.notifications.retain(|n| n.created_at.elapsed() < ttl);
    }

    pub fn dismiss_notification(&mut self, index: usize) {
        if index < self.notifications.len() {
            self.notifications.remove(index);
        }
    }

    fn set_region(&mut self, id: &str, content: String) {
        self.regions.insert(id.to_string(), content);
    }

    fn set_regions(&mut self, regions: Vec<(&'static str, String)>) {
        for (id, content) in regions {
            self.set_region(id, content);
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.prune_notifications();
        self.notifications.push(Notification {
            kind,
            message: message.into(),
            created_at: Instant::now(),
        });
    }

    /// Logs `err` and shows either the server's rejection message or `generic`
    fn report(&mut self, err: &DashboardError, generic: &str) {
        match err {
            DashboardError::Rejected(message) => {
                tracing::warn!(%message, "request rejected");
                let message = message.clone();
                self.notify(NotificationKind::Error, message);
            }
            other => {
                tracing::error!(error = %other, "{}", generic);
                self.notify(NotificationKind::Error, generic);
            }
        }
    }

    /// Handles one user event
    ///
    /// Errors that escape the action are caught here, logged and shown as a
    /// generic notification.
    pub async fn dispatch(&mut self, action: Action) {
        if let Err(err) = self.run(action).await {
            tracing::error!(error = %err, "unhandled dashboard error");
            self.notify(NotificationKind::Error, UNEXPECTED_ERROR);
        }
    }

    async fn run(&mut self, action: Action) -> Result<(), DashboardError> {
        if !self.is_logged_in() {
            return Err(DashboardError::NotAuthenticated);
        }

        match action {
            Action::SwitchTab(tab) => self.switch_tab(tab).await?,
            Action::RefreshAnalytics => self.refresh_analytics().await,
            Action::ChangePeriod(days) => {
                self.period_days = days;
                self.refresh_analytics().await;
            }
            Action::ChangeTopClientsLimit(limit) => {
                self.top_clients_limit = limit;
                self.load_top_clients().await;
            }
            Action::NewClient => self.open_client_modal(None),
            Action::EditClient(id) => self.edit_client(id).await?,
            Action::SearchClients(term) => self.search_clients(&term),
            Action::SaveClient(form) => self.save_client(form).await,
            Action::DeleteClient(id) => self.delete_client(id).await,
            Action::NewCanje => self.open_canje_modal(),
            Action::SaveCanje(form) => self.save_canje(form).await,
            Action::DeleteCanje(id) => self.delete_canje(id).await,
            Action::CloseModal => self.close_modal(),
            Action::Logout => self.logout().await,
        }
        Ok(())
    }

    /// Activates `tab` and loads what it shows
    pub async fn switch_tab(&mut self, tab: Tab) -> Result<(), DashboardError> {
        if tab == Tab::Admin && !self.admin_tab_visible {
            return Err(DashboardError::Unexpected(
                "admin tab is not available for this role".into(),
            ));
        }

        self.active_tab = tab;
        match tab {
            Tab::Dashboard => self.refresh_analytics().await,
            Tab::Clientes => self.load_clientes().await,
            Tab::Canjes => {
                self.load_canjes().await;
                self.load_clientes_for_select().await;
            }
            Tab::Admin => self.load_admin_stats().await,
        }
        Ok(())
    }

    // analytics

    /// Loads KPIs, daily sales, top clients and trends concurrently
    pub async fn load_dashboard_data(&mut self) {
        self.loading = Some("Cargando dashboard...".to_string());

        let (kpis, daily, top, trends) = tokio::join!(
            self.api.kpis(),
            self.api.daily_sales(self.period_days),
            self.api.top_clients(self.top_clients_limit),
            self.api.trends(),
        );

        let mut failed = 0;
        match kpis {
            Ok(kpis) => self.set_regions(render::kpi_regions(&kpis)),
            Err(err) => {
                tracing::error!(error = %err, "error loading KPIs");
                failed += 1;
            }
        }
        match daily {
            Ok(data) => self.set_daily_sales(data),
            Err(err) => {
                tracing::error!(error = %err, "error loading daily sales");
                failed += 1;
            }
        }
        match top {
            Ok(data) => self.set_top_clients(data),
            Err(err) => {
                tracing::error!(error = %err, "error loading top clients");
                failed += 1;
            }
        }
        match trends {
            Ok(trends) => {
                self.set_regions(render::trend_regions(&trends));
                self.charts.insert(
                    ChartId::HourlyPattern,
                    ChartSpec {
                        kind: ChartKind::Line,
                        data: ChartData {
                            labels: trends.hourly_pattern.labels.clone(),
                            datasets: vec![Dataset {
                                label: "Canjes por Hora".to_string(),
                                data: trends.hourly_pattern.canjes.iter().map(|c| *c as f64).collect(),
                                background_color: Vec::new(),
                            }],
                        },
                        horizontal: false,
                    },
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "error loading trends");
                failed += 1;
            }
        }

        self.loading = None;
        if failed > 0 {
            self.notify(NotificationKind::Error, "Error cargando datos del dashboard");
        } else {
            tracing::debug!("dashboard data loaded");
        }
    }

    pub async fn load_kpis(&mut self) {
        match self.api.kpis().await {
            Ok(kpis) => self.set_regions(render::kpi_regions(&kpis)),
            Err(err) => tracing::error!(error = %err, "error loading KPIs"),
        }
    }

    pub async fn load_daily_sales(&mut self) {
        match self.api.daily_sales(self.period_days).await {
            Ok(data) => self.set_daily_sales(data),
            Err(err) => tracing::error!(error = %err, "error loading daily sales"),
        }
    }

    pub async fn load_top_clients(&mut self) {
        match self.api.top_clients(self.top_clients_limit).await {
            Ok(data) => self.set_top_clients(data),
            Err(err) => tracing::error!(error = %err, "error loading top clients"),
        }
    }

    fn set_daily_sales(&mut self, data: ChartData) {
        // replaces any previous chart
        self.charts.insert(
            ChartId::DailySales,
            ChartSpec {
                kind: ChartKind::Line,
                data,
                horizontal: false,
            },
        );
    }

    fn set_top_clients(&mut self, data: ChartData) {
        self.charts.insert(
            ChartId::TopClients,
            ChartSpec {
                kind: ChartKind::Bar,
                data,
                horizontal: true,
            },
        );
    }

    pub async fn refresh_analytics(&mut self) {
        tracing::debug!("refreshing analytics");
        self.notify(NotificationKind::Info, "Actualizando datos...");
        self.load_dashboard_data().await;
        self.notify(NotificationKind::Success, "Datos actualizados correctamente");
    }

    // clientes

    pub async fn load_clientes(&mut self) {
        match self.api.list_clientes().await {
            Ok(clientes) => self.display_clientes(clientes),
            Err(err) => self.report(&err, "Error cargando clientes"),
        }
    }

    fn display_clientes(&mut self, clientes: Vec<Cliente>) {
        let markup = render::clientes_table(&clientes, render::NO_CLIENTES);
        self.clientes = clientes;
        self.set_region("clients-tbody", markup);
    }

    /// Filters the loaded clients by a case-insensitive substring
    pub fn search_clients(&mut self, term: &str) {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            let markup = render::clientes_table(&self.clientes, render::NO_CLIENTES);
            self.set_region("clients-tbody", markup);
            return;
        }

        let matches: Vec<Cliente> = self
            .clientes
            .iter()
            .filter(|c| render::cliente_search_text(c).contains(&term))
            .cloned()
            .collect();
        let empty = if self.clientes.is_empty() {
            render::NO_CLIENTES
        } else {
            render::NO_SEARCH_MATCH
        };
        let markup = render::clientes_table(&matches, empty);
        self.set_region("clients-tbody", markup);
    }

    pub fn open_client_modal(&mut self, cliente: Option<&Cliente>) {
        let modal = match cliente {
            Some(cliente) => Modal::Client {
                form: ClientForm::from_cliente(cliente),
                cedula_locked: true,
            },
            None => Modal::Client {
                form: ClientForm::default(),
                cedula_locked: false,
            },
        };
        self.modal = Some(modal);
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    /// Opens the client form filled with the current server copy of `id`
    pub async fn edit_client(&mut self, id: u64) -> Result<(), DashboardError> {
        let clientes = self.api.list_clientes().await?;
        match clientes.iter().find(|c| c.id == id) {
            Some(cliente) => self.open_client_modal(Some(cliente)),
            None => tracing::warn!(cliente_id = id, "client to edit not found"),
        }
        Ok(())
    }

    /// Creates the client, or updates it when the form carries an id
    pub async fn save_client(&mut self, form: ClientForm) {
        let request = form.to_request();
        let result = match form.id {
            Some(id) => self.api.update_cliente(id, &request).await,
            None => self.api.create_cliente(&request).await,
        };

        match result {
            Ok(message) => {
                self.notify(NotificationKind::Success, message);
                self.close_modal();
                self.load_clientes().await;
            }
            Err(err) => self.report(&err, "Error guardando cliente"),
        }
    }

    pub async fn delete_client(&mut self, id: u64) {
        if !(self.confirm)("¿Está seguro de eliminar este cliente?") {
            return;
        }

        match self.api.delete_cliente(id).await {
            Ok(message) => {
                self.notify(NotificationKind::Success, message);
                self.load_clientes().await;
            }
            Err(err) => self.report(&err, "Error eliminando cliente"),
        }
    }

    // canjes

    pub async fn load_canjes(&mut self) {
        match self.api.list_canjes().await {
            Ok(canjes) => self.set_region("canjes-tbody", render::canjes_table(&canjes)),
            Err(err) => self.report(&err, "Error cargando canjes"),
        }
    }

    pub async fn load_clientes_for_select(&mut self) {
        match self.api.list_clientes().await {
            Ok(clientes) => self.set_region("canje-cliente", render::cliente_options(&clientes)),
            Err(err) => tracing::error!(error = %err, "error loading clients for select"),
        }
    }

    pub fn open_canje_modal(&mut self) {
        self.modal = Some(Modal::Canje(CanjeForm::default()));
    }

    pub async fn save_canje(&mut self, form: CanjeForm) {
        match self.api.create_canje(&form.to_request()).await {
            Ok(message) => {
                self.notify(NotificationKind::Success, message);
                self.close_modal();
                self.load_canjes().await;
                if self.active_tab == Tab::Dashboard {
                    self.refresh_analytics().await;
                }
            }
            Err(err) => self.report(&err, "Error registrando canje"),
        }
    }

    pub async fn delete_canje(&mut self, id: u64) {
        if !(self.confirm)("¿Está seguro de eliminar este canje?") {
            return;
        }

        match self.api.delete_canje(id).await {
            Ok(message) => {
                self.notify(NotificationKind::Success, message);
                self.load_canjes().await;
                if self.active_tab == Tab::Dashboard {
                    self.refresh_analytics().await;
                }
            }
            Err(err) => self.report(&err, "Error eliminando canje"),
        }
    }

    // admin

    pub async fn load_admin_stats(&mut self) {
        match self.api.admin_stats().await {
            Ok(stats) => self.set_regions(render::admin_regions(&stats)),
            Err(err) => self.report(&err, "Error cargando estadísticas"),
        }
    }

    /// Ends the session
    ///
    /// The stored keys are dropped when the server confirms, and also when it
    /// cannot be reached, so a dead server never traps the user in.
    pub async fn logout(&mut self) {
        match self.api.logout().await {
            Ok(_) => {
                self.session.end();
                self.charts.clear();
            }
            Err(DashboardError::Rejected(message)) => {
                tracing::warn!(%message, "logout rejected");
            }
            Err(err) => {
                tracing::error!(error = %err, "error during logout, clearing local session");
                self.session.clear();
                self.charts.clear();
            }
        }
    }
}

/// Reloads the KPIs every `every` while the dashboard tab is active
///
/// Periods shorter than [`MIN_AUTO_REFRESH`] are raised to it. The task stops
/// on its own once the session is gone; abort the handle to stop it earlier.
pub fn spawn_auto_refresh(dashboard: Arc<Mutex<Dashboard>>, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_AUTO_REFRESH);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let mut dashboard = dashboard.lock().await;
            if !dashboard.is_logged_in() {
                tracing::debug!("session ended, stopping auto-refresh");
                break;
            }
            if dashboard.active_tab() == Tab::Dashboard {
                tracing::debug!("auto-refreshing analytics");
                dashboard.load_kpis().await;
            }
        }
    })
}
