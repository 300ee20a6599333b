//! Self-contained in-memory casino store
//!
//! [`CasinoSystem`] keeps clients, vouchers, prizes, points history and
//! redemptions per logged-in username. Nothing is persisted: state lives as
//! long as the value does. Every mutation is a single synchronous call that
//! either applies completely and re-renders the views, or changes nothing and
//! leaves an error in the inline message area.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::render;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Client {
    pub id: u64,
    pub name: String,
    pub document_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub points: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub document_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub initial_points: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Voucher {
    pub id: u64,
    pub client_id: u64,
    pub amount: f64,
    pub description: Option<String>,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prize {
    pub id: u64,
    pub name: String,
    pub points_required: u64,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Redemption {
    pub id: u64,
    pub client_id: u64,
    pub prize_id: u64,
    pub prize_name: String,
    pub points_used: u64,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PointsAction {
    Add,
    Subtract,
    Redeem,
}

impl fmt::Display for PointsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PointsAction::Add => "Suma",
            PointsAction::Subtract => "Resta",
            PointsAction::Redeem => "Canje",
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PointsHistoryEntry {
    pub id: u64,
    pub client_id: u64,
    /// Signed change applied to the balance
    pub points: i64,
    pub action: PointsAction,
    pub reason: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// Text shown in the inline message area under the forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMessage {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CasinoError {
    #[error("Debe iniciar sesión")]
    NotLoggedIn,

    #[error("Cliente no encontrado")]
    ClientNotFound(u64),

    #[error("Premio no encontrado")]
    PrizeNotFound(u64),

    #[error("Puntos insuficientes: disponibles {available}, requeridos {required}")]
    InsufficientPoints { available: u64, required: u64 },

    #[error("Ya existe un cliente con el documento {0}")]
    DuplicateDocument(String),

    #[error("{0}")]
    Validation(String),
}

pub type CasinoResult<T> = Result<T, CasinoError>;

/// Markup of every view, refreshed after each successful mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasinoViews {
    pub clients: String,
    pub vouchers: String,
    pub prizes: String,
    pub history: String,
    pub redemptions: String,
}

/// Everything one user sees
#[derive(Debug, Clone, Default)]
pub struct UserData {
    pub clients: Vec<Client>,
    pub vouchers: Vec<Voucher>,
    pub prizes: Vec<Prize>,
    pub points_history: Vec<PointsHistoryEntry>,
    pub redemptions: Vec<Redemption>,
    last_id: u64,
}

impl UserData {
    /// Fresh store with the default prize catalog
    pub fn seeded() -> Self {
        let mut data = UserData::default();
        let catalog = [
            ("Polo Deportivo", 500),
            ("Camiseta Oficial", 800),
            ("Cerveza", 200),
            ("Gaseosa", 100),
            ("Llavero", 150),
            ("Gorra", 400),
            ("Vaso Térmico", 300),
        ];
        for (name, points_required) in catalog {
            let id = data.next_id();
            data.prizes.push(Prize {
                id,
                name: name.to_string(),
                points_required,
                description: None,
            });
        }
        data
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn client_mut(&mut self, id: u64) -> CasinoResult<&mut Client> {
        self.clients
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CasinoError::ClientNotFound(id))
    }
}

type Confirm = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Per-user in-memory store with rendered views
pub struct CasinoSystem {
    users: HashMap<String, UserData>,
    current_user: Option<String>,
    views: CasinoViews,
    message: Option<InlineMessage>,
    confirm: Confirm,
}

impl Default for CasinoSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CasinoSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasinoSystem")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("current_user", &self.current_user)
            .field("message", &self.message)
            .finish()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn signed(points: u64) -> CasinoResult<i64> {
    i64::try_from(points)
        .map_err(|_| CasinoError::Validation("La cantidad de puntos excede el máximo permitido".into()))
}

fn required(value: &str, field: &str) -> CasinoResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(CasinoError::Validation(format!("{} es obligatorio", field)))
    } else {
        Ok(value.to_string())
    }
}

impl CasinoSystem {
    /// Store whose deletions are always confirmed
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            current_user: None,
            views: CasinoViews::default(),
            message: None,
            confirm: Box::new(|_| true),
        }
    }

    /// Replaces the confirmation prompt asked before every deletion
    pub fn with_confirm(mut self, confirm: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    /// Switches to `username`, creating their store with the prize catalog on first use
    pub fn login(&mut self, username: &str) -> CasinoResult<()> {
        let username = required(username, "El usuario")?;
        self.users
            .entry(username.clone())
            .or_insert_with(UserData::seeded);
        tracing::debug!(user = %username, "casino login");
        self.current_user = Some(username);
        self.message = None;
        self.render();
        Ok(())
    }

    pub fn logout(&mut self) {
        self.current_user = None;
        self.message = None;
        self.views = CasinoViews::default();
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn views(&self) -> &CasinoViews {
        &self.views
    }

    pub fn message(&self) -> Option<&InlineMessage> {
        self.message.as_ref()
    }

    /// Data of the logged-in user
    pub fn data(&self) -> CasinoResult<&UserData> {
        self.current_user
            .as_ref()
            .and_then(|user| self.users.get(user))
            .ok_or(CasinoError::NotLoggedIn)
    }

    pub fn clients(&self) -> &[Client] {
        self.data().map(|d| d.clients.as_slice()).unwrap_or(&[])
    }

    pub fn vouchers(&self) -> &[Voucher] {
        self.data().map(|d| d.vouchers.as_slice()).unwrap_or(&[])
    }

    pub fn prizes(&self) -> &[Prize] {
        self.data().map(|d| d.prizes.as_slice()).unwrap_or(&[])
    }

    pub fn points_history(&self) -> &[PointsHistoryEntry] {
        self.data().map(|d| d.points_history.as_slice()).unwrap_or(&[])
    }

    pub fn redemptions(&self) -> &[Redemption] {
        self.data().map(|d| d.redemptions.as_slice()).unwrap_or(&[])
    }

    pub fn client(&self, id: u64) -> Option<&Client> {
        self.clients().iter().find(|c| c.id == id)
    }

    pub fn add_client(&mut self, new: NewClient) -> CasinoResult<Client> {
        let result = self.mutate(|data, user| {
            let name = required(&new.name, "El nombre")?;
            let document_id = required(&new.document_id, "El documento")?;
            if data.clients.iter().any(|c| c.document_id == document_id) {
                return Err(CasinoError::DuplicateDocument(document_id));
            }

            let initial = signed(new.initial_points)?;

            let client = Client {
                id: data.next_id(),
                name,
                document_id,
                phone: clean(new.phone),
                email: clean(new.email),
                points: new.initial_points,
                created_at: Utc::now(),
            };
            if client.points > 0 {
                let entry = PointsHistoryEntry {
                    id: data.next_id(),
                    client_id: client.id,
                    points: initial,
                    action: PointsAction::Add,
                    reason: "Puntos iniciales".to_string(),
                    user: user.to_string(),
                    created_at: client.created_at,
                };
                data.points_history.push(entry);
            }
            data.clients.push(client.clone());
            Ok(client)
        });
        self.report(result, "Cliente registrado exitosamente")
    }

    pub fn update_client(&mut self, id: u64, update: ClientUpdate) -> CasinoResult<Client> {
        let result = self.mutate(|data, _| {
            let name = required(&update.name, "El nombre")?;
            let client = data.client_mut(id)?;
            client.name = name;
            client.phone = clean(update.phone);
            client.email = clean(update.email);
            Ok(client.clone())
        });
        self.report(result, "Cliente actualizado exitosamente")
    }

    /// Removes the client with `id` once the prompt is confirmed
    ///
    /// Returns whether a record was removed.
    pub fn delete_client(&mut self, id: u64) -> CasinoResult<bool> {
        self.delete("¿Está seguro de eliminar este cliente?", |data| {
            let before = data.clients.len();
            data.clients.retain(|c| c.id != id);
            before != data.clients.len()
        })
    }

    /// Records a voucher of `amount` for a client
    pub fn add_voucher(
        &mut self,
        client_id: u64,
        amount: f64,
        description: Option<String>,
    ) -> CasinoResult<Voucher> {
        let result = self.mutate(|data, user| {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(CasinoError::Validation(
                    "El monto debe ser mayor a cero".into(),
                ));
            }
            data.client_mut(client_id)?;

            let voucher = Voucher {
                id: data.next_id(),
                client_id,
                amount,
                description: clean(description),
                user: user.to_string(),
                created_at: Utc::now(),
            };
            data.vouchers.push(voucher.clone());
            Ok(voucher)
        });
        self.report(result, "Canje registrado exitosamente")
    }

    pub fn delete_voucher(&mut self, id: u64) -> CasinoResult<bool> {
        self.delete("¿Está seguro de eliminar este canje?", |data| {
            let before = data.vouchers.len();
            data.vouchers.retain(|v| v.id != id);
            before != data.vouchers.len()
        })
    }

    pub fn add_prize(
        &mut self,
        name: &str,
        points_required: u64,
        description: Option<String>,
    ) -> CasinoResult<Prize> {
        let result = self.mutate(|data, _| {
            let name = required(name, "El nombre del premio")?;
            signed(points_required)?;
            if points_required == 0 {
                return Err(CasinoError::Validation(
                    "Los puntos requeridos deben ser mayores a cero".into(),
                ));
            }

            let prize = Prize {
                id: data.next_id(),
                name,
                points_required,
                description: clean(description),
            };
            data.prizes.push(prize.clone());
            Ok(prize)
        });
        self.report(result, "Premio registrado exitosamente")
    }

    pub fn delete_prize(&mut self, id: u64) -> CasinoResult<bool> {
        self.delete("¿Está seguro de eliminar este premio?", |data| {
            let before = data.prizes.len();
            data.prizes.retain(|p| p.id != id);
            before != data.prizes.len()
        })
    }

    /// Adds or subtracts points and records the movement
    ///
    /// A subtraction larger than the balance is refused. Only
    /// [`PointsAction::Add`] and [`PointsAction::Subtract`] are accepted here;
    /// redemptions go through [`CasinoSystem::redeem_prize`].
    pub fn adjust_points(
        &mut self,
        client_id: u64,
        points: u64,
        action: PointsAction,
        reason: &str,
    ) -> CasinoResult<u64> {
        let result = self.mutate(|data, user| {
            if points == 0 {
                return Err(CasinoError::Validation(
                    "Los puntos deben ser mayores a cero".into(),
                ));
            }
            let reason = required(reason, "El motivo")?;
            let magnitude = signed(points)?;

            let client = data.client_mut(client_id)?;
            let (balance, delta) = match action {
                PointsAction::Add => {
                    let balance = client
                        .points
                        .checked_add(points)
                        .filter(|b| i64::try_from(*b).is_ok())
                        .ok_or_else(|| {
                            CasinoError::Validation("El saldo excede el máximo permitido".into())
                        })?;
                    (balance, magnitude)
                }
                PointsAction::Subtract => {
                    let balance = client.points.checked_sub(points).ok_or(
                        CasinoError::InsufficientPoints {
                            available: client.points,
                            required: points,
                        },
                    )?;
                    (balance, -magnitude)
                }
                PointsAction::Redeem => {
                    return Err(CasinoError::Validation(
                        "Use el canje de premios para redimir puntos".into(),
                    ))
                }
            };
            client.points = balance;

            let entry = PointsHistoryEntry {
                id: data.next_id(),
                client_id,
                points: delta,
                action,
                reason,
                user: user.to_string(),
                created_at: Utc::now(),
            };
            data.points_history.push(entry);
            Ok(balance)
        });

        let success = match action {
            PointsAction::Add => "Puntos agregados exitosamente",
            _ => "Puntos descontados exitosamente",
        };
        self.report(result, success)
    }

    /// Exchanges a prize for points
    ///
    /// On success the balance drops by the prize cost and exactly one
    /// redemption and one history entry are appended.
    pub fn redeem_prize(&mut self, client_id: u64, prize_id: u64) -> CasinoResult<Redemption> {
        let result = self.mutate(|data, user| {
            let prize = data
                .prizes
                .iter()
                .find(|p| p.id == prize_id)
                .cloned()
                .ok_or(CasinoError::PrizeNotFound(prize_id))?;

            let cost = signed(prize.points_required)?;
            let client = data.client_mut(client_id)?;
            let balance = client.points.checked_sub(prize.points_required).ok_or(
                CasinoError::InsufficientPoints {
                    available: client.points,
                    required: prize.points_required,
                },
            )?;
            client.points = balance;

            let now = Utc::now();
            let redemption = Redemption {
                id: data.next_id(),
                client_id,
                prize_id,
                prize_name: prize.name.clone(),
                points_used: prize.points_required,
                user: user.to_string(),
                created_at: now,
            };
            let entry = PointsHistoryEntry {
                id: data.next_id(),
                client_id,
                points: -cost,
                action: PointsAction::Redeem,
                reason: format!("Canje de premio: {}", prize.name),
                user: user.to_string(),
                created_at: now,
            };
            data.redemptions.push(redemption.clone());
            data.points_history.push(entry);
            Ok(redemption)
        });
        self.report(result, "Premio canjeado exitosamente")
    }

    /// Runs `op` against the current user's data
    ///
    /// `op` must validate before writing: an `Err` means nothing was changed.
    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut UserData, &str) -> CasinoResult<T>,
    ) -> CasinoResult<T> {
        let user = self.current_user.clone().ok_or(CasinoError::NotLoggedIn)?;
        let data = self.users.get_mut(&user).ok_or(CasinoError::NotLoggedIn)?;
        op(data, &user)
    }

    fn delete(
        &mut self,
        prompt: &str,
        remove: impl FnOnce(&mut UserData) -> bool,
    ) -> CasinoResult<bool> {
        if self.current_user.is_none() {
            return self.report(Err(CasinoError::NotLoggedIn), "");
        }
        if !(self.confirm)(prompt) {
            return Ok(false);
        }
        let removed = self.mutate(|data, _| Ok(remove(data)))?;
        if removed {
            self.report(Ok(true), "Registro eliminado")
        } else {
            Ok(false)
        }
    }

    fn report<T>(&mut self, result: CasinoResult<T>, success: &str) -> CasinoResult<T> {
        match &result {
            Ok(_) => {
                self.message = Some(InlineMessage {
                    kind: MessageKind::Success,
                    text: success.to_string(),
                });
                self.render();
            }
            Err(err) => {
                tracing::debug!(error = %err, "casino operation rejected");
                self.message = Some(InlineMessage {
                    kind: MessageKind::Error,
                    text: err.to_string(),
                });
            }
        }
        result
    }

    fn render(&mut self) {
        let views = match self.data() {
            Ok(data) => CasinoViews {
                clients: render::clients_table(&data.clients),
                vouchers: render::vouchers_table(&data.vouchers, &data.clients),
                prizes: render::prizes_table(&data.prizes),
                history: render::history_table(&data.points_history, &data.clients),
                redemptions: render::redemptions_table(&data.redemptions, &data.clients),
            },
            Err(_) => CasinoViews::default(),
        };
        self.views = views;
    }
}
