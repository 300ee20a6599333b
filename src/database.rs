//! Database initialization, table definitions and record access
//!
//! Clients and vouchers live in an embedded redb database. Rows are stored as
//! JSON strings keyed by a numeric id handed out by a per-table sequence.

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::sync::Arc;
use thiserror::Error;

use crate::model::{Canje, Cliente};

/// Main table for client records
///
/// Key: client id
/// Value: JSON-serialized Cliente
pub const TABLE_CLIENTES: TableDefinition<u64, &str> = TableDefinition::new("clientes_v1");

/// Unique index from document id (cedula) to client id
pub const TABLE_CEDULA_INDEX: TableDefinition<&str, u64> = TableDefinition::new("cedula_index_v1");

/// Main table for voucher records
///
/// Key: voucher id
/// Value: JSON-serialized Canje
pub const TABLE_CANJES: TableDefinition<u64, &str> = TableDefinition::new("canjes_v1");

/// Last id handed out per sequence name
pub const TABLE_SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences_v1");

const SEQ_CLIENTES: &str = "clientes";
const SEQ_CANJES: &str = "canjes";

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    /// Token every `/api/mbl` request must present; `None` disables the check
    pub auth_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty()).map(Arc::from);
        self
    }
}

/// Failures of the storage layer
///
/// The first two variants are infrastructure failures; the rest are business
/// rules enforced while the write transaction is open.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Redb(#[from] redb::Error),

    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("cliente {0} no encontrado")]
    ClienteNotFound(u64),

    #[error("canje {0} no encontrado")]
    CanjeNotFound(u64),

    #[error("ya existe un cliente con la cédula {0}")]
    DuplicateCedula(String),

    #[error("el cliente {0} tiene canjes registrados")]
    ClienteHasCanjes(u64),
}

macro_rules! store_error_from_redb {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(err: $source) -> Self {
                    StoreError::Redb(err.into())
                }
            }
        )*
    };
}

store_error_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields of a client about to be inserted
#[derive(Debug, Clone)]
pub struct NewCliente {
    pub nombre: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub puntos: u64,
}

/// Editable client fields; the document id is fixed at creation
#[derive(Debug, Clone)]
pub struct ClienteUpdate {
    pub nombre: String,
    pub telefono: Option<String>,
    pub email: Option<String>,
}

/// Fields of a voucher about to be issued
#[derive(Debug, Clone)]
pub struct NewCanje {
    pub cliente_id: u64,
    pub monto: f64,
    pub descripcion: Option<String>,
    pub usuario_registro: String,
}

/// Initializes the embedded database and creates required tables
///
/// # Example
///
/// ```no_run
/// # use mbl::database::init_db;
/// let db = init_db("mbl.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_CLIENTES)?;
        write_txn.open_table(TABLE_CEDULA_INDEX)?;
        write_txn.open_table(TABLE_CANJES)?;
        write_txn.open_table(TABLE_SEQUENCES)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Inserts the demo clients when the clients table is empty
///
/// Returns the number of clients inserted.
pub fn seed_demo_clientes(db: &Database) -> StoreResult<usize> {
    if !list_clientes(db)?.is_empty() {
        return Ok(0);
    }

    let demo = [
        ("Juan Perez", "1001", 150),
        ("Maria Lopez", "1002", 300),
        ("Carlos Ramirez", "1003", 50),
    ];

    for (nombre, cedula, puntos) in demo {
        insert_cliente(
            db,
            NewCliente {
                nombre: nombre.to_string(),
                cedula: cedula.to_string(),
                telefono: None,
                email: None,
                puntos,
            },
        )?;
    }

    Ok(demo.len())
}

fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(TABLE_SEQUENCES)?;
    let next = table.get(sequence)?.map(|guard| guard.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// All clients ordered by id
pub fn list_clientes(db: &Database) -> StoreResult<Vec<Cliente>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_CLIENTES)?;

    let mut clientes = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        clientes.push(serde_json::from_str::<Cliente>(value.value())?);
    }
    Ok(clientes)
}

/// Stores a new client, rejecting a document id that is already registered
pub fn insert_cliente(db: &Database, new: NewCliente) -> StoreResult<Cliente> {
    let write_txn = db.begin_write()?;
    let cliente = {
        {
            let index = write_txn.open_table(TABLE_CEDULA_INDEX)?;
            if index.get(new.cedula.as_str())?.is_some() {
                return Err(StoreError::DuplicateCedula(new.cedula));
            }
        }

        let cliente = Cliente {
            id: next_id(&write_txn, SEQ_CLIENTES)?,
            nombre: new.nombre,
            cedula: new.cedula,
            telefono: new.telefono,
            email: new.email,
            puntos: new.puntos,
            fecha_registro: Utc::now(),
        };
        let record_json = serde_json::to_string(&cliente)?;

        let mut table = write_txn.open_table(TABLE_CLIENTES)?;
        table.insert(cliente.id, record_json.as_str())?;

        let mut index = write_txn.open_table(TABLE_CEDULA_INDEX)?;
        index.insert(cliente.cedula.as_str(), cliente.id)?;

        cliente
    };
    write_txn.commit()?;

    Ok(cliente)
}

/// Rewrites the editable fields of a client
pub fn update_cliente(db: &Database, id: u64, update: ClienteUpdate) -> StoreResult<Cliente> {
    let write_txn = db.begin_write()?;
    let cliente = {
        let mut table = write_txn.open_table(TABLE_CLIENTES)?;

        let mut cliente = match table.get(id)? {
            Some(guard) => serde_json::from_str::<Cliente>(guard.value())?,
            None => return Err(StoreError::ClienteNotFound(id)),
        };

        cliente.nombre = update.nombre;
        cliente.telefono = update.telefono;
        cliente.email = update.email;

        let record_json = serde_json::to_string(&cliente)?;
        table.insert(id, record_json.as_str())?;
        cliente
    };
    write_txn.commit()?;

    Ok(cliente)
}

/// Deletes a client that has no vouchers
///
/// Vouchers keep a copy of the client's name, so a client with history is
/// refused instead of leaving orphans behind.
pub fn delete_cliente(db: &Database, id: u64) -> StoreResult<Cliente> {
    let write_txn = db.begin_write()?;
    let cliente = {
        {
            let canjes = write_txn.open_table(TABLE_CANJES)?;
            for entry in canjes.iter()? {
                let (_, value) = entry?;
                let canje = serde_json::from_str::<Canje>(value.value())?;
                if canje.cliente_id == id {
                    return Err(StoreError::ClienteHasCanjes(id));
                }
            }
        }

        let mut table = write_txn.open_table(TABLE_CLIENTES)?;
        let cliente = match table.get(id)? {
            Some(guard) => serde_json::from_str::<Cliente>(guard.value())?,
            None => return Err(StoreError::ClienteNotFound(id)),
        };
        table.remove(id)?;

        let mut index = write_txn.open_table(TABLE_CEDULA_INDEX)?;
        index.remove(cliente.cedula.as_str())?;

        cliente
    };
    write_txn.commit()?;

    Ok(cliente)
}

/// All vouchers, newest first
pub fn list_canjes(db: &Database) -> StoreResult<Vec<Canje>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_CANJES)?;

    let mut canjes = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        canjes.push(serde_json::from_str::<Canje>(value.value())?);
    }

    canjes.sort_by(|a, b| b.fecha_canje.cmp(&a.fecha_canje).then(b.id.cmp(&a.id)));
    Ok(canjes)
}

/// Issues a voucher for an existing client
pub fn insert_canje(db: &Database, new: NewCanje) -> StoreResult<Canje> {
    let write_txn = db.begin_write()?;
    let canje = {
        let cliente = {
            let clientes = write_txn.open_table(TABLE_CLIENTES)?;
            let found = match clientes.get(new.cliente_id)? {
                Some(guard) => serde_json::from_str::<Cliente>(guard.value())?,
                None => return Err(StoreError::ClienteNotFound(new.cliente_id)),
            };
            found
        };

        let canje = Canje {
            id: next_id(&write_txn, SEQ_CANJES)?,
            cliente_id: cliente.id,
            cliente_nombre: cliente.nombre,
            cliente_cedula: cliente.cedula,
            monto: new.monto,
            descripcion: new.descripcion,
            usuario_registro: new.usuario_registro,
            fecha_canje: Utc::now(),
        };
        let record_json = serde_json::to_string(&canje)?;

        let mut table = write_txn.open_table(TABLE_CANJES)?;
        table.insert(canje.id, record_json.as_str())?;
        canje
    };
    write_txn.commit()?;

    Ok(canje)
}

pub fn delete_canje(db: &Database, id: u64) -> StoreResult<Canje> {
    let write_txn = db.begin_write()?;
    let canje = {
        let mut table = write_txn.open_table(TABLE_CANJES)?;
        let removed = match table.remove(id)? {
            Some(guard) => serde_json::from_str::<Canje>(guard.value())?,
            None => return Err(StoreError::CanjeNotFound(id)),
        };
        removed
    };
    write_txn.commit()?;

    Ok(canje)
}
