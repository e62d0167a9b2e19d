//! SQLite-backed store.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while a writer commits
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` to protect relational integrity
//!
//! Every [`Store::transaction`] runs `BEGIN IMMEDIATE`, so two callers
//! racing a conditional status update serialize at the store: the loser's
//! update matches zero rows and the core reports `InvalidState` instead of
//! silently double-assigning.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::{Store, StoreTx, TicketFilter, migrations};
use crate::error::{Error, Result};
use crate::model::{
    Binding, BindingStatus, Channel, Complaint, ComplaintStatus, Dispatcher, FaultType, Feedback,
    FeedbackScores, NewTicket, RepairOutcome, RepairRecord, RepairReport, Resident, StaffRef,
    Statement, Status, Ticket, Worker,
};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A store backed by a SQLite database file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store database, apply runtime pragmas, and
    /// migrate the schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if opening, configuring, or migrating fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!("create store directory {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Store(format!("open store database {}: {e}", path.display())))?;
        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory store (used by tests).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if SQLite setup fails.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        configure_connection(&conn)?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn })
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

impl Store for SqliteStore {
    fn transaction<T>(&mut self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut store_tx = SqliteTx { conn: &tx };
        // On Err the Transaction drop rolls everything back.
        let value = f(&mut store_tx)?;
        tx.commit()?;
        Ok(value)
    }
}

struct SqliteTx<'conn> {
    conn: &'conn Connection,
}

fn parse_col<T: FromStr>(raw: &str, column: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Store(format!("corrupt {column} column '{raw}': {e}")))
}

fn timestamp_from_us(us: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| Error::Store(format!("timestamp {us} out of range")))
}

fn ticket_from_row(row: &Row<'_>) -> Result<Ticket> {
    let channel: String = row.get(3)?;
    let status: String = row.get(6)?;
    Ok(Ticket {
        id: row.get(0)?,
        fault_type: row.get(1)?,
        description: row.get(2)?,
        channel: parse_col::<Channel>(&channel, "channel")?,
        resident: row.get(4)?,
        dispatcher: row.get(5)?,
        status: parse_col::<Status>(&status, "status")?,
        created_at: timestamp_from_us(row.get(7)?)?,
    })
}

fn binding_from_row(row: &Row<'_>) -> Result<Binding> {
    let status: String = row.get(3)?;
    Ok(Binding {
        id: row.get(0)?,
        ticket: row.get(1)?,
        worker: row.get(2)?,
        status: parse_col::<BindingStatus>(&status, "status")?,
    })
}

fn staff_ref(role: &str, id: i64) -> Result<StaffRef> {
    match role {
        "dispatcher" => Ok(StaffRef::Dispatcher(id)),
        "worker" => Ok(StaffRef::Worker(id)),
        other => Err(Error::Store(format!("corrupt staff role '{other}'"))),
    }
}

const fn staff_role(staff: StaffRef) -> (&'static str, i64) {
    match staff {
        StaffRef::Dispatcher(id) => ("dispatcher", id),
        StaffRef::Worker(id) => ("worker", id),
    }
}

const TICKET_COLUMNS: &str = "ticket_id, fault_type_id, description, channel, \
     resident_id, dispatcher_id, status, created_at_us";

impl StoreTx for SqliteTx<'_> {
    fn create_ticket(&mut self, new: &NewTicket, created_at: DateTime<Utc>) -> Result<Ticket> {
        self.conn.execute(
            "INSERT INTO tickets (fault_type_id, description, channel, resident_id, \
             status, created_at_us) VALUES (?1, ?2, ?3, ?4, 'submitted', ?5)",
            params![
                new.fault_type,
                new.description,
                new.channel.to_string(),
                new.resident,
                created_at.timestamp_micros(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(Ticket {
            id,
            fault_type: new.fault_type,
            description: new.description.clone(),
            channel: new.channel,
            resident: new.resident,
            dispatcher: None,
            status: Status::Submitted,
            created_at,
        })
    }

    fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(ticket_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let mut sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(status) = filter.status {
            args.push(Box::new(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        if let Some(dispatcher) = filter.dispatcher {
            args.push(Box::new(dispatcher));
            sql.push_str(&format!(" AND dispatcher_id = ?{}", args.len()));
        }
        if let Some(resident) = filter.resident {
            args.push(Box::new(resident));
            sql.push_str(&format!(" AND resident_id = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY ticket_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(args.iter().map(AsRef::as_ref)))?;
        let mut tickets = Vec::new();
        while let Some(row) = rows.next()? {
            tickets.push(ticket_from_row(row)?);
        }
        Ok(tickets)
    }

    fn update_ticket_status(
        &mut self,
        id: i64,
        expected: Status,
        new: Status,
        dispatcher: Option<i64>,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tickets
             SET status = ?3, dispatcher_id = COALESCE(?4, dispatcher_id)
             WHERE ticket_id = ?1 AND status = ?2",
            params![id, expected.to_string(), new.to_string(), dispatcher],
        )?;
        Ok(changed == 1)
    }

    fn create_worker(&mut self, name: &str, capabilities: &BTreeSet<i64>) -> Result<Worker> {
        self.conn
            .execute("INSERT INTO workers (name) VALUES (?1)", [name])?;
        let id = self.conn.last_insert_rowid();
        let mut stmt = self.conn.prepare(
            "INSERT INTO worker_capabilities (worker_id, fault_type_id) VALUES (?1, ?2)",
        )?;
        for fault_type in capabilities {
            stmt.execute(params![id, fault_type])?;
        }
        Ok(Worker {
            id,
            name: name.to_string(),
            available: true,
            capabilities: capabilities.clone(),
        })
    }

    fn get_worker(&self, id: i64) -> Result<Option<Worker>> {
        let header = self
            .conn
            .query_row(
                "SELECT worker_id, name, available FROM workers WHERE worker_id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, name, available)) = header else {
            return Ok(None);
        };
        Ok(Some(Worker {
            id,
            name,
            available,
            capabilities: self.worker_capabilities(id)?,
        }))
    }

    fn list_workers(&self, available_only: bool) -> Result<Vec<Worker>> {
        let mut stmt = self.conn.prepare(
            "SELECT worker_id, name, available FROM workers
             WHERE (?1 = 0 OR available = 1)
             ORDER BY worker_id ASC",
        )?;
        let headers = stmt
            .query_map([i64::from(available_only)], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut workers = Vec::with_capacity(headers.len());
        for (id, name, available) in headers {
            workers.push(Worker {
                id,
                name,
                available,
                capabilities: self.worker_capabilities(id)?,
            });
        }
        Ok(workers)
    }

    fn set_worker_availability(&mut self, id: i64, available: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE workers SET available = ?2 WHERE worker_id = ?1",
            params![id, available],
        )?;
        Ok(changed == 1)
    }

    fn create_binding(&mut self, ticket: i64, worker: i64) -> Result<Binding> {
        self.conn.execute(
            "INSERT INTO bindings (ticket_id, worker_id, status) VALUES (?1, ?2, 'active')",
            params![ticket, worker],
        )?;
        Ok(Binding {
            id: self.conn.last_insert_rowid(),
            ticket,
            worker,
            status: BindingStatus::Active,
        })
    }

    fn active_binding_for(&self, ticket: i64) -> Result<Option<Binding>> {
        let mut stmt = self.conn.prepare(
            "SELECT binding_id, ticket_id, worker_id, status FROM bindings
             WHERE ticket_id = ?1 AND status = 'active'",
        )?;
        let mut rows = stmt.query([ticket])?;
        match rows.next()? {
            Some(row) => Ok(Some(binding_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn close_binding(&mut self, id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE bindings SET status = 'closed' WHERE binding_id = ?1 AND status = 'active'",
            [id],
        )?;
        Ok(changed == 1)
    }

    fn create_dispatcher(&mut self, name: &str) -> Result<Dispatcher> {
        self.conn
            .execute("INSERT INTO dispatchers (name) VALUES (?1)", [name])?;
        Ok(Dispatcher {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn get_dispatcher(&self, id: i64) -> Result<Option<Dispatcher>> {
        Ok(self
            .conn
            .query_row(
                "SELECT dispatcher_id, name FROM dispatchers WHERE dispatcher_id = ?1",
                [id],
                |row| {
                    Ok(Dispatcher {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn create_resident(&mut self, name: &str, address: &str) -> Result<Resident> {
        self.conn.execute(
            "INSERT INTO residents (name, address) VALUES (?1, ?2)",
            params![name, address],
        )?;
        Ok(Resident {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            address: address.to_string(),
        })
    }

    fn get_resident(&self, id: i64) -> Result<Option<Resident>> {
        Ok(self
            .conn
            .query_row(
                "SELECT resident_id, name, address FROM residents WHERE resident_id = ?1",
                [id],
                |row| {
                    Ok(Resident {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn create_fault_type(&mut self, name: &str) -> Result<FaultType> {
        self.conn
            .execute("INSERT INTO fault_types (name) VALUES (?1)", [name])?;
        Ok(FaultType {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn get_fault_type(&self, id: i64) -> Result<Option<FaultType>> {
        Ok(self
            .conn
            .query_row(
                "SELECT fault_type_id, name FROM fault_types WHERE fault_type_id = ?1",
                [id],
                |row| {
                    Ok(FaultType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn list_fault_types(&self) -> Result<Vec<FaultType>> {
        let mut stmt = self
            .conn
            .prepare("SELECT fault_type_id, name FROM fault_types ORDER BY fault_type_id ASC")?;
        let types = stmt
            .query_map([], |row| {
                Ok(FaultType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(types)
    }

    fn create_record(&mut self, binding: i64, report: &RepairReport) -> Result<RepairRecord> {
        self.conn.execute(
            "INSERT INTO repair_records (binding_id, outcome, started_at_us, ended_at_us, \
             procedure) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                binding,
                report.outcome.to_string(),
                report.started_at.timestamp_micros(),
                report.ended_at.timestamp_micros(),
                report.procedure,
            ],
        )?;
        Ok(RepairRecord {
            id: self.conn.last_insert_rowid(),
            binding,
            outcome: report.outcome,
            started_at: report.started_at,
            ended_at: report.ended_at,
            procedure: report.procedure.clone(),
        })
    }

    fn create_feedback(&mut self, ticket: i64, scores: FeedbackScores) -> Result<Feedback> {
        self.conn.execute(
            "INSERT INTO feedback (ticket_id, response_speed, service_attitude, satisfaction) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                ticket,
                scores.response_speed,
                scores.service_attitude,
                scores.satisfaction,
            ],
        )?;
        Ok(Feedback {
            id: self.conn.last_insert_rowid(),
            ticket,
            response_speed: scores.response_speed,
            service_attitude: scores.service_attitude,
            satisfaction: scores.satisfaction,
        })
    }

    fn create_complaint(
        &mut self,
        ticket: i64,
        content: &str,
        related_staff: &[StaffRef],
    ) -> Result<Complaint> {
        self.conn.execute(
            "INSERT INTO complaints (ticket_id, content, status) VALUES (?1, ?2, 'raised')",
            params![ticket, content],
        )?;
        let id = self.conn.last_insert_rowid();
        let staff: BTreeSet<StaffRef> = related_staff.iter().copied().collect();
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO complaint_staff (complaint_id, role, staff_id) \
             VALUES (?1, ?2, ?3)",
        )?;
        for member in &staff {
            let (role, staff_id) = staff_role(*member);
            stmt.execute(params![id, role, staff_id])?;
        }
        Ok(Complaint {
            id,
            ticket,
            content: content.to_string(),
            status: ComplaintStatus::Raised,
            related_staff: staff.into_iter().collect(),
            resolution: None,
        })
    }

    fn get_complaint(&self, id: i64) -> Result<Option<Complaint>> {
        let header = self
            .conn
            .query_row(
                "SELECT complaint_id, ticket_id, content, status, resolution \
                 FROM complaints WHERE complaint_id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, ticket, content, status, resolution)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT role, staff_id FROM complaint_staff \
             WHERE complaint_id = ?1 ORDER BY role, staff_id",
        )?;
        let pairs = stmt
            .query_map([id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut related_staff = Vec::with_capacity(pairs.len());
        for (role, staff_id) in pairs {
            related_staff.push(staff_ref(&role, staff_id)?);
        }

        Ok(Some(Complaint {
            id,
            ticket,
            content,
            status: parse_col::<ComplaintStatus>(&status, "status")?,
            related_staff,
            resolution,
        }))
    }

    fn set_complaint_status(
        &mut self,
        id: i64,
        status: ComplaintStatus,
        resolution: Option<&str>,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE complaints
             SET status = ?2, resolution = COALESCE(?3, resolution)
             WHERE complaint_id = ?1",
            params![id, status.to_string(), resolution],
        )?;
        Ok(changed == 1)
    }

    fn create_statement(
        &mut self,
        complaint: i64,
        submitter: StaffRef,
        content: &str,
    ) -> Result<Statement> {
        let (role, staff_id) = staff_role(submitter);
        self.conn.execute(
            "INSERT INTO statements (complaint_id, submitter_role, submitter_id, content) \
             VALUES (?1, ?2, ?3, ?4)",
            params![complaint, role, staff_id, content],
        )?;
        Ok(Statement {
            id: self.conn.last_insert_rowid(),
            complaint,
            submitter,
            content: content.to_string(),
        })
    }

    fn list_statements(&self, complaint: i64) -> Result<Vec<Statement>> {
        let mut stmt = self.conn.prepare(
            "SELECT statement_id, submitter_role, submitter_id, content FROM statements \
             WHERE complaint_id = ?1 ORDER BY statement_id ASC",
        )?;
        let rows = stmt
            .query_map([complaint], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut statements = Vec::with_capacity(rows.len());
        for (id, role, staff_id, content) in rows {
            statements.push(Statement {
                id,
                complaint,
                submitter: staff_ref(&role, staff_id)?,
                content,
            });
        }
        Ok(statements)
    }
}

impl SqliteTx<'_> {
    fn worker_capabilities(&self, worker_id: i64) -> Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT fault_type_id FROM worker_capabilities WHERE worker_id = ?1",
        )?;
        let capabilities = stmt
            .query_map([worker_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(capabilities)
    }
}
