//! Canonical SQLite schema for the snag store.
//!
//! The schema is normalized for queryability:
//! - `tickets` keeps the aggregate lifecycle fields for each ticket
//! - edge tables (`worker_capabilities`, `complaint_staff`) model
//!   multi-valued relationships as proper rows, never delimited strings
//! - `bindings` is the dispatch ledger; `repair_records`, `feedback`,
//!   `complaints`, and `statements` hold downstream bookkeeping

/// Migration v1: core normalized tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS residents (
    resident_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    address TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dispatchers (
    dispatcher_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0)
);

CREATE TABLE IF NOT EXISTS fault_types (
    fault_type_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0)
);

CREATE TABLE IF NOT EXISTS workers (
    worker_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    available INTEGER NOT NULL DEFAULT 1 CHECK (available IN (0, 1))
);

CREATE TABLE IF NOT EXISTS worker_capabilities (
    worker_id INTEGER NOT NULL REFERENCES workers(worker_id) ON DELETE CASCADE,
    fault_type_id INTEGER NOT NULL REFERENCES fault_types(fault_type_id) ON DELETE CASCADE,
    PRIMARY KEY (worker_id, fault_type_id)
);

CREATE TABLE IF NOT EXISTS tickets (
    ticket_id INTEGER PRIMARY KEY AUTOINCREMENT,
    fault_type_id INTEGER NOT NULL REFERENCES fault_types(fault_type_id),
    description TEXT NOT NULL,
    channel TEXT NOT NULL CHECK (channel IN ('phone', 'app')),
    resident_id INTEGER NOT NULL REFERENCES residents(resident_id),
    dispatcher_id INTEGER REFERENCES dispatchers(dispatcher_id),
    status TEXT NOT NULL DEFAULT 'submitted'
        CHECK (status IN ('submitted', 'logged', 'assigned', 'repaired', 'reviewed')),
    created_at_us INTEGER NOT NULL,
    CHECK ((dispatcher_id IS NULL) = (status = 'submitted'))
);

CREATE TABLE IF NOT EXISTS bindings (
    binding_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL REFERENCES tickets(ticket_id),
    worker_id INTEGER NOT NULL REFERENCES workers(worker_id),
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'closed'))
);

CREATE TABLE IF NOT EXISTS repair_records (
    record_id INTEGER PRIMARY KEY AUTOINCREMENT,
    binding_id INTEGER NOT NULL REFERENCES bindings(binding_id),
    outcome TEXT NOT NULL
        CHECK (outcome IN ('cannot_repair', 'follow_up_needed', 'completed')),
    started_at_us INTEGER NOT NULL,
    ended_at_us INTEGER NOT NULL,
    procedure TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feedback (
    feedback_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL UNIQUE REFERENCES tickets(ticket_id),
    response_speed INTEGER NOT NULL CHECK (response_speed BETWEEN 1 AND 5),
    service_attitude INTEGER NOT NULL CHECK (service_attitude BETWEEN 1 AND 5),
    satisfaction INTEGER NOT NULL CHECK (satisfaction BETWEEN 1 AND 5)
);

CREATE TABLE IF NOT EXISTS complaints (
    complaint_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL REFERENCES tickets(ticket_id),
    content TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'raised'
        CHECK (status IN ('raised', 'in_progress', 'closed')),
    resolution TEXT
);

CREATE TABLE IF NOT EXISTS complaint_staff (
    complaint_id INTEGER NOT NULL REFERENCES complaints(complaint_id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('dispatcher', 'worker')),
    staff_id INTEGER NOT NULL,
    PRIMARY KEY (complaint_id, role, staff_id)
);

CREATE TABLE IF NOT EXISTS statements (
    statement_id INTEGER PRIMARY KEY AUTOINCREMENT,
    complaint_id INTEGER NOT NULL REFERENCES complaints(complaint_id) ON DELETE CASCADE,
    submitter_role TEXT NOT NULL CHECK (submitter_role IN ('dispatcher', 'worker')),
    submitter_id INTEGER NOT NULL,
    content TEXT NOT NULL
);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_tickets_status_created
    ON tickets(status, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_tickets_dispatcher
    ON tickets(dispatcher_id, status);

CREATE INDEX IF NOT EXISTS idx_tickets_resident
    ON tickets(resident_id);

CREATE INDEX IF NOT EXISTS idx_workers_available
    ON workers(available, worker_id);

CREATE INDEX IF NOT EXISTS idx_bindings_ticket_status
    ON bindings(ticket_id, status);

CREATE INDEX IF NOT EXISTS idx_statements_complaint
    ON statements(complaint_id);
";
