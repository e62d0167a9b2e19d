//! End-to-end lifecycle flows through the core operations.
//!
//! Each test runs against both store implementations: the in-memory store
//! and a throwaway SQLite database. The flows cover submission, intake,
//! assignment (including the no-eligible-worker retry), ownership checks,
//! racing transitions, and the repair/feedback tail.

use chrono::Utc;
use snag_core::dispatch::{AssignOutcome, assign};
use snag_core::error::{Entity, Error};
use snag_core::lifecycle::{complete_repair, leave_feedback, log_intake, submit};
use snag_core::model::{
    BindingStatus, Channel, FeedbackScores, NewTicket, RepairOutcome, RepairReport, Status,
};
use snag_core::store::{MemoryStore, SqliteStore, Store, StoreTx, TicketFilter};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Seed reference data: resident 1, dispatchers 1 and 2, fault types 1-2.
fn seed<S: Store>(store: &mut S) {
    store
        .transaction(|tx| {
            tx.create_resident("Li Feng", "4-702")?;
            tx.create_dispatcher("Sun Si")?;
            tx.create_dispatcher("Second Desk")?;
            tx.create_fault_type("plumbing")?;
            tx.create_fault_type("electrical")?;
            Ok(())
        })
        .expect("seed reference data");
}

fn submit_plumbing<S: Store>(store: &mut S) -> i64 {
    submit(
        store,
        &NewTicket {
            fault_type: 1,
            description: "kitchen drain blocked".to_string(),
            channel: Channel::Phone,
            resident: 1,
        },
    )
    .expect("submit ticket")
    .id
}

fn add_worker<S: Store>(store: &mut S, name: &str, capabilities: &[i64]) -> i64 {
    store
        .transaction(|tx| {
            tx.create_worker(name, &capabilities.iter().copied().collect())
                .map(|w| w.id)
        })
        .expect("create worker")
}

fn completed_report() -> RepairReport {
    let now = Utc::now();
    RepairReport {
        outcome: RepairOutcome::Completed,
        started_at: now,
        ended_at: now,
        procedure: "cleared the trap".to_string(),
    }
}

/// Run `test` against both store implementations.
fn with_both_stores(test: impl Fn(&mut dyn DynStore)) {
    let mut memory = MemoryStore::new();
    test(&mut memory);
    let mut sqlite = SqliteStore::open_in_memory().expect("open sqlite");
    test(&mut sqlite);
}

/// Object-safe shim so one test body can drive either store.
trait DynStore {
    fn tx(&mut self, f: &mut dyn FnMut(&mut dyn StoreTx) -> snag_core::Result<()>)
    -> snag_core::Result<()>;
    fn submit(&mut self, new: &NewTicket) -> snag_core::Result<snag_core::model::Ticket>;
    fn log_intake(&mut self, ticket: i64, dispatcher: i64)
    -> snag_core::Result<snag_core::model::Ticket>;
    fn assign(&mut self, ticket: i64, dispatcher: i64) -> snag_core::Result<AssignOutcome>;
    fn complete_repair(
        &mut self,
        ticket: i64,
        report: &RepairReport,
    ) -> snag_core::Result<snag_core::model::RepairRecord>;
    fn leave_feedback(
        &mut self,
        ticket: i64,
        scores: FeedbackScores,
    ) -> snag_core::Result<snag_core::model::Feedback>;
}

impl<S: Store> DynStore for S {
    fn tx(
        &mut self,
        f: &mut dyn FnMut(&mut dyn StoreTx) -> snag_core::Result<()>,
    ) -> snag_core::Result<()> {
        self.transaction(|tx| f(tx))
    }

    fn submit(&mut self, new: &NewTicket) -> snag_core::Result<snag_core::model::Ticket> {
        submit(self, new)
    }

    fn log_intake(
        &mut self,
        ticket: i64,
        dispatcher: i64,
    ) -> snag_core::Result<snag_core::model::Ticket> {
        log_intake(self, ticket, dispatcher)
    }

    fn assign(&mut self, ticket: i64, dispatcher: i64) -> snag_core::Result<AssignOutcome> {
        assign(self, ticket, dispatcher)
    }

    fn complete_repair(
        &mut self,
        ticket: i64,
        report: &RepairReport,
    ) -> snag_core::Result<snag_core::model::RepairRecord> {
        complete_repair(self, ticket, report)
    }

    fn leave_feedback(
        &mut self,
        ticket: i64,
        scores: FeedbackScores,
    ) -> snag_core::Result<snag_core::model::Feedback> {
        leave_feedback(self, ticket, scores)
    }
}

fn seed_dyn(store: &mut dyn DynStore) {
    store
        .tx(&mut |tx| {
            tx.create_resident("Li Feng", "4-702")?;
            tx.create_dispatcher("Sun Si")?;
            tx.create_dispatcher("Second Desk")?;
            tx.create_fault_type("plumbing")?;
            tx.create_fault_type("electrical")?;
            Ok(())
        })
        .expect("seed reference data");
}

fn submit_plumbing_dyn(store: &mut dyn DynStore) -> i64 {
    store
        .submit(&NewTicket {
            fault_type: 1,
            description: "kitchen drain blocked".to_string(),
            channel: Channel::Phone,
            resident: 1,
        })
        .expect("submit ticket")
        .id
}

fn add_worker_dyn(store: &mut dyn DynStore, name: &str, capabilities: &[i64]) -> i64 {
    let mut id = 0;
    store
        .tx(&mut |tx| {
            id = tx
                .create_worker(name, &capabilities.iter().copied().collect())?
                .id;
            Ok(())
        })
        .expect("create worker");
    id
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// The full scenario from the original acceptance test: submit, intake,
/// assignment deferred while nobody is capable, then first-fit once a
/// capable worker appears.
#[test]
fn deferred_assignment_succeeds_once_worker_appears() {
    with_both_stores(|store| {
        seed_dyn(store);
        // An available worker who cannot handle fault type 1.
        add_worker_dyn(store, "electrician", &[2]);
        let ticket = submit_plumbing_dyn(store);

        store.log_intake(ticket, 1).expect("intake");

        // No capable idle worker: distinguishable outcome, no mutation.
        let deferred = store.assign(ticket, 1).expect("assign call");
        assert_eq!(deferred, AssignOutcome::NoWorkerAvailable);
        store
            .tx(&mut |tx| {
                let t = tx.get_ticket(ticket)?.expect("ticket");
                assert_eq!(t.status, Status::Logged);
                assert!(tx.active_binding_for(ticket)?.is_none());
                assert!(tx.list_workers(false)?.iter().all(|w| w.available));
                Ok(())
            })
            .expect("verify deferred");

        // A capable worker shows up; the retry binds them.
        let plumber = add_worker_dyn(store, "Yu Bing", &[1]);
        let outcome = store.assign(ticket, 1).expect("assign retry");
        let AssignOutcome::Assigned { binding } = outcome else {
            panic!("expected assignment, got {outcome:?}");
        };
        assert_eq!(binding.worker, plumber);
        assert_eq!(binding.status, BindingStatus::Active);

        store
            .tx(&mut |tx| {
                let t = tx.get_ticket(ticket)?.expect("ticket");
                assert_eq!(t.status, Status::Assigned);
                let active = tx.active_binding_for(ticket)?.expect("active binding");
                assert_eq!(active.worker, plumber);
                let w = tx.get_worker(plumber)?.expect("worker");
                assert!(!w.available);
                Ok(())
            })
            .expect("verify assignment");
    });
}

#[test]
fn first_fit_prefers_lowest_worker_id() {
    with_both_stores(|store| {
        seed_dyn(store);
        let first = add_worker_dyn(store, "first plumber", &[1, 2]);
        add_worker_dyn(store, "second plumber", &[1]);
        let ticket = submit_plumbing_dyn(store);
        store.log_intake(ticket, 1).expect("intake");

        let outcome = store.assign(ticket, 1).expect("assign");
        let AssignOutcome::Assigned { binding } = outcome else {
            panic!("expected assignment");
        };
        assert_eq!(binding.worker, first);
    });
}

#[test]
fn assignment_by_non_owner_is_rejected_without_mutation() {
    with_both_stores(|store| {
        seed_dyn(store);
        add_worker_dyn(store, "plumber", &[1]);
        let ticket = submit_plumbing_dyn(store);
        store.log_intake(ticket, 1).expect("intake by dispatcher 1");

        // Dispatcher 2 did not log the ticket.
        assert!(matches!(
            store.assign(ticket, 2),
            Err(Error::NotOwner {
                dispatcher: 2,
                ..
            })
        ));

        store
            .tx(&mut |tx| {
                let t = tx.get_ticket(ticket)?.expect("ticket");
                assert_eq!(t.status, Status::Logged);
                assert_eq!(t.dispatcher, Some(1));
                assert!(tx.active_binding_for(ticket)?.is_none());
                assert!(tx.get_worker(1)?.expect("worker").available);
                Ok(())
            })
            .expect("verify no mutation");
    });
}

#[test]
fn racing_assigns_let_exactly_one_win() {
    with_both_stores(|store| {
        seed_dyn(store);
        add_worker_dyn(store, "plumber a", &[1]);
        add_worker_dyn(store, "plumber b", &[1]);
        let ticket = submit_plumbing_dyn(store);
        store.log_intake(ticket, 1).expect("intake");

        // Serialized by the store's write transaction, the second call
        // observes the ticket no longer Logged.
        let first = store.assign(ticket, 1).expect("first assign");
        assert!(matches!(first, AssignOutcome::Assigned { .. }));

        let second = store.assign(ticket, 1);
        assert!(matches!(
            second,
            Err(Error::InvalidState {
                status: Status::Assigned,
                ..
            })
        ));

        store
            .tx(&mut |tx| {
                // Exactly one worker claimed, exactly one Active binding.
                let claimed: Vec<_> = tx
                    .list_workers(false)?
                    .into_iter()
                    .filter(|w| !w.available)
                    .collect();
                assert_eq!(claimed.len(), 1);
                assert!(tx.active_binding_for(ticket)?.is_some());
                Ok(())
            })
            .expect("verify single claim");
    });
}

#[test]
fn dispatcher_is_bound_exactly_from_logged_onward() {
    with_both_stores(|store| {
        seed_dyn(store);
        add_worker_dyn(store, "plumber", &[1]);
        let ticket = submit_plumbing_dyn(store);

        let check = |store: &mut dyn DynStore, expect_bound: bool| {
            store
                .tx(&mut |tx| {
                    let t = tx.get_ticket(ticket)?.expect("ticket");
                    assert_eq!(t.dispatcher.is_some(), expect_bound);
                    assert_eq!(t.status >= Status::Logged, expect_bound);
                    Ok(())
                })
                .expect("invariant check");
        };

        check(store, false);
        store.log_intake(ticket, 1).expect("intake");
        check(store, true);
        store.assign(ticket, 1).expect("assign");
        check(store, true);
    });
}

#[test]
fn repair_and_feedback_close_out_the_lifecycle() {
    with_both_stores(|store| {
        seed_dyn(store);
        let worker = add_worker_dyn(store, "plumber", &[1]);
        let ticket = submit_plumbing_dyn(store);
        store.log_intake(ticket, 1).expect("intake");
        store.assign(ticket, 1).expect("assign");

        let record = store
            .complete_repair(ticket, &completed_report())
            .expect("complete repair");
        assert_eq!(record.outcome, RepairOutcome::Completed);

        store
            .tx(&mut |tx| {
                let t = tx.get_ticket(ticket)?.expect("ticket");
                assert_eq!(t.status, Status::Repaired);
                assert!(tx.active_binding_for(ticket)?.is_none());
                assert!(tx.get_worker(worker)?.expect("worker").available);
                Ok(())
            })
            .expect("verify repaired");

        store
            .leave_feedback(
                ticket,
                FeedbackScores {
                    response_speed: 5,
                    service_attitude: 4,
                    satisfaction: 5,
                },
            )
            .expect("feedback");

        store
            .tx(&mut |tx| {
                let t = tx.get_ticket(ticket)?.expect("ticket");
                assert_eq!(t.status, Status::Reviewed);
                Ok(())
            })
            .expect("verify reviewed");

        // Terminal: no further feedback.
        assert!(matches!(
            store.leave_feedback(
                ticket,
                FeedbackScores {
                    response_speed: 1,
                    service_attitude: 1,
                    satisfaction: 1,
                },
            ),
            Err(Error::InvalidState {
                status: Status::Reviewed,
                ..
            })
        ));
    });
}

#[test]
fn failed_repair_returns_ticket_to_logged_for_redispatch() {
    with_both_stores(|store| {
        seed_dyn(store);
        add_worker_dyn(store, "plumber a", &[1]);
        let backup = add_worker_dyn(store, "plumber b", &[1]);
        let ticket = submit_plumbing_dyn(store);
        store.log_intake(ticket, 1).expect("intake");
        store.assign(ticket, 1).expect("assign");

        let now = Utc::now();
        store
            .complete_repair(
                ticket,
                &RepairReport {
                    outcome: RepairOutcome::FollowUpNeeded,
                    started_at: now,
                    ended_at: now,
                    procedure: "needs a replacement part".to_string(),
                },
            )
            .expect("follow-up record");

        store
            .tx(&mut |tx| {
                let t = tx.get_ticket(ticket)?.expect("ticket");
                assert_eq!(t.status, Status::Logged);
                assert!(tx.active_binding_for(ticket)?.is_none());
                Ok(())
            })
            .expect("verify redispatchable");

        // Same dispatcher can assign again; first worker is free again so
        // first-fit picks them, proving the release happened.
        let outcome = store.assign(ticket, 1).expect("reassign");
        let AssignOutcome::Assigned { binding } = outcome else {
            panic!("expected reassignment");
        };
        assert_ne!(binding.worker, backup, "first-fit should pick worker a");
    });
}

#[test]
fn feedback_scores_are_validated() {
    with_both_stores(|store| {
        seed_dyn(store);
        add_worker_dyn(store, "plumber", &[1]);
        let ticket = submit_plumbing_dyn(store);
        store.log_intake(ticket, 1).expect("intake");
        store.assign(ticket, 1).expect("assign");
        store
            .complete_repair(ticket, &completed_report())
            .expect("repair");

        assert!(matches!(
            store.leave_feedback(
                ticket,
                FeedbackScores {
                    response_speed: 0,
                    service_attitude: 3,
                    satisfaction: 3,
                },
            ),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.leave_feedback(
                ticket,
                FeedbackScores {
                    response_speed: 3,
                    service_attitude: 6,
                    satisfaction: 3,
                },
            ),
            Err(Error::Validation(_))
        ));
    });
}

#[test]
fn unknown_ids_surface_as_not_found() {
    with_both_stores(|store| {
        seed_dyn(store);
        assert!(matches!(
            store.log_intake(404, 1),
            Err(Error::NotFound {
                entity: Entity::Ticket,
                id: 404,
            })
        ));
        assert!(matches!(
            store.assign(404, 1),
            Err(Error::NotFound {
                entity: Entity::Ticket,
                id: 404,
            })
        ));
    });
}

// A couple of flows only meaningful on the durable store.

/// The genuinely concurrent version of the race above: two connections to
/// the same database file assign from separate threads. `BEGIN IMMEDIATE`
/// plus the busy timeout serializes the writers, so the loser's transaction
/// starts after the winner committed and reads the ticket as `Assigned`.
#[test]
fn sqlite_racing_assigns_across_connections_let_exactly_one_win() {
    use std::sync::{Arc, Barrier};

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snag.db");

    let mut store = SqliteStore::open(&path).expect("open sqlite");
    seed(&mut store);
    add_worker(&mut store, "plumber a", &[1]);
    add_worker(&mut store, "plumber b", &[1]);
    let ticket = submit_plumbing(&mut store);
    log_intake(&mut store, ticket, 1).expect("intake");

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let mut store = SqliteStore::open(&path).expect("open second connection");
                barrier.wait();
                assign(&mut store, ticket, 1)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("assign thread"))
        .collect();

    let wins = results
        .iter()
        .filter(|r| matches!(r, Ok(AssignOutcome::Assigned { .. })))
        .count();
    let losses = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(Error::InvalidState {
                    status: Status::Assigned,
                    ..
                })
            )
        })
        .count();
    assert_eq!(wins, 1, "exactly one assign wins: {results:?}");
    assert_eq!(losses, 1, "the loser sees InvalidState: {results:?}");

    store
        .transaction(|tx| {
            let claimed: Vec<_> = tx
                .list_workers(false)?
                .into_iter()
                .filter(|w| !w.available)
                .collect();
            assert_eq!(claimed.len(), 1);
            assert!(tx.active_binding_for(ticket)?.is_some());
            Ok(())
        })
        .expect("verify single claim");
}

#[test]
fn sqlite_list_tickets_filters_by_dispatcher_and_status() {
    let mut store = SqliteStore::open_in_memory().expect("open sqlite");
    seed(&mut store);
    add_worker(&mut store, "plumber", &[1]);

    let first = submit_plumbing(&mut store);
    let second = submit_plumbing(&mut store);
    log_intake(&mut store, first, 1).expect("intake first");
    log_intake(&mut store, second, 2).expect("intake second");
    assign(&mut store, first, 1).expect("assign first");

    store
        .transaction(|tx| {
            let mine = tx.list_tickets(&TicketFilter {
                dispatcher: Some(1),
                ..TicketFilter::default()
            })?;
            assert_eq!(mine.len(), 1);
            assert_eq!(mine[0].id, first);

            let logged = tx.list_tickets(&TicketFilter {
                status: Some(Status::Logged),
                ..TicketFilter::default()
            })?;
            assert_eq!(logged.len(), 1);
            assert_eq!(logged[0].id, second);
            Ok(())
        })
        .expect("filters");
}
