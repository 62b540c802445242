//! CRUD operations for connection edges, plus the
//! [`EdgeStore`](trellis_engine::EdgeStore) impl the graph engine runs
//! against.
//!
//! Every row carries the canonicalized pair columns `pair_lo`/`pair_hi`
//! (min/max of the two user ids); a partial unique index over them enforces
//! the at-most-one-live-edge invariant at the store level, which makes the
//! database the final arbiter between concurrent requesters.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::params;

use trellis_engine::{EdgeStore, StoreFault};
use trellis_shared::{ConnectionStatus, Edge, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// The edge between two users, either direction.  Live edges win over
    /// superseded `Rejected` rows; among rejected rows the newest is
    /// returned.
    pub fn find_connection(&self, a: &UserId, b: &UserId) -> Result<Option<Edge>> {
        let (lo, hi) = pair_key(a, b);
        let mut stmt = self.conn().prepare(
            "SELECT from_id, to_id, status, requested_at
             FROM connections
             WHERE pair_lo = ?1 AND pair_hi = ?2
             ORDER BY (status = 'Rejected') ASC, id DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query_map(params![lo, hi], row_to_edge)?;
        rows.next().transpose().map_err(StoreError::from)
    }

    /// Insert a new edge.  Returns `false` when the live-pair unique index
    /// rejects the write, i.e. a concurrent writer got there first.
    pub fn insert_connection(
        &self,
        from: &UserId,
        to: &UserId,
        status: ConnectionStatus,
    ) -> Result<bool> {
        let (lo, hi) = pair_key(from, to);
        let result = self.conn().execute(
            "INSERT INTO connections (from_id, to_id, status, pair_lo, pair_hi, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                from.as_str(),
                to.as_str(),
                status.as_str(),
                lo,
                hi,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Compare-and-set the status of the directed edge `from -> to`.  A
    /// single guarded `UPDATE`, so concurrent double-resolves cannot both
    /// win.  Returns `false` when no edge with status `expected` exists.
    pub fn set_connection_status(
        &self,
        from: &UserId,
        to: &UserId,
        expected: ConnectionStatus,
        new: ConnectionStatus,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE connections SET status = ?4
             WHERE from_id = ?1 AND to_id = ?2 AND status = ?3",
            params![
                from.as_str(),
                to.as_str(),
                expected.as_str(),
                new.as_str(),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Users joined to `user` by an edge with the given status, merging
    /// both edge directions.
    pub fn connection_neighbors(
        &self,
        user: &UserId,
        status: ConnectionStatus,
    ) -> Result<HashSet<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT to_id   FROM connections WHERE from_id = ?1 AND status = ?2
             UNION
             SELECT from_id FROM connections WHERE to_id   = ?1 AND status = ?2",
        )?;

        let rows = stmt.query_map(params![user.as_str(), status.as_str()], |row| {
            Ok(UserId(row.get(0)?))
        })?;

        rows.collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Directed edges pointing at `to` with the given status, oldest first.
    pub fn incoming_connections(
        &self,
        to: &UserId,
        status: ConnectionStatus,
    ) -> Result<Vec<Edge>> {
        let mut stmt = self.conn().prepare(
            "SELECT from_id, to_id, status, requested_at
             FROM connections
             WHERE to_id = ?1 AND status = ?2
             ORDER BY requested_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![to.as_str(), status.as_str()], row_to_edge)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }
}

impl EdgeStore for Database {
    fn find_edge(&self, a: &UserId, b: &UserId) -> std::result::Result<Option<Edge>, StoreFault> {
        self.find_connection(a, b).map_err(Into::into)
    }

    fn insert_edge(
        &self,
        from: &UserId,
        to: &UserId,
        status: ConnectionStatus,
    ) -> std::result::Result<bool, StoreFault> {
        self.insert_connection(from, to, status).map_err(Into::into)
    }

    fn update_status(
        &self,
        from: &UserId,
        to: &UserId,
        expected: ConnectionStatus,
        new: ConnectionStatus,
    ) -> std::result::Result<bool, StoreFault> {
        self.set_connection_status(from, to, expected, new)
            .map_err(Into::into)
    }

    fn neighbors(
        &self,
        user: &UserId,
        status: ConnectionStatus,
    ) -> std::result::Result<HashSet<UserId>, StoreFault> {
        self.connection_neighbors(user, status).map_err(Into::into)
    }

    fn incoming(
        &self,
        to: &UserId,
        status: ConnectionStatus,
    ) -> std::result::Result<Vec<Edge>, StoreFault> {
        self.incoming_connections(to, status).map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Canonical unordered-pair key: `(min, max)` of the two user ids.
fn pair_key<'a>(a: &'a UserId, b: &'a UserId) -> (&'a str, &'a str) {
    if a.as_str() <= b.as_str() {
        (a.as_str(), b.as_str())
    } else {
        (b.as_str(), a.as_str())
    }
}

/// Map a `rusqlite::Row` to an [`Edge`].
fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    let from: String = row.get(0)?;
    let to: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let requested_str: String = row.get(3)?;

    let status = ConnectionStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown connection status '{status_str}'").into(),
        )
    })?;

    let requested_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&requested_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Edge {
        from: UserId(from),
        to: UserId(to),
        status,
        requested_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_engine::{ConnectionGraph, EngineError};

    fn db_with_users(dir: &tempfile::TempDir, ids: &[&str]) -> Database {
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        for id in ids {
            db.create_user(&UserId::from(*id), "pw", "x@example.org")
                .unwrap();
        }
        db
    }

    fn accept(db: &Database, a: &str, b: &str) {
        assert!(db
            .insert_connection(&a.into(), &b.into(), ConnectionStatus::Accepted)
            .unwrap());
    }

    #[test]
    fn edge_round_trip_and_direction() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob"]);

        assert!(db
            .insert_connection(&"alice".into(), &"bob".into(), ConnectionStatus::Requested)
            .unwrap());

        // Either lookup direction finds the same row.
        let edge = db
            .find_connection(&"bob".into(), &"alice".into())
            .unwrap()
            .unwrap();
        assert_eq!(edge.from, UserId::from("alice"));
        assert_eq!(edge.to, UserId::from("bob"));
        assert_eq!(edge.status, ConnectionStatus::Requested);
    }

    #[test]
    fn live_pair_index_rejects_duplicates_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob"]);

        assert!(db
            .insert_connection(&"alice".into(), &"bob".into(), ConnectionStatus::Requested)
            .unwrap());
        assert!(!db
            .insert_connection(&"alice".into(), &"bob".into(), ConnectionStatus::Requested)
            .unwrap());
        assert!(!db
            .insert_connection(&"bob".into(), &"alice".into(), ConnectionStatus::Requested)
            .unwrap());
    }

    #[test]
    fn rejected_edges_are_superseded_by_fresh_requests() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob"]);

        assert!(db
            .insert_connection(&"alice".into(), &"bob".into(), ConnectionStatus::Requested)
            .unwrap());
        assert!(db
            .set_connection_status(
                &"alice".into(),
                &"bob".into(),
                ConnectionStatus::Requested,
                ConnectionStatus::Rejected,
            )
            .unwrap());

        // The rejected row no longer blocks the unique index.
        assert!(db
            .insert_connection(&"alice".into(), &"bob".into(), ConnectionStatus::Requested)
            .unwrap());
        // And the live edge shadows the rejected history row.
        let edge = db
            .find_connection(&"alice".into(), &"bob".into())
            .unwrap()
            .unwrap();
        assert_eq!(edge.status, ConnectionStatus::Requested);
    }

    #[test]
    fn compare_and_set_guards_the_expected_status() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob"]);

        assert!(db
            .insert_connection(&"alice".into(), &"bob".into(), ConnectionStatus::Requested)
            .unwrap());
        assert!(db
            .set_connection_status(
                &"alice".into(),
                &"bob".into(),
                ConnectionStatus::Requested,
                ConnectionStatus::Accepted,
            )
            .unwrap());
        // Second resolve loses the CAS.
        assert!(!db
            .set_connection_status(
                &"alice".into(),
                &"bob".into(),
                ConnectionStatus::Requested,
                ConnectionStatus::Rejected,
            )
            .unwrap());
        // Wrong direction never matches.
        assert!(!db
            .set_connection_status(
                &"bob".into(),
                &"alice".into(),
                ConnectionStatus::Accepted,
                ConnectionStatus::Rejected,
            )
            .unwrap());
    }

    #[test]
    fn neighbors_merge_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob", "carol", "dave"]);
        accept(&db, "alice", "bob");
        accept(&db, "carol", "alice");
        assert!(db
            .insert_connection(&"dave".into(), &"alice".into(), ConnectionStatus::Requested)
            .unwrap());

        let neighbors = db
            .connection_neighbors(&"alice".into(), ConnectionStatus::Accepted)
            .unwrap();
        assert_eq!(
            neighbors,
            HashSet::from([UserId::from("bob"), UserId::from("carol")])
        );
    }

    #[test]
    fn incoming_is_directional_and_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob", "carol"]);

        assert!(db
            .insert_connection(&"bob".into(), &"alice".into(), ConnectionStatus::Requested)
            .unwrap());
        assert!(db
            .insert_connection(&"carol".into(), &"alice".into(), ConnectionStatus::Requested)
            .unwrap());

        let incoming = db
            .incoming_connections(&"alice".into(), ConnectionStatus::Requested)
            .unwrap();
        let from: Vec<&str> = incoming.iter().map(|e| e.from.as_str()).collect();
        assert_eq!(from, vec!["bob", "carol"]);

        // alice's own outgoing requests are not incoming.
        assert!(db
            .incoming_connections(&"bob".into(), ConnectionStatus::Accepted)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn graph_engine_runs_against_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_with_users(&dir, &["alice", "bob", "carol", "dave", "eve", "frank"]);
        // alice - bob - carol - dave - eve chain.
        accept(&db, "alice", "bob");
        accept(&db, "bob", "carol");
        accept(&db, "carol", "dave");
        accept(&db, "dave", "eve");

        let graph = ConnectionGraph::new(&db, &db);

        // eve is 4 hops from alice; frank is in no component at all.
        assert_eq!(
            graph.request_connection(&"alice".into(), &"eve".into()),
            Err(EngineError::TooFarToConnect)
        );
        assert_eq!(
            graph.request_connection(&"alice".into(), &"frank".into()),
            Err(EngineError::TooFarToConnect)
        );

        // frank has no accepted connections yet, so the bootstrap carve-out
        // lets him request anyone.
        graph
            .request_connection(&"frank".into(), &"alice".into())
            .unwrap();
        graph
            .respond_to_request(&"alice".into(), &"frank".into(), true)
            .unwrap();
        assert!(graph
            .list_connections(&"alice".into())
            .unwrap()
            .contains(&"frank".into()));

        // dave sits exactly at the 3-hop bound.
        graph
            .request_connection(&"alice".into(), &"dave".into())
            .unwrap();
        assert_eq!(
            graph.list_pending_requests(&"dave".into()).unwrap(),
            vec![UserId::from("alice")]
        );
    }
}
