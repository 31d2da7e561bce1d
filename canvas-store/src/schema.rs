//! SQLite schema for the participant ledger and placement store
//!
//! Tables:
//! - `participants`: one ledger row per anonymous session
//! - `placements`: append-only accepted marks

/// Complete canvas schema
pub const CANVAS_SCHEMA: &str = r#"
-- ============================================
-- Participant Ledger
-- ============================================
CREATE TABLE IF NOT EXISTS participants (
    id                  TEXT PRIMARY KEY,
    color_label         TEXT NOT NULL,
    color_value         TEXT NOT NULL UNIQUE,
    free_quota_consumed INTEGER NOT NULL DEFAULT 0 CHECK (free_quota_consumed >= 0),
    revealed            INTEGER NOT NULL DEFAULT 0 CHECK (revealed IN (0, 1)),
    credit_balance      INTEGER NOT NULL DEFAULT 0 CHECK (credit_balance >= 0),
    created_at          TEXT NOT NULL,
    revealed_at         TEXT
);

CREATE INDEX IF NOT EXISTS idx_participants_label
    ON participants(color_label);

-- ============================================
-- Placement Store (append-only)
-- ============================================
CREATE TABLE IF NOT EXISTS placements (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    id               TEXT NOT NULL UNIQUE,
    participant_id   TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
    x                REAL NOT NULL CHECK (x >= 0.0 AND x <= 1.0),
    y                REAL NOT NULL CHECK (y >= 0.0 AND y <= 1.0),
    color_value      TEXT NOT NULL,
    phase            TEXT NOT NULL CHECK (phase IN ('free', 'paid')),
    idempotency_key  TEXT,
    created_at       TEXT NOT NULL,
    UNIQUE (participant_id, idempotency_key)
);

CREATE INDEX IF NOT EXISTS idx_placements_participant
    ON placements(participant_id, seq);
CREATE INDEX IF NOT EXISTS idx_placements_created
    ON placements(created_at, seq);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_valid_sql() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CANVAS_SCHEMA).unwrap();
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CANVAS_SCHEMA).unwrap();
        conn.execute_batch(CANVAS_SCHEMA).unwrap();
    }

    #[test]
    fn test_idempotency_key_unique_per_participant() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CANVAS_SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO participants (id, color_label, color_value, created_at) VALUES ('p1', 'red', '#c20000', 'now')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO placements (id, participant_id, x, y, color_value, phase, idempotency_key, created_at)
                      VALUES (?1, 'p1', 0.5, 0.5, '#c20000', 'free', ?2, 'now')";
        conn.execute(insert, rusqlite::params!["a", "k1"]).unwrap();
        assert!(conn.execute(insert, rusqlite::params!["b", "k1"]).is_err());

        // Keyless placements never collide
        conn.execute(insert, rusqlite::params!["c", Option::<String>::None]).unwrap();
        conn.execute(insert, rusqlite::params!["d", Option::<String>::None]).unwrap();
    }

    #[test]
    fn test_coordinates_are_checked() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CANVAS_SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO participants (id, color_label, color_value, created_at) VALUES ('p1', 'red', '#c20000', 'now')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO placements (id, participant_id, x, y, color_value, phase, created_at)
             VALUES ('a', 'p1', 1.5, 0.5, '#c20000', 'free', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
