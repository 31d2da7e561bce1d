//! Synchronous SQL helpers
//!
//! Every helper takes a plain `&Connection` so it composes inside a
//! `Transaction` (which derefs to `Connection`). Conditional updates report
//! success through the affected-row count; callers never read-then-write a
//! counter.

use canvas_core::{CanvasError, ColorLabel, IdempotencyKey, ParticipantId, Phase};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::{ParticipantEntity, PlacementEntity, PARTICIPANT_COLUMNS, PLACEMENT_COLUMNS};
use crate::error::StoreResult;

/// Load a participant row
pub(crate) fn find_participant(
    conn: &Connection,
    id: &ParticipantId,
) -> StoreResult<Option<ParticipantEntity>> {
    let statement = format!("SELECT {} FROM participants WHERE id = ?1", PARTICIPANT_COLUMNS);
    let entity = conn
        .query_row(&statement, params![id.as_str()], ParticipantEntity::from_row)
        .optional()?;
    Ok(entity)
}

/// Load a participant row, failing with not-found
pub(crate) fn load_participant(conn: &Connection, id: &ParticipantId) -> StoreResult<ParticipantEntity> {
    find_participant(conn, id)?
        .ok_or_else(|| CanvasError::participant_not_found(id.as_str()).into())
}

/// Insert a new participant row
pub(crate) fn insert_participant(conn: &Connection, entity: &ParticipantEntity) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO participants (id, color_label, color_value, free_quota_consumed, revealed, credit_balance, created_at, revealed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entity.id,
            entity.color_label,
            entity.color_value,
            entity.free_quota_consumed,
            entity.revealed,
            entity.credit_balance,
            entity.created_at,
            entity.revealed_at,
        ],
    )?;
    Ok(())
}

/// Color values already allocated for a label
pub(crate) fn used_colors(conn: &Connection, label: ColorLabel) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT color_value FROM participants WHERE color_label = ?1")?;
    let rows = stmt.query_map(params![label.as_str()], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Allocated color count per label
pub(crate) fn count_by_label(conn: &Connection) -> StoreResult<Vec<(String, u64)>> {
    let mut stmt =
        conn.prepare("SELECT color_label, COUNT(*) FROM participants GROUP BY color_label")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    let counts = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(counts
        .into_iter()
        .map(|(label, n)| (label, n.max(0) as u64))
        .collect())
}

/// Debit one unit of free quota.
///
/// Sets the reveal flag in the same statement when the debit reaches the
/// limit. Returns `None` when no row matched (already revealed or quota
/// used up), otherwise whether this debit revealed the participant.
pub(crate) fn debit_free(
    conn: &Connection,
    id: &ParticipantId,
    limit: u32,
    now: DateTime<Utc>,
) -> StoreResult<Option<bool>> {
    let revealed = conn
        .query_row(
            "UPDATE participants
             SET free_quota_consumed = free_quota_consumed + 1,
                 revealed = CASE WHEN free_quota_consumed + 1 >= ?2 THEN 1 ELSE 0 END,
                 revealed_at = CASE WHEN free_quota_consumed + 1 >= ?2 THEN ?3 ELSE revealed_at END
             WHERE id = ?1 AND revealed = 0 AND free_quota_consumed < ?2
             RETURNING revealed",
            params![id.as_str(), limit, now],
            |row| row.get::<_, bool>(0),
        )
        .optional()?;
    Ok(revealed)
}

/// Debit one credit from a revealed participant. Returns whether a row matched.
pub(crate) fn debit_credit(conn: &Connection, id: &ParticipantId) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE participants
         SET credit_balance = credit_balance - 1
         WHERE id = ?1 AND revealed = 1 AND credit_balance > 0",
        params![id.as_str()],
    )?;
    Ok(changed == 1)
}

/// Explicit reveal transition. Returns whether this call flipped the flag.
pub(crate) fn mark_revealed(
    conn: &Connection,
    id: &ParticipantId,
    limit: u32,
    now: DateTime<Utc>,
) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE participants
         SET revealed = 1, revealed_at = ?3
         WHERE id = ?1 AND revealed = 0 AND free_quota_consumed >= ?2",
        params![id.as_str(), limit, now],
    )?;
    Ok(changed == 1)
}

/// Outcome of a bounded credit increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CreditGrant {
    Granted(i64),
    Overflow { balance: i64 },
    UnknownParticipant,
}

/// Atomic credit increment, refused when the new balance would not fit a `u32`.
pub(crate) fn grant_credits(conn: &Connection, id: &ParticipantId, amount: u32) -> StoreResult<CreditGrant> {
    let balance = conn
        .query_row(
            "UPDATE participants
             SET credit_balance = credit_balance + ?2
             WHERE id = ?1 AND credit_balance + ?2 <= ?3
             RETURNING credit_balance",
            params![id.as_str(), amount, u32::MAX],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    if let Some(balance) = balance {
        return Ok(CreditGrant::Granted(balance));
    }
    Ok(match find_participant(conn, id)? {
        Some(entity) => CreditGrant::Overflow {
            balance: entity.credit_balance,
        },
        None => CreditGrant::UnknownParticipant,
    })
}

/// Find an accepted placement by its idempotency key
pub(crate) fn find_placement_by_key(
    conn: &Connection,
    participant_id: &ParticipantId,
    key: &IdempotencyKey,
) -> StoreResult<Option<PlacementEntity>> {
    let statement = format!(
        "SELECT {} FROM placements WHERE participant_id = ?1 AND idempotency_key = ?2",
        PLACEMENT_COLUMNS
    );
    let entity = conn
        .query_row(
            &statement,
            params![participant_id.as_str(), key.as_str()],
            PlacementEntity::from_row,
        )
        .optional()?;
    Ok(entity)
}

/// Conditional insert keyed on `(participant_id, idempotency_key)`.
///
/// Returns the assigned sequence number, or `None` when the key already
/// exists for this participant.
pub(crate) fn insert_placement(conn: &Connection, entity: &PlacementEntity) -> StoreResult<Option<i64>> {
    let seq = conn
        .query_row(
            "INSERT INTO placements (id, participant_id, x, y, color_value, phase, idempotency_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (participant_id, idempotency_key) DO NOTHING
             RETURNING seq",
            params![
                entity.id,
                entity.participant_id,
                entity.x,
                entity.y,
                entity.color_value,
                entity.phase,
                entity.idempotency_key,
                entity.created_at,
            ],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(seq)
}

/// Placements of one participant, oldest first
pub(crate) fn list_for_participant(
    conn: &Connection,
    participant_id: &ParticipantId,
) -> StoreResult<Vec<PlacementEntity>> {
    let statement = format!(
        "SELECT {} FROM placements WHERE participant_id = ?1 ORDER BY seq",
        PLACEMENT_COLUMNS
    );
    let mut stmt = conn.prepare(&statement)?;
    let rows = stmt.query_map(params![participant_id.as_str()], PlacementEntity::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Every placement, oldest first
pub(crate) fn list_all(conn: &Connection) -> StoreResult<Vec<PlacementEntity>> {
    let statement = format!(
        "SELECT {} FROM placements ORDER BY created_at, seq",
        PLACEMENT_COLUMNS
    );
    let mut stmt = conn.prepare(&statement)?;
    let rows = stmt.query_map([], PlacementEntity::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Participant count, optionally only revealed ones
pub(crate) fn count_participants(conn: &Connection, revealed_only: bool) -> StoreResult<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM participants WHERE ?1 = 0 OR revealed = 1",
        params![revealed_only],
        |row| row.get(0),
    )?;
    Ok(n.max(0) as u64)
}

/// Placement count, optionally filtered by phase
pub(crate) fn count_placements(conn: &Connection, phase: Option<Phase>) -> StoreResult<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM placements WHERE ?1 IS NULL OR phase = ?1",
        params![phase.map(|p| p.as_str())],
        |row| row.get(0),
    )?;
    Ok(n.max(0) as u64)
}
