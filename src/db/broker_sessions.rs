use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{from_micros, now_micros};
use crate::models::BrokerSession;

/// Store (or replace) the user's brokerage access token
pub fn save_session(
    conn: &Connection,
    user_id: i64,
    access_token: &str,
    broker_user_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO broker_sessions (user_id, access_token, broker_user_id, created_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
            access_token = excluded.access_token,
            broker_user_id = excluded.broker_user_id,
            created_at = excluded.created_at",
        params![user_id, access_token, broker_user_id, now_micros()],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, user_id: i64) -> Result<Option<BrokerSession>> {
    conn.query_row(
        "SELECT user_id, access_token, broker_user_id, created_at FROM broker_sessions WHERE user_id = ?",
        [user_id],
        |row| {
            Ok(BrokerSession {
                user_id: row.get(0)?,
                access_token: row.get(1)?,
                broker_user_id: row.get(2)?,
                created_at: from_micros(row.get(3)?),
            })
        },
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{users, Database};

    #[test]
    fn test_save_replaces_existing_session() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn.lock().unwrap();
        let user = users::insert_user(&conn, "kite@example.com", "hash").unwrap();

        assert!(get_session(&conn, user.id).unwrap().is_none());

        save_session(&conn, user.id, "token-1", Some("AB1234")).unwrap();
        save_session(&conn, user.id, "token-2", None).unwrap();

        let session = get_session(&conn, user.id).unwrap().unwrap();
        assert_eq!(session.access_token, "token-2");
        assert!(session.broker_user_id.is_none());
    }
}
