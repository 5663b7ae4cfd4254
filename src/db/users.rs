use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{from_micros, now_micros};
use crate::models::User;

fn map_row_to_user(row: &rusqlite::Row) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        is_active: row.get::<_, i32>(3)? == 1,
        created_at: from_micros(row.get(4)?),
    })
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, hashed_password, is_active, created_at FROM users WHERE email = ?",
        [email],
        map_row_to_user,
    )
    .optional()
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, hashed_password, is_active, created_at FROM users WHERE id = ?",
        [id],
        map_row_to_user,
    )
    .optional()
}

pub fn insert_user(conn: &Connection, email: &str, hashed_password: &str) -> Result<User> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO users (email, hashed_password, is_active, created_at) VALUES (?, ?, 1, ?)",
        params![email, hashed_password, now_micros()],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    find_by_id(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_insert_and_find_user() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn.lock().unwrap();

        let user = insert_user(&conn, "trader@example.com", "hash").unwrap();
        assert!(user.is_active);
        assert_eq!(user.email, "trader@example.com");

        let found = find_by_email(&conn, "trader@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(find_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn.lock().unwrap();

        insert_user(&conn, "dup@example.com", "hash").unwrap();
        assert!(insert_user(&conn, "dup@example.com", "hash").is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
