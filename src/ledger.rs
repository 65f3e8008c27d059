use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::model::attendance::AttendanceRecord;
use crate::model::role::Role;
use crate::models::UserSql;
use crate::qr;

/// Outcome of the shared check-in/check-out trigger.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    CheckedIn,
    CheckedOut,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    Created,
    Updated,
}

/// Day-level presence as the dashboards report it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
pub enum Presence {
    Present,
    Absent,
}

/// One ledger row joined with its user, as handed to reports.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LedgerRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub role_id: u8,
    #[schema(example = "2026-08-06", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-08-06 09:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-08-06 18:00:00", value_type = Option<String>)]
    pub check_out: Option<NaiveDateTime>,
    pub is_present: bool,
}

/// Owner edit of a single record: direct field overwrite.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordEdit {
    #[schema(example = "2026-08-06", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "2026-08-06 09:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-08-06 18:00:00", value_type = Option<String>)]
    pub check_out: Option<NaiveDateTime>,
    pub is_present: bool,
}

/// Resolve a scanned QR payload down to the staff member it names.
pub async fn resolve_token(pool: &SqlitePool, qr_value: &str) -> Result<UserSql, ServiceError> {
    let user_id = qr::parse_token(qr_value)?;
    resolve_subject(pool, user_id).await
}

/// A toggle subject must exist and hold the staff role; nothing is
/// mutated otherwise.
pub async fn resolve_subject(pool: &SqlitePool, user_id: i64) -> Result<UserSql, ServiceError> {
    let user = sqlx::query_as::<_, UserSql>(
        "SELECT id, username, password, role_id FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(user) if user.role_id == Role::Staff.id() => Ok(user),
        _ => Err(ServiceError::UnauthorizedSubject),
    }
}

/// The single transition trigger shared by QR scans and the owner's
/// manual toggle.
///
/// Closes the most recently opened record if one is open, otherwise
/// opens a new one dated from `at`. Repeated calls alternate strictly;
/// there is no "already checked in today" guard on this path. The
/// day-granularity guard belongs to [`mark_day`] alone and the two are
/// kept separate on purpose.
pub async fn toggle(
    pool: &SqlitePool,
    user_id: i64,
    at: NaiveDateTime,
) -> Result<ToggleOutcome, ServiceError> {
    // Tolerates several open rows: pick the newest, never error.
    let open = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM attendance \
         WHERE user_id = ? AND check_in IS NOT NULL AND check_out IS NULL \
         ORDER BY check_in DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match open {
        Some(record_id) => {
            sqlx::query("UPDATE attendance SET check_out = ? WHERE id = ?")
                .bind(at)
                .bind(record_id)
                .execute(pool)
                .await?;
            Ok(ToggleOutcome::CheckedOut)
        }
        None => {
            sqlx::query(
                "INSERT INTO attendance (user_id, date, check_in, is_present) VALUES (?, ?, ?, 1)",
            )
            .bind(user_id)
            .bind(at.date())
            .bind(at)
            .execute(pool)
            .await?;
            Ok(ToggleOutcome::CheckedIn)
        }
    }
}

/// Owner back-office upsert at day granularity.
///
/// Updates the first existing record for (user, day) in place, inserts
/// otherwise, and can store an explicit Absent day with no timestamps
/// at all. On the toggle path absence is the mere lack of a record;
/// both contracts are load-bearing and must not be unified.
pub async fn mark_day(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    present: bool,
) -> Result<MarkOutcome, ServiceError> {
    let check_in = check_in.map(|t| date.and_time(t));
    let check_out = check_out.map(|t| date.and_time(t));
    validate_range(check_in, check_out)?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM attendance WHERE user_id = ? AND date = ? ORDER BY id LIMIT 1",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some(record_id) => {
            sqlx::query(
                "UPDATE attendance SET check_in = ?, check_out = ?, is_present = ? WHERE id = ?",
            )
            .bind(check_in)
            .bind(check_out)
            .bind(present)
            .bind(record_id)
            .execute(pool)
            .await?;
            Ok(MarkOutcome::Updated)
        }
        None => {
            sqlx::query(
                "INSERT INTO attendance (user_id, date, check_in, check_out, is_present) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(date)
            .bind(check_in)
            .bind(check_out)
            .bind(present)
            .execute(pool)
            .await?;
            Ok(MarkOutcome::Created)
        }
    }
}

/// Direct field overwrite, no state-machine validation beyond the time
/// range invariant.
pub async fn edit_record(
    pool: &SqlitePool,
    record_id: i64,
    edit: RecordEdit,
) -> Result<(), ServiceError> {
    validate_range(edit.check_in, edit.check_out)?;

    let current_date =
        sqlx::query_scalar::<_, NaiveDate>("SELECT date FROM attendance WHERE id = ?")
            .bind(record_id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::RecordNotFound)?;

    let date = edit.date.unwrap_or(current_date);

    sqlx::query("UPDATE attendance SET date = ?, check_in = ?, check_out = ?, is_present = ? WHERE id = ?")
        .bind(date)
        .bind(edit.check_in)
        .bind(edit.check_out)
        .bind(edit.is_present)
        .bind(record_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_record(pool: &SqlitePool, record_id: i64) -> Result<(), ServiceError> {
    let done = sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(record_id)
        .execute(pool)
        .await?;

    if done.rows_affected() == 0 {
        return Err(ServiceError::RecordNotFound);
    }
    Ok(())
}

/// Joined range query behind the owner dashboard and the CSV export.
/// Bounds are inclusive; an absent bound leaves that side open.
pub async fn query(
    pool: &SqlitePool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<LedgerRow>, ServiceError> {
    let mut sql = String::from(
        "SELECT a.id, a.user_id, u.username, u.role_id, a.date, a.check_in, a.check_out, a.is_present \
         FROM attendance a JOIN users u ON u.id = a.user_id WHERE 1=1",
    );
    if from.is_some() {
        sql.push_str(" AND a.date >= ?");
    }
    if to.is_some() {
        sql.push_str(" AND a.date <= ?");
    }
    sql.push_str(" ORDER BY a.check_in DESC, a.id DESC");

    let mut rows = sqlx::query_as::<_, LedgerRow>(&sql);
    if let Some(from) = from {
        rows = rows.bind(from);
    }
    if let Some(to) = to {
        rows = rows.bind(to);
    }

    Ok(rows.fetch_all(pool).await?)
}

/// One user's own rows, newest first.
pub async fn user_log(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<AttendanceRecord>, ServiceError> {
    let rows = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, user_id, date, check_in, check_out, is_present FROM attendance \
         WHERE user_id = ? ORDER BY check_in DESC, id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Present iff the day has a record that is not an explicit Absent
/// mark. `today` comes from the configured reference timezone.
pub async fn today_status(
    pool: &SqlitePool,
    user_id: i64,
    today: NaiveDate,
) -> Result<Presence, ServiceError> {
    let present = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attendance WHERE user_id = ? AND date = ? AND is_present = 1)",
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(pool)
    .await?;

    Ok(if present {
        Presence::Present
    } else {
        Presence::Absent
    })
}

const EXPORT_HEADER: [&str; 4] = ["username", "role", "check_in", "check_out"];

/// Same filter and order as [`query`], with standard CSV quoting.
/// Null timestamps become empty fields.
pub async fn export_csv(
    pool: &SqlitePool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<u8>, ServiceError> {
    let rows = query(pool, from, to).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER).map_err(csv_failure)?;

    for row in &rows {
        let role = Role::from_id(row.role_id)
            .map(|r| r.to_string())
            .unwrap_or_default();
        let check_in = format_time(row.check_in);
        let check_out = format_time(row.check_out);
        writer
            .write_record([
                row.username.as_str(),
                role.as_str(),
                check_in.as_str(),
                check_out.as_str(),
            ])
            .map_err(csv_failure)?;
    }

    writer.into_inner().map_err(|e| {
        tracing::error!(error = %e, "CSV export flush failed");
        ServiceError::Internal
    })
}

fn format_time(value: Option<NaiveDateTime>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn csv_failure(e: csv::Error) -> ServiceError {
    tracing::error!(error = %e, "CSV export failed");
    ServiceError::Internal
}

fn validate_range(
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
) -> Result<(), ServiceError> {
    if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
        if check_out < check_in {
            return Err(ServiceError::InvalidTimeRange);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{day, seed_user, setup_test_db, ts};

    async fn open_count(pool: &SqlitePool, user_id: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM attendance \
             WHERE user_id = ? AND check_in IS NOT NULL AND check_out IS NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn day_count(pool: &SqlitePool, user_id: i64, date: NaiveDate) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE user_id = ? AND date = ?")
            .bind(user_id)
            .bind(date)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn toggle_reuses_the_open_record_then_opens_a_new_one() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice", Role::Staff).await;

        let t1 = ts("2026-03-02 09:00:00");
        let t2 = ts("2026-03-02 17:30:00");
        let t3 = ts("2026-03-03 08:45:00");

        assert_eq!(
            toggle(&pool, alice, t1).await.unwrap(),
            ToggleOutcome::CheckedIn
        );
        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].check_in, Some(t1));
        assert_eq!(rows[0].check_out, None);

        assert_eq!(
            toggle(&pool, alice, t2).await.unwrap(),
            ToggleOutcome::CheckedOut
        );
        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows.len(), 1, "check-out must not create a second record");
        assert_eq!(rows[0].check_in, Some(t1));
        assert_eq!(rows[0].check_out, Some(t2));

        assert_eq!(
            toggle(&pool, alice, t3).await.unwrap(),
            ToggleOutcome::CheckedIn
        );
        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        // newest check-in first
        assert_eq!(rows[0].check_in, Some(t3));
        assert_eq!(rows[0].check_out, None);
        assert_eq!(rows[1].check_in, Some(t1));
        assert_eq!(rows[1].check_out, Some(t2));
    }

    #[actix_web::test]
    async fn toggle_alternates_strictly_and_keeps_at_most_one_open() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "bob", Role::Staff).await;

        for n in 1..=6 {
            let at = ts(&format!("2026-03-02 09:{:02}:00", n));
            let outcome = toggle(&pool, user, at).await.unwrap();
            let expected = if n % 2 == 1 {
                ToggleOutcome::CheckedIn
            } else {
                ToggleOutcome::CheckedOut
            };
            assert_eq!(outcome, expected, "call {n}");
            assert!(
                open_count(&pool, user).await <= 1,
                "more than one open record after {n} toggles"
            );
        }
    }

    #[actix_web::test]
    async fn toggle_closes_the_newest_when_several_are_open() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "carol", Role::Staff).await;

        // Corrupted state with two open rows must not error.
        for d in ["2026-03-01", "2026-03-02"] {
            sqlx::query(
                "INSERT INTO attendance (user_id, date, check_in, is_present) VALUES (?, ?, ?, 1)",
            )
            .bind(user)
            .bind(day(d))
            .bind(ts(&format!("{d} 09:00:00")))
            .execute(&pool)
            .await
            .unwrap();
        }

        let at = ts("2026-03-02 18:00:00");
        assert_eq!(
            toggle(&pool, user, at).await.unwrap(),
            ToggleOutcome::CheckedOut
        );

        let rows = query(&pool, None, None).await.unwrap();
        let newest = rows
            .iter()
            .find(|r| r.check_in == Some(ts("2026-03-02 09:00:00")))
            .unwrap();
        assert_eq!(newest.check_out, Some(at));
        let oldest = rows
            .iter()
            .find(|r| r.check_in == Some(ts("2026-03-01 09:00:00")))
            .unwrap();
        assert_eq!(oldest.check_out, None);
    }

    #[actix_web::test]
    async fn toggle_ignores_absent_marks_when_looking_for_open_records() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "dave", Role::Staff).await;

        // An explicit Absent day has no check-in and must never be
        // "closed" by a later toggle.
        mark_day(&pool, user, day("2026-03-01"), None, None, false)
            .await
            .unwrap();

        let at = ts("2026-03-02 09:00:00");
        assert_eq!(
            toggle(&pool, user, at).await.unwrap(),
            ToggleOutcome::CheckedIn
        );
    }

    #[actix_web::test]
    async fn mark_day_is_an_upsert_per_user_and_day() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "erin", Role::Staff).await;
        let d = day("2026-03-02");

        let first = mark_day(
            &pool,
            user,
            d,
            Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(first, MarkOutcome::Created);

        let second = mark_day(
            &pool,
            user,
            d,
            Some(NaiveTime::from_hms_opt(9, 30, 0).unwrap()),
            Some(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
            true,
        )
        .await
        .unwrap();
        assert_eq!(second, MarkOutcome::Updated);

        assert_eq!(day_count(&pool, user, d).await, 1);

        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows[0].check_in, Some(ts("2026-03-02 09:30:00")));
        assert_eq!(rows[0].check_out, Some(ts("2026-03-02 18:00:00")));
    }

    #[actix_web::test]
    async fn mark_day_stores_an_explicit_absent_day() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "fred", Role::Staff).await;
        let d = day("2026-03-02");

        mark_day(&pool, user, d, None, None, false).await.unwrap();

        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_present);
        assert_eq!(rows[0].check_in, None);
        assert_eq!(rows[0].check_out, None);

        assert_eq!(today_status(&pool, user, d).await.unwrap(), Presence::Absent);
    }

    #[actix_web::test]
    async fn mark_day_rejects_a_backwards_range() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "gina", Role::Staff).await;

        let err = mark_day(
            &pool,
            user,
            day("2026-03-02"),
            Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            true,
        )
        .await
        .unwrap_err();
        assert_eq!(err, ServiceError::InvalidTimeRange);
        assert_eq!(day_count(&pool, user, day("2026-03-02")).await, 0);
    }

    #[actix_web::test]
    async fn edit_rejects_a_backwards_range_without_mutating() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "hank", Role::Staff).await;

        toggle(&pool, user, ts("2026-03-02 09:00:00")).await.unwrap();
        toggle(&pool, user, ts("2026-03-02 17:00:00")).await.unwrap();
        let record_id = query(&pool, None, None).await.unwrap()[0].id;

        let err = edit_record(
            &pool,
            record_id,
            RecordEdit {
                date: None,
                check_in: Some(ts("2026-03-02 10:00:00")),
                check_out: Some(ts("2026-03-02 09:00:00")),
                is_present: true,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, ServiceError::InvalidTimeRange);

        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows[0].check_in, Some(ts("2026-03-02 09:00:00")));
        assert_eq!(rows[0].check_out, Some(ts("2026-03-02 17:00:00")));
    }

    #[actix_web::test]
    async fn edit_overwrites_fields_directly() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "iris", Role::Staff).await;

        toggle(&pool, user, ts("2026-03-02 09:00:00")).await.unwrap();
        let record_id = query(&pool, None, None).await.unwrap()[0].id;

        edit_record(
            &pool,
            record_id,
            RecordEdit {
                date: Some(day("2026-03-03")),
                check_in: Some(ts("2026-03-03 08:00:00")),
                check_out: Some(ts("2026-03-03 16:00:00")),
                is_present: true,
            },
        )
        .await
        .unwrap();

        let rows = query(&pool, None, None).await.unwrap();
        assert_eq!(rows[0].date, day("2026-03-03"));
        assert_eq!(rows[0].check_in, Some(ts("2026-03-03 08:00:00")));
        assert_eq!(rows[0].check_out, Some(ts("2026-03-03 16:00:00")));

        let err = edit_record(
            &pool,
            9999,
            RecordEdit {
                date: None,
                check_in: None,
                check_out: None,
                is_present: false,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, ServiceError::RecordNotFound);
    }

    #[actix_web::test]
    async fn delete_record_removes_exactly_one_row() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "jane", Role::Staff).await;

        toggle(&pool, user, ts("2026-03-02 09:00:00")).await.unwrap();
        let record_id = query(&pool, None, None).await.unwrap()[0].id;

        delete_record(&pool, record_id).await.unwrap();
        assert!(query(&pool, None, None).await.unwrap().is_empty());

        let err = delete_record(&pool, record_id).await.unwrap_err();
        assert_eq!(err, ServiceError::RecordNotFound);
    }

    #[actix_web::test]
    async fn query_applies_inclusive_bounds() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "kate", Role::Staff).await;

        for d in ["2026-03-01", "2026-03-02", "2026-03-03"] {
            toggle(&pool, user, ts(&format!("{d} 09:00:00"))).await.unwrap();
            toggle(&pool, user, ts(&format!("{d} 17:00:00"))).await.unwrap();
        }

        assert_eq!(query(&pool, None, None).await.unwrap().len(), 3);
        assert_eq!(
            query(&pool, Some(day("2026-03-02")), None).await.unwrap().len(),
            2
        );
        assert_eq!(
            query(&pool, None, Some(day("2026-03-02"))).await.unwrap().len(),
            2
        );

        let exact = query(&pool, Some(day("2026-03-02")), Some(day("2026-03-02")))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].date, day("2026-03-02"));
    }

    #[actix_web::test]
    async fn today_status_follows_check_ins() {
        let pool = setup_test_db().await;
        let user = seed_user(&pool, "liam", Role::Staff).await;

        assert_eq!(
            today_status(&pool, user, day("2026-03-02")).await.unwrap(),
            Presence::Absent
        );

        toggle(&pool, user, ts("2026-03-02 09:00:00")).await.unwrap();

        assert_eq!(
            today_status(&pool, user, day("2026-03-02")).await.unwrap(),
            Presence::Present
        );
        assert_eq!(
            today_status(&pool, user, day("2026-03-03")).await.unwrap(),
            Presence::Absent
        );
    }

    #[actix_web::test]
    async fn export_round_trips_against_query() {
        let pool = setup_test_db().await;
        // A comma in the username exercises CSV quoting.
        let spicy = seed_user(&pool, "o,malley", Role::Staff).await;
        let plain = seed_user(&pool, "pete", Role::Staff).await;

        toggle(&pool, spicy, ts("2026-03-02 09:00:00")).await.unwrap();
        toggle(&pool, spicy, ts("2026-03-02 17:00:00")).await.unwrap();
        toggle(&pool, plain, ts("2026-03-03 08:00:00")).await.unwrap();

        let rows = query(&pool, None, None).await.unwrap();
        let bytes = export_csv(&pool, None, None).await.unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(vec!["username", "role", "check_in", "check_out"])
        );

        let parsed: Vec<csv::StringRecord> =
            reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(parsed.len(), rows.len());

        for (record, row) in parsed.iter().zip(rows.iter()) {
            assert_eq!(&record[0], row.username.as_str());
            assert_eq!(record[2].to_string(), format_time(row.check_in));
            assert_eq!(record[3].to_string(), format_time(row.check_out));
        }
    }
}
