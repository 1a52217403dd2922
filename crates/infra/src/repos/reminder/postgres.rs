use super::{IReminderRepo, InsertReminderError};
use nudge_domain::{Reminder, ReminderStatus, ReminderType, ID};
use sqlx::{
    postgres::PgArguments, query::QueryAs, types::Uuid, FromRow, PgPool, Postgres,
};
use tracing::error;

pub struct PostgresReminderRepo {
    pool: PgPool,
}

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, query: QueryAs<'_, Postgres, ReminderRaw, PgArguments>) -> Vec<Reminder> {
        match query.fetch_all(&self.pool).await {
            Ok(reminders) => reminders
                .into_iter()
                .filter_map(|r| r.try_into().ok())
                .collect(),
            Err(e) => {
                error!("Unable to query reminders. Err: {:?}", e);
                vec![]
            }
        }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    reminder_uid: Uuid,
    user_uid: Uuid,
    event_uid: Uuid,
    reminder_date: i64,
    reminder_type: String,
    status: String,
    notified_at: Option<i64>,
    snoozed_until: Option<i64>,
    custom_message: Option<String>,
    failure_reason: Option<String>,
    retry_count: i64,
    last_retry_at: Option<i64>,
    acknowledged_at: Option<i64>,
    created: i64,
    updated: i64,
}

impl TryFrom<ReminderRaw> for Reminder {
    type Error = anyhow::Error;

    fn try_from(r: ReminderRaw) -> Result<Self, Self::Error> {
        let reminder_type = r.reminder_type.parse::<ReminderType>()?;
        let status = r.status.parse::<ReminderStatus>().map_err(|e| {
            error!("Reminder {} has an unknown status. Err: {:?}", r.reminder_uid, e);
            e
        })?;
        Ok(Reminder {
            id: r.reminder_uid.into(),
            user_id: r.user_uid.into(),
            event_id: r.event_uid.into(),
            reminder_date: r.reminder_date,
            reminder_type,
            status,
            notified_at: r.notified_at,
            snoozed_until: r.snoozed_until,
            custom_message: r.custom_message,
            failure_reason: r.failure_reason,
            retry_count: r.retry_count,
            last_retry_at: r.last_retry_at,
            acknowledged_at: r.acknowledged_at,
            created: r.created,
            updated: r.updated,
        })
    }
}

const ONE_ACTIVE_PER_USER_EVENT: &str = "reminders_one_active_per_user_event";

fn is_active_reminder_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => {
            violates_one_active_per_user_event(db_err.code().as_deref(), db_err.constraint())
        }
        _ => false,
    }
}

/// Only unique violations of the partial index count, other key collisions are storage errors
fn violates_one_active_per_user_event(code: Option<&str>, constraint: Option<&str>) -> bool {
    code == Some("23505") && constraint == Some(ONE_ACTIVE_PER_USER_EVENT)
}

fn status_strings(statuses: &[ReminderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> Result<(), InsertReminderError> {
        let res = sqlx::query(
            r#"
            INSERT INTO reminders
            (reminder_uid, user_uid, event_uid, reminder_date, reminder_type, status,
             notified_at, snoozed_until, custom_message, failure_reason, retry_count,
             last_retry_at, acknowledged_at, created, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.user_id.inner_ref())
        .bind(reminder.event_id.inner_ref())
        .bind(reminder.reminder_date)
        .bind(reminder.reminder_type.as_str())
        .bind(reminder.status.as_str())
        .bind(reminder.notified_at)
        .bind(reminder.snoozed_until)
        .bind(&reminder.custom_message)
        .bind(&reminder.failure_reason)
        .bind(reminder.retry_count)
        .bind(reminder.last_retry_at)
        .bind(reminder.acknowledged_at)
        .bind(reminder.created)
        .bind(reminder.updated)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_active_reminder_conflict(&e) => Err(InsertReminderError::ActiveReminderExists),
            Err(e) => Err(InsertReminderError::Storage(e.into())),
        }
    }

    async fn save_if_status(
        &self,
        reminder: &Reminder,
        expected: &[ReminderStatus],
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE reminders SET
                reminder_date = $2,
                reminder_type = $3,
                status = $4,
                notified_at = $5,
                snoozed_until = $6,
                custom_message = $7,
                failure_reason = $8,
                retry_count = $9,
                last_retry_at = $10,
                acknowledged_at = $11,
                updated = $12
            WHERE reminder_uid = $1 AND status = ANY($13)
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.reminder_date)
        .bind(reminder.reminder_type.as_str())
        .bind(reminder.status.as_str())
        .bind(reminder.notified_at)
        .bind(reminder.snoozed_until)
        .bind(&reminder.custom_message)
        .bind(&reminder.failure_reason)
        .bind(reminder.retry_count)
        .bind(reminder.last_retry_at)
        .bind(reminder.acknowledged_at)
        .bind(reminder.updated)
        .bind(status_strings(expected))
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        let res = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.reminder_uid = $1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await;

        match res {
            Ok(reminder) => reminder.and_then(|r| r.try_into().ok()),
            Err(e) => {
                error!("Unable to find reminder {}. Err: {:?}", reminder_id, e);
                None
            }
        }
    }

    async fn find_active_by_user_and_event(
        &self,
        user_id: &ID,
        event_id: &ID,
    ) -> Option<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.user_uid = $1 AND r.event_uid = $2
                AND r.status IN ('pending', 'snoozed')
                LIMIT 1
                "#,
            )
            .bind(user_id.inner_ref())
            .bind(event_id.inner_ref()),
        )
        .await
        .into_iter()
        .next()
    }

    async fn find_by_user_and_event(&self, user_id: &ID, event_id: &ID) -> Vec<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.user_uid = $1 AND r.event_uid = $2
                ORDER BY r.created DESC
                "#,
            )
            .bind(user_id.inner_ref())
            .bind(event_id.inner_ref()),
        )
        .await
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.user_uid = $1
                ORDER BY r.fire_at
                "#,
            )
            .bind(user_id.inner_ref()),
        )
        .await
    }

    async fn find_overdue(&self, now: i64) -> Vec<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.status IN ('pending', 'snoozed') AND r.fire_at <= $1
                ORDER BY r.fire_at
                "#,
            )
            .bind(now),
        )
        .await
    }

    async fn find_pending_future(&self, now: i64) -> Vec<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.status IN ('pending', 'snoozed') AND r.fire_at > $1
                ORDER BY r.fire_at
                "#,
            )
            .bind(now),
        )
        .await
    }

    async fn find_in_window(&self, start: i64, end: i64) -> Vec<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.status IN ('pending', 'snoozed')
                AND r.fire_at >= $1 AND r.fire_at < $2
                ORDER BY r.fire_at
                "#,
            )
            .bind(start)
            .bind(end),
        )
        .await
    }

    async fn find_by_status(&self, status: ReminderStatus) -> Vec<Reminder> {
        self.fetch_many(
            sqlx::query_as::<_, ReminderRaw>(
                r#"
                SELECT * FROM reminders AS r
                WHERE r.status = $1
                ORDER BY r.updated
                "#,
            )
            .bind(status.as_str()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_active_reminder_index_is_a_conflict() {
        assert!(violates_one_active_per_user_event(
            Some("23505"),
            Some("reminders_one_active_per_user_event")
        ));
        assert!(!violates_one_active_per_user_event(
            Some("23505"),
            Some("reminders_pkey")
        ));
        assert!(!violates_one_active_per_user_event(Some("23505"), None));
        assert!(!violates_one_active_per_user_event(
            Some("23503"),
            Some("reminders_one_active_per_user_event")
        ));
    }
}
