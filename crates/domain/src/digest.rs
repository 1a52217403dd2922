use crate::{reminder::Reminder, shared::entity::ID};
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

/// All the `Reminder`s of one `User` that should go out as a single digest
#[derive(Debug, Clone, PartialEq)]
pub struct DigestBatch {
    pub user_id: ID,
    /// Ordered by effective fire time
    pub reminder_ids: Vec<ID>,
}

/// Groups the active `Reminder`s by `User` and keeps the users that
/// have more than one of them.
pub fn group_for_digest(reminders: &[Reminder]) -> Vec<DigestBatch> {
    let mut by_user: HashMap<&ID, Vec<&Reminder>> = HashMap::new();
    for reminder in reminders.iter().filter(|r| r.status.is_active()) {
        by_user.entry(&reminder.user_id).or_default().push(reminder);
    }

    let mut batches = by_user
        .into_iter()
        .filter(|(_, reminders)| reminders.len() > 1)
        .map(|(user_id, mut reminders)| {
            reminders.sort_by_key(|r| r.effective_fire_time());
            DigestBatch {
                user_id: user_id.clone(),
                reminder_ids: reminders.into_iter().map(|r| r.id.clone()).collect(),
            }
        })
        .collect::<Vec<_>>();
    batches.sort_by_key(|batch| batch.user_id.as_string());
    batches
}

fn local_timestamp(date: NaiveDate, hour: u32, tz: &Tz) -> Option<i64> {
    tz.from_local_datetime(&date.and_hms_opt(hour, 0, 0)?)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// The `[start, end)` millis of the calendar day following `now` in the given timezone
pub fn next_day_window(now_millis: i64, tz: &Tz) -> Option<(i64, i64)> {
    let now = Utc.timestamp_millis_opt(now_millis).single()?.with_timezone(tz);
    let tomorrow = now.date_naive().succ_opt()?;
    let day_after = tomorrow.succ_opt()?;
    Some((
        local_timestamp(tomorrow, 0, tz)?,
        local_timestamp(day_after, 0, tz)?,
    ))
}

/// Millis from `now` until the wall clock in the given timezone next shows `hour`:00
pub fn millis_until_next_run(now_millis: i64, hour: u32, tz: &Tz) -> Option<i64> {
    let now = Utc.timestamp_millis_opt(now_millis).single()?.with_timezone(tz);
    let today = now.date_naive();
    let tomorrow = today.succ_opt()?;
    [today, tomorrow]
        .iter()
        .filter_map(|date| local_timestamp(*date, hour, tz))
        .find(|run_at| *run_at > now_millis)
        .map(|run_at| run_at - now_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{ReminderStatus, ReminderType};

    const HOUR: i64 = 1000 * 60 * 60;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn reminder(user_id: &ID, at: i64) -> Reminder {
        Reminder::new(
            user_id.clone(),
            ID::default(),
            at,
            ReminderType::Email,
            None,
            0,
        )
    }

    #[test]
    fn groups_users_with_several_reminders() {
        let busy_user = ID::default();
        let quiet_user = ID::default();
        let late = reminder(&busy_user, 500);
        let early = reminder(&busy_user, 100);
        let mut cancelled = reminder(&quiet_user, 200);
        cancelled.status = ReminderStatus::Cancelled;
        let reminders = vec![
            late.clone(),
            reminder(&quiet_user, 300),
            early.clone(),
            cancelled,
        ];

        let batches = group_for_digest(&reminders);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].user_id, busy_user);
        assert_eq!(batches[0].reminder_ids, vec![early.id, late.id]);
    }

    #[test]
    fn no_batches_without_reminders() {
        assert!(group_for_digest(&[]).is_empty());
    }

    #[test]
    fn next_day_window_in_utc() {
        let now = ts(2021, 2, 21, 10, 0);
        let (start, end) = next_day_window(now, &chrono_tz::UTC).unwrap();
        assert_eq!(start, ts(2021, 2, 22, 0, 0));
        assert_eq!(end, ts(2021, 2, 23, 0, 0));
    }

    #[test]
    fn next_day_window_follows_local_calendar() {
        // 00:30 on the 22nd in Oslo
        let now = ts(2021, 2, 21, 23, 30);
        let (start, end) = next_day_window(now, &chrono_tz::Europe::Oslo).unwrap();
        assert_eq!(start, ts(2021, 2, 22, 23, 0));
        assert_eq!(end - start, 24 * HOUR);
    }

    #[test]
    fn waits_until_the_next_wall_clock_hour() {
        let tz = chrono_tz::UTC;
        assert_eq!(
            millis_until_next_run(ts(2021, 2, 21, 7, 0), 8, &tz),
            Some(HOUR)
        );
        assert_eq!(
            millis_until_next_run(ts(2021, 2, 21, 8, 30), 8, &tz),
            Some(23 * HOUR + HOUR / 2)
        );
        assert_eq!(
            millis_until_next_run(ts(2021, 2, 21, 8, 0), 8, &tz),
            Some(24 * HOUR)
        );
    }
}
