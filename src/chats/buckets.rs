use chrono::{DateTime, Days, NaiveDate, TimeZone};

use crate::api::models::Conversation;

/// Conversations grouped by how recently they were created.
/// Derived on every read, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateBuckets {
    pub today: Vec<Conversation>,
    pub yesterday: Vec<Conversation>,
    /// Two to seven days ago; yesterday is not repeated here.
    pub last_seven_days: Vec<Conversation>,
}

impl DateBuckets {
    pub fn len(&self) -> usize {
        self.today.len() + self.yesterday.len() + self.last_seven_days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits `list` into date buckets relative to the calendar day of `now`, in
/// `now`'s time zone. Anything older than seven days is left out of the view.
pub fn bucketize<Tz: TimeZone>(list: &[Conversation], now: &DateTime<Tz>) -> DateBuckets {
    let tz = now.timezone();
    let today = now.date_naive();
    let yesterday = today.pred_opt().unwrap_or(NaiveDate::MIN);
    let seven_days_ago = today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN);

    let mut buckets = DateBuckets::default();
    for conv in list {
        let created = conv.created_at.with_timezone(&tz).date_naive();
        let bucket = if created == today {
            &mut buckets.today
        } else if created == yesterday {
            &mut buckets.yesterday
        } else if seven_days_ago <= created && created < yesterday {
            &mut buckets.last_seven_days
        } else {
            continue;
        };
        bucket.push(conv.clone());
    }

    for bucket in [&mut buckets.today, &mut buckets.yesterday, &mut buckets.last_seven_days] {
        // stable: equal timestamps keep their list order
        bucket.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    buckets
}
