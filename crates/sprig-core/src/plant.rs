use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub image_url: String,

    pub description: String,

    #[serde(default)]
    pub schedule: Vec<CareTask>,

    #[serde(default)]
    pub log: Vec<CareLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTask {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub frequency_days: u32,

    pub last_completed: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareLogEntry {
    pub id: String,

    pub task_type: String,

    pub date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Plant {
    pub fn new(
        id: String,
        name: String,
        kind: String,
        image_url: String,
        description: String,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            image_url,
            description,
            schedule: vec![],
            log: vec![],
        }
    }

    pub fn ordered_schedule(&self) -> Vec<&CareTask> {
        let mut tasks: Vec<&CareTask> = self.schedule.iter().collect();
        tasks.sort_by_key(|task| task.due_date());
        tasks
    }

    pub fn recent_log(&self) -> Vec<&CareLogEntry> {
        let mut entries: Vec<&CareLogEntry> = self.log.iter().collect();
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.date));
        entries
    }

    pub fn next_due(&self) -> Option<&CareTask> {
        self.ordered_schedule().into_iter().next()
    }

    pub fn due_count(&self, now: DateTime<Utc>) -> usize {
        self.schedule.iter().filter(|task| task.is_due(now)).count()
    }
}

impl CareTask {
    pub fn new(id: String, kind: String, frequency_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            frequency_days,
            last_completed: now,
        }
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.last_completed
            .checked_add_days(Days::new(u64::from(self.frequency_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.due_date()
    }

    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.due_date() - now).num_seconds();
        secs.div_euclid(86_400) + i64::from(secs.rem_euclid(86_400) > 0)
    }
}
