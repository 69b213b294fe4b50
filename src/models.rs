use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Applied,
    Assessment,
    #[serde(rename = "Phone Screen")]
    PhoneScreen,
    Interview,
    Offer,
    Rejected,
    Withdrawn,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Applied,
        Status::Assessment,
        Status::PhoneScreen,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
        Status::Withdrawn,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Assessment => "Assessment",
            Status::PhoneScreen => "Phone Screen",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
            Status::Withdrawn => "Withdrawn",
        }
    }

    /// Still in play: no offer, rejection or withdrawal yet.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Status::Applied | Status::Assessment | Status::PhoneScreen | Status::Interview
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "applied" => Ok(Status::Applied),
            "assessment" => Ok(Status::Assessment),
            "phone screen" => Ok(Status::PhoneScreen),
            "interview" => Ok(Status::Interview),
            "offer" => Ok(Status::Offer),
            "rejected" => Ok(Status::Rejected),
            "withdrawn" => Ok(Status::Withdrawn),
            _ => Err(StoreError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub date_applied: NaiveDate,
    pub company: String,
    pub job_title: String,
    pub description: String,
    pub status: Status,
    pub status_history: String, // " - " joined, oldest first
    pub next_steps: String,
    pub notes: String,
    pub last_updated: NaiveDateTime,
}

impl ApplicationRecord {
    /// Appends one status to the history and makes it current.
    pub fn push_status(&mut self, status: Status, now: NaiveDateTime) {
        self.status_history = if self.status_history.is_empty() {
            status.label().to_string()
        } else {
            format!("{} - {}", self.status_history, status.label())
        };
        self.status = status;
        self.last_updated = now;
    }
}

/// Fields submitted when creating a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewApplication {
    pub company: String,
    pub job_title: String,
    pub description: String,
    pub status: Option<Status>, // defaults to Applied
    pub next_steps: String,
    pub notes: String,
}

/// Full edit-form submission for an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEdit {
    pub company: String,
    pub job_title: String,
    pub description: String,
    pub status: Status,
    pub next_steps: String,
    pub notes: String,
}

impl From<&ApplicationRecord> for RecordEdit {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            company: record.company.clone(),
            job_title: record.job_title.clone(),
            description: record.description.clone(),
            status: record.status,
            next_steps: record.next_steps.clone(),
            notes: record.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create(NewApplication),
    Update(usize, RecordEdit),
    Delete(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Added(usize),
    Updated(usize),
    Deleted(usize),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Added(idx) => write!(f, "Application added successfully! (#{})", idx),
            Outcome::Updated(idx) => write!(f, "Application updated successfully! (#{})", idx),
            Outcome::Deleted(idx) => write!(f, "Application #{} deleted.", idx),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total: usize,
    pub active: usize,
    pub offers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ApplicationRecord {
        ApplicationRecord {
            date_applied: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            company: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            description: String::new(),
            status: Status::Applied,
            status_history: "Applied".to_string(),
            next_steps: String::new(),
            notes: String::new(),
            last_updated: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_status_labels_round_trip() {
        for status in Status::ALL {
            assert_eq!(status.label().parse::<Status>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_accepts_cli_spellings() {
        assert_eq!("phone-screen".parse::<Status>().unwrap(), Status::PhoneScreen);
        assert_eq!("PHONE_SCREEN".parse::<Status>().unwrap(), Status::PhoneScreen);
        assert_eq!(" offer ".parse::<Status>().unwrap(), Status::Offer);
        assert!(matches!(
            "ghosted".parse::<Status>(),
            Err(StoreError::UnknownStatus(s)) if s == "ghosted"
        ));
    }

    #[test]
    fn test_is_active() {
        let active: Vec<Status> = Status::ALL.into_iter().filter(|s| s.is_active()).collect();
        assert_eq!(
            active,
            vec![Status::Applied, Status::Assessment, Status::PhoneScreen, Status::Interview]
        );
    }

    #[test]
    fn test_push_status_appends_without_dedup() {
        let mut rec = record();
        let now = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        rec.push_status(Status::Applied, now);
        assert_eq!(rec.status_history, "Applied - Applied");
        rec.push_status(Status::Interview, now);
        assert_eq!(rec.status_history, "Applied - Applied - Interview");
        assert_eq!(rec.status, Status::Interview);
        assert_eq!(rec.last_updated, now);
    }

    #[test]
    fn test_push_status_on_empty_history() {
        let mut rec = record();
        rec.status_history.clear();
        let now = rec.last_updated;
        rec.push_status(Status::Offer, now);
        assert_eq!(rec.status_history, "Offer");
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            Outcome::Added(0).to_string(),
            "Application added successfully! (#0)"
        );
        assert_eq!(
            Outcome::Updated(2).to_string(),
            "Application updated successfully! (#2)"
        );
    }
}
