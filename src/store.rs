use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::models::{
    ApplicationRecord, Intent, Metrics, NewApplication, Outcome, RecordEdit, Status,
};

pub const DEFAULT_FILE: &str = "job_applications.csv";

pub const COLUMNS: [&str; 9] = [
    "Date Applied",
    "Company",
    "Job Title",
    "Description",
    "Status",
    "Status History",
    "Next Steps",
    "Notes",
    "Last Updated",
];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordered application table bound to one CSV file.
///
/// A record's position is its identity. Every mutation runs on a copy of the
/// table; the copy only replaces the in-memory table after it has been
/// written to disk, so a failed save leaves both sides untouched.
pub struct ApplicationStore {
    table: Vec<ApplicationRecord>,
    path: PathBuf,
}

impl ApplicationStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            table: Vec::new(),
            path: path.into(),
        };
        store.table = store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ApplicationRecord] {
        &self.table
    }

    /// Re-reads the table from disk, replacing the in-memory copy.
    pub fn reload(&mut self) -> Result<()> {
        self.table = self.load()?;
        Ok(())
    }

    /// Reads the persisted table. A missing or empty file is an empty table.
    pub fn load(&self) -> Result<Vec<ApplicationRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no table on disk, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let columns = ColumnMap::from_headers(&headers)?;
        if columns.status_history.is_none() {
            warn!(
                path = %self.path.display(),
                "table has no 'Status History' column, defaulting to empty history"
            );
        }

        let mut table = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row.map_err(|e| self.csv_error(e))?;
            table.push(columns.parse_row(&row, i + 1)?);
        }

        debug!(path = %self.path.display(), rows = table.len(), "loaded table");
        Ok(table)
    }

    /// Writes the whole table next to the target and renames it into place.
    pub fn save(&self, table: &[ApplicationRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let tmp_path = self.temp_path();
        if let Err(e) = self.write_table(&tmp_path, table) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.io_error(e));
        }

        debug!(path = %self.path.display(), rows = table.len(), "saved table");
        Ok(())
    }

    fn write_table(&self, tmp_path: &Path, table: &[ApplicationRecord]) -> Result<()> {
        let file = File::create(tmp_path).map_err(|e| self.io_error(e))?;
        let mut writer = csv::Writer::from_writer(&file);

        writer
            .write_record(COLUMNS)
            .map_err(|e| self.csv_error(e))?;
        for record in table {
            let date_applied = record.date_applied.format(DATE_FORMAT).to_string();
            let last_updated = record.last_updated.format(TIMESTAMP_FORMAT).to_string();
            writer
                .write_record([
                    date_applied.as_str(),
                    record.company.as_str(),
                    record.job_title.as_str(),
                    record.description.as_str(),
                    record.status.label(),
                    record.status_history.as_str(),
                    record.next_steps.as_str(),
                    record.notes.as_str(),
                    last_updated.as_str(),
                ])
                .map_err(|e| self.csv_error(e))?;
        }

        writer.flush().map_err(|e| self.io_error(e))?;
        drop(writer);
        file.sync_all().map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE.to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }

    fn commit(&mut self, table: Vec<ApplicationRecord>) -> Result<()> {
        self.save(&table)?;
        self.table = table;
        Ok(())
    }

    // --- Mutations ---

    pub fn add(&mut self, fields: NewApplication) -> Result<usize> {
        let company = required("Company", &fields.company)?;
        let job_title = required("Job Title", &fields.job_title)?;
        let status = fields.status.unwrap_or(Status::Applied);
        let now = now();

        let record = ApplicationRecord {
            date_applied: now.date(),
            company,
            job_title,
            description: fields.description,
            status,
            status_history: status.label().to_string(),
            next_steps: fields.next_steps,
            notes: fields.notes,
            last_updated: now,
        };

        let mut table = self.table.clone();
        table.push(record);
        let index = table.len() - 1;
        self.commit(table)?;

        info!(index, status = %status, "added application");
        Ok(index)
    }

    /// Appends `status` to the record's history. Other fields are left alone.
    pub fn update_status(&mut self, index: usize, status: Status) -> Result<()> {
        self.check_index(index)?;
        let mut table = self.table.clone();
        table[index].push_status(status, now());
        self.commit(table)?;

        info!(index, status = %status, "updated application status");
        Ok(())
    }

    /// Applies a full edit-form submission. The status goes through the same
    /// history append as [`update_status`](Self::update_status).
    pub fn edit(&mut self, index: usize, edit: RecordEdit) -> Result<()> {
        self.check_index(index)?;
        let company = required("Company", &edit.company)?;
        let job_title = required("Job Title", &edit.job_title)?;

        let mut table = self.table.clone();
        let record = &mut table[index];
        record.company = company;
        record.job_title = job_title;
        record.description = edit.description;
        record.next_steps = edit.next_steps;
        record.notes = edit.notes;
        record.push_status(edit.status, now());
        self.commit(table)?;

        info!(index, status = %edit.status, "edited application");
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let mut table = self.table.clone();
        let removed = table.remove(index);
        self.commit(table)?;

        info!(index, company = %removed.company, "deleted application");
        Ok(())
    }

    pub fn apply(&mut self, intent: Intent) -> Result<Outcome> {
        match intent {
            Intent::Create(fields) => self.add(fields).map(Outcome::Added),
            Intent::Update(index, edit) => self.edit(index, edit).map(|_| Outcome::Updated(index)),
            Intent::Delete(index) => self.delete(index).map(|_| Outcome::Deleted(index)),
        }
    }

    // --- Queries ---

    pub fn get(&self, index: usize) -> Option<&ApplicationRecord> {
        self.table.get(index)
    }

    /// Records in table order, restricted to `filter` unless it is empty.
    pub fn list(&self, filter: &[Status]) -> Vec<(usize, &ApplicationRecord)> {
        self.table
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.is_empty() || filter.contains(&r.status))
            .collect()
    }

    /// Distinct statuses in first-seen order.
    pub fn statuses_present(&self) -> Vec<Status> {
        let mut seen = Vec::new();
        for record in &self.table {
            if !seen.contains(&record.status) {
                seen.push(record.status);
            }
        }
        seen
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            total: self.table.len(),
            active: self.table.iter().filter(|r| r.status.is_active()).count(),
            offers: self
                .table
                .iter()
                .filter(|r| r.status == Status::Offer)
                .count(),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.table.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.table.len(),
            });
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

/// Header positions, matched by name so older column orders still load.
struct ColumnMap {
    date_applied: usize,
    company: usize,
    job_title: usize,
    description: usize,
    status: usize,
    status_history: Option<usize>,
    next_steps: usize,
    notes: usize,
    last_updated: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| StoreError::Format {
                row: 0,
                message: format!("missing column '{}'", name),
            })
        };

        Ok(Self {
            date_applied: require("Date Applied")?,
            company: require("Company")?,
            job_title: require("Job Title")?,
            description: require("Description")?,
            status: require("Status")?,
            status_history: find("Status History"),
            next_steps: require("Next Steps")?,
            notes: require("Notes")?,
            last_updated: require("Last Updated")?,
        })
    }

    fn parse_row(&self, row: &csv::StringRecord, row_num: usize) -> Result<ApplicationRecord> {
        let field = |idx: usize| row.get(idx).unwrap_or("").to_string();
        let format_err = |message: String| StoreError::Format {
            row: row_num,
            message,
        };

        let raw_date = field(self.date_applied);
        let date_applied = NaiveDate::parse_from_str(raw_date.trim(), DATE_FORMAT)
            .map_err(|e| format_err(format!("bad Date Applied '{}': {}", raw_date, e)))?;

        let raw_updated = field(self.last_updated);
        let last_updated = NaiveDateTime::parse_from_str(raw_updated.trim(), TIMESTAMP_FORMAT)
            .map_err(|e| format_err(format!("bad Last Updated '{}': {}", raw_updated, e)))?;

        let raw_status = field(self.status);
        let status = raw_status
            .parse::<Status>()
            .map_err(|e| format_err(e.to_string()))?;

        Ok(ApplicationRecord {
            date_applied,
            company: field(self.company),
            job_title: field(self.job_title),
            description: field(self.description),
            status,
            status_history: self.status_history.map(field).unwrap_or_default(),
            next_steps: field(self.next_steps),
            notes: field(self.notes),
            last_updated,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation { field });
    }
    Ok(trimmed.to_string())
}

/// Local time at the precision the file stores.
fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
