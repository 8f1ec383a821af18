use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::plant::{CareTask, Plant};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, plants, now))]
    pub fn print_plant_table(
        &mut self,
        plants: &[&Plant],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Type".to_string(),
            "Tasks".to_string(),
            "Due".to_string(),
            "Next".to_string(),
        ];

        let mut rows = Vec::with_capacity(plants.len());

        for plant in plants {
            let id = self.paint(short_id(&plant.id), "33");
            let tasks = plant.schedule.len().to_string();

            let due_count = plant.due_count(now);
            let due = if due_count > 0 {
                self.paint(&due_count.to_string(), "31")
            } else {
                due_count.to_string()
            };

            let next = match plant.next_due() {
                Some(task) if task.is_due(now) => self.paint(&due_status(task, now), "31"),
                Some(task) => due_status(task, now),
                None => "-".to_string(),
            };

            rows.push(vec![
                id,
                plant.name.clone(),
                plant.kind.clone(),
                tasks,
                due,
                next,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, plant, now))]
    pub fn print_schedule_table(
        &mut self,
        plant: &Plant,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Task".to_string(),
            "Every".to_string(),
            "Last done".to_string(),
            "Due".to_string(),
            "Status".to_string(),
        ];

        let mut rows = Vec::new();

        for task in plant.ordered_schedule() {
            let id = self.paint(short_id(&task.id), "33");
            let every = format!("{}d", task.frequency_days);
            let last = task
                .last_completed
                .with_timezone(&Local)
                .format("%Y-%m-%d")
                .to_string();

            let due = task
                .due_date()
                .with_timezone(&Local)
                .format("%Y-%m-%d")
                .to_string();
            let due = if task.is_due(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let status = if task.is_due(now) {
                self.paint(&due_status(task, now), "31")
            } else {
                due_status(task, now)
            };

            rows.push(vec![id, task.kind.clone(), every, last, due, status]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, plant))]
    pub fn print_log_table(&mut self, plant: &Plant) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Date".to_string(),
            "Task".to_string(),
            "Notes".to_string(),
            "Photo".to_string(),
        ];

        let mut rows = Vec::new();

        for entry in plant.recent_log() {
            let date = entry
                .date
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string();
            rows.push(vec![
                date,
                entry.task_type.clone(),
                entry.notes.clone().unwrap_or_default(),
                entry.photo_url.clone().unwrap_or_default(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, plant, now))]
    pub fn print_plant_info(&mut self, plant: &Plant, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", plant.id)?;
        writeln!(out, "name        {}", self.paint(&plant.name, "33"))?;
        writeln!(out, "type        {}", plant.kind)?;
        writeln!(out, "image       {}", plant.image_url)?;

        if !plant.description.is_empty() {
            writeln!(out, "description {}", plant.description)?;
        }

        writeln!(out, "tasks       {}", plant.schedule.len())?;

        let due_count = plant.due_count(now);
        let due = if due_count > 0 {
            self.paint(&due_count.to_string(), "31")
        } else {
            due_count.to_string()
        };
        writeln!(out, "due         {due}")?;
        writeln!(out, "log entries {}", plant.log.len())?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn due_status(task: &CareTask, now: DateTime<Utc>) -> String {
    if task.is_due(now) {
        "Due now".to_string()
    } else {
        format!("Due in {} days", task.days_until_due(now))
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
