use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::datetime::format_date;
use crate::geometry::QUANTUM_MINUTES;
use crate::gesture::SlotHighlight;
use crate::goal::{DailyGoal, GOALS_PER_DAY};
use crate::journal::JournalEntry;
use crate::reminders::reminder_at;
use crate::task::{Priority, Task};
use crate::views::day::DayLayout;
use crate::views::month::MonthLayout;
use crate::views::week::WeekLayout;
use crate::views::{DayColumn, TaskBlock};

const WEEK_CELL_WIDTH: usize = 16;
const MONTH_CELL_WIDTH: usize = 14;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Colours output only when stdout is a terminal.
    pub fn new() -> Self {
        Self {
            color: io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, tasks))]
    pub fn task_table<W: Write>(&self, out: &mut W, tasks: &[Task]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Date".to_string(),
            "Time".to_string(),
            "Dur".to_string(),
            "Pri".to_string(),
            "Title".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.short_id(), "33"),
                    format_date(task.scheduled_date),
                    task.scheduled_time.clone().unwrap_or_else(|| "-".to_string()),
                    format!("{}m", task.duration_minutes),
                    self.paint(task.priority.as_key(), priority_code(task.priority)),
                    self.title(task),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, task))]
    pub fn task_info<W: Write>(&self, out: &mut W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        if let Some(description) = &task.description {
            writeln!(out, "desc      {description}")?;
        }
        writeln!(out, "date      {}", format_date(task.scheduled_date))?;
        writeln!(
            out,
            "time      {}",
            task.scheduled_time.as_deref().unwrap_or("unscheduled")
        )?;
        writeln!(out, "duration  {}min", task.duration_minutes)?;
        writeln!(
            out,
            "priority  {}",
            self.paint(task.priority.as_key(), priority_code(task.priority))
        )?;
        if let Some(color) = &task.color {
            writeln!(out, "color     {color}")?;
        }
        writeln!(out, "done      {}", if task.is_completed { "yes" } else { "no" })?;
        if let Some(minutes) = task.reminder_minutes {
            match reminder_at(task) {
                Some(at) => writeln!(out, "reminder  {minutes}min before ({})", at.format("%Y-%m-%d %H:%M"))?,
                None => writeln!(out, "reminder  {minutes}min before")?,
            }
        }
        writeln!(out, "created   {}", task.created_at.format("%Y%m%dT%H%M%SZ"))?;
        Ok(())
    }

    /// One row per visible hour, plus quarter rows that something occupies.
    #[tracing::instrument(skip(self, out, layout), fields(date = %layout.date()))]
    pub fn day<W: Write>(&self, out: &mut W, layout: &DayLayout) -> anyhow::Result<()> {
        let column = &layout.column;
        writeln!(
            out,
            "{} {}",
            self.paint(&column.date.format("%A").to_string(), "1"),
            format_date(column.date)
        )?;
        self.unscheduled_strip(out, column)?;

        for cell in &column.slots {
            let minute = cell.slot.minute_of_day();
            let starting: Vec<&TaskBlock> = column
                .blocks
                .iter()
                .filter(|block| block.task.start_minute().map(quantize) == Some(minute))
                .collect();
            let covered = column.blocks.iter().any(|block| covers(block, minute));

            if cell.slot.minutes != 0 && starting.is_empty() && !covered && cell.highlight == SlotHighlight::None {
                continue;
            }

            let marker = match cell.highlight {
                SlotHighlight::None => ' ',
                SlotHighlight::MoveSpan | SlotHighlight::ResizeSpan => '*',
            };
            let gutter = if covered { "│" } else { " " };
            let body = starting
                .iter()
                .map(|block| format!("{} ({})", self.title(&block.task), block.label()))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(out, "{}{marker}{gutter} {body}", cell.slot.time_label())?;
        }

        for task in &column.outside_hours {
            writeln!(
                out,
                "outside hours: {} ({})",
                self.title(task),
                task.scheduled_time.as_deref().unwrap_or_default()
            )?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, layout))]
    pub fn week<W: Write>(&self, out: &mut W, layout: &WeekLayout) -> anyhow::Result<()> {
        let mut headers = vec![String::new()];
        headers.extend(layout.days.iter().map(|column| {
            let label = column.date.format("%a %m-%d").to_string();
            if column.date == layout.selected_date {
                self.paint(&label, "1")
            } else {
                label
            }
        }));

        let mut rows = Vec::new();
        let mut unscheduled = vec!["-".to_string()];
        unscheduled.extend(layout.days.iter().map(|column| {
            let titles: Vec<&str> = column.unscheduled.tasks.iter().map(|t| t.title.as_str()).collect();
            truncate_width(&titles.join(", "), WEEK_CELL_WIDTH)
        }));
        rows.push(unscheduled);

        for hour in layout.metrics.hours() {
            let mut row = vec![format!("{hour:02}:00")];
            for column in &layout.days {
                let titles: Vec<String> = column
                    .blocks
                    .iter()
                    .filter(|block| block.task.start_minute().map(|m| m / 60) == Some(hour))
                    .map(|block| {
                        let text = format!(
                            "{} {}",
                            block.task.scheduled_time.as_deref().unwrap_or_default(),
                            block.task.title
                        );
                        self.paint(&truncate_width(&text, WEEK_CELL_WIDTH), priority_code(block.task.priority))
                    })
                    .collect();
                let marker = column
                    .slots
                    .iter()
                    .any(|cell| cell.slot.hour == hour && cell.highlight != SlotHighlight::None);
                let mut cell = titles.join(" ");
                if marker {
                    cell.insert(0, '*');
                }
                row.push(cell);
            }
            rows.push(row);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, layout))]
    pub fn month<W: Write>(&self, out: &mut W, layout: &MonthLayout) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&layout.selected_date.format("%B %Y").to_string(), "1"))?;

        let headers: Vec<String> = layout
            .weeks
            .first()
            .map(|week| week.iter().map(|cell| cell.date.format("%a").to_string()).collect())
            .unwrap_or_default();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for week in &layout.weeks {
            let lines = week.iter().map(|cell| cell.tasks.len() + 1).max().unwrap_or(1) + 1;
            for line in 0..lines {
                let row: Vec<String> = week
                    .iter()
                    .map(|cell| {
                        if line == 0 {
                            let day = cell.date.format("%d").to_string();
                            return match (cell.is_selected, cell.is_today, cell.in_month) {
                                (true, _, _) => self.paint(&format!("[{day}]"), "1"),
                                (false, true, _) => self.paint(&format!("{day}*"), "36"),
                                (false, false, true) => day,
                                (false, false, false) => self.paint(&day, "2"),
                            };
                        }
                        match cell.tasks.get(line - 1) {
                            Some(task) => self.paint(
                                &truncate_width(&task.title, MONTH_CELL_WIDTH),
                                priority_code(task.priority),
                            ),
                            None if line - 1 == cell.tasks.len() => {
                                cell.overflow_label().unwrap_or_default()
                            }
                            None => String::new(),
                        }
                    })
                    .collect();
                rows.push(row);
            }
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, tasks))]
    pub fn reminders<W: Write>(&self, out: &mut W, tasks: &[Task]) -> anyhow::Result<()> {
        for task in tasks {
            writeln!(
                out,
                "{} {} at {} {} (in {}min)",
                self.paint("reminder:", "35"),
                task.title,
                format_date(task.scheduled_date),
                task.scheduled_time.as_deref().unwrap_or_default(),
                task.reminder_minutes.unwrap_or_default()
            )?;
        }
        Ok(())
    }

    /// Every goal slot of the day, filled or not.
    #[tracing::instrument(skip(self, out, goals))]
    pub fn goals<W: Write>(&self, out: &mut W, date: NaiveDate, goals: &[DailyGoal]) -> anyhow::Result<()> {
        let done = goals.iter().filter(|goal| goal.is_completed).count();
        writeln!(
            out,
            "{} {} ({done}/{})",
            self.paint("Goals", "1"),
            format_date(date),
            goals.len()
        )?;
        for slot in 1..=GOALS_PER_DAY {
            match goals.iter().find(|goal| goal.goal_order == slot) {
                Some(goal) if goal.is_completed => {
                    writeln!(out, "[x] {slot}. {}", self.paint(&goal.goal_text, "9"))?
                }
                Some(goal) => writeln!(out, "[ ] {slot}. {}", goal.goal_text)?,
                None => writeln!(out, "    {slot}. -")?,
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, entry))]
    pub fn journal<W: Write>(
        &self,
        out: &mut W,
        date: NaiveDate,
        entry: Option<&JournalEntry>,
    ) -> anyhow::Result<()> {
        let Some(entry) = entry else {
            writeln!(out, "No journal entry for {}.", format_date(date))?;
            return Ok(());
        };

        writeln!(out, "{} {}", self.paint("Journal", "1"), format_date(date))?;
        if let Some(mood) = entry.mood {
            writeln!(out, "mood: {} {mood}", mood.emoji())?;
        }
        if !entry.content.is_empty() {
            writeln!(out)?;
            writeln!(out, "{}", entry.content)?;
        }
        Ok(())
    }

    fn unscheduled_strip<W: Write>(&self, out: &mut W, column: &DayColumn) -> anyhow::Result<()> {
        if column.unscheduled.tasks.is_empty() {
            writeln!(out, "unscheduled: -")?;
            return Ok(());
        }
        let titles: Vec<String> = column.unscheduled.tasks.iter().map(|task| self.title(task)).collect();
        writeln!(out, "unscheduled: {}", titles.join(", "))?;
        Ok(())
    }

    fn title(&self, task: &Task) -> String {
        let code = if task.is_completed { "9" } else { priority_code(task.priority) };
        self.paint(&task.title, code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

fn quantize(minute: u32) -> u32 {
    minute - minute % QUANTUM_MINUTES
}

/// True when `minute` falls inside the block but after its first quarter.
fn covers(block: &TaskBlock, minute: u32) -> bool {
    block.task.start_minute().is_some_and(|start| {
        let first = quantize(start);
        minute > first && minute < start.saturating_add(block.duration_minutes)
    })
}

fn truncate_width(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn write_table<W: Write>(writer: &mut W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write_cell(writer, header, widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            write_cell(writer, row.get(idx).map(String::as_str).unwrap_or_default(), *width)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn write_cell<W: Write>(writer: &mut W, cell: &str, width: usize) -> anyhow::Result<()> {
    let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
    let padding = width.saturating_sub(visible_width);
    write!(writer, "{}{} ", cell, " ".repeat(padding))?;
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
