use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::app_state::CalendarView;
use crate::goal::GOALS_PER_DAY;
use crate::journal::Mood;
use crate::task::Priority;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "planner",
    version,
    about = "Planner: a personal calendar with drag-and-drop scheduling",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config value, e.g. `--set day_view.hour_start=8`.
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl GlobalCli {
    pub fn parse_args(raw_args: Vec<OsString>) -> anyhow::Result<Self> {
        Self::try_parse_from(raw_args).map_err(|err| match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                err.exit()
            }
            _ => anyhow!("{err}"),
        })
    }

    pub fn override_pairs(&self) -> Vec<(String, String)> {
        self.overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task.
    Add(AddArgs),
    /// List tasks scheduled in a date range (today by default).
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Show every field of one task.
    Info { id: String },
    /// Change fields of a task.
    Edit(EditArgs),
    /// Toggle completion.
    Done { id: String },
    Delete { id: String },
    /// Drag a task onto a slot (`YYYY-MM-DDTHH:MM`) or onto the unscheduled
    /// strip of its day (`unscheduled`).
    Drag {
        id: String,
        #[arg(long = "to", value_name = "YYYY-MM-DDTHH:MM|unscheduled")]
        to: String,
    },
    /// Drag a task's bottom edge so it ends in the quarter hour before
    /// `--until`.
    Resize {
        id: String,
        #[arg(long = "until", value_name = "HH:MM")]
        until: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Render the day, week or month around a date.
    View {
        #[arg(value_enum, default_value_t = ViewArg::Day)]
        view: ViewArg,
        #[arg(long)]
        date: Option<String>,
    },
    /// Fire reminders due at the given minute (now by default).
    Remind {
        #[arg(long, value_name = "YYYY-MM-DDTHH:MM")]
        at: Option<String>,
    },
    /// Daily goals checklist.
    Goal {
        #[command(subcommand)]
        action: GoalCommand,
    },
    /// Daily journal entry.
    Journal {
        #[command(subcommand)]
        action: JournalCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum GoalCommand {
    /// Show the goal slots of a day (today by default).
    List {
        #[arg(long)]
        date: Option<String>,
    },
    /// Set the text of goal slot 1-3.
    Set {
        #[arg(value_parser = parse_goal_slot)]
        slot: u8,
        text: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Toggle completion of a goal slot.
    Toggle {
        #[arg(value_parser = parse_goal_slot)]
        slot: u8,
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        #[arg(value_parser = parse_goal_slot)]
        slot: u8,
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum JournalCommand {
    Show {
        #[arg(long)]
        date: Option<String>,
    },
    /// Write the day's entry, replacing any previous text and mood.
    Write {
        text: Option<String>,
        #[arg(long, value_parser = parse_mood)]
        mood: Option<Mood>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long, value_name = "HH:MM")]
    pub time: Option<String>,
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u32>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "remind", value_name = "MINUTES")]
    pub reminder: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long, value_name = "HH:MM", conflicts_with = "clear_time")]
    pub time: Option<String>,
    #[arg(long)]
    pub clear_time: bool,
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u32>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
    #[arg(long, conflicts_with = "no_color")]
    pub color: Option<String>,
    #[arg(long)]
    pub no_color: bool,
    #[arg(long, conflicts_with = "no_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub no_description: bool,
    #[arg(long = "remind", value_name = "MINUTES", conflicts_with = "no_remind")]
    pub reminder: Option<u32>,
    #[arg(long)]
    pub no_remind: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewArg {
    Day,
    Week,
    Month,
}

impl From<ViewArg> for CalendarView {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Day => CalendarView::Day,
            ViewArg::Week => CalendarView::Week,
            ViewArg::Month => CalendarView::Month,
        }
    }
}

fn parse_priority(raw: &str) -> anyhow::Result<Priority> {
    raw.parse()
}

fn parse_mood(raw: &str) -> anyhow::Result<Mood> {
    raw.parse()
}

fn parse_goal_slot(raw: &str) -> anyhow::Result<u8> {
    let slot: u8 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid goal slot: {raw}"))?;
    if !(1..=GOALS_PER_DAY).contains(&slot) {
        return Err(anyhow!("goal slot must be between 1 and {GOALS_PER_DAY}"));
    }
    Ok(slot)
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
