use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::parse_week_start;
use crate::geometry::GridMetrics;
use crate::gesture::DEFAULT_ACTIVATION_DISTANCE_PX;
use crate::task::DEFAULT_DURATION_MINUTES;

const CONFIG_ENV_VAR: &str =
  "PLANNER_CONFIG";
const CONFIG_FILE_NAME: &str =
  "planner.toml";

const DAY_VIEW_SLOT_HEIGHT_PX: f64 =
  15.0;
const WEEK_VIEW_SLOT_HEIGHT_PX: f64 =
  12.0;
const DEFAULT_HOUR_START: u32 = 6;
const DEFAULT_HOUR_END: u32 = 22;

fn default_data_location() -> String {
  "~/.planner".to_string()
}

fn default_week_start() -> String {
  "sunday".to_string()
}

fn default_max_visible_tasks() -> usize
{
  3
}

fn default_activation_distance() -> f64
{
  DEFAULT_ACTIVATION_DISTANCE_PX
}

fn default_duration_minutes() -> u32 {
  DEFAULT_DURATION_MINUTES
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct Config {
  #[serde(
    default = "default_data_location"
  )]
  pub data_location: String,
  #[serde(default)]
  pub calendar:      CalendarSection,
  #[serde(default)]
  pub day_view:      GridSection,
  #[serde(default)]
  pub week_view:     GridSection,
  #[serde(default)]
  pub month_view:    MonthSection,
  #[serde(default)]
  pub gesture:       GestureSection,
  #[serde(default)]
  pub tasks:         TaskSection,
  #[serde(skip)]
  pub loaded_files:  Vec<PathBuf>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarSection {
  #[serde(
    default = "default_week_start"
  )]
  pub week_start: String
}

/// Unset fields fall back to the
/// defaults of the view the section
/// belongs to.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct GridSection {
  pub hour_start:     Option<u32>,
  pub hour_end:       Option<u32>,
  pub slot_height_px: Option<f64>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct MonthSection {
  #[serde(
    default = "default_max_visible_tasks"
  )]
  pub max_visible_tasks: usize
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct GestureSection {
  #[serde(
    default = "default_activation_distance"
  )]
  pub activation_distance_px: f64
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct TaskSection {
  #[serde(
    default = "default_duration_minutes"
  )]
  pub default_duration_minutes: u32
}

impl Default for CalendarSection {
  fn default() -> Self {
    Self {
      week_start: default_week_start()
    }
  }
}

impl Default for MonthSection {
  fn default() -> Self {
    Self {
      max_visible_tasks:
        default_max_visible_tasks()
    }
  }
}

impl Default for GestureSection {
  fn default() -> Self {
    Self {
      activation_distance_px:
        default_activation_distance()
    }
  }
}

impl Default for TaskSection {
  fn default() -> Self {
    Self {
      default_duration_minutes:
        default_duration_minutes()
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_location:
        default_data_location(),
      calendar:
        CalendarSection::default(),
      day_view: GridSection::default(),
      week_view: GridSection::default(),
      month_view:
        MonthSection::default(),
      gesture:
        GestureSection::default(),
      tasks: TaskSection::default(),
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override,
    overrides
  ))]
  pub fn load<I>(
    config_override: Option<&Path>,
    overrides: I
  ) -> anyhow::Result<Self>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    let path = resolve_config_path(
      config_override
    )?;

    let (table, loaded_files) =
      match path {
        | Some(path) => {
          info!(config = %path.display(), "loading config");
          let text =
            fs::read_to_string(&path)
              .with_context(|| {
                format!(
                  "failed to read {}",
                  path.display()
                )
              })?;
          let table = parse_table(&text)
            .with_context(|| {
              format!(
                "failed to parse {}",
                path.display()
              )
            })?;
          (table, vec![path])
        }
        | None => {
          warn!(
            "no config file found; \
             using defaults"
          );
          (toml::Table::new(), vec![])
        }
      };

    let mut cfg =
      Self::from_table(table, overrides)?;
    cfg.loaded_files = loaded_files;
    Ok(cfg)
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    Self::from_table(
      parse_table(text)?,
      std::iter::empty()
    )
  }

  fn from_table<I>(
    mut table: toml::Table,
    overrides: I
  ) -> anyhow::Result<Self>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      apply_override(
        &mut table, &key, &value
      )?;
    }

    let mut cfg: Config =
      toml::Value::Table(table)
        .try_into()
        .context(
          "invalid configuration"
        )?;
    cfg.sanitize();
    Ok(cfg)
  }

  fn sanitize(&mut self) {
    if self
      .calendar
      .week_start
      .trim()
      .is_empty()
    {
      self.calendar.week_start =
        default_week_start();
    }

    sanitize_grid(
      &mut self.day_view,
      DAY_VIEW_SLOT_HEIGHT_PX
    );
    sanitize_grid(
      &mut self.week_view,
      WEEK_VIEW_SLOT_HEIGHT_PX
    );

    if self.month_view.max_visible_tasks
      == 0
    {
      self.month_view.max_visible_tasks =
        default_max_visible_tasks();
    }

    let distance =
      self.gesture.activation_distance_px;
    if !distance.is_finite()
      || distance < 0.0
    {
      self
        .gesture
        .activation_distance_px =
        default_activation_distance();
    }

    if self.tasks.default_duration_minutes
      == 0
    {
      self
        .tasks
        .default_duration_minutes =
        default_duration_minutes();
    }
  }

  pub fn week_start(&self) -> Weekday {
    parse_week_start(
      &self.calendar.week_start
    )
  }

  pub fn day_metrics(
    &self
  ) -> GridMetrics {
    grid_metrics(
      &self.day_view,
      DAY_VIEW_SLOT_HEIGHT_PX
    )
  }

  pub fn week_metrics(
    &self
  ) -> GridMetrics {
    grid_metrics(
      &self.week_view,
      WEEK_VIEW_SLOT_HEIGHT_PX
    )
  }
}

fn sanitize_grid(
  section: &mut GridSection,
  default_height: f64
) {
  let start = section
    .hour_start
    .unwrap_or(DEFAULT_HOUR_START)
    .min(23);
  let end = section
    .hour_end
    .unwrap_or(DEFAULT_HOUR_END)
    .min(23)
    .max(start);
  let height = section
    .slot_height_px
    .filter(|h| h.is_finite() && *h > 0.0)
    .unwrap_or(default_height);

  section.hour_start = Some(start);
  section.hour_end = Some(end);
  section.slot_height_px = Some(height);
}

fn grid_metrics(
  section: &GridSection,
  default_height: f64
) -> GridMetrics {
  GridMetrics::new(
    section
      .hour_start
      .unwrap_or(DEFAULT_HOUR_START),
    section
      .hour_end
      .unwrap_or(DEFAULT_HOUR_END),
    section
      .slot_height_px
      .unwrap_or(default_height)
  )
}

fn parse_table(
  text: &str
) -> anyhow::Result<toml::Table> {
  toml::from_str::<toml::Table>(text)
    .map_err(|err| anyhow!("{err}"))
}

/// Sets `key` (a dotted path such as
/// `day_view.hour_start`) in the raw
/// config tree. The value is read as a
/// TOML literal, falling back to a
/// plain string.
fn apply_override(
  table: &mut toml::Table,
  key: &str,
  raw: &str
) -> anyhow::Result<()> {
  let key = key.trim();
  let mut parts = key
    .split('.')
    .map(str::trim)
    .collect::<Vec<_>>();
  if parts.iter().any(|p| p.is_empty())
  {
    return Err(anyhow!(
      "invalid config key: {key}"
    ));
  }

  let Some(leaf) = parts.pop() else {
    return Err(anyhow!(
      "invalid config key: {key}"
    ));
  };

  let mut current = table;
  for part in parts {
    let entry = current
      .entry(part.to_string())
      .or_insert_with(|| {
        toml::Value::Table(
          toml::Table::new()
        )
      });
    current = match entry {
      | toml::Value::Table(inner) => {
        inner
      }
      | _ => {
        return Err(anyhow!(
          "config key {key} crosses a \
           non-table value at {part}"
        ));
      }
    };
  }

  current.insert(
    leaf.to_string(),
    parse_override_value(raw)
  );
  Ok(())
}

fn parse_override_value(
  raw: &str
) -> toml::Value {
  let snippet =
    format!("value = {}", raw.trim());
  toml::from_str::<toml::Table>(
    &snippet
  )
  .ok()
  .and_then(|mut t| t.remove("value"))
  .unwrap_or_else(|| {
    toml::Value::String(
      raw.trim().to_string()
    )
  })
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if !cfg
    .data_location
    .trim()
    .is_empty()
  {
    expand_tilde(Path::new(
      cfg.data_location.trim()
    ))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(expand_tilde(path)));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(&env_path)
    )));
  }

  if let Some(config_dir) =
    dirs::config_dir()
  {
    let candidate = config_dir
      .join("planner")
      .join(CONFIG_FILE_NAME);
    if candidate.exists() {
      return Ok(Some(candidate));
    }
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".planner"))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
