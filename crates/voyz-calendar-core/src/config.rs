use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::annotate::DEFAULT_MARKER_LIMIT;
use crate::period::{
  DEFAULT_MAX_MONTH_SPAN,
  DEFAULT_MAX_YEAR_SPAN,
  PeriodLimits,
  PeriodValidator
};
use crate::resolver::{
  OrderPolicy,
  PeriodRangeResolver
};

pub const CONFIG_ENV_VAR: &str =
  "VOYZ_CALENDAR_CONFIG";
const CONFIG_DIR_NAME: &str = "voyz";
const CONFIG_FILE_NAME: &str =
  "calendar.toml";

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct Config {
  pub policies:    Policies,
  pub display:     DisplayConfig,
  #[serde(skip)]
  pub loaded_file: Option<PathBuf>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct Policies {
  pub max_year_span:  u32,
  pub max_month_span: u32,
  pub max_week_span:  Option<u32>,
  pub order:          OrderPolicy,
  pub marker_limit:   usize
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct DisplayConfig {
  pub color: bool
}

impl Default for Policies {
  fn default() -> Self {
    Self {
      max_year_span:  DEFAULT_MAX_YEAR_SPAN,
      max_month_span:
        DEFAULT_MAX_MONTH_SPAN,
      max_week_span:  None,
      order:          OrderPolicy::default(),
      marker_limit:   DEFAULT_MARKER_LIMIT
    }
  }
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self { color: true }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(config_override)?
    else {
      info!(
        "no calendar config found; \
         using defaults"
      );
      return Ok(Self::default());
    };

    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg = Self::from_toml_str(
      &raw
    )
    .with_context(|| {
      format!(
        "failed to parse {}",
        path.display()
      )
    })?;

    info!(
      file = %path.display(),
      order = cfg.policies.order.as_key(),
      "loaded calendar config"
    );
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut cfg =
      toml::from_str::<Self>(raw)
        .context(
          "invalid calendar config"
        )?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// Applies `key=value` overrides; a
  /// leading `rc.` is ignored.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");

      match key.as_str() {
        | "policies.max_year_span" => {
          self.policies.max_year_span =
            parse_number(&key, value)?;
        }
        | "policies.max_month_span" => {
          self.policies.max_month_span =
            parse_number(&key, value)?;
        }
        | "policies.max_week_span" => {
          self.policies.max_week_span =
            if is_unset(value) {
              None
            } else {
              Some(parse_number(
                &key, value
              )?)
            };
        }
        | "policies.order" => {
          self.policies.order =
            value.parse()?;
        }
        | "policies.marker_limit" => {
          self.policies.marker_limit =
            parse_number(&key, value)?;
        }
        | "display.color" => {
          self.display.color =
            parse_bool(value);
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: {other}"
          ));
        }
      }
    }

    self.sanitize();
    Ok(())
  }

  pub fn limits(&self) -> PeriodLimits {
    PeriodLimits {
      max_year_span:  self
        .policies
        .max_year_span,
      max_month_span: self
        .policies
        .max_month_span,
      max_week_span:  self
        .policies
        .max_week_span
    }
  }

  pub fn validator(
    &self
  ) -> PeriodValidator {
    PeriodValidator::new(self.limits())
  }

  pub fn resolver(
    &self
  ) -> PeriodRangeResolver {
    PeriodRangeResolver::new(
      self.policies.order
    )
  }

  fn sanitize(&mut self) {
    if self.policies.max_year_span == 0 {
      warn!(
        "policies.max_year_span was 0; \
         using default"
      );
      self.policies.max_year_span =
        DEFAULT_MAX_YEAR_SPAN;
    }
    if self.policies.max_month_span == 0
    {
      warn!(
        "policies.max_month_span was 0; \
         using default"
      );
      self.policies.max_month_span =
        DEFAULT_MAX_MONTH_SPAN;
    }
    if self.policies.max_week_span
      == Some(0)
    {
      warn!(
        "policies.max_week_span was 0; \
         disabling the week cap"
      );
      self.policies.max_week_span = None;
    }
    if self.policies.marker_limit == 0 {
      self.policies.marker_limit =
        DEFAULT_MARKER_LIMIT;
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    if !path.exists() {
      return Err(anyhow!(
        "config file does not exist: {}",
        path.display()
      ));
    }
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      let path = PathBuf::from(trimmed);
      if path.exists() {
        return Ok(Some(path));
      }
      warn!(
        file = %path.display(),
        env = CONFIG_ENV_VAR,
        "config file from environment does not exist"
      );
      return Ok(None);
    }
  }

  let candidate =
    dirs::config_dir().map(|dir| {
      dir
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
    });
  Ok(candidate.filter(|path| {
    path.exists()
  }))
}

fn parse_number<T>(
  key: &str,
  value: &str
) -> anyhow::Result<T>
where
  T: std::str::FromStr,
  T::Err: std::error::Error
    + Send
    + Sync
    + 'static
{
  value.parse::<T>().with_context(|| {
    format!(
      "invalid number for {key}: \
       {value}"
    )
  })
}

fn is_unset(s: &str) -> bool {
  matches!(
    s.to_ascii_lowercase().as_str(),
    "" | "none" | "off" | "unset"
  )
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
