/*
 * vPEC certified mail agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

use serde_with::{serde_as, DisplayFromStr};
use std::{collections::HashMap, str::FromStr};

use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::ConfigError;

#[serde_as]
#[derive(Debug, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Logs {
    #[serde(default)]
    pub facility: LogsFacility,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "Logs::default_log_level")]
    pub default_level: tracing_subscriber::filter::LevelFilter,
    /// Customize the log level of the different parts of the program.
    #[serde(
        default,
        serialize_with = "Logs::serialize_levels",
        deserialize_with = "Logs::deserialize_levels"
    )]
    pub levels: HashMap<String, tracing_subscriber::filter::LevelFilter>,
}

#[derive(Default, Debug, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
pub enum LogsFacility {
    /// Daily-rotated files in the given directory.
    File(std::path::PathBuf),
    #[default]
    Console,
}

impl Logs {
    const fn default_log_level() -> tracing_subscriber::filter::LevelFilter {
        tracing_subscriber::filter::LevelFilter::WARN
    }

    fn serialize_levels<S: serde::Serializer>(
        value: &HashMap<String, tracing_subscriber::filter::LevelFilter>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(value.len()))?;
        for entry in value {
            serde::ser::SerializeMap::serialize_entry(&mut map, &entry.0, &entry.1.to_string())?;
        }
        serde::ser::SerializeMap::end(map)
    }

    fn deserialize_levels<'de, D>(
        deserializer: D,
    ) -> Result<HashMap<String, tracing_subscriber::filter::LevelFilter>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <HashMap<String, String> as serde::Deserialize>::deserialize(deserializer)?;
        value
            .into_iter()
            .map(|(target, level)| {
                tracing_subscriber::filter::LevelFilter::from_str(&level)
                    .map(|level| (target, level))
                    .map_err(|e| {
                        serde::de::Error::custom(format!("failed to parse log level: `{e}`"))
                    })
            })
            .collect()
    }

    fn targets(&self) -> Targets {
        Targets::new()
            .with_default(self.default_level)
            .with_targets(self.levels.clone())
    }

    /// Install the global tracing subscriber described by this section.
    ///
    /// With a file facility, the returned guard must be held for the
    /// lifetime of the process: dropping it stops the background writer.
    ///
    /// # Errors
    ///
    /// * A global subscriber is already installed.
    pub fn install(
        &self,
    ) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, ConfigError> {
        match &self.facility {
            LogsFacility::Console => {
                tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer())
                    .with(self.targets())
                    .try_init()
                    .map_err(|e| ConfigError::Logs(e.to_string()))?;
                Ok(None)
            }
            LogsFacility::File(directory) => {
                let appender = tracing_appender::rolling::daily(directory, "vpec.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .with(self.targets())
                    .try_init()
                    .map_err(|e| ConfigError::Logs(e.to_string()))?;
                Ok(Some(guard))
            }
        }
    }
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            facility: LogsFacility::default(),
            default_level: Self::default_log_level(),
            levels: HashMap::default(),
        }
    }
}
