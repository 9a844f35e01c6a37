//! The four benchmark modes and the store configuration each one runs with.

use crate::store::{Configuration, Keywords};
use perf_core::constants::OPTIMIZED_FETCH_SIZE;
use perf_core::mapping::{compile_mapping, MappingMode};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    Normal,
    Optimized,
    Stateless,
    Sql,
}

impl RunMode {
    /// Declaration order; modes always run in this order.
    pub const ALL: [RunMode; 4] = [
        RunMode::Normal,
        RunMode::Optimized,
        RunMode::Stateless,
        RunMode::Sql,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RunMode::Normal => "Normal",
            RunMode::Optimized => "Optimized",
            RunMode::Stateless => "Stateless",
            RunMode::Sql => "Sql",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn build_configuration(mode: RunMode, connection_string: &str) -> Configuration {
    match mode {
        RunMode::Normal => normal(connection_string),
        RunMode::Optimized | RunMode::Stateless | RunMode::Sql => optimized(connection_string),
    }
}

/// Connection plus the conventional mapping, default tuning.
pub fn common(connection_string: &str) -> Configuration {
    Configuration::new(connection_string).add_mapping(compile_mapping(MappingMode::Conventional))
}

fn normal(connection_string: &str) -> Configuration {
    common(connection_string)
}

fn optimized(connection_string: &str) -> Configuration {
    common(connection_string).tune(|s| {
        s.format_sql = false;
        s.generate_statistics = false;
        s.keywords = Keywords::None;
        s.prepare_sql = true;
        s.use_reflection_optimizer = true;
        s.query_startup_checking = false;
        s.show_sql = false;
        s.fetch_size = Some(OPTIMIZED_FETCH_SIZE);
        s.use_proxy_validator = false;
        s.use_second_level_cache = false;
        s.use_sql_comments = false;
        s.use_query_cache = true;
        s.wrap_result_sets = true;
        s.load_event_listeners = false;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Settings;

    #[test]
    fn optimized_modes_share_one_configuration() {
        let optimized = build_configuration(RunMode::Optimized, "db");
        assert_eq!(build_configuration(RunMode::Stateless, "db"), optimized);
        assert_eq!(build_configuration(RunMode::Sql, "db"), optimized);
        assert_ne!(build_configuration(RunMode::Normal, "db"), optimized);
    }

    #[test]
    fn normal_keeps_default_tuning() {
        let cfg = build_configuration(RunMode::Normal, "db");
        assert_eq!(cfg.settings, Settings::default());
        assert_eq!(cfg.mappings.len(), 3);
    }

    #[test]
    fn optimized_turns_off_the_expensive_paths() {
        let s = build_configuration(RunMode::Optimized, "db").settings;
        assert!(!s.show_sql && !s.generate_statistics && !s.load_event_listeners);
        assert!(s.prepare_sql && s.use_reflection_optimizer && s.wrap_result_sets);
        assert_eq!(s.fetch_size, Some(100));
    }

    #[test]
    fn modes_display_by_name() {
        let names: Vec<String> = RunMode::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["Normal", "Optimized", "Stateless", "Sql"]);
    }
}
