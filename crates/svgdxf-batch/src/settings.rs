//! 运行配置（TOML）
//!
//! 查找顺序：显式路径 → 环境变量 `SVGDXF_CONFIG` → `./svgdxf.toml` → 默认值。

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use svgdxf_core::assemble::AssemblyOptions;
use thiserror::Error;

/// 指定配置文件的环境变量
pub const CONFIG_ENV: &str = "SVGDXF_CONFIG";

/// 当前目录下的默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "svgdxf.toml";

/// 配置根结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub conversion: ConversionSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

impl Settings {
    /// 从显式路径加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件；都不存在时返回默认配置
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
            .map_err(|source| SettingsError::Context {
                message: "failed to resolve the current directory".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 转换选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSettings {
    #[serde(default = "default_true")]
    pub layering: bool,
    #[serde(default = "default_true")]
    pub merge_splines: bool,
    /// 严格模式：任一路径解析或几何错误都使整个文件失败
    #[serde(default = "default_true")]
    pub fail_on_path_errors: bool,
}

impl ConversionSettings {
    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            layering: self.layering,
            merge_splines: self.merge_splines,
        }
    }
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            layering: true,
            merge_splines: true,
            fail_on_path_errors: true,
        }
    }
}

/// 批量转换配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// 工作线程数；缺省为 `max(1, 可用并行度 / 4)`
    #[serde(default)]
    pub workers: Option<usize>,
    /// 中间文件目录；缺省为系统临时目录下的 `svgdxf`
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub keep_staging_files: bool,
    #[serde(default)]
    pub quiet: bool,
}

impl BatchSettings {
    pub fn worker_count(&self) -> usize {
        self.workers.filter(|&n| n > 0).unwrap_or_else(default_worker_count)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("svgdxf"))
    }
}

/// 默认工作线程数
pub fn default_worker_count() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (parallelism / 4).max(1)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.logging.level, "info");
        assert!(settings.conversion.layering);
        assert!(settings.conversion.merge_splines);
        assert!(settings.conversion.fail_on_path_errors);
        assert!(!settings.batch.keep_staging_files);
        assert!(settings.batch.worker_count() >= 1);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [conversion]
            layering = false
            fail_on_path_errors = false

            [batch]
            workers = 3
            temp_dir = "/tmp/staging"
            keep_staging_files = true
            "#
        )
        .expect("write config");

        let settings = Settings::discover(Some(file.path())).expect("load config");
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.conversion.layering);
        assert!(settings.conversion.merge_splines);
        assert!(!settings.conversion.fail_on_path_errors);
        assert_eq!(settings.batch.worker_count(), 3);
        assert_eq!(settings.batch.temp_dir(), PathBuf::from("/tmp/staging"));
        assert!(settings.batch.keep_staging_files);
        assert!(!settings.batch.quiet);

        let options = settings.conversion.assembly_options();
        assert!(!options.layering);
    }

    #[test]
    fn zero_workers_falls_back_to_default() {
        let batch = BatchSettings {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(batch.worker_count(), default_worker_count());
    }

    #[test]
    fn invalid_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[batch]\nworkers = \"many\"").expect("write config");
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
