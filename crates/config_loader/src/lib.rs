//! # Config Loader
//!
//! 配置加载与解析模块。
//!
//! 负责：
//! - 解析 TOML/JSON 配置文件
//! - 校验配置合法性
//! - 生成 `PipelineBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("pipeline.toml")).unwrap();
//! println!("Driver: {}", blueprint.driver.stream);
//! ```

mod parser;
mod validator;

pub use contracts::PipelineBlueprint;
pub use parser::ConfigFormat;

use contracts::CaptureError;
use std::path::Path;

/// 配置加载器
///
/// 提供从文件或字符串加载配置的静态方法。
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从文件路径加载配置
    ///
    /// 根据文件扩展名自动检测格式 (.toml / .json)。
    ///
    /// # Errors
    /// - 文件读取失败
    /// - 格式不支持
    /// - 解析失败
    /// - 校验失败
    pub fn load_from_path(path: &Path) -> Result<PipelineBlueprint, CaptureError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// 从字符串加载配置
    ///
    /// # Errors
    /// - 解析失败
    /// - 校验失败
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineBlueprint, CaptureError> {
        Self::parse_and_validate(content, format)
    }

    /// 将 PipelineBlueprint 序列化为 TOML 字符串
    pub fn to_toml(blueprint: &PipelineBlueprint) -> Result<String, CaptureError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| CaptureError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// 将 PipelineBlueprint 序列化为 JSON 字符串
    pub fn to_json(blueprint: &PipelineBlueprint) -> Result<String, CaptureError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| CaptureError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// 根据文件扩展名推断配置格式
    fn detect_format(path: &Path) -> Result<ConfigFormat, CaptureError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            CaptureError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| CaptureError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// 读取配置文件内容
    fn read_file(path: &Path) -> Result<String, CaptureError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// 解析并校验配置内容
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineBlueprint, CaptureError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[pipeline]
name = "demo"

[driver]
stream = "odom"
rate_hz = 20.0

[driver.policy]
kind = "next"

[[followers]]
stream = "imu"
rate_hz = 100.0

[followers.policy]
kind = "closest_before"
period_ms = 10.0
delay_ms = 2.0

[[followers]]
stream = "camera"

[followers.policy]
kind = "ranged"
delay_ms = 0.0

[[sinks]]
name = "log_sink"
sink_type = "log"

[capture]
poll_interval_ms = 5
max_captures = 0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let blueprint = result.unwrap();
        assert_eq!(blueprint.driver.stream, "odom");
        assert_eq!(blueprint.followers.len(), 2);
        assert_eq!(blueprint.sinks.len(), 1);
    }

    #[test]
    fn test_round_trip_toml() {
        let blueprint = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&blueprint).unwrap();
        let blueprint2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.driver.stream, blueprint2.driver.stream);
        assert_eq!(blueprint.followers.len(), blueprint2.followers.len());
        assert_eq!(blueprint.followers[0].policy, blueprint2.followers[0].policy);
    }

    #[test]
    fn test_round_trip_json() {
        let blueprint = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let blueprint2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(blueprint.driver.stream, blueprint2.driver.stream);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // Duplicate stream id should fail validation
        let content = r#"
[driver]
stream = "odom"

[driver.policy]
kind = "next"

[[followers]]
stream = "odom"

[followers.policy]
kind = "latched"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }
}
