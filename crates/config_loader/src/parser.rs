//! 配置解析：按格式反序列化为 `PipelineBlueprint`。

use contracts::{CaptureError, PipelineBlueprint};

/// 支持的配置格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 根据文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析配置内容
pub(crate) fn parse(
    content: &str,
    format: ConfigFormat,
) -> Result<PipelineBlueprint, CaptureError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| CaptureError::config_parse(format!("TOML parse error: {e}"))),
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| CaptureError::config_parse(format!("JSON parse error: {e}"))),
    }
}
