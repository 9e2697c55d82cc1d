//! 変換結果のレポート

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::Mode;

/// 書き出したファイル
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub bytes: u64,
}

impl OutputFile {
    /// サイズ（MB）
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 * 1e-6
    }
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "saved as '{}' {:.2}M", self.path.display(), self.megabytes())
    }
}

/// 変換結果の要約（`--json` で出力）
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub mode: Mode,
    pub version: u32,
    pub blocks: usize,
    /// 2 行目のテンソルの要素数
    pub filters: Option<usize>,
    pub tensors: usize,
    pub bits: u32,
    /// 元テンソルと逆量子化後の最大絶対誤差（エンコード時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_abs_error: Option<f32>,
    pub outputs: Vec<OutputFile>,
}
