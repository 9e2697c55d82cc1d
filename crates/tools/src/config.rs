//! 変換設定

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use lc0_weights::QuantBits;
use serde::Serialize;

/// protobuf 出力の既定拡張子
pub const PROTO_SUFFIX: &str = ".pb.gz";

/// テキスト出力の既定拡張子
pub const TEXT_SUFFIX: &str = ".txt.gz";

/// 変換方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// テキスト → protobuf
    Encode,
    /// protobuf → テキスト
    Decode,
}

impl Mode {
    /// 入力ファイル名から変換方向を決める
    ///
    /// `.txt` / `.txt.gz` → Encode、`.pb` / `.pb.gz` → Decode。
    pub fn detect(input: &Path) -> Option<Self> {
        let name = input.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".txt") || name.ends_with(".txt.gz") {
            Some(Self::Encode)
        } else if name.ends_with(".pb") || name.ends_with(".pb.gz") {
            Some(Self::Decode)
        } else {
            None
        }
    }
}

/// 変換設定
///
/// コマンドライン引数から組み立てる。
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// 変換方向（入力の拡張子から決定）
    pub mode: Mode,
    /// 入力ファイル
    pub input: PathBuf,
    /// 出力パス（拡張子なしなら既定の拡張子を付ける）
    pub output: PathBuf,
    /// 量子化ビット幅（エンコード・デコードで同じ値を使う）
    pub bits: QuantBits,
    /// エンコード時に逆量子化したテキストも書き出すか
    pub write_text: bool,
}

impl ConvertConfig {
    pub fn new(input: PathBuf, output: PathBuf, bits: QuantBits, write_text: bool) -> Result<Self> {
        let Some(mode) = Mode::detect(&input) else {
            bail!(
                "unsupported input file: {} (expected .txt, .txt.gz, .pb or .pb.gz)",
                input.display()
            );
        };
        let config = Self {
            mode,
            input,
            output,
            bits,
            write_text,
        };
        if let Some(text) = config.text_output() {
            if text == config.primary_output() {
                bail!("text and proto outputs would both be written to {}", text.display());
            }
        }
        Ok(config)
    }

    /// 主出力（Encode: protobuf、Decode: テキスト）
    pub fn primary_output(&self) -> PathBuf {
        match self.mode {
            Mode::Encode => with_default_suffix(&self.output, PROTO_SUFFIX),
            Mode::Decode => with_default_suffix(&self.output, TEXT_SUFFIX),
        }
    }

    /// エンコード時に併せて書くテキスト出力
    pub fn text_output(&self) -> Option<PathBuf> {
        (self.mode == Mode::Encode && self.write_text)
            .then(|| append_suffix(&strip_extensions(&self.output), TEXT_SUFFIX))
    }
}

/// ファイル名の最初の `.` の位置（先頭のドットは除く）
fn extension_start(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    name.char_indices().skip(1).find(|&(_, c)| c == '.').map(|(i, _)| i)
}

/// 拡張子が無ければ `suffix` を付ける
pub fn with_default_suffix(base: &Path, suffix: &str) -> PathBuf {
    match extension_start(base) {
        Some(_) => base.to_path_buf(),
        None => append_suffix(base, suffix),
    }
}

fn append_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

fn strip_extensions(base: &Path) -> PathBuf {
    match (extension_start(base), base.file_name().and_then(|n| n.to_str())) {
        (Some(i), Some(name)) => base.with_file_name(&name[..i]),
        _ => base.to_path_buf(),
    }
}
