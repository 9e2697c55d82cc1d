//! 変換処理本体
//!
//! 入力を全部読み込み、出力を全部メモリ上で組み立ててから書き出す。
//! 書き出しは一時ファイル経由で、全出力の書き込みが終わってから rename する。
//! 途中で失敗した場合は新しいファイルを一切残さない。

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use lc0_weights::{Net, WeightFile, quant};

use crate::common::io::{Staged, create_staged, open_reader};
use crate::config::{ConvertConfig, Mode};
use crate::report::{ConversionReport, OutputFile};

/// 設定に従って変換する
pub fn run(config: &ConvertConfig) -> Result<ConversionReport> {
    match config.mode {
        Mode::Encode => encode_file(config),
        Mode::Decode => decode_file(config),
    }
}

fn encode_file(config: &ConvertConfig) -> Result<ConversionReport> {
    let reader = open_reader(&config.input)
        .with_context(|| format!("failed to open {}", config.input.display()))?;
    let file = lc0_weights::read_weights(reader)
        .with_context(|| format!("failed to read {}", config.input.display()))?;
    log_header(&file);

    let blocks = file.blocks()?;
    info!("residual blocks: {blocks}");

    let net = lc0_weights::encode_network(file.version, blocks, &file.tensors, config.bits)?;
    let restored = lc0_weights::decode(&net, config.bits)?;
    let max_abs_error = file
        .tensors
        .iter()
        .zip(&restored.tensors)
        .map(|(orig, rest)| quant::max_abs_error(orig, rest))
        .fold(0.0, f32::max);
    info!("quantized to {} (max abs error {max_abs_error:e})", config.bits);

    let mut staged = vec![stage(&config.primary_output(), |w| w.write_all(&net.to_bytes()))?];
    if let Some(text_path) = config.text_output() {
        staged.push(stage(&text_path, |w| lc0_weights::write_weights(w, &restored))?);
    }

    Ok(ConversionReport {
        mode: Mode::Encode,
        version: file.version,
        blocks,
        filters: file.filters(),
        tensors: file.tensors.len(),
        bits: config.bits.bits(),
        max_abs_error: Some(max_abs_error),
        outputs: commit_all(staged)?,
    })
}

fn decode_file(config: &ConvertConfig) -> Result<ConversionReport> {
    let mut bytes = Vec::new();
    open_reader(&config.input)
        .and_then(|mut r| r.read_to_end(&mut bytes))
        .with_context(|| format!("failed to read {}", config.input.display()))?;
    let net = Net::from_bytes(&bytes)
        .with_context(|| format!("failed to decode {}", config.input.display()))?;

    let file = lc0_weights::decode(&net, config.bits)?;
    log_header(&file);
    info!("residual blocks: {}", net.residual.len());

    let staged = vec![stage(&config.primary_output(), |w| lc0_weights::write_weights(w, &file))?];

    Ok(ConversionReport {
        mode: Mode::Decode,
        version: file.version,
        blocks: net.residual.len(),
        filters: file.filters(),
        tensors: file.tensors.len(),
        bits: config.bits.bits(),
        max_abs_error: None,
        outputs: commit_all(staged)?,
    })
}

fn log_header(file: &WeightFile) {
    info!("version: {}", file.version);
    if let Some(filters) = file.filters() {
        info!("filters: {filters}");
    }
}

/// 一時ファイルに書き込んで閉じる（まだ確定しない）
fn stage<F>(path: &Path, write: F) -> Result<Staged>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let mut writer =
        create_staged(path).with_context(|| format!("failed to create {}", path.display()))?;
    write(&mut writer)
        .and_then(|()| writer.close())
        .with_context(|| format!("failed to write {}", path.display()))
}

/// 全出力を確定する
///
/// 途中で失敗した場合は、この実行で確定済みのファイルを削除してからエラーを返す。
fn commit_all(staged: Vec<Staged>) -> Result<Vec<OutputFile>> {
    let mut outputs: Vec<OutputFile> = Vec::with_capacity(staged.len());
    for s in staged {
        let path = s.target().to_path_buf();
        match s.commit() {
            Ok(bytes) => {
                log::debug!("committed {} ({bytes} bytes)", path.display());
                outputs.push(OutputFile { path, bytes });
            }
            Err(e) => {
                for done in &outputs {
                    if let Err(err) = std::fs::remove_file(&done.path) {
                        warn!("failed to remove {}: {err}", done.path.display());
                    }
                }
                return Err(e).with_context(|| format!("failed to save {}", path.display()));
            }
        }
    }
    Ok(outputs)
}
