//! 重みファイル変換のエラー型
//!
//! 変換は「全部成功するか何も出力しないか」なので、ここで定義するエラーは
//! すべて変換全体を中断させる。

use crate::layout::Slot;

/// 重み変換のエラー
#[derive(thiserror::Error, Debug)]
pub enum WeightsError {
    /// ファイル I/O エラー
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// テキスト形式の解析エラー（行番号は 1 始まり）
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// テンソル行数がネットワーク構造と整合しない
    #[error("Inconsistent number of weights in the file: {tensors} tensor lines")]
    InconsistentWeightCount { tensors: usize },

    /// スロットを埋めるのに必要なテンソルが足りない
    #[error("not enough tensors for {slot}: need {needed}, {remaining} remaining")]
    MissingTensors {
        slot: Slot,
        needed: usize,
        remaining: usize,
    },

    /// 入力ブロックを埋め終えた時点でテンソルが残っている
    #[error("{remaining} tensors left over after the input block")]
    TrailingTensors { remaining: usize },

    /// コンテナに必須フィールドが無い
    #[error("missing field in container: {field}")]
    MissingField { field: String },

    /// params のバイト長がコード幅で割り切れない
    #[error("invalid params in {field}: {len} bytes is not a multiple of {bits}-bit codes")]
    InvalidParams { field: String, len: usize, bits: u32 },

    /// 要素数 0 のレイヤー（テキスト形式では空行になり読み戻せない）
    #[error("empty layer in {field}")]
    EmptyLayer { field: String },

    /// protobuf デコードエラー
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
}

/// 重み変換の Result 型
pub type WeightsResult<T> = Result<T, WeightsError>;
