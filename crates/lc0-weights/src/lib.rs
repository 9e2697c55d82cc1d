//! Leela 系残差ネットワークの重みコーデック
//!
//! テキスト形式の重み（1 行 1 テンソル）と、量子化済み protobuf コンテナを
//! 相互変換する。
//!
//! # 構成
//!
//! ```text
//! text ──read_weights──▶ WeightFile ──encode──▶ Net (proto) ──to_bytes──▶ .pb
//!                                  ◀──decode──
//! ```
//!
//! - [`quant`]: min–max 線形量子化（8bit / 16bit）
//! - [`layout`]: ファイル順のスロット列と残差ブロック数の算出
//! - [`adapter`]: スロット単位の fill / extract
//! - [`walker`]: ネットワーク全体の走査
//! - [`text`]: テキスト形式の入出力

pub mod adapter;
pub mod error;
pub mod layout;
pub mod proto;
pub mod quant;
pub mod text;
pub mod walker;

pub use error::{WeightsError, WeightsResult};
pub use layout::NetworkLayout;
pub use proto::Net;
pub use quant::QuantBits;
pub use text::{WeightFile, read_weights, write_weights};
pub use walker::{decode_network, encode_network};

/// テンソル（形状情報なしの f32 列）
pub type Tensor = Vec<f32>;

/// テキスト形式の重みを量子化してコンテナにする
///
/// 残差ブロック数はテンソル行数から求める。整合しなければ何も作らずにエラー。
pub fn encode(file: &WeightFile, bits: QuantBits) -> WeightsResult<Net> {
    let blocks = file.blocks()?;
    encode_network(file.version, blocks, &file.tensors, bits)
}

/// コンテナを逆量子化してテキスト形式の重みに戻す
pub fn decode(net: &Net, bits: QuantBits) -> WeightsResult<WeightFile> {
    Ok(WeightFile {
        version: net.version,
        tensors: decode_network(net, bits)?,
    })
}
