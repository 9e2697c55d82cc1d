//! 量子化済みネットワークのコンテナ（protobuf メッセージ）
//!
//! ```text
//! Net
//! ├── version
//! ├── input: ConvBlock
//! ├── residual[]: Residual { conv1, conv2 }
//! ├── policy: ConvBlock, ip_pol_w, ip_pol_b
//! └── value:  ConvBlock, ip1_val_w, ip1_val_b, ip2_val_w, ip2_val_b
//! ```
//!
//! 各 `Layer` は `{min_val, max_val, params}` で、params は量子化コードの
//! リトルエンディアン列。シリアライズ結果はそのまま gzip に包んで保存する。
//!
//! ConvBlock の各フィールドにはファイル順（weights, biases, bn_means,
//! bn_stddivs）のテンソルをそのまま入れる。ラベルを 1 つずらして格納する
//! 旧来の変換ツールが出力した .pb.gz とは互換性がない。

use prost::Message;

use crate::error::WeightsResult;

/// 量子化済みテンソル 1 本
#[derive(Clone, PartialEq, Message)]
pub struct Layer {
    #[prost(float, tag = "1")]
    pub min_val: f32,
    #[prost(float, tag = "2")]
    pub max_val: f32,
    #[prost(bytes = "vec", tag = "3")]
    pub params: Vec<u8>,
}

/// 畳み込みブロック（重み・バイアス・BN 平均・BN 標準偏差）
#[derive(Clone, PartialEq, Message)]
pub struct ConvBlock {
    #[prost(message, optional, tag = "1")]
    pub weights: Option<Layer>,
    #[prost(message, optional, tag = "2")]
    pub biases: Option<Layer>,
    #[prost(message, optional, tag = "3")]
    pub bn_means: Option<Layer>,
    #[prost(message, optional, tag = "4")]
    pub bn_stddivs: Option<Layer>,
}

/// 残差ブロック
#[derive(Clone, PartialEq, Message)]
pub struct Residual {
    #[prost(message, optional, tag = "1")]
    pub conv1: Option<ConvBlock>,
    #[prost(message, optional, tag = "2")]
    pub conv2: Option<ConvBlock>,
}

/// ネットワーク全体
#[derive(Clone, PartialEq, Message)]
pub struct Net {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(message, optional, tag = "2")]
    pub input: Option<ConvBlock>,
    #[prost(message, repeated, tag = "3")]
    pub residual: Vec<Residual>,

    #[prost(message, optional, tag = "4")]
    pub policy: Option<ConvBlock>,
    #[prost(message, optional, tag = "5")]
    pub ip_pol_w: Option<Layer>,
    #[prost(message, optional, tag = "6")]
    pub ip_pol_b: Option<Layer>,

    #[prost(message, optional, tag = "7")]
    pub value: Option<ConvBlock>,
    #[prost(message, optional, tag = "8")]
    pub ip1_val_w: Option<Layer>,
    #[prost(message, optional, tag = "9")]
    pub ip1_val_b: Option<Layer>,
    #[prost(message, optional, tag = "10")]
    pub ip2_val_w: Option<Layer>,
    #[prost(message, optional, tag = "11")]
    pub ip2_val_b: Option<Layer>,
}

impl Net {
    /// protobuf バイト列にシリアライズ
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// protobuf バイト列から復元
    pub fn from_bytes(bytes: &[u8]) -> WeightsResult<Self> {
        Ok(Self::decode(bytes)?)
    }
}
