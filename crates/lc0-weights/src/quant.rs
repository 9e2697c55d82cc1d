//! min–max 線形量子化
//!
//! テンソル 1 本を `[min_val, max_val]` に正規化し、`2^bits - 1` 段階の
//! 符号なし整数コード（リトルエンディアン）に丸める。逆変換は
//! `c / (2^bits - 1) * (max_val - min_val) + min_val`。
//!
//! 往復誤差は半ステップ以内。定数テンソルは誤差 0 で往復する。

use std::fmt;

use crate::proto::Layer;

/// 量子化ビット幅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuantBits {
    /// 8bit コード（1 バイト / 要素）
    U8,
    /// 16bit コード（2 バイト / 要素、LE）
    #[default]
    U16,
}

impl QuantBits {
    /// ビット数
    pub const fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
        }
    }

    /// 最大コード値（`2^bits - 1`）
    pub const fn max_code(self) -> u32 {
        (1u32 << self.bits()) - 1
    }

    /// 1 コードあたりのバイト数
    pub const fn code_bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    /// ビット数から変換（8 / 16 のみ）
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::U16),
            _ => None,
        }
    }

    /// params のバイト長からコード数を求める
    ///
    /// コード幅で割り切れない場合は `None`。
    pub fn code_count(self, params_len: usize) -> Option<usize> {
        let width = self.code_bytes();
        (params_len % width == 0).then_some(params_len / width)
    }

    /// 量子化ステップ `(max - min) / (2^bits - 1)`
    pub fn step(self, min_val: f32, max_val: f32) -> f32 {
        ((f64::from(max_val) - f64::from(min_val)).abs() / f64::from(self.max_code())) as f32
    }
}

impl fmt::Display for QuantBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bit", self.bits())
    }
}

/// テンソルを量子化する
///
/// - 要素数 1 のテンソルは `min_val = 0` とする（`max_val` は要素そのもの）
/// - `max_val == min_val` の場合はゼロ除算せず、全要素をコード 0 にする
pub fn quantize(values: &[f32], bits: QuantBits) -> Layer {
    if values.is_empty() {
        return Layer::default();
    }

    let max_val = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min_val = if values.len() == 1 {
        0.0
    } else {
        values.iter().copied().fold(f32::INFINITY, f32::min)
    };
    // f32 のままだと max - min が inf に溢れることがある
    let lo = f64::from(min_val);
    let range = f64::from(max_val) - lo;
    let scale = f64::from(bits.max_code());

    let mut params = Vec::with_capacity(values.len() * bits.code_bytes());
    for &v in values {
        let code = if range == 0.0 {
            0
        } else {
            ((f64::from(v) - lo) / range * scale).round().clamp(0.0, scale) as u32
        };
        match bits {
            QuantBits::U8 => params.push(code as u8),
            QuantBits::U16 => params.extend_from_slice(&(code as u16).to_le_bytes()),
        }
    }

    Layer {
        min_val,
        max_val,
        params,
    }
}

/// 量子化済みレイヤーを浮動小数点に戻す
///
/// 末尾の半端なバイトは無視する。長さの検証は呼び出し側で
/// [`QuantBits::code_count`] を使って行う。
pub fn dequantize(layer: &Layer, bits: QuantBits) -> Vec<f32> {
    let scale = f64::from(bits.max_code());
    let lo = f64::from(layer.min_val);
    let range = f64::from(layer.max_val) - lo;
    let decode = |code: u32| (f64::from(code) / scale * range + lo) as f32;

    match bits {
        QuantBits::U8 => layer.params.iter().map(|&b| decode(u32::from(b))).collect(),
        QuantBits::U16 => layer
            .params
            .chunks_exact(2)
            .map(|c| decode(u32::from(u16::from_le_bytes([c[0], c[1]]))))
            .collect(),
    }
}

/// 2 本のテンソル間の最大絶対誤差
pub fn max_abs_error(original: &[f32], restored: &[f32]) -> f32 {
    debug_assert_eq!(original.len(), restored.len());
    original
        .iter()
        .zip(restored)
        .map(|(&a, &b)| (f64::from(a) - f64::from(b)).abs() as f32)
        .fold(0.0, f32::max)
}
