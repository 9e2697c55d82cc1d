//! コンテナ（[`Net`]）とテンソルの橋渡し
//!
//! - `fill_*`: テンソルを量子化してフィールドに書き込む
//! - `extract_*`: フィールドを逆量子化してテンソルに戻す
//!
//! ConvBlock の 4 テンソルはファイル上で weights, biases, bn_means, bn_stddivs の
//! 順に並ぶ。fill / extract ともこの順序で扱う。

use crate::error::{WeightsError, WeightsResult};
use crate::layout::{BlockSite, CONV_BLOCK_TENSORS, HeadLayer, ResidualConv, Slot};
use crate::proto::{ConvBlock, Layer, Net};
use crate::quant::{self, QuantBits};
use crate::walker::TensorCursor;
use crate::Tensor;

/// ConvBlock 内のフィールド名（ファイル順）
const CONV_FIELDS: [&str; CONV_BLOCK_TENSORS] = ["weights", "biases", "bn_means", "bn_stddivs"];

// =============================================================================
// Net のフィールドアクセス
// =============================================================================

impl Net {
    /// ヘッドの ip レイヤー
    pub fn head_layer(&self, head: HeadLayer) -> Option<&Layer> {
        match head {
            HeadLayer::IpPolW => self.ip_pol_w.as_ref(),
            HeadLayer::IpPolB => self.ip_pol_b.as_ref(),
            HeadLayer::Ip1ValW => self.ip1_val_w.as_ref(),
            HeadLayer::Ip1ValB => self.ip1_val_b.as_ref(),
            HeadLayer::Ip2ValW => self.ip2_val_w.as_ref(),
            HeadLayer::Ip2ValB => self.ip2_val_b.as_ref(),
        }
    }

    /// ヘッドの ip レイヤー（書き込み用）
    pub fn head_layer_mut(&mut self, head: HeadLayer) -> &mut Option<Layer> {
        match head {
            HeadLayer::IpPolW => &mut self.ip_pol_w,
            HeadLayer::IpPolB => &mut self.ip_pol_b,
            HeadLayer::Ip1ValW => &mut self.ip1_val_w,
            HeadLayer::Ip1ValB => &mut self.ip1_val_b,
            HeadLayer::Ip2ValW => &mut self.ip2_val_w,
            HeadLayer::Ip2ValB => &mut self.ip2_val_b,
        }
    }

    /// ConvBlock
    pub fn conv_block(&self, site: BlockSite) -> Option<&ConvBlock> {
        match site {
            BlockSite::Input => self.input.as_ref(),
            BlockSite::Policy => self.policy.as_ref(),
            BlockSite::Value => self.value.as_ref(),
            BlockSite::Residual { index, conv } => {
                let res = self.residual.get(index)?;
                match conv {
                    ResidualConv::Conv1 => res.conv1.as_ref(),
                    ResidualConv::Conv2 => res.conv2.as_ref(),
                }
            }
        }
    }

    /// ConvBlock（書き込み用、無ければ空で作る）
    ///
    /// 残差ブロックは事前に `residual` に確保されている必要がある。
    pub fn conv_block_mut(&mut self, site: BlockSite) -> WeightsResult<&mut ConvBlock> {
        let slot = match site {
            BlockSite::Input => &mut self.input,
            BlockSite::Policy => &mut self.policy,
            BlockSite::Value => &mut self.value,
            BlockSite::Residual { index, conv } => {
                let res = self
                    .residual
                    .get_mut(index)
                    .ok_or_else(|| WeightsError::MissingField { field: site.to_string() })?;
                match conv {
                    ResidualConv::Conv1 => &mut res.conv1,
                    ResidualConv::Conv2 => &mut res.conv2,
                }
            }
        };
        Ok(slot.get_or_insert_with(ConvBlock::default))
    }
}

impl ConvBlock {
    /// 4 レイヤーをファイル順（weights, biases, bn_means, bn_stddivs）で返す
    pub fn layers(&self) -> [Option<&Layer>; CONV_BLOCK_TENSORS] {
        [
            self.weights.as_ref(),
            self.biases.as_ref(),
            self.bn_means.as_ref(),
            self.bn_stddivs.as_ref(),
        ]
    }

    fn layers_mut(&mut self) -> [&mut Option<Layer>; CONV_BLOCK_TENSORS] {
        [
            &mut self.weights,
            &mut self.biases,
            &mut self.bn_means,
            &mut self.bn_stddivs,
        ]
    }
}

// =============================================================================
// fill
// =============================================================================

/// 単独レイヤーを末尾から 1 本取り出して量子化する
pub fn fill_layer(
    target: &mut Option<Layer>,
    cursor: &mut TensorCursor<'_>,
    head: HeadLayer,
    bits: QuantBits,
) -> WeightsResult<()> {
    let tensors = cursor.take_back(Slot::Layer(head))?;
    *target = Some(quant::quantize(&tensors[0], bits));
    Ok(())
}

/// ConvBlock を末尾から 4 本取り出して量子化する
///
/// 取り出した 4 本はファイル順（weights, biases, bn_means, bn_stddivs）に並んでいる。
/// 残りが 4 本未満なら `MissingTensors`。
pub fn fill_conv_block(
    block: &mut ConvBlock,
    cursor: &mut TensorCursor<'_>,
    site: BlockSite,
    bits: QuantBits,
) -> WeightsResult<()> {
    let tensors = cursor.take_back(Slot::ConvBlock(site))?;
    for (field, tensor) in block.layers_mut().into_iter().zip(tensors) {
        *field = Some(quant::quantize(tensor, bits));
    }
    Ok(())
}

// =============================================================================
// extract
// =============================================================================

/// レイヤーを逆量子化する
///
/// `field` はエラー表示用のフィールド名。params が空のレイヤーはエラー。
pub fn extract_layer(layer: Option<&Layer>, field: &str, bits: QuantBits) -> WeightsResult<Tensor> {
    let layer = layer.ok_or_else(|| WeightsError::MissingField { field: field.to_owned() })?;
    if layer.params.is_empty() {
        return Err(WeightsError::EmptyLayer { field: field.to_owned() });
    }
    if bits.code_count(layer.params.len()).is_none() {
        return Err(WeightsError::InvalidParams {
            field: field.to_owned(),
            len: layer.params.len(),
            bits: bits.bits(),
        });
    }
    Ok(quant::dequantize(layer, bits))
}

/// ConvBlock を逆量子化してファイル順（weights, biases, bn_means, bn_stddivs）で返す
pub fn extract_conv_block(
    block: Option<&ConvBlock>,
    site: BlockSite,
    bits: QuantBits,
) -> WeightsResult<[Tensor; CONV_BLOCK_TENSORS]> {
    let block = block.ok_or_else(|| WeightsError::MissingField { field: site.to_string() })?;
    let [w, b, m, s] = block.layers();
    let extract = |layer: Option<&Layer>, idx: usize| {
        extract_layer(layer, &format!("{site}.{}", CONV_FIELDS[idx]), bits)
    };
    Ok([extract(w, 0)?, extract(b, 1)?, extract(m, 2)?, extract(s, 3)?])
}
