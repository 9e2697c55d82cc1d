//! ネットワーク全体の走査（エンコード / デコード）
//!
//! どちらの方向も [`NetworkLayout`] のスロット列を **逆順** に辿る。
//!
//! - エンコード: テンソル列を末尾から消費し、value → policy → tower
//!   （最後のブロックから、conv2 → conv1）→ input の順にフィールドを埋める。
//!   input を埋めた時点でちょうど空になっていなければエラー。
//! - デコード: 同じ順にフィールドを逆量子化し、出力列の先頭へ挿入する。
//!   結果は元のテキストファイルと同じ上から順の並びになる。

use std::collections::VecDeque;

use crate::adapter::{extract_conv_block, extract_layer, fill_conv_block, fill_layer};
use crate::error::{WeightsError, WeightsResult};
use crate::layout::{NetworkLayout, Slot};
use crate::proto::{Net, Residual};
use crate::quant::QuantBits;
use crate::Tensor;

// =============================================================================
// TensorCursor
// =============================================================================

/// テンソル列を末尾から読むカーソル
///
/// 元の列は変更しない。`end` より前が未消費。
#[derive(Debug)]
pub struct TensorCursor<'a> {
    tensors: &'a [Tensor],
    end: usize,
}

impl<'a> TensorCursor<'a> {
    pub fn new(tensors: &'a [Tensor]) -> Self {
        Self {
            tensors,
            end: tensors.len(),
        }
    }

    /// 未消費のテンソル数
    pub fn remaining(&self) -> usize {
        self.end
    }

    /// スロット 1 個分を末尾から取り出す
    ///
    /// 返すスライスはファイル順。足りない場合は何も消費せずにエラー。
    pub fn take_back(&mut self, slot: Slot) -> WeightsResult<&'a [Tensor]> {
        let needed = slot.tensor_count();
        let start = self
            .end
            .checked_sub(needed)
            .ok_or(WeightsError::MissingTensors {
                slot,
                needed,
                remaining: self.end,
            })?;
        let taken = &self.tensors[start..self.end];
        self.end = start;
        Ok(taken)
    }

    /// 全て消費済みであることを確認する
    pub fn finish(self) -> WeightsResult<()> {
        match self.end {
            0 => Ok(()),
            remaining => Err(WeightsError::TrailingTensors { remaining }),
        }
    }
}

// =============================================================================
// エンコード / デコード
// =============================================================================

/// テンソル列（ファイル順）を量子化してコンテナを組み立てる
///
/// `blocks` は残差ブロック数。テンソル数と合わない場合は
/// `MissingTensors` または `TrailingTensors`。
pub fn encode_network(
    version: u32,
    blocks: usize,
    tensors: &[Tensor],
    bits: QuantBits,
) -> WeightsResult<Net> {
    let layout = NetworkLayout::new(blocks);
    let mut net = Net {
        version,
        residual: vec![Residual::default(); blocks],
        ..Default::default()
    };

    let mut cursor = TensorCursor::new(tensors);
    for &slot in layout.slots().iter().rev() {
        match slot {
            Slot::Layer(head) => fill_layer(net.head_layer_mut(head), &mut cursor, head, bits)?,
            Slot::ConvBlock(site) => {
                fill_conv_block(net.conv_block_mut(site)?, &mut cursor, site, bits)?
            }
        }
    }
    cursor.finish()?;

    log::debug!(
        "encoded {} tensors ({} residual blocks, {bits})",
        tensors.len(),
        blocks
    );
    Ok(net)
}

/// コンテナを逆量子化してテンソル列（ファイル順）に戻す
pub fn decode_network(net: &Net, bits: QuantBits) -> WeightsResult<Vec<Tensor>> {
    let layout = NetworkLayout::new(net.residual.len());
    let mut out = VecDeque::with_capacity(layout.tensor_count());

    for &slot in layout.slots().iter().rev() {
        match slot {
            Slot::Layer(head) => {
                out.push_front(extract_layer(net.head_layer(head), head.as_str(), bits)?);
            }
            Slot::ConvBlock(site) => {
                let block = extract_conv_block(net.conv_block(site), site, bits)?;
                for tensor in block.into_iter().rev() {
                    out.push_front(tensor);
                }
            }
        }
    }

    log::debug!(
        "decoded {} tensors ({} residual blocks, {bits})",
        out.len(),
        layout.blocks()
    );
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BlockSite, HeadLayer, ResidualConv};
    use crate::quant::max_abs_error;

    /// i 番目のテンソルの長さを i + 1 にして並びを識別できるようにする
    fn synthetic(count: usize) -> Vec<Tensor> {
        (0..count)
            .map(|i| (0..=i).map(|j| (i * 7 + j) as f32 * 0.01 - 0.3).collect())
            .collect()
    }

    fn assert_roundtrip(tensors: &[Tensor], blocks: usize, bits: QuantBits) {
        let net = encode_network(3, blocks, tensors, bits).unwrap();
        assert_eq!(net.residual.len(), blocks);

        let back = decode_network(&net, bits).unwrap();
        assert_eq!(back.len(), tensors.len());
        for (i, (orig, rest)) in tensors.iter().zip(&back).enumerate() {
            assert_eq!(orig.len(), rest.len(), "tensor {i} moved");
            let hi = orig.iter().copied().fold(f32::MIN, f32::max);
            let lo = if orig.len() == 1 {
                0.0
            } else {
                orig.iter().copied().fold(f32::MAX, f32::min)
            };
            let step = bits.step(lo, hi);
            assert!(max_abs_error(orig, rest) <= step, "tensor {i} out of bound");
        }
    }

    #[test]
    fn test_cursor_take_back() {
        let tensors = synthetic(6);
        let mut cursor = TensorCursor::new(&tensors);

        let last = cursor.take_back(Slot::Layer(HeadLayer::Ip2ValB)).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].len(), 6);

        let block = cursor.take_back(Slot::ConvBlock(BlockSite::Value)).unwrap();
        let lens: Vec<usize> = block.iter().map(Vec::len).collect();
        assert_eq!(lens, [2, 3, 4, 5]);
        assert_eq!(cursor.remaining(), 1);

        assert!(matches!(
            cursor.take_back(Slot::ConvBlock(BlockSite::Input)),
            Err(WeightsError::MissingTensors { needed: 4, remaining: 1, .. })
        ));
        assert!(matches!(
            cursor.finish(),
            Err(WeightsError::TrailingTensors { remaining: 1 })
        ));
    }

    #[test]
    fn test_head_only_network_preserves_order() {
        let tensors = synthetic(18);
        assert_roundtrip(&tensors, 0, QuantBits::U16);
        assert_roundtrip(&tensors, 0, QuantBits::U8);
    }

    #[test]
    fn test_two_block_network_preserves_order() {
        let tensors = synthetic(34);
        assert_roundtrip(&tensors, 2, QuantBits::U16);
    }

    #[test]
    fn test_fields_receive_expected_tensors() {
        let tensors = synthetic(26);
        let net = encode_network(1, 1, &tensors, QuantBits::U16).unwrap();
        let params_len = |layer: Option<&crate::proto::Layer>| layer.unwrap().params.len() / 2;

        // input = 0..4, residual[0].conv1 = 4..8, conv2 = 8..12
        let input = net.conv_block(BlockSite::Input).unwrap();
        assert_eq!(params_len(input.weights.as_ref()), 1);
        assert_eq!(params_len(input.bn_stddivs.as_ref()), 4);

        let conv1 = net
            .conv_block(BlockSite::Residual { index: 0, conv: ResidualConv::Conv1 })
            .unwrap();
        assert_eq!(params_len(conv1.weights.as_ref()), 5);
        let conv2 = net
            .conv_block(BlockSite::Residual { index: 0, conv: ResidualConv::Conv2 })
            .unwrap();
        assert_eq!(params_len(conv2.weights.as_ref()), 9);

        // policy = 12..16, ip_pol_w = 16, ip_pol_b = 17, value = 18..22, ip1/ip2 = 22..26
        assert_eq!(params_len(net.policy.as_ref().unwrap().weights.as_ref()), 13);
        assert_eq!(params_len(net.ip_pol_w.as_ref()), 17);
        assert_eq!(params_len(net.ip_pol_b.as_ref()), 18);
        assert_eq!(params_len(net.value.as_ref().unwrap().bn_stddivs.as_ref()), 22);
        assert_eq!(params_len(net.ip1_val_w.as_ref()), 23);
        assert_eq!(params_len(net.ip2_val_b.as_ref()), 26);
    }

    #[test]
    fn test_encode_block_count_mismatch() {
        // テンソルが足りない（途中で空になる）
        let tensors = synthetic(26);
        let err = encode_network(1, 2, &tensors, QuantBits::U16).unwrap_err();
        assert!(matches!(
            err,
            WeightsError::MissingTensors {
                slot: Slot::ConvBlock(BlockSite::Residual { index: 0, conv: ResidualConv::Conv1 }),
                ..
            }
        ));

        // テンソルが余る
        let err = encode_network(1, 0, &tensors, QuantBits::U16).unwrap_err();
        assert!(matches!(err, WeightsError::TrailingTensors { remaining: 8 }));
    }

    #[test]
    fn test_decode_missing_field() {
        let tensors = synthetic(18);
        let mut net = encode_network(1, 0, &tensors, QuantBits::U16).unwrap();
        net.ip1_val_b = None;
        let err = decode_network(&net, QuantBits::U16).unwrap_err();
        assert!(matches!(err, WeightsError::MissingField { ref field } if field == "ip1_val_b"));
    }

    #[test]
    fn test_decode_container_bytes() {
        let tensors = synthetic(26);
        let net = encode_network(9, 1, &tensors, QuantBits::U8).unwrap();
        let restored = Net::from_bytes(&net.to_bytes()).unwrap();
        assert_eq!(restored.version, 9);
        let back = decode_network(&restored, QuantBits::U8).unwrap();
        assert_eq!(back, decode_network(&net, QuantBits::U8).unwrap());
    }
}
