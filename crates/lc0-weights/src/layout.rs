//! ネットワークのスロット配置
//!
//! テキストファイル上のテンソル並び（上から順）をスロット列として宣言的に表す。
//! エンコード・デコードの両方がこの列を逆順に辿るので、順序ロジックは
//! ここにしか存在しない。
//!
//! ```text
//! input(4)
//! residual[0].conv1(4) residual[0].conv2(4)
//! ...
//! residual[B-1].conv1(4) residual[B-1].conv2(4)
//! policy(4) ip_pol_w ip_pol_b
//! value(4) ip1_val_w ip1_val_b ip2_val_w ip2_val_b
//! ```

use std::fmt;

use crate::error::{WeightsError, WeightsResult};

// =============================================================================
// 定数
// =============================================================================

/// ConvBlock 1 個あたりのテンソル数
pub const CONV_BLOCK_TENSORS: usize = 4;

/// 残差ブロック 1 個あたりのテンソル数（conv1 + conv2）
pub const RESIDUAL_TENSORS: usize = 2 * CONV_BLOCK_TENSORS;

/// 残差ブロック以外のテンソル数
///
/// input(4) + policy(4 + 2) + value(4 + 4) = 18
pub const FIXED_TENSORS: usize = 3 * CONV_BLOCK_TENSORS + 6;

// =============================================================================
// スロット
// =============================================================================

/// ヘッドの全結合（ip）レイヤー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadLayer {
    IpPolW,
    IpPolB,
    Ip1ValW,
    Ip1ValB,
    Ip2ValW,
    Ip2ValB,
}

impl HeadLayer {
    /// コンテナ上のフィールド名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpPolW => "ip_pol_w",
            Self::IpPolB => "ip_pol_b",
            Self::Ip1ValW => "ip1_val_w",
            Self::Ip1ValB => "ip1_val_b",
            Self::Ip2ValW => "ip2_val_w",
            Self::Ip2ValB => "ip2_val_b",
        }
    }
}

/// 残差ブロック内の畳み込み位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidualConv {
    Conv1,
    Conv2,
}

/// ConvBlock の置き場所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockSite {
    Input,
    Residual { index: usize, conv: ResidualConv },
    Policy,
    Value,
}

impl fmt::Display for BlockSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Residual { index, conv } => {
                let conv = match conv {
                    ResidualConv::Conv1 => "conv1",
                    ResidualConv::Conv2 => "conv2",
                };
                write!(f, "residual[{index}].{conv}")
            }
            Self::Policy => f.write_str("policy"),
            Self::Value => f.write_str("value"),
        }
    }
}

/// スロット（単独レイヤー or ConvBlock）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Layer(HeadLayer),
    ConvBlock(BlockSite),
}

impl Slot {
    /// このスロットが消費するテンソル数
    pub fn tensor_count(&self) -> usize {
        match self {
            Self::Layer(_) => 1,
            Self::ConvBlock(_) => CONV_BLOCK_TENSORS,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer(layer) => f.write_str(layer.as_str()),
            Self::ConvBlock(site) => fmt::Display::fmt(site, f),
        }
    }
}

// =============================================================================
// NetworkLayout
// =============================================================================

/// ファイル順のスロット列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLayout {
    blocks: usize,
    slots: Vec<Slot>,
}

impl NetworkLayout {
    /// 残差ブロック数からレイアウトを組み立てる
    pub fn new(blocks: usize) -> Self {
        let mut slots = Vec::with_capacity(2 * blocks + 9);
        slots.push(Slot::ConvBlock(BlockSite::Input));
        for index in 0..blocks {
            for conv in [ResidualConv::Conv1, ResidualConv::Conv2] {
                slots.push(Slot::ConvBlock(BlockSite::Residual { index, conv }));
            }
        }
        slots.extend([
            Slot::ConvBlock(BlockSite::Policy),
            Slot::Layer(HeadLayer::IpPolW),
            Slot::Layer(HeadLayer::IpPolB),
            Slot::ConvBlock(BlockSite::Value),
            Slot::Layer(HeadLayer::Ip1ValW),
            Slot::Layer(HeadLayer::Ip1ValB),
            Slot::Layer(HeadLayer::Ip2ValW),
            Slot::Layer(HeadLayer::Ip2ValB),
        ]);
        Self { blocks, slots }
    }

    /// テンソル行数から残差ブロック数を求めてレイアウトを作る
    pub fn from_tensor_count(tensors: usize) -> WeightsResult<Self> {
        blocks_for_tensor_count(tensors).map(Self::new)
    }

    /// 残差ブロック数
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// ファイル順のスロット列
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// 全スロットが消費するテンソル数
    pub fn tensor_count(&self) -> usize {
        self.slots.iter().map(Slot::tensor_count).sum()
    }
}

/// テンソル行数から残差ブロック数を求める
///
/// 最終行のインデックスを `e`（0 始まり）とすると `blocks = (e - 17) / 8`。
/// 割り切れない、または固定部分にも満たない場合はエラー。
pub fn blocks_for_tensor_count(tensors: usize) -> WeightsResult<usize> {
    match tensors.checked_sub(FIXED_TENSORS) {
        Some(tower) if tower % RESIDUAL_TENSORS == 0 => Ok(tower / RESIDUAL_TENSORS),
        _ => Err(WeightsError::InconsistentWeightCount { tensors }),
    }
}
