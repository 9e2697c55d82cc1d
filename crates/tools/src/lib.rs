//! 重みファイル変換ツール
//!
//! テキスト形式の重みと量子化済み protobuf（gzip）を相互変換する
//! `txt2proto` の本体。

pub mod common;
pub mod config;
pub mod convert;
pub mod report;
