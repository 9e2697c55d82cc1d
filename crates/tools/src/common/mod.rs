//! 共通ユーティリティ

pub mod io;
