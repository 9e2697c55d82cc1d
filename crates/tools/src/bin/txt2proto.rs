//! 重みファイル変換ツール
//!
//! テキスト形式の重み（.txt）を量子化済み protobuf（.pb.gz）に変換する。
//! .pb.gz を入力するとテキスト（.txt.gz）に戻す。

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use lc0_weights::QuantBits;
use tools::config::ConvertConfig;
use tools::convert;

#[derive(Parser, Debug)]
#[command(name = "txt2proto")]
#[command(about = "Convert network textfile to proto.")]
struct Cli {
    /// 入力ファイル（.txt / .txt.gz → proto、.pb.gz / .pb → テキスト）
    #[arg(short, long)]
    input: PathBuf,

    /// 出力パス（拡張子なしで指定すると .pb.gz / .txt.gz を付ける）
    #[arg(short, long)]
    output: PathBuf,

    /// 量子化ビット幅（デコード時もエンコード時と同じ値を指定する）
    #[arg(long, value_enum, default_value_t = Bits::Sixteen)]
    bits: Bits,

    /// エンコード時に逆量子化したテキストを書き出さない
    #[arg(long, default_value_t = false)]
    no_text: bool,

    /// 変換結果を JSON で標準出力に出す
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Bits {
    #[value(name = "8")]
    Eight,
    #[value(name = "16")]
    Sixteen,
}

impl From<Bits> for QuantBits {
    fn from(bits: Bits) -> Self {
        match bits {
            Bits::Eight => QuantBits::U8,
            Bits::Sixteen => QuantBits::U16,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ConvertConfig::new(cli.input, cli.output, cli.bits.into(), !cli.no_text)?;
    log::debug!("{config:?}");

    let report = convert::run(&config)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for output in &report.outputs {
            println!("{output}");
        }
    }
    Ok(())
}
