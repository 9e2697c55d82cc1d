//! テキスト形式の重みファイル
//!
//! ```text
//! <version>
//! <float> <float> ...   ← テンソル 1 本 / 行（ファイル順）
//! ...
//! ```
//!
//! 末尾の空行は無視する。途中の空行・数値でないトークン・非有限値はエラー。

use std::io::{self, BufRead, Write};

use crate::error::{WeightsError, WeightsResult};
use crate::layout::blocks_for_tensor_count;
use crate::Tensor;

/// テキスト形式の重み（バージョン + ファイル順のテンソル列）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightFile {
    pub version: u32,
    pub tensors: Vec<Tensor>,
}

impl WeightFile {
    /// フィルタ数（2 行目のテンソル = input のバイアスの要素数）
    pub fn filters(&self) -> Option<usize> {
        self.tensors.get(1).map(Vec::len)
    }

    /// 残差ブロック数（テンソル行数から算出）
    pub fn blocks(&self) -> WeightsResult<usize> {
        blocks_for_tensor_count(self.tensors.len())
    }
}

/// テキスト形式を読み込む
pub fn read_weights<R: BufRead>(reader: R) -> WeightsResult<WeightFile> {
    let mut lines = reader.lines();

    let header = lines.next().transpose()?.ok_or_else(|| WeightsError::Parse {
        line: 1,
        message: "missing version line".to_owned(),
    })?;
    let version = header.trim().parse::<u32>().map_err(|e| WeightsError::Parse {
        line: 1,
        message: format!("invalid version {:?}: {e}", header.trim()),
    })?;

    let mut tensors = Vec::new();
    let mut blank_line = None;
    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line?;
        if line.trim().is_empty() {
            blank_line.get_or_insert(line_no);
            continue;
        }
        if let Some(line) = blank_line {
            return Err(WeightsError::Parse {
                line,
                message: "empty tensor line".to_owned(),
            });
        }
        tensors.push(parse_tensor(&line, line_no)?);
    }

    Ok(WeightFile { version, tensors })
}

fn parse_tensor(line: &str, line_no: usize) -> WeightsResult<Tensor> {
    line.split_whitespace()
        .map(|token| match token.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v),
            Ok(_) => Err(WeightsError::Parse {
                line: line_no,
                message: format!("non-finite value {token:?}"),
            }),
            Err(e) => Err(WeightsError::Parse {
                line: line_no,
                message: format!("invalid value {token:?}: {e}"),
            }),
        })
        .collect()
}

/// テキスト形式で書き出す
pub fn write_weights<W: Write + ?Sized>(writer: &mut W, file: &WeightFile) -> io::Result<()> {
    writeln!(writer, "{}", file.version)?;
    for tensor in &file.tensors {
        for (i, v) in tensor.iter().enumerate() {
            if i > 0 {
                writer.write_all(b" ")?;
            }
            write!(writer, "{v:?}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(s: &str) -> WeightsResult<WeightFile> {
        read_weights(Cursor::new(s.as_bytes()))
    }

    fn parse_error_line(s: &str) -> usize {
        match parse(s) {
            Err(WeightsError::Parse { line, .. }) => line,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_weights() {
        let file = parse("5\n3.0\n1.0 2.0 3.0 4.0\n-0.5  1e-3\n").unwrap();
        assert_eq!(file.version, 5);
        assert_eq!(
            file.tensors,
            vec![vec![3.0], vec![1.0, 2.0, 3.0, 4.0], vec![-0.5, 0.001]]
        );
        assert_eq!(file.filters(), Some(4));
    }

    #[test]
    fn test_trailing_blank_lines_ignored() {
        let file = parse("1\n1.0\n2.0\n\n\n").unwrap();
        assert_eq!(file.tensors.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_error_line(""), 1);
        assert_eq!(parse_error_line("v2\n1.0\n"), 1);
        assert_eq!(parse_error_line("-1\n1.0\n"), 1);
        assert_eq!(parse_error_line("2\n1.0\n1.0 x\n"), 3);
        assert_eq!(parse_error_line("2\n1.0\nNaN\n"), 3);
        assert_eq!(parse_error_line("2\n1.0 inf\n"), 2);
        assert_eq!(parse_error_line("2\n1.0\n\n2.0\n"), 3);
    }

    #[test]
    fn test_blocks() {
        let mut file = WeightFile {
            version: 1,
            tensors: vec![vec![0.0]; 18],
        };
        assert_eq!(file.blocks().unwrap(), 0);
        file.tensors.push(vec![0.0]);
        assert!(matches!(
            file.blocks(),
            Err(WeightsError::InconsistentWeightCount { tensors: 19 })
        ));
    }

    #[test]
    fn test_write_weights() {
        let file = WeightFile {
            version: 7,
            tensors: vec![vec![3.0], vec![0.25, -1.5]],
        };
        let mut out = Vec::new();
        write_weights(&mut out, &file).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "7\n3.0\n0.25 -1.5\n");

        // 書き出したものはそのまま読み戻せる
        assert_eq!(parse(std::str::from_utf8(&out).unwrap()).unwrap(), file);
    }
}
