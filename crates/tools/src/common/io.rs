//! ファイルI/Oユーティリティ（gzip対応）
//!
//! 出力は同じディレクトリの一時ファイルに書き、[`Staged::commit`] で
//! rename して確定する。commit 前に drop されれば一時ファイルごと消える。

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

const READER_BUF_CAP: usize = 128 * 1024; // 128 KiB

fn is_gz(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    ext == "gz"
}

/// 入力を開く（拡張子が .gz なら展開する）
pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    let f = File::open(p)?;
    if is_gz(p) {
        let dec = flate2::read::GzDecoder::new(f);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, f)))
}

/// Writer wrapper to propagate finish/close errors for compressed outputs.
pub enum Writer {
    Plain(BufWriter<NamedTempFile>),
    Gz(flate2::write::GzEncoder<BufWriter<NamedTempFile>>),
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Plain(f) => f.write(buf),
            Writer::Gz(e) => e.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => f.flush(),
            Writer::Gz(e) => e.flush(),
        }
    }
}

impl Writer {
    /// Finalize the stream and flush the underlying temp file.
    fn close(self) -> io::Result<NamedTempFile> {
        let buf = match self {
            Writer::Plain(f) => f,
            Writer::Gz(e) => e.finish()?,
        };
        let mut file = buf.into_inner().map_err(|e| e.into_error())?;
        file.flush()?;
        Ok(file)
    }
}

/// 確定前の出力ファイル
#[must_use = "call .close() and then .commit() to move the output into place"]
pub struct StagedWriter {
    target: PathBuf,
    inner: Writer,
}

impl Write for StagedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StagedWriter {
    /// ストリームを閉じる（gzip フッタの書き込みを含む）
    pub fn close(self) -> io::Result<Staged> {
        Ok(Staged {
            target: self.target,
            file: self.inner.close()?,
        })
    }
}

/// 書き込み済み・未確定の出力
#[must_use = "call .commit() to move the output into place"]
pub struct Staged {
    target: PathBuf,
    file: NamedTempFile,
}

impl Staged {
    /// 確定先のパス
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// 一時ファイルを確定先へ rename し、ファイルサイズを返す
    pub fn commit(self) -> io::Result<u64> {
        let file = self.file.persist(&self.target).map_err(|e| e.error)?;
        Ok(file.metadata()?.len())
    }
}

/// 出力先と同じディレクトリに一時ファイルを作る（拡張子が .gz なら gzip で包む）
pub fn create_staged<P: AsRef<Path>>(path: P) -> io::Result<StagedWriter> {
    let p = path.as_ref();
    let dir = match p.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new().prefix(".txt2proto-").tempfile_in(dir)?;
    let buf = BufWriter::new(tmp);
    let inner = if is_gz(p) {
        Writer::Gz(flate2::write::GzEncoder::new(buf, flate2::Compression::default()))
    } else {
        Writer::Plain(buf)
    };
    Ok(StagedWriter {
        target: p.to_path_buf(),
        inner,
    })
}
