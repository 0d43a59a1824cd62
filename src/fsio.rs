//! File Boundary Module
//!
//! ソースファイルの読み込み（サイズ上限付き）と、出力バイト列のアトミックな書き込みを行う。

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::error::ConvertError;

/// 入力サイズの既定上限: 2GB
pub(crate) const DEFAULT_MAX_INPUT_SIZE: u64 = 2_147_483_648;

/// ファイル全体を読み込む
///
/// # 戻り値
///
/// * `Ok(Vec<u8>)` - 読み込みに成功した場合
/// * `Err(ConvertError::InputTooLarge)` - ファイルサイズが`limit`を超える場合
/// * `Err(ConvertError::Io)` - オープン・読み込みに失敗した場合
pub(crate) fn read_source(path: &Path, limit: u64) -> Result<Vec<u8>, ConvertError> {
    debug!("Reading file: {}", path.display());

    let file = File::open(path)?;
    let size = file.metadata()?.len();
    if size > limit {
        return Err(ConvertError::InputTooLarge { size, limit });
    }

    // メタデータの長さと実際の読み込み量は一致しないことがある
    let mut buffer = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
    let read = file.take(limit.saturating_add(1)).read_to_end(&mut buffer)? as u64;
    if read > limit {
        return Err(ConvertError::InputTooLarge { size: read, limit });
    }

    debug!("Read {} bytes from {}", read, path.display());
    Ok(buffer)
}

/// 出力バイト列を宛先にコミットする
///
/// 宛先と同じディレクトリに一時ファイルを作成して書き込み、最後にリネームします。
/// 途中で失敗した場合、宛先ファイルは作成・変更されません。
///
/// 既存の宛先を置き換える場合はそのパーミッションを引き継ぎ、新規作成の場合は
/// `std::fs::write`と同じくumaskに従ったパーミッションになります。
pub(crate) fn commit(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    debug!("Writing {} bytes to {}", bytes.len(), path.display());

    let mut temp = temp_file_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }
    temp.persist(path).map_err(|e| ConvertError::Io(e.error))?;

    Ok(())
}

/// 一時ファイルを作成する（Unixでは0o666をumaskで絞ったモード）
fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}
