//! 账户列表：每行一个地址，可选 `;` 后附带备注，`#` 开头的行跳过。

use std::path::{Path, PathBuf};

use alloy::primitives::hex::FromHexError;
use thiserror::Error;

pub use alloy::primitives::Address;

/// 账户文件中的一行；`row` 原样写入结果文件。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRow {
    pub address: Address,
    pub row: String,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("failed to read accounts file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("accounts file line {line}: {source}")]
    InvalidRow {
        line: usize,
        #[source]
        source: FromHexError,
    },
}

pub fn parse_accounts(contents: &str) -> Result<Vec<AccountRow>, WalletError> {
    let mut rows = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let row = raw.trim();
        if row.is_empty() || row.starts_with('#') {
            continue;
        }
        let first = row.split(';').next().unwrap_or(row);
        let address = first
            .trim()
            .parse::<Address>()
            .map_err(|source| WalletError::InvalidRow {
                line: idx + 1,
                source,
            })?;
        rows.push(AccountRow {
            address,
            row: row.to_string(),
        });
    }
    Ok(rows)
}

pub fn load_accounts(path: &Path) -> Result<Vec<AccountRow>, WalletError> {
    let contents = std::fs::read_to_string(path).map_err(|source| WalletError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_accounts(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn parses_address_regardless_of_case() {
        let rows = parse_accounts(&format!("{A}\n{}\n", A.to_ascii_lowercase())).unwrap();
        assert_eq!(rows[0].address, rows[1].address);
        assert_eq!(rows[0].address.to_string(), A);
        assert!(parse_accounts("0x1234\n").is_err());
    }

    #[test]
    fn skips_comments_and_keeps_labels() {
        let contents = format!("# disabled\n\n{A};main\n  {A}  \n");
        let rows = parse_accounts(&contents).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, format!("{A};main"));
        assert_eq!(rows[1].row, A);
    }

    #[test]
    fn reports_line_of_bad_row() {
        let err = parse_accounts(&format!("{A}\nnot-an-address\n")).unwrap_err();
        assert!(matches!(err, WalletError::InvalidRow { line: 2, .. }));
    }
}
