use crate::wallet::Address;

/// 日志里展示的短地址：`0x1234..abcd`（EIP-55 大小写）。
pub fn short_address(address: &Address) -> String {
    let raw = address.to_checksum(None);
    format!("{}..{}", &raw[..6], &raw[raw.len() - 4..])
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn shortens_address() {
        let address = address!("52908400098527886e0f7030069857d2e4169ee7");
        assert_eq!(short_address(&address), "0x5290..9EE7");
    }
}
