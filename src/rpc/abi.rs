//! refuel 合约接口。

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IRefuel {
        function depositNativeToken(uint256 destinationChainId, address receiver) external payable;
    }
}

/// 收款地址与发送地址相同，金额放在交易 `value` 中。
pub fn deposit_calldata(dest_chain_id: u64, receiver: Address) -> Bytes {
    IRefuel::depositNativeTokenCall {
        destinationChainId: U256::from(dest_chain_id),
        receiver,
    }
    .abi_encode()
    .into()
}
