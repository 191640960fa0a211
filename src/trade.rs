//! The settlement contract's `Trade` event and its decoding.

use alloy::{
    primitives::{Address, address},
    rpc::types::Log,
    sol,
    sol_types::{self, SolEvent},
};

/// Address the settlement protocol uses to denote the chain's native currency in orders.
///
/// It is not an ERC20 token and is never part of a result.
pub const NATIVE_TOKEN_PLACEHOLDER: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Address at which the settlement contract is deployed on every supported chain.
pub const DEFAULT_SETTLEMENT_ADDRESS: Address =
    address!("0x9008D19f58AAbD9eD0D60971565AA8510560ab41");

sol! {
    /// Emitted by the settlement contract once per executed order.
    event Trade(
        address indexed owner,
        address sellToken,
        address buyToken,
        uint256 sellAmount,
        uint256 buyAmount,
        uint256 feeAmount,
        bytes orderUid
    );
}

/// The two tokens exchanged by one trade.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecodedTrade {
    pub sell_token: Address,
    pub buy_token: Address,
}

impl From<Trade> for DecodedTrade {
    fn from(trade: Trade) -> Self {
        Self { sell_token: trade.sellToken, buy_token: trade.buyToken }
    }
}

/// Turns a raw `Trade` log into the tokens it exchanged.
pub trait TradeDecoder: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the log is not a well-formed `Trade` event.
    fn decode(&self, log: &Log) -> Result<DecodedTrade, sol_types::Error>;
}

/// Decodes logs with the ABI of the settlement contract's [`Trade`] event.
#[derive(Copy, Clone, Debug, Default)]
pub struct SettlementTradeDecoder;

impl TradeDecoder for SettlementTradeDecoder {
    fn decode(&self, log: &Log) -> Result<DecodedTrade, sol_types::Error> {
        Trade::decode_log_data(log.data()).map(DecodedTrade::from)
    }
}
