//! Helpers for exercising the fetcher without a node.
//!
//! Available under `cfg(test)` and with the `test-utils` feature.

mod scripted_source;

use alloy::{
    primitives::{Address, BlockNumber, Bytes, U256},
    rpc::{json_rpc::ErrorPayload, types::Log},
    sol_types::SolEvent,
    transports::{RpcError, TransportErrorKind},
};

pub use scripted_source::{RecordedQuery, ScriptedLogSource};

use crate::{
    robust_provider::Error as ProviderError,
    trade::{DEFAULT_SETTLEMENT_ADDRESS, Trade},
};

/// A `Trade` log emitted by the default settlement contract in `block`.
#[must_use]
pub fn trade_log(block: BlockNumber, sell_token: Address, buy_token: Address) -> Log {
    let trade = Trade {
        owner: Address::repeat_byte(0x01),
        sellToken: sell_token,
        buyToken: buy_token,
        sellAmount: U256::from(1_000_000u64),
        buyAmount: U256::from(999_000u64),
        feeAmount: U256::from(1_000u64),
        orderUid: Bytes::from(vec![0xab; 56]),
    };

    Log {
        inner: alloy::primitives::Log {
            address: DEFAULT_SETTLEMENT_ADDRESS,
            data: trade.encode_log_data(),
        },
        block_number: Some(block),
        ..Default::default()
    }
}

/// A JSON-RPC error response from the node.
#[must_use]
pub fn rpc_error(code: i64, message: &'static str) -> ProviderError {
    RpcError::<TransportErrorKind>::ErrorResp(ErrorPayload { code, message: message.into(), data: None })
        .into()
}

/// The error geth-style nodes return when a log query matches too many entries.
#[must_use]
pub fn too_many_results() -> ProviderError {
    rpc_error(-32005, "query returned more than 10000 results")
}

/// Asserts that a fetch result is an error matching the given pattern.
#[macro_export]
macro_rules! assert_fetch_error {
    ($result: expr, $pattern: pat $(if $guard: expr)?) => {
        match $result {
            Err(err) => assert!(
                matches!(err, $pattern $(if $guard)?),
                "Expected error matching {}, got {:?}",
                stringify!($pattern),
                err
            ),
            Ok(value) => panic!("Expected error matching {}, got Ok({:?})", stringify!($pattern), value),
        }
    };
}
