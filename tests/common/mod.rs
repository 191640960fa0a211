#![allow(dead_code)]

pub mod node;

use alloy::{
    primitives::{Address, BlockNumber, address},
    rpc::types::Log,
};
use settlement_tokens::test_utils::trade_log;

pub const TOKEN_A: Address = address!("0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a");
pub const TOKEN_B: Address = address!("0x0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
pub const TOKEN_C: Address = address!("0x0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c");

/// Token traded in `block` by [`trades_every_third_block`].
pub fn token_for(block: BlockNumber) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&block.to_be_bytes());
    Address::from(bytes)
}

/// One trade of `token_for(b) -> token_for(b + 1)` in every block `b` divisible by three.
pub fn trades_every_third_block(from: BlockNumber, to: BlockNumber) -> Vec<Log> {
    (from..=to)
        .filter(|block| block % 3 == 0)
        .map(|block| trade_log(block, token_for(block), token_for(block + 1)))
        .collect()
}
