use alloy::{
    network::{Ethereum, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder, ext::AnvilApi},
    rpc::types::TransactionRequest,
    sol_types::SolEvent,
};
use alloy_node_bindings::{Anvil, AnvilInstance};
use settlement_tokens::trade::Trade;
use tracing_subscriber::EnvFilter;

pub struct NodeSetup {
    pub provider: DynProvider<Ethereum>,
    pub settlement: Address,
    pub trader: Address,
    #[allow(dead_code)]
    pub anvil: AnvilInstance,
}

/// Runtime code that emits `Trade(caller, ..calldata)`:
/// copies the calldata to memory and logs it with the event signature and the caller as topics.
fn trade_emitter_code() -> Bytes {
    let mut code = vec![0x36, 0x5f, 0x5f, 0x37, 0x33, 0x7f];
    code.extend_from_slice(Trade::SIGNATURE_HASH.as_slice());
    code.extend_from_slice(&[0x36, 0x5f, 0xa2, 0x00]);
    code.into()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
}

/// Spawns Anvil and installs a contract at a fixed address that emits `Trade` logs.
pub async fn setup_node() -> anyhow::Result<NodeSetup> {
    init_tracing();

    let anvil = Anvil::new().try_spawn()?;
    let provider = ProviderBuilder::new().connect_http(anvil.endpoint_url()).erased();

    let settlement = Address::repeat_byte(0x90);
    provider.anvil_set_code(settlement, trade_emitter_code()).await?;

    let trader = anvil.addresses()[0];

    Ok(NodeSetup { provider, settlement, trader, anvil })
}

impl NodeSetup {
    /// Executes one trade in its own block and returns that block's number.
    pub async fn trade(&self, sell_token: Address, buy_token: Address) -> anyhow::Result<u64> {
        let trade = Trade {
            owner: self.trader,
            sellToken: sell_token,
            buyToken: buy_token,
            sellAmount: U256::from(10u64).pow(U256::from(18u64)),
            buyAmount: U256::from(2_500u64),
            feeAmount: U256::ZERO,
            orderUid: Bytes::from(vec![0x42; 56]),
        };

        let tx = TransactionRequest::default()
            .with_from(self.trader)
            .with_to(self.settlement)
            .with_input(trade.encode_data());

        let receipt = self.provider.send_transaction(tx).await?.get_receipt().await?;
        anyhow::ensure!(receipt.status(), "trade transaction reverted");
        receipt.block_number.ok_or_else(|| anyhow::anyhow!("receipt without block number"))
    }
}
