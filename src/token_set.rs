use std::collections::HashSet;

use alloy::primitives::Address;

use crate::trade::DecodedTrade;

/// Unique token addresses seen in one block range.
///
/// [`Address`] is a 20-byte value, so two spellings of an address that differ only in letter
/// case are the same entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenSet(HashSet<Address>);

impl TokenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records both tokens of `trade`.
    pub fn insert_trade(&mut self, trade: DecodedTrade) {
        self.0.insert(trade.sell_token);
        self.0.insert(trade.buy_token);
    }

    /// Union with another range's tokens.
    pub fn merge(&mut self, other: TokenSet) {
        if other.0.len() > self.0.len() {
            let smaller = std::mem::replace(&mut self.0, other.0);
            self.0.extend(smaller);
        } else {
            self.0.extend(other.0);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, token: &Address) -> bool {
        self.0.contains(token)
    }

    /// Drops `excluded` and returns the remaining tokens in case-insensitive order of their
    /// hex representation.
    ///
    /// Lowercase hex preserves byte order, so sorting the raw addresses yields exactly that
    /// order.
    #[must_use]
    pub fn into_sorted_without(mut self, excluded: &Address) -> Vec<Address> {
        self.0.remove(excluded);
        let mut tokens: Vec<Address> = self.0.into_iter().collect();
        tokens.sort_unstable();
        tokens
    }
}

impl FromIterator<Address> for TokenSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<DecodedTrade> for TokenSet {
    fn extend<I: IntoIterator<Item = DecodedTrade>>(&mut self, iter: I) {
        for trade in iter {
            self.insert_trade(trade);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::NATIVE_TOKEN_PLACEHOLDER;
    use alloy::primitives::address;

    const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
    const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    #[test]
    fn trades_contribute_both_tokens_once() {
        let mut set = TokenSet::new();
        set.extend([
            DecodedTrade { sell_token: DAI, buy_token: WETH },
            DecodedTrade { sell_token: WETH, buy_token: DAI },
        ]);

        assert_eq!(set.len(), 2);
        assert!(set.contains(&DAI));
        assert!(set.contains(&WETH));
    }

    #[test]
    fn addresses_differing_only_in_case_are_one_token() {
        let checksummed: Address = "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap();
        let lowercase: Address = "0x6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap();

        let set: TokenSet = [checksummed, lowercase].into_iter().collect();

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn merge_is_a_union() {
        let mut left: TokenSet = [DAI, USDC].into_iter().collect();
        let right: TokenSet = [USDC, WETH].into_iter().collect();

        left.merge(right);

        assert_eq!(left, [DAI, USDC, WETH].into_iter().collect());
    }

    #[test]
    fn merge_into_empty_set_takes_everything() {
        let mut left = TokenSet::new();
        left.merge([DAI, USDC, WETH].into_iter().collect());

        assert_eq!(left.len(), 3);
    }

    #[test]
    fn sorted_output_drops_placeholder() {
        let set: TokenSet = [WETH, NATIVE_TOKEN_PLACEHOLDER, DAI].into_iter().collect();

        let tokens = set.into_sorted_without(&NATIVE_TOKEN_PLACEHOLDER);

        assert_eq!(tokens, vec![DAI, WETH]);
    }

    #[test]
    fn sort_order_matches_lowercase_hex_order() {
        let set: TokenSet = [
            WETH,
            USDC,
            DAI,
            Address::repeat_byte(0x0f),
            Address::repeat_byte(0xa0),
            Address::repeat_byte(0x9f),
        ]
        .into_iter()
        .collect();

        let tokens = set.into_sorted_without(&NATIVE_TOKEN_PLACEHOLDER);

        let mut by_string: Vec<String> =
            tokens.iter().map(|token| token.to_string().to_lowercase()).collect();
        let as_returned = by_string.clone();
        by_string.sort();

        assert_eq!(as_returned, by_string);
    }
}
