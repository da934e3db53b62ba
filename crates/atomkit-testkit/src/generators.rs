//! Proptest generators for property-based testing.

use proptest::prelude::*;

use atomkit_core::{Address, Keypair, NonNegativeAmount, PositiveAmount, Universe, U256};

use crate::fixtures::TEST_UNIVERSE;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate an address in the test universe.
pub fn address() -> impl Strategy<Value = Address> {
    address_in(TEST_UNIVERSE)
}

pub fn address_in(universe: Universe) -> impl Strategy<Value = Address> {
    keypair().prop_map(move |kp| Address::from_keypair(universe, &kp))
}

/// Generate a full-range 256-bit value.
pub fn u256() -> impl Strategy<Value = U256> {
    any::<[u8; 32]>().prop_map(|bytes| U256::from_big_endian(&bytes))
}

/// Generate a positive amount that fits in a u64.
pub fn small_amount() -> impl Strategy<Value = PositiveAmount> {
    (1u64..=1_000_000u64).prop_map(|v| PositiveAmount::from_u64(v).expect("nonzero"))
}

/// Generate a positive amount anywhere in the 256-bit range.
pub fn large_amount() -> impl Strategy<Value = PositiveAmount> {
    u256().prop_filter_map("zero", |v| PositiveAmount::new(v).ok())
}

/// Generate a non-negative amount anywhere in the 256-bit range.
pub fn non_negative_amount() -> impl Strategy<Value = NonNegativeAmount> {
    u256().prop_map(NonNegativeAmount::new)
}

/// Generate a granularity: a power of ten up to 10^18.
pub fn granularity() -> impl Strategy<Value = PositiveAmount> {
    (0u32..=18u32).prop_map(|exp| PositiveAmount::from_u64(10u64.pow(exp)).expect("nonzero"))
}

/// Generate a token symbol.
pub fn symbol() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9]{0,13}".prop_map(String::from)
}

/// Generate a unique-claim name.
pub fn unique_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,31}".prop_map(String::from)
}

/// Token amounts a holder receives, then a sequence of transfers out of it.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// Sizes of the particles the holder starts with.
    pub deposits: Vec<u64>,
    /// Amounts transferred out, in order.
    pub transfers: Vec<u64>,
}

impl TransferPlan {
    pub fn total_deposited(&self) -> u64 {
        self.deposits.iter().sum()
    }
}

impl Arbitrary for TransferPlan {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(1u64..=1_000u64, 1..=6),
            prop::collection::vec(1u64..=1_500u64, 1..=6),
        )
            .prop_map(|(deposits, transfers)| TransferPlan {
                deposits,
                transfers,
            })
            .boxed()
    }
}
