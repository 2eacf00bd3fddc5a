//! Human-readable identifier generation.
//!
//! Transaction codes look like `TRX-YYYYMMDD-NNNN` and account numbers like
//! `SAV-YYYYMM-NNNN`, with a random 4-digit suffix. The suffix makes codes
//! guessable-but-unique-enough for tellers; actual uniqueness is enforced
//! by the store, and the poster regenerates on collision.

use jiff::Timestamp;
use rand::Rng;

pub fn transaction_code(now: Timestamp) -> String {
    format!("TRX-{}-{:04}", now.strftime("%Y%m%d"), suffix())
}

pub fn account_number(now: Timestamp) -> String {
    format!("SAV-{}-{:04}", now.strftime("%Y%m"), suffix())
}

fn suffix() -> u16 {
    rand::thread_rng().gen_range(0..10_000)
}
