// Giveaway Bot - Utility Functions
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use crate::state::UserId;

/// Placeholder URL from the help text that people paste verbatim
pub const PLACEHOLDER_DESTINATION: &str = "https://mytradeurl.here";

/// Pick one element uniformly at random
pub fn pick_uniform<T>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut rng = rand::thread_rng();
    items.choose(&mut rng)
}

/// Pick a count in `min..=max` (capped by `available`) and that many distinct items
pub fn sample_prize<T: Clone>(items: &[T], min: usize, max: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    let wanted = rng.gen_range(min..=max.max(min)).min(items.len());
    items.choose_multiple(&mut rng, wanted).cloned().collect()
}

/// Strip everything but digits, the way mentions and pasted ids are cleaned
pub fn parse_user_id(raw: &str) -> Option<UserId> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn is_destination_url(url: &str) -> bool {
    url.starts_with("https://")
}

pub fn is_placeholder_destination(url: &str) -> bool {
    url.contains(PLACEHOLDER_DESTINATION)
}

