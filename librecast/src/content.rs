//! Fixed content pools for outgoing posts

use rand::seq::SliceRandom;

/// Caption phrases attached to republished posts. One is picked uniformly
/// per publish attempt.
pub const CAPTIONS: &[&str] = &[
    "Worth a second look.",
    "Still true today.",
    "Resurfacing this one.",
    "This one aged well.",
    "One from the archives.",
    "Never gets old.",
    "In case you missed it.",
    "Bringing this back.",
];

/// Donor posts scraped solely for attachable media. They are unrelated to
/// the mirrored account, never stored, and never flagged used.
pub const DONOR_POSTS: &[&str] = &[
    "https://twitter.com/twitter/statuses/1580661436132757506",
    "https://twitter.com/twitter/statuses/1586719944124939265",
    "https://twitter.com/twitter/statuses/1593015057557311493",
];

pub fn random_caption() -> &'static str {
    CAPTIONS.choose(&mut rand::thread_rng()).copied().unwrap_or("")
}
