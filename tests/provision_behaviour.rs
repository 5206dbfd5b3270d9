//! Behavioural scenarios for `buildbox provision`.

#[path = "common/fixtures.rs"]
mod fixtures;

mod provision;
