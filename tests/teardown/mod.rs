//! Behaviour scenarios for `buildbox teardown`.

mod bdd_steps;
mod scenarios;
mod test_helpers;
