//! Behaviour scenarios for `buildbox provision`.

mod bdd_steps;
mod scenarios;
mod test_helpers;
