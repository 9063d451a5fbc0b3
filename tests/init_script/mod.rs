//! Step definitions, fixtures, and scenarios for control script rendering.

mod bdd_steps;
mod scenarios;
mod test_helpers;
