//! End-to-end tests for the relay server and transfer sessions.

mod helpers;
mod relay_test;
mod transfer_test;
mod ws_test;
