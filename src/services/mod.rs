//! # Service Configuration Module
//!
//! Produces the files the container runtime consumes once addresses are
//! allocated:
//!
//! - `docker-compose.yml`: `etc/base-compose.yml` with every selected
//!   service definition merged into its `services` section
//! - `.env`: one `KEY=value` line per address variable and per setting
//!
//! ## Example `.env`
//!
//! ```text
//! SERVICES_IP=192.168.1.51
//! GAME_IP=192.168.1.53
//! PORT=25565
//! DOMAIN=lan
//! ```

pub mod compose;
pub mod env;

pub use compose::{build_compose, merge_service, write_compose};
pub use env::{render_env, write_env};
