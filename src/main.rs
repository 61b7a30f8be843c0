//! Web service dispatcher (`www-dispatch`).
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                      DISPATCHER                           │
//!                     │                                                           │
//!   Client            │  ┌──────────┐   ┌──────────┐   ┌──────────┐              │
//!   ──────────────────┼─▶│ listener │──▶│  poller  │──▶│  access  │──reject──▶ close
//!                     │  │ (2784)   │   │ (5s cap) │   │  filter  │              │
//!                     │  └──────────┘   └────┬─────┘   └────┬─────┘              │
//!                     │                      │ timeout      │ admit              │
//!                     │                      ▼              ▼                    │
//!                     │                 ┌──────────┐   ┌──────────┐              │
//!                     │                 │  reaper  │◀──│ handoff  │──fork/exec──┼──▶ handler
//!                     │                 └──────────┘   └──────────┘              │   (fd 0 = socket)
//!                     └──────────────────────────────────────────────────────────┘
//! ```
//!
//! `-world` is forwarded verbatim to every spawned handler.

use std::process::ExitCode;

use conn_dispatch::cli::{normalize_world_flag, parse_args, WebCli};
use conn_dispatch::config::ServiceKind;
use conn_dispatch::lifecycle::startup;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli: WebCli = match parse_args(normalize_world_flag(std::env::args_os())) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match cli.service.resolve(ServiceKind::Web, cli.world) {
        Ok(config) => startup::run(config).await,
        Err(e) => startup::report_config_error(&e),
    }
}
