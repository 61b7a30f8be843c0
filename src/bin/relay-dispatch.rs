//! Relay service dispatcher (`relay-dispatch`).
//!
//! Same loop as the web dispatcher; the handler receives the socket
//! descriptor number and the accept timestamp on its command line.

use std::process::ExitCode;

use conn_dispatch::cli::{parse_args, RelayCli};
use conn_dispatch::config::ServiceKind;
use conn_dispatch::lifecycle::startup;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli: RelayCli = match parse_args(std::env::args_os().collect()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match cli.service.resolve(ServiceKind::Relay, false) {
        Ok(config) => startup::run(config).await,
        Err(e) => startup::report_config_error(&e),
    }
}
