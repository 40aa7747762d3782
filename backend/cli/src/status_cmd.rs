//! `keygate status`: query a node's built-in `/status` route.

use anyhow::Result;
use keygate_core::{Method, SignedCall};
use keygate_gateway::RpcClient;

use crate::output;

pub async fn run(url: &str) -> Result<()> {
    let client = RpcClient::new(url)?;
    match client.send(&SignedCall::new("/status"), Method::Get).await {
        Ok(response) => {
            print!("{}", output::render_envelope(&response, output::supports_color()));
            Ok(())
        }
        Err(e) => {
            output::note_error(&format!("keygate is not reachable at {url}: {e:#}"));
            Err(e)
        }
    }
}
