//! `keygate call`: sign one call and send it to a node.

use anyhow::{Context, Result};
use keygate_core::{Method, SignedCall};
use keygate_gateway::{CallResponse, RpcClient};
use keygate_security::signing_key_from_hex;

use crate::output;

pub struct CallArgs {
    pub url: String,
    pub function: String,
    pub method: Method,
    pub params: Vec<String>,
    pub signing_key: Option<String>,
}

pub async fn send(args: CallArgs) -> Result<CallResponse> {
    let client = RpcClient::new(&args.url)?;
    let function = if args.function.starts_with('/') {
        args.function
    } else {
        format!("/{}", args.function)
    };
    let mut call = args
        .params
        .into_iter()
        .fold(SignedCall::new(function), |call, param| call.with_param(param));

    match args.signing_key {
        Some(hex) => {
            let key = signing_key_from_hex(&hex).context("KEYGATE_SIGNING_KEY is not a valid key")?;
            client.send_signed(&mut call, &key, args.method).await
        }
        None => {
            output::note_warn("no signing key given; sending an unsigned call");
            client.send(&call, args.method).await
        }
    }
}

pub async fn run(args: CallArgs) -> Result<()> {
    let response = send(args).await?;
    print!("{}", output::render_envelope(&response, output::supports_color()));
    if !response.is_success() {
        anyhow::bail!("node answered with status {}", response.status());
    }
    Ok(())
}
