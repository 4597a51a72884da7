use crate::config::{Config, GoogleConfig};
use crate::error::Result;
use crate::sheets::{
    Credential, FileCredentialStore, GoogleOAuthFlow, MemoryCredentialStore, acquire_credential,
};
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Delete cached tokens before authenticating
    #[arg(long)]
    pub reset: bool,

    /// Keep tokens in memory for this run only
    #[arg(long, conflicts_with = "reset")]
    pub no_cache: bool,
}

impl AuthArgs {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load()?.google;
        let _credential = authenticate(&config, self).await?;

        info!("Google authentication verified");

        Ok(())
    }
}

pub(super) async fn authenticate(config: &GoogleConfig, args: &AuthArgs) -> Result<Credential> {
    let flow = GoogleOAuthFlow::new(config)?;

    if args.no_cache {
        let store = MemoryCredentialStore::default();
        return acquire_credential(&store, &flow).await;
    }

    let store = FileCredentialStore::new(config.token_cache_file()?);
    if args.reset {
        store.clear()?;
    }

    acquire_credential(&store, &flow).await
}
