use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use crate::sheets::credential::{Credential, OAuthFlow};
use async_trait::async_trait;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::redirect::Policy;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tiny_http::{Response, Server};
use tracing::{debug, instrument};
use url::Url;
use yup_oauth2::ApplicationSecret;

/// Used when the token response carries no `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Installed-app consent flow against Google's OAuth2 endpoints.
///
/// The client secret file is only read when a token has to be requested, so
/// a valid cached credential works without it.
pub struct GoogleOAuthFlow {
    client_secret_path: PathBuf,
    http_client: reqwest::Client,
    scopes: Vec<String>,
    callback_port: u16,
}

impl GoogleOAuthFlow {
    pub fn new(config: &GoogleConfig) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client_secret_path: config.client_secret_path.clone(),
            http_client,
            scopes: config.scopes.clone(),
            callback_port: config.callback_port,
        })
    }

    async fn oauth_client(&self) -> Result<ConfiguredClient> {
        let secret = load_client_secret(&self.client_secret_path).await?;
        build_client(secret)
    }
}

async fn load_client_secret(path: &Path) -> Result<ApplicationSecret> {
    if !path.exists() {
        return Err(AppError::Auth(format!(
            "Client secret file not found at {:?}. Download it from the Google Cloud console.",
            path
        )));
    }

    yup_oauth2::read_application_secret(path)
        .await
        .map_err(|e| AppError::Auth(format!("Failed to read client secret {:?}: {}", path, e)))
}

fn build_client(secret: ApplicationSecret) -> Result<ConfiguredClient> {
    let auth_url = AuthUrl::new(secret.auth_uri)
        .map_err(|e| AppError::Auth(format!("Invalid auth URL: {}", e)))?;
    let token_url = TokenUrl::new(secret.token_uri)
        .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;

    let client = BasicClient::new(ClientId::new(secret.client_id))
        .set_client_secret(ClientSecret::new(secret.client_secret))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_auth_type(AuthType::RequestBody);

    Ok(client)
}

/// Extract the authorization code from the loopback callback path
fn parse_callback(path: &str, csrf_token: &CsrfToken) -> Result<AuthorizationCode> {
    let url = Url::parse(&format!("http://127.0.0.1{}", path))
        .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(AppError::Auth(format!("Authorization denied: {}", error)));
    }

    let code = param("code").ok_or_else(|| AppError::Auth("No code in callback".to_string()))?;
    let state = param("state").ok_or_else(|| AppError::Auth("No state in callback".to_string()))?;

    if state != *csrf_token.secret() {
        return Err(AppError::Auth("CSRF token mismatch".to_string()));
    }

    Ok(AuthorizationCode::new(code))
}

fn credential_from_response(
    token_result: &BasicTokenResponse,
    fallback_refresh_token: Option<&str>,
) -> Credential {
    let expires_in = token_result
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    Credential {
        access_token: token_result.access_token().secret().clone(),
        refresh_token: token_result
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| fallback_refresh_token.map(str::to_string)),
        expires_at: Some(chrono::Utc::now().timestamp() + expires_in),
    }
}

#[async_trait]
impl OAuthFlow for GoogleOAuthFlow {
    #[instrument(name = "Authorizing with Google", skip_all)]
    async fn authorize(&self) -> Result<Credential> {
        let client = self.oauth_client().await?;

        // Start a local server to receive the callback
        let bind_addr = format!("127.0.0.1:{}", self.callback_port);
        let server = Server::http(&bind_addr)
            .map_err(|e| AppError::Auth(format!("Failed to bind to {}: {}", bind_addr, e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| AppError::Auth("Callback server has no IP address".to_string()))?;

        let redirect_url = format!("http://127.0.0.1:{}/", port);
        let client = client.set_redirect_uri(
            RedirectUrl::new(redirect_url)
                .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))?,
        );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let scopes = self
            .scopes
            .iter()
            .map(|s| Scope::new(s.to_string()))
            .collect::<Vec<Scope>>();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes)
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        write_consent_prompt(&mut io::stderr().lock(), &auth_url)?;

        let request = server
            .recv()
            .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

        let code = parse_callback(request.url(), &csrf_token);
        let message = match &code {
            Ok(_) => "Authentication successful! You can close this window.".to_string(),
            Err(e) => format!("Authentication failed: {}", e),
        };
        request
            .respond(Response::from_string(message))
            .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;
        let code = code?;

        let token_result = client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to exchange code: {:?}", e)))?;
        debug!("Authorization code exchanged");

        Ok(credential_from_response(&token_result, None))
    }

    #[instrument(name = "Refreshing Google token", skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let client = self.oauth_client().await?;

        let token_result = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        Ok(credential_from_response(&token_result, Some(refresh_token)))
    }
}

/// Prompt for the consent URL; written to stderr so stdout only carries the report
fn write_consent_prompt<W: Write>(out: &mut W, auth_url: &Url) -> io::Result<()> {
    writeln!(out, "Open this URL in your browser:\n{}", auth_url)?;
    writeln!(out)?;
    writeln!(out, "Waiting for authorization...")
}
