//! OAuth2 authorization against Twitch.
//!
//! Covers both flows the bridge needs: the one-time channel-owner
//! authorization (scope `channel_read`) and the per-visitor follow
//! authorization (scopes `user_read user_follows_edit`). Both are plain
//! authorization-code flows; Twitch v5 does not support PKCE, so only the
//! `state` parameter guards the redirect.

use bytes::Bytes;
use eyre::Context;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::url::Url;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, Scope, TokenUrl, reqwest};
use std::future::Future;
use tokio::net::TcpListener;

pub use oauth2::{AuthorizationCode, RedirectUrl, TokenResponse};

/// Twitch v5 authorization endpoint.
const AUTHORIZE_URL: &str = "https://api.twitch.tv/kraken/oauth2/authorize";
/// Twitch v5 token endpoint.
const TOKEN_URL: &str = "https://api.twitch.tv/kraken/oauth2/token";

/// Scope requested when the channel owner connects their channel.
pub const CHANNEL_SCOPES: &[&str] = &["channel_read"];
/// Scopes requested from a visitor going through the follow flow.
pub const FOLLOW_SCOPES: &[&str] = &["user_read", "user_follows_edit"];

/// Page shown in the visitor's browser once the redirect has been captured.
const OAUTH_DONE_HTML: &str = "<!DOCTYPE html>\
<html><head><title>Authorized</title></head>\
<body><p>Authorization complete. You can close this tab and return to the site.</p></body></html>";

/// Manages OAuth2 authorization flows for the Twitch API.
///
/// Holds the application credentials and knows how to build authorize URLs,
/// capture the redirect on a loopback listener, and exchange authorization
/// codes for access tokens.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
}

impl OAuthManager {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Points the manager at different authorize and token endpoints.
    ///
    /// Used by tests to target a mock server.
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Builds the Twitch authorization URL for the given redirect and scopes.
    ///
    /// The resulting URL carries `response_type=code`, `client_id`,
    /// `redirect_uri`, the space-separated `scope` list, and `state`.
    ///
    /// # Panics
    ///
    /// Panics if the configured authorize endpoint URL is malformed.
    pub fn authorize_url(&self, redirect: RedirectUrl, scopes: &[&str], state: CsrfToken) -> Url {
        let auth_url =
            AuthUrl::new(self.auth_url.clone()).expect("Invalid authorization endpoint URL");
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_redirect_uri(redirect);

        let (url, _state) = client
            // The state is single-use; each flow generates a fresh one.
            .authorize_url(move || state.clone())
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .url();
        url
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// The `redirect` must match the one presented in the authorize request
    /// that produced the code. The caller's stored token must stay empty
    /// until this returns successfully.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (does not happen in
    /// practice).
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        redirect: RedirectUrl,
    ) -> eyre::Result<BasicTokenResponse> {
        let token_url =
            TokenUrl::new(self.token_url.clone()).context("token endpoint URL is malformed")?;
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(token_url)
            .set_redirect_uri(redirect);

        let http_client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");

        let token = client
            .exchange_code(code)
            .request_async(&http_client)
            .await
            .context("exchange authorization code for access token")?;

        Ok(token)
    }

    /// Runs the authorize leg of the flow and returns the captured code.
    ///
    /// Binds a loopback HTTP listener for the redirect, opens the user's
    /// browser on the authorize URL, and waits for Twitch to redirect back
    /// with a `code` and a matching `state`. The returned [`RedirectUrl`] is
    /// needed for the subsequent [`Self::exchange_code`].
    pub async fn request_authorization(
        &self,
        scopes: &[&str],
    ) -> eyre::Result<(AuthorizationCode, RedirectUrl)> {
        let state = CsrfToken::new_random();
        let (redirect, eventually_code) = self
            .setup_redirect(state.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_url = self.authorize_url(redirect.clone(), scopes, state);
        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        webbrowser::open(auth_url.as_ref()).context("open user's browser")?;

        let code = eventually_code
            .await
            .context("await user authorization code")?;
        Ok((code, redirect))
    }

    /// Performs a complete authorization flow and returns the access token.
    ///
    /// Convenience wrapper over [`Self::request_authorization`] followed by
    /// [`Self::exchange_code`].
    pub async fn authenticate(&self, scopes: &[&str]) -> eyre::Result<BasicTokenResponse> {
        let (code, redirect) = self.request_authorization(scopes).await?;
        self.exchange_code(code, redirect).await
    }

    /// Binds a loopback listener for the OAuth redirect and spawns the
    /// capture task; the returned future resolves with the authorization
    /// code once the redirect lands.
    async fn setup_redirect(
        &self,
        state: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind callback listener")?;
        let addr = listener.local_addr().context("get callback address")?;
        let redirect =
            RedirectUrl::new(format!("http://{addr}")).context("construct redirect url")?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(capture_callback(listener, state).await);
        });

        Ok((redirect, async move {
            rx.await.context("callback task dropped prematurely")?
        }))
    }
}

/// Serves exactly one callback request and returns the code it carried.
///
/// The connection is shut down gracefully once a valid callback has been
/// answered, so the browser still receives the confirmation page.
async fn capture_callback(
    listener: TcpListener,
    state: CsrfToken,
) -> eyre::Result<AuthorizationCode> {
    let (conn, _) = listener.accept().await.context("accept callback connection")?;
    let conn = hyper_util::rt::TokioIo::new(conn);

    let (found_tx, mut found_rx) = tokio::sync::mpsc::channel(1);
    let service = service_fn(move |req: Request<body::Incoming>| {
        let state = state.clone();
        let found_tx = found_tx.clone();
        async move {
            let code = parse_callback(req.uri().query().unwrap_or(""), &state)?;
            found_tx
                .send(code)
                .await
                .expect("receiver lives until the server shuts down");
            Ok::<_, &'static str>(Response::new(Full::<Bytes>::from(OAUTH_DONE_HTML)))
        }
    });

    let mut serving = std::pin::pin!(
        hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
    );
    tokio::select! {
        exit = &mut serving => match exit {
            Ok(()) => eyre::bail!("callback server exited before a code arrived"),
            Err(e) => Err(e).context("callback server got a bad request"),
        },
        code = found_rx.recv() => {
            serving.graceful_shutdown();
            Ok(code.expect("sender lives in the service closure"))
        }
    }
}

/// Extracts the authorization code from the callback query string.
///
/// The `state` parameter must match the CSRF token generated for this flow;
/// a callback without a matching state or without a code is rejected.
fn parse_callback(
    query: &str,
    expected_state: &CsrfToken,
) -> Result<AuthorizationCode, &'static str> {
    let mut state = None;
    let mut code = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => state = Some(v.into_owned()),
            "code" => code = Some(v.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state.secret().as_str()) {
        return Err("state parameter does not match");
    }
    code.map(AuthorizationCode::new)
        .ok_or("no authorization code in callback")
}
