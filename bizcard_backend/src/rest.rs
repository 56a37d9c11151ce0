use crate::util::ResponseExt;
use crate::{
    response, Auth, AuthSession, ErrorKind, Filter, Principal, Resolution, Result, Row,
    SignUp, Storage, Table, Tables,
};
use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::result::Result as StdResult;
use tracing::debug;
use url::Url;

/// Struct for specifying the URLs of the backend services.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urls {
    pub auth: Url,
    pub rest: Url,
    pub storage: Url,
}

impl Urls {
    /// Creates a new [`Urls`] type from the URL of a hosted project.
    ///
    /// | Field       | URL                         |
    /// |-------------|-----------------------------|
    /// | [`auth`]    | *\<url\>*/auth/v1           |
    /// | [`rest`]    | *\<url\>*/rest/v1           |
    /// | [`storage`] | *\<url\>*/storage/v1        |
    ///
    /// [`auth`]: Self::auth
    /// [`rest`]: Self::rest
    /// [`storage`]: Self::storage
    pub fn new(project_url: &Url) -> StdResult<Self, url::ParseError> {
        Ok(Self {
            auth: project_url.join("auth/v1")?,
            rest: project_url.join("rest/v1")?,
            storage: project_url.join("storage/v1")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: Principal,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            user: token.user,
        }
    }
}

/// A sign up returns a session when no email confirmation is required and the bare user
/// otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(Principal),
}

/// A backend reached over the hosted service's HTTP API.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    urls: Urls,
    api_key: String,
    bucket: String,
}

impl RestBackend {
    /// Creates a new [`RestBackend`] for the project at `project_url`, storing uploads in
    /// `bucket`.
    pub fn new<K, B>(project_url: &Url, api_key: K, bucket: B) -> StdResult<Self, url::ParseError>
    where
        K: Into<String>,
        B: Into<String>,
    {
        Ok(Self {
            client: reqwest::Client::new(),
            urls: Urls::new(project_url)?,
            api_key: api_key.into(),
            bucket: bucket.into(),
        })
    }

    /// Returns the URLs of the backend services.
    pub fn urls(&self) -> &Urls {
        &self.urls
    }

    fn request<F, I>(
        &self,
        method: Method,
        url: F,
        path_segments: I,
        access_token: Option<&str>,
    ) -> StdResult<RequestBuilder, url::ParseError>
    where
        F: Fn(&Urls) -> &Url,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = url(&self.urls).clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path_segments);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", access_token.unwrap_or(&self.api_key)),
            ))
    }

    fn request_table(
        &self,
        method: Method,
        table: Table,
        filters: &[Filter],
        access_token: Option<&str>,
    ) -> StdResult<RequestBuilder, url::ParseError> {
        let query = filters.iter().map(Filter::to_query).collect::<Vec<_>>();
        Ok(self
            .request(method, |urls| &urls.rest, &[table.name()], access_token)?
            .query(&query))
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthSession> {
        Ok(self
            .request(Method::POST, |urls| &urls.auth, &["token"], None)?
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?
            .parse::<TokenResponse>()
            .await?
            .into())
    }
}

fn first_row(table: Table, rows: Vec<Row>) -> Result<Row> {
    rows.into_iter().next().ok_or_else(|| {
        response::Error::new(
            ErrorKind::Other,
            200,
            format!("{} returned no representation", table),
        )
        .into()
    })
}

#[async_trait]
impl Auth for RestBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        debug!(email, "signing up");
        let response = self
            .request(Method::POST, |urls| &urls.auth, &["signup"], None)?
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?
            .parse::<SignUpResponse>()
            .await?;
        Ok(match response {
            SignUpResponse::Session(token) => {
                let session = AuthSession::from(token);
                SignUp {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUp {
                user,
                session: None,
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        debug!(email, "signing in");
        self.token("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        debug!("refreshing access token");
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.request(Method::POST, |urls| &urls.auth, &["logout"], Some(access_token))?
            .send()
            .await?
            .parse_empty()
            .await
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &Url) -> Result<()> {
        self.request(Method::POST, |urls| &urls.auth, &["recover"], None)?
            .query(&[("redirect_to", redirect_to.as_str())])
            .json(&json!({ "email": email }))
            .send()
            .await?
            .parse_empty()
            .await
    }
}

#[async_trait]
impl Tables for RestBackend {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        access_token: Option<&str>,
    ) -> Result<Vec<Row>> {
        self.request_table(Method::GET, table, filters, access_token)?
            .query(&[("select", "*")])
            .send()
            .await?
            .parse()
            .await
    }

    async fn insert(&self, table: Table, row: Row, access_token: Option<&str>) -> Result<Row> {
        let rows = self
            .request_table(Method::POST, table, &[], access_token)?
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?
            .parse()
            .await?;
        first_row(table, rows)
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
        access_token: Option<&str>,
    ) -> Result<Vec<Row>> {
        self.request_table(Method::PATCH, table, filters, access_token)?
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?
            .parse()
            .await
    }

    async fn upsert(
        &self,
        table: Table,
        row: Row,
        on_conflict: &str,
        resolution: Resolution,
        access_token: Option<&str>,
    ) -> Result<Option<Row>> {
        let resolution = match resolution {
            Resolution::Merge => "resolution=merge-duplicates",
            Resolution::IgnoreDuplicates => "resolution=ignore-duplicates",
        };
        let rows: Vec<Row> = self
            .request_table(Method::POST, table, &[], access_token)?
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", format!("{},return=representation", resolution))
            .json(&[row])
            .send()
            .await?
            .parse()
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl Storage for RestBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        access_token: Option<&str>,
    ) -> Result<()> {
        debug!(path, len = bytes.len(), "uploading object");
        let segments = ["object", self.bucket.as_str()]
            .iter()
            .copied()
            .chain(path.split('/'))
            .collect::<Vec<_>>();
        self.request(Method::POST, |urls| &urls.storage, segments, access_token)?
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?
            .parse_empty()
            .await
    }

    fn public_url(&self, path: &str) -> Result<Url> {
        let mut url = self.urls.storage.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(&["object", "public", self.bucket.as_str()])
            .extend(path.split('/'));
        Ok(url)
    }
}
