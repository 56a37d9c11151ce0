use crate::{response, Error};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

#[async_trait]
pub trait ResponseExt {
    async fn parse<T: DeserializeOwned>(self) -> Result<T, Error>;
    async fn parse_empty(self) -> Result<(), Error>;
}

#[async_trait]
impl ResponseExt for reqwest::Response {
    async fn parse<T: DeserializeOwned>(self) -> Result<T, Error> {
        if self.status().is_success() {
            Ok(self.json().await?)
        } else {
            Err(into_error(self).await)
        }
    }

    async fn parse_empty(self) -> Result<(), Error> {
        if self.status().is_success() {
            Ok(())
        } else {
            Err(into_error(self).await)
        }
    }
}

async fn into_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => response::Error::from_body(status, &body).into(),
        Err(e) => e.into(),
    }
}
