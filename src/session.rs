// Keystone v3 token session. Holds the token and the resolved image
// endpoint, every Glance call goes through it.
use crate::config::{CloudConfig, Credentials, Project};
use crate::error::Error;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize, Debug)]
struct TokenResponse {
    token: Token,
}

#[derive(Deserialize, Debug)]
struct Token {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize, Debug)]
struct CatalogEntry {
    #[serde(rename = "type")]
    type_: String,
    endpoints: Vec<Endpoint>,
}

#[derive(Deserialize, Debug)]
struct Endpoint {
    interface: String,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    url: String,
}

pub struct Session {
    client: Client,
    token: String,
    image_endpoint: String,
}

impl Session {
    pub fn connect(config: &CloudConfig) -> Result<Session, Error> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let url = tokens_url(&config.auth_url);
        debug!("POST {}", url);

        let response = client
            .post(&url)
            .json(&auth_body(&config.credentials))
            .send()?
            .error_for_status()?;
        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or(Error::MissingToken)?;
        let body: TokenResponse = response.json()?;

        let image_endpoint = image_endpoint(
            &body.token.catalog,
            &config.interface,
            config.region.as_deref(),
        )
        .ok_or_else(|| Error::NoEndpoint {
            interface: config.interface.clone(),
        })?;
        debug!("image endpoint {}", image_endpoint);

        Ok(Session::new(client, token, image_endpoint))
    }

    /// `image_endpoint` is the image API root, including the `/v2` suffix.
    pub fn new(client: Client, token: String, image_endpoint: String) -> Session {
        Session {
            client,
            token,
            image_endpoint,
        }
    }

    /// `path` is relative to the image API root, e.g. `images/{id}`.
    pub fn image_url(&self, path: &str) -> String {
        format!("{}/{}", self.image_endpoint, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.get(&self.image_url(path)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.post(&self.image_url(path)))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.put(&self.image_url(path)))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.delete(&self.image_url(path)))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("X-Auth-Token", self.token.as_str())
    }
}

fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

fn auth_body(credentials: &Credentials) -> Value {
    match credentials {
        Credentials::ApplicationCredential { id, secret } => json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": { "id": id, "secret": secret }
                }
            }
        }),
        Credentials::Password {
            username,
            password,
            user_domain,
            project,
        } => {
            let project = match project {
                Project::Id(id) => json!({ "id": id }),
                Project::Name { name, domain } => json!({
                    "name": name,
                    "domain": { "name": domain }
                }),
            };
            json!({
                "auth": {
                    "identity": {
                        "methods": ["password"],
                        "password": {
                            "user": {
                                "name": username,
                                "domain": { "name": user_domain },
                                "password": password
                            }
                        }
                    },
                    "scope": { "project": project }
                }
            })
        }
    }
}

/// Picks the image service url for `interface` (and `region` if given)
/// and makes sure it points at the v2 API.
fn image_endpoint(catalog: &[CatalogEntry], interface: &str, region: Option<&str>) -> Option<String> {
    let endpoint = catalog
        .iter()
        .filter(|entry| entry.type_ == "image")
        .flat_map(|entry| entry.endpoints.iter())
        .find(|endpoint| {
            endpoint.interface == interface
                && region.map_or(true, |r| {
                    endpoint.region_id.as_deref() == Some(r) || endpoint.region.as_deref() == Some(r)
                })
        })?;

    let url = endpoint.url.trim_end_matches('/');
    if url.ends_with("/v2") {
        Some(url.to_string())
    } else {
        Some(format!("{}/v2", url))
    }
}
