use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("environment variable {var} is not set")]
    MissingEnv { var: &'static str },

    #[error("keystone did not return an X-Subject-Token header")]
    MissingToken,

    #[error("no {interface} image endpoint in the service catalog")]
    NoEndpoint { interface: String },

    #[error("image {id} did not become active within {secs}s")]
    UploadTimeout { id: String, secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
