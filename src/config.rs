use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    Password {
        username: String,
        password: String,
        user_domain: String,
        project: Project,
    },
    ApplicationCredential {
        id: String,
        secret: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Project {
    Id(String),
    Name { name: String, domain: String },
}

/// Everything needed to reach the image service. Built once at startup
/// and passed down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudConfig {
    pub auth_url: String,
    pub credentials: Credentials,
    pub region: Option<String>,
    /// catalog interface, usually public
    pub interface: String,
}

impl CloudConfig {
    /// Reads the usual OS_* variables of an openrc / clouds.yaml export.
    pub fn from_env() -> Result<CloudConfig, Error> {
        CloudConfig::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<CloudConfig, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).filter(|v| !v.is_empty());
        let require = |var: &'static str| get(var).ok_or(Error::MissingEnv { var });

        let auth_url = require("OS_AUTH_URL")?;

        let credentials = match get("OS_APPLICATION_CREDENTIAL_ID") {
            Some(id) => Credentials::ApplicationCredential {
                id,
                secret: require("OS_APPLICATION_CREDENTIAL_SECRET")?,
            },
            None => {
                let project = match get("OS_PROJECT_ID") {
                    Some(id) => Project::Id(id),
                    None => Project::Name {
                        name: require("OS_PROJECT_NAME")?,
                        domain: get("OS_PROJECT_DOMAIN_NAME")
                            .unwrap_or_else(|| "Default".to_string()),
                    },
                };
                Credentials::Password {
                    username: require("OS_USERNAME")?,
                    password: require("OS_PASSWORD")?,
                    user_domain: get("OS_USER_DOMAIN_NAME")
                        .unwrap_or_else(|| "Default".to_string()),
                    project,
                }
            }
        };

        Ok(CloudConfig {
            auth_url,
            credentials,
            region: get("OS_REGION_NAME"),
            interface: get("OS_INTERFACE").unwrap_or_else(|| "public".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_password_defaults() {
        let config = CloudConfig::from_lookup(lookup(&[
            ("OS_AUTH_URL", "https://keystone.example:5000"),
            ("OS_USERNAME", "ci"),
            ("OS_PASSWORD", "hunter2"),
            ("OS_PROJECT_NAME", "images"),
        ]))
        .unwrap();

        assert_eq!(config.interface, "public");
        assert_eq!(config.region, None);
        assert_eq!(
            config.credentials,
            Credentials::Password {
                username: "ci".to_string(),
                password: "hunter2".to_string(),
                user_domain: "Default".to_string(),
                project: Project::Name {
                    name: "images".to_string(),
                    domain: "Default".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_application_credential_wins() {
        let config = CloudConfig::from_lookup(lookup(&[
            ("OS_AUTH_URL", "https://keystone.example:5000/v3"),
            ("OS_APPLICATION_CREDENTIAL_ID", "abc"),
            ("OS_APPLICATION_CREDENTIAL_SECRET", "s3cret"),
            ("OS_USERNAME", "ignored"),
            ("OS_REGION_NAME", "RegionOne"),
            ("OS_INTERFACE", "internal"),
        ]))
        .unwrap();

        assert_eq!(
            config.credentials,
            Credentials::ApplicationCredential {
                id: "abc".to_string(),
                secret: "s3cret".to_string(),
            }
        );
        assert_eq!(config.region.as_deref(), Some("RegionOne"));
        assert_eq!(config.interface, "internal");
    }

    #[test]
    fn test_project_id() {
        let config = CloudConfig::from_lookup(lookup(&[
            ("OS_AUTH_URL", "https://keystone.example:5000"),
            ("OS_USERNAME", "ci"),
            ("OS_PASSWORD", "hunter2"),
            ("OS_PROJECT_ID", "0123abcd"),
        ]))
        .unwrap();
        match config.credentials {
            Credentials::Password { project, .. } => {
                assert_eq!(project, Project::Id("0123abcd".to_string()))
            }
            other => panic!("unexpected credentials {:?}", other),
        }
    }

    #[test]
    fn test_missing_vars() {
        match CloudConfig::from_lookup(lookup(&[])) {
            Err(Error::MissingEnv { var }) => assert_eq!(var, "OS_AUTH_URL"),
            other => panic!("unexpected {:?}", other),
        }
        match CloudConfig::from_lookup(lookup(&[
            ("OS_AUTH_URL", "https://keystone.example:5000"),
            ("OS_USERNAME", "ci"),
            ("OS_PASSWORD", ""),
            ("OS_PROJECT_NAME", "images"),
        ])) {
            Err(Error::MissingEnv { var }) => assert_eq!(var, "OS_PASSWORD"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
