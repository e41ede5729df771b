//! Docker Engine backend for the container inspector interface.

use bollard::Docker;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models;

use crate::container::{ContainerID, ContainerInspector, ContainerRecord, ContainerSummary};
use crate::error::ResultOkLogExt;

/// Container inspector backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerInspector {
    docker: Docker,
}

impl DockerInspector {
    /// Wraps an existing engine connection.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connects using the environment defaults: `DOCKER_HOST` when set,
    /// the local socket otherwise.
    ///
    /// # Errors
    ///
    /// Returns the engine error when no connection can be established.
    pub fn from_env() -> std::result::Result<Self, bollard::errors::Error> {
        Ok(Self::new(Docker::connect_with_defaults()?))
    }
}

impl ContainerInspector for DockerInspector {
    type Error = bollard::errors::Error;

    async fn list(&self) -> std::result::Result<Vec<ContainerSummary>, Self::Error> {
        let listed = self
            .docker
            .list_containers(Option::<ListContainersOptions<String>>::None)
            .await?;
        Ok(listed.into_iter().filter_map(summary_from_listing).collect())
    }

    async fn inspect(
        &self,
        id: &ContainerID,
    ) -> std::result::Result<ContainerRecord, Self::Error> {
        let response = self
            .docker
            .inspect_container(id.as_str(), Option::<InspectContainerOptions>::None)
            .await?;
        Ok(record_from_inspect(id, response))
    }
}

/// Maps one listing entry, skipping entries without a usable identifier.
fn summary_from_listing(entry: models::ContainerSummary) -> Option<ContainerSummary> {
    let id = ContainerID::new(entry.id.unwrap_or_default()).ok_log()?;
    Some(ContainerSummary {
        id,
        labels: entry.labels.unwrap_or_default(),
    })
}

/// Maps an inspect response into the engine-independent record.
///
/// Network attachments are sorted by network name so the fallback address
/// resolution is stable across calls.
fn record_from_inspect(
    id: &ContainerID,
    response: models::ContainerInspectResponse,
) -> ContainerRecord {
    let config = response.config.unwrap_or_default();
    let settings = response.network_settings.unwrap_or_default();

    let mut networks: Vec<(String, String)> = settings
        .networks
        .unwrap_or_default()
        .into_iter()
        .map(|(name, endpoint)| (name, endpoint.ip_address.unwrap_or_default()))
        .collect();
    networks.sort_by(|a, b| a.0.cmp(&b.0));

    ContainerRecord {
        id: id.clone(),
        name: response.name.unwrap_or_default(),
        labels: config.labels.unwrap_or_default(),
        env: config.env.unwrap_or_default(),
        image: config.image.unwrap_or_default(),
        networks,
        ip_address: settings.ip_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_listing_skips_entries_without_id() {
        let entries = vec![
            models::ContainerSummary {
                id: None,
                ..Default::default()
            },
            models::ContainerSummary {
                id: Some("abc123".to_owned()),
                labels: Some(HashMap::from([("app".to_owned(), "db".to_owned())])),
                ..Default::default()
            },
        ];
        let summaries: Vec<_> = entries.into_iter().filter_map(summary_from_listing).collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id.as_str(), "abc123");
        assert_eq!(summaries[0].labels.get("app").unwrap(), "db");
    }

    #[test]
    fn test_inspect_mapping_sorts_networks_and_keeps_raw_primary_ip() {
        let id = ContainerID::new("abc123").unwrap();
        let response = models::ContainerInspectResponse {
            name: Some("/deploy-cnf1-1".to_owned()),
            config: Some(models::ContainerConfig {
                image: Some("example/cnf:23.02".to_owned()),
                env: Some(vec!["MICROSERVICE_LABEL=cnf1".to_owned()]),
                labels: Some(HashMap::from([(
                    "com.docker.compose.service".to_owned(),
                    "cnf1-service".to_owned(),
                )])),
                ..Default::default()
            }),
            network_settings: Some(models::NetworkSettings {
                ip_address: Some(String::new()),
                networks: Some(HashMap::from([
                    (
                        "overlay".to_owned(),
                        models::EndpointSettings {
                            ip_address: Some("10.3.0.7".to_owned()),
                            ..Default::default()
                        },
                    ),
                    (
                        "bridge".to_owned(),
                        models::EndpointSettings {
                            ip_address: None,
                            ..Default::default()
                        },
                    ),
                ])),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = record_from_inspect(&id, response);
        assert_eq!(record.id, id);
        assert_eq!(record.name, "/deploy-cnf1-1");
        assert_eq!(record.service_name(), "cnf1-service");
        assert_eq!(record.microservice_label(), Some("cnf1"));
        assert_eq!(
            record.networks,
            vec![
                ("bridge".to_owned(), String::new()),
                ("overlay".to_owned(), "10.3.0.7".to_owned()),
            ]
        );
        assert_eq!(record.ip_address, Some(String::new()));
    }

    #[test]
    fn test_inspect_mapping_tolerates_sparse_responses() {
        let id = ContainerID::new("abc123").unwrap();
        let record = record_from_inspect(&id, models::ContainerInspectResponse::default());
        assert_eq!(record.name, "");
        assert!(record.labels.is_empty());
        assert!(record.env.is_empty());
        assert!(record.networks.is_empty());
        assert_eq!(record.ip_address, None);
    }
}
