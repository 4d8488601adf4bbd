//! Test fixtures for service descriptions and registries.

use portier_registry::{ServiceDescription, ServiceRegistry};

/// Services of [`test_registry`].
pub const TEST_SERVICES: [&str; 2] = ["Radar", "Lidar"];

/// Instances of [`test_registry`].
pub const TEST_INSTANCES: [&str; 2] = ["FrontLeft", "FrontRight"];

/// Events of [`test_registry`].
pub const TEST_EVENTS: [&str; 2] = ["Objects", "Status"];

/// Create a service description.
///
/// # Panics
///
/// Panics if an identifier exceeds the identifier length limit.
#[must_use]
pub fn test_description(service: &str, instance: &str, event: &str) -> ServiceDescription {
    ServiceDescription::new(service, instance, event).expect("test identifiers fit")
}

/// The description used by single-service tests.
#[must_use]
pub fn radar_description() -> ServiceDescription {
    test_description("Radar", "FrontLeft", "Objects")
}

/// `count` pairwise distinct descriptions.
#[must_use]
pub fn numbered_descriptions(count: usize) -> Vec<ServiceDescription> {
    (0..count)
        .map(|i| {
            test_description(
                &format!("Service{i}"),
                &format!("Instance{i}"),
                &format!("Event{i}"),
            )
        })
        .collect()
}

/// Every combination of [`TEST_SERVICES`], [`TEST_INSTANCES`] and
/// [`TEST_EVENTS`].
#[must_use]
pub fn test_description_matrix() -> Vec<ServiceDescription> {
    let mut descriptions = Vec::new();
    for service in TEST_SERVICES {
        for instance in TEST_INSTANCES {
            for event in TEST_EVENTS {
                descriptions.push(test_description(service, instance, event));
            }
        }
    }
    descriptions
}

/// A registry holding each description of [`test_description_matrix`] once.
///
/// # Panics
///
/// Panics if the registry cannot hold the matrix.
#[must_use]
pub fn test_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::with_capacity(16);
    for description in test_description_matrix() {
        registry.add(&description).expect("matrix fits in the registry");
    }
    registry
}
