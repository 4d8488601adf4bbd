//! Prelude module - commonly used test helpers for convenient import.
//!
//! Use `use portier_test::prelude::*;` to import all essential helpers.

// Mocks
pub use crate::{HitCounter, MockSubscriber, MockTrigger, SubscriberEvent};

// Fixtures
pub use crate::{
    numbered_descriptions, radar_description, test_description, test_description_matrix,
    test_registry,
};

// Logging
pub use crate::init_test_logging;
