//! Cross-module scenarios
//!
//! Unit tests live next to the code they cover; these exercise pools,
//! registry and builders together through the headless host.
