// Error taxonomy
pub mod error;

// Supported service enumeration
pub mod service;

// Encrypted credential storage
pub mod credentials;

// Transient OAuth handshake sessions
pub mod session;

// Connection status resolution
pub mod status;

// OAuth provider clients
pub mod provider;

// Host capability interfaces
pub mod host;

// Handshake orchestration
pub mod coordinator;

// HTTP route wiring
pub mod api;

// Configuration
pub mod config;
