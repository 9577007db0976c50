//! Backend API types
//!
//! Request and response bodies exchanged with the prediction service and
//! the account backend, plus the message-selection rule both use when a
//! request fails.

pub mod types;

pub use types::{
    select_message, AuthStatusResponse, LoginRequest, LoginResponse, PredictResponse,
};
