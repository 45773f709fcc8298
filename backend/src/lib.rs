//! Crop disease prediction: a one-page form in front of a pre-trained
//! classifier, with static advisory text for each predicted disease.

pub mod config;
pub mod error;
pub mod form;
pub mod inference;
pub mod knowledge;
pub mod models;
pub mod render;
pub mod routes;
pub mod state;
pub mod stats;
