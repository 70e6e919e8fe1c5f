//! Membergate — Telegram onboarding bot for a private channel.

pub mod app;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod gateway;
pub mod onboarding;
pub mod store;
